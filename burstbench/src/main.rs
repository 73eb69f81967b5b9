//! Command line entry point of the burst latency benchmark.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

fn main() -> anyhow::Result<()> {
    burstbench::cli::execute()
}
