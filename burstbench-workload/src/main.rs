//! Runs the demo workload HTTP server.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use std::net::SocketAddr;

use anyhow::Result;
use argh::FromArgs;
use tracing_subscriber::EnvFilter;

/// Demo workload server answering prime number queries.
#[derive(Debug, FromArgs)]
struct Args {
    /// address to listen on
    #[argh(option, default = "SocketAddr::from(([127, 0, 0, 1], 8080))")]
    addr: SocketAddr,
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("INFO,burstbench_workload=DEBUG"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("workload-rt")
        .enable_all()
        .build()?;

    runtime.block_on(burstbench_workload::web::server(args.addr))
}
