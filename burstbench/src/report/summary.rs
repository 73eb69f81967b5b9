//! Latency summary printed to the console.

use std::io::{self, Write};
use std::time::Duration;

use sketches_ddsketch::DDSketch;
use yansi::Paint;

use super::{ReportError, ReportRenderer};
use crate::measurement::{Snapshot, TargetRounds};

/// Prints request counts and latency percentiles per batch size and target.
#[derive(Debug)]
pub struct ConsoleSummary<W> {
    out: W,
}

impl ConsoleSummary<io::Stdout> {
    /// Creates a summary printing to stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleSummary<W> {
    /// Creates a summary printing to the given writer.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consumes the renderer and returns the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn print_target(&mut self, rounds: &TargetRounds) -> io::Result<()> {
        let mut elapsed = DDSketch::default();
        let mut delay = DDSketch::default();
        let mut failures = 0;

        for record in rounds.records() {
            delay.add(record.delay().as_secs_f64());
            if record.outcome.is_failure() {
                failures += 1;
            } else {
                elapsed.add(record.elapsed.as_secs_f64());
            }
        }

        let target = rounds.target();
        write!(
            self.out,
            "{} {} ({} rounds, {} requests",
            target.name().bold().blue(),
            target.host(),
            rounds.rounds().len(),
            (elapsed.count() + failures).bold()
        )?;
        if failures > 0 {
            write!(self.out, ", {}", format!("{failures} FAILURES").bold().red())?;
        }
        writeln!(self.out, ")")?;

        if elapsed.count() > 0 {
            write!(self.out, "  elapsed ")?;
            print_percentiles(&mut self.out, &elapsed)?;
        }
        if delay.count() > 0 {
            write!(self.out, "  delay   ")?;
            print_percentiles(&mut self.out, &delay)?;
        }

        Ok(())
    }
}

impl<W: Write> ReportRenderer for ConsoleSummary<W> {
    fn render(&mut self, snapshot: Snapshot<'_>) -> Result<(), ReportError> {
        for group in snapshot.groups() {
            writeln!(self.out)?;
            writeln!(
                self.out,
                "{}",
                format!("## {} requests", group.batch_size()).bold()
            )?;
            for rounds in group.targets() {
                self.print_target(rounds)?;
            }
        }
        self.out.flush()?;

        Ok(())
    }
}

fn print_percentiles(out: &mut impl Write, sketch: &DDSketch) -> io::Result<()> {
    let quantile = |q| {
        let secs = sketch.quantile(q).ok().flatten().unwrap_or_default();
        Duration::from_secs_f64(secs.max(0.0))
    };

    let avg = sketch.sum().unwrap_or_default() / sketch.count() as f64;
    let avg = Duration::from_secs_f64(avg.max(0.0));
    let p50 = quantile(0.5);
    let p90 = quantile(0.9);
    let p99 = quantile(0.99);

    writeln!(
        out,
        "avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}",
        avg.bold()
    )
}
