//! The `burstbench` command line interface.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result};
use argh::FromArgs;
use yansi::Paint;

use crate::config::Config;
use crate::console::Console;
use crate::dispatch::Dispatcher;
use crate::observability;
use crate::report::{ConsoleSummary, CsvReport, ReportRenderer};
use crate::session::{self, Answer, Ending, Session, SessionConfig};
use crate::target::Bounds;

/// Measures the latency of HTTP endpoints under bursts of concurrent requests.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Interactive(InteractiveCommand),
    Run(RunCommand),
    Targets(TargetsCommand),
    Version(VersionCommand),
}

/// prompt for targets, bounds and batch sizes until 'exit' is entered
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "interactive")]
struct InteractiveCommand {}

/// run a fixed list of batch sizes without prompting
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCommand {
    /// lower bound passed to the workload
    #[argh(option, default = "1000")]
    from: i64,

    /// upper bound passed to the workload
    #[argh(option, default = "10000")]
    to: i64,

    /// number of concurrent requests per batch, can be repeated
    #[argh(option, short = 'b')]
    batch: Vec<NonZeroUsize>,

    /// name of a configured target, can be repeated (default: all targets)
    #[argh(option, short = 't')]
    target: Vec<String>,
}

/// list the configured targets
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "targets")]
struct TargetsCommand {}

/// print the version
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    if let Command::Version(_) = args.command {
        println!("burstbench {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    observability::init_tracing(&config.logging);
    tracing::debug!(?config);

    if let Command::Targets(_) = args.command {
        for spec in &config.targets {
            println!("{} {}", spec.name.bold(), spec.url);
        }
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("burstbench-rt")
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        match args.command {
            Command::Interactive(InteractiveCommand {}) => interactive(config).await,
            Command::Run(command) => run(config, command).await,
            Command::Targets(_) | Command::Version(_) => unreachable!(),
        }
    })
}

async fn interactive(config: Config) -> Result<()> {
    let dispatcher = Dispatcher::new(config.http_client()?).with_progress(true);
    let mut reports = Reports::new(&config);
    let mut console = Console::stdio();

    let ending = session::run_interactive(
        &mut console,
        &config.targets,
        dispatcher,
        &mut reports.renderers(),
    )
    .await?;

    reports.finish(ending);
    Ok(())
}

async fn run(config: Config, command: RunCommand) -> Result<()> {
    if command.batch.is_empty() {
        anyhow::bail!("at least one `--batch` is required");
    }
    let bounds = Bounds::new(command.from, command.to)
        .with_context(|| format!("`--to` must not be less than {}", command.from))?;

    let specs = match session::parse_selection(&command.target.join(","), &config.targets) {
        Ok(Answer::Value(specs)) => specs,
        Ok(Answer::Exit) => anyhow::bail!("`exit` is not a target"),
        Err(message) => anyhow::bail!(message),
    };

    let dispatcher = Dispatcher::new(config.http_client()?);
    let mut session = Session::new(SessionConfig::resolve(bounds, specs)?, dispatcher);

    for batch_size in &command.batch {
        session
            .run_round(batch_size.get(), |result| {
                println!(
                    "{} {} x{} ({} failures)",
                    "measured".green(),
                    result.target(),
                    result.batch_size(),
                    result.failures()
                );
                Ok(())
            })
            .await?;
    }

    let mut reports = Reports::new(&config);
    let ending = session.export(&mut reports.renderers())?;
    reports.finish(ending);
    Ok(())
}

/// The renderers enabled in the configuration.
struct Reports {
    summary: Option<ConsoleSummary<std::io::Stdout>>,
    csv: Option<CsvReport>,
}

impl Reports {
    fn new(config: &Config) -> Self {
        let csv = config
            .report
            .csv
            .then(|| match &config.report.output_dir {
                Some(dir) => CsvReport::new(dir),
                None => CsvReport::in_temp_dir(),
            });

        Self {
            summary: config.report.summary.then(ConsoleSummary::stdout),
            csv,
        }
    }

    fn renderers(&mut self) -> Vec<&mut dyn ReportRenderer> {
        let mut renderers: Vec<&mut dyn ReportRenderer> = Vec::new();
        if let Some(summary) = self.summary.as_mut() {
            renderers.push(summary);
        }
        if let Some(csv) = self.csv.as_mut() {
            renderers.push(csv);
        }
        renderers
    }

    fn finish(&self, ending: Ending) {
        match ending {
            Ending::NotConfigured => {}
            Ending::NothingRecorded => println!("Nothing measured, no report written."),
            Ending::Exported { rounds } => {
                println!();
                println!("{} {rounds} rounds", "Exported".bold());
                for path in self.csv.iter().flat_map(|csv| csv.written()) {
                    println!("  {}", path.display());
                }
            }
        }
    }
}
