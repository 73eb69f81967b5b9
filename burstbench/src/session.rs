//! The session controller.
//!
//! A session reads its configuration, then repeatedly reads a batch size and dispatches one batch
//! per configured target. Targets are visited one after another; only the requests within a
//! single batch run concurrently. When the session is terminated, the collected measurements are
//! handed to the report renderers.
//!
//! ```text
//! AwaitingConfig -> AwaitingBatchSize <-> Dispatching -> Exporting -> Terminated
//!        |                                                              ^
//!        +--------------------------------------------------------------+
//! ```

use std::io::{self, Write};
use std::num::NonZeroUsize;

use tokio::io::AsyncBufRead;

use crate::console::{Console, is_exit};
use crate::dispatch::Dispatcher;
use crate::measurement::{BatchResult, MeasurementStore};
use crate::report::{ReportError, ReportRenderer};
use crate::target::{Bounds, Target, TargetError, TargetSpec};

/// Width of the separator lines around the records of a batch.
const SEPARATOR_WIDTH: usize = 82;

const LOWER_BOUND_PROMPT: &str = "Input the lower bound or 'exit' to quit:";
const UPPER_BOUND_PROMPT: &str = "Input the upper bound or 'exit' to quit:";

/// Errors that end a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session has no targets to run against.
    #[error("no targets selected")]
    NoTargets,
    /// A target URL could not be resolved.
    #[error(transparent)]
    Target(#[from] TargetError),
    /// Reading from or writing to the console failed.
    #[error("console input/output failed")]
    Console(#[from] io::Error),
    /// Exporting the measurements failed.
    #[error("failed to export measurements")]
    Report(#[from] ReportError),
}

/// Validated settings of a single session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    bounds: Bounds,
    targets: Vec<Target>,
}

impl SessionConfig {
    /// Resolves the given target specs against the bounds.
    pub fn resolve<'a>(
        bounds: Bounds,
        specs: impl IntoIterator<Item = &'a TargetSpec>,
    ) -> Result<Self, SessionError> {
        let targets = specs
            .into_iter()
            .map(|spec| spec.resolve(bounds))
            .collect::<Result<Vec<_>, _>>()?;

        if targets.is_empty() {
            return Err(SessionError::NoTargets);
        }

        Ok(Self { bounds, targets })
    }

    /// The bounds passed to the workload.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// The targets in the order they are measured.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }
}

/// What happened at the end of a session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Ending {
    /// Configuration was aborted, no session was started.
    NotConfigured,
    /// The session ended without any recorded round, so nothing was exported.
    NothingRecorded,
    /// The measurements were handed to the renderers.
    Exported {
        /// The number of recorded rounds.
        rounds: usize,
    },
}

/// A configured session owning the measurements collected so far.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    dispatcher: Dispatcher,
    store: MeasurementStore,
}

impl Session {
    /// Starts a session with an empty measurement store.
    pub fn new(config: SessionConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher,
            store: MeasurementStore::new(),
        }
    }

    /// The measurements collected so far.
    pub fn store(&self) -> &MeasurementStore {
        &self.store
    }

    /// Runs one batch of the given size against every target, one target at a time.
    ///
    /// `observe` is called with each result before it is recorded. Every result is recorded even
    /// if `observe` fails; the first error is returned after the round.
    pub async fn run_round<F>(&mut self, batch_size: usize, mut observe: F) -> io::Result<()>
    where
        F: FnMut(&BatchResult) -> io::Result<()>,
    {
        let mut observed = Ok(());

        for target in &self.config.targets {
            let result = self.dispatcher.dispatch_batch(target, batch_size).await;
            if observed.is_ok() {
                observed = observe(&result);
            }
            self.store.record(result);
        }

        observed
    }

    /// Hands the measurements to every renderer, unless nothing was recorded.
    pub fn export(
        &self,
        renderers: &mut [&mut dyn ReportRenderer],
    ) -> Result<Ending, ReportError> {
        if self.store.is_empty() {
            tracing::info!("no measurements recorded, skipping export");
            return Ok(Ending::NothingRecorded);
        }

        for renderer in renderers.iter_mut() {
            renderer.render(self.store.snapshot())?;
        }

        Ok(Ending::Exported {
            rounds: self.store.len(),
        })
    }
}

/// A parsed answer to a prompt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Answer<T> {
    /// A valid value.
    Value(T),
    /// The exit sentinel.
    Exit,
}

/// Parses a comma separated selection of target names.
///
/// An empty answer or `all` selects the whole catalog, in catalog order.
pub fn parse_selection<'a>(
    answer: &str,
    catalog: &'a [TargetSpec],
) -> Result<Answer<Vec<&'a TargetSpec>>, String> {
    if is_exit(answer) {
        return Ok(Answer::Exit);
    }
    if answer.is_empty() || answer.eq_ignore_ascii_case("all") {
        return Ok(Answer::Value(catalog.iter().collect()));
    }

    let mut selected: Vec<&TargetSpec> = Vec::new();
    for name in answer.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let Some(spec) = catalog.iter().find(|spec| spec.name == name) else {
            return Err(format!("Unknown target `{name}`"));
        };
        if !selected.iter().any(|s| s.name == spec.name) {
            selected.push(spec);
        }
    }

    if selected.is_empty() {
        return Err("Select at least one target".to_owned());
    }
    Ok(Answer::Value(selected))
}

/// Parses a workload bound. An empty answer terminates like the exit sentinel.
pub fn parse_bound(answer: &str) -> Result<Answer<i64>, String> {
    if answer.is_empty() || is_exit(answer) {
        return Ok(Answer::Exit);
    }
    answer
        .parse()
        .map(Answer::Value)
        .map_err(|_| "Input should be a valid integer or 'exit' to quit".to_owned())
}

/// Parses a batch size, which must be a positive integer.
pub fn parse_batch_size(answer: &str) -> Result<Answer<NonZeroUsize>, String> {
    if is_exit(answer) {
        return Ok(Answer::Exit);
    }
    answer
        .parse()
        .map(Answer::Value)
        .map_err(|_| "Input should be a positive integer or 'exit' to quit".to_owned())
}

enum State {
    AwaitingConfig,
    AwaitingBatchSize(Session),
    Dispatching(Session, NonZeroUsize),
    Exporting(Session),
    Terminated(Ending),
}

/// Runs an interactive session on the console.
///
/// Prompts for the targets and bounds, then for batch sizes until `exit` is entered or the input
/// is closed. Invalid answers are rejected and asked again.
pub async fn run_interactive<R, W>(
    console: &mut Console<R, W>,
    catalog: &[TargetSpec],
    dispatcher: Dispatcher,
    renderers: &mut [&mut dyn ReportRenderer],
) -> Result<Ending, SessionError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut state = State::AwaitingConfig;
    let mut first_batch = true;
    // A console failure after configuration still exports what was recorded.
    let mut console_error = None;

    loop {
        state = match state {
            State::AwaitingConfig => match read_config(console, catalog).await? {
                Some(config) => {
                    tracing::info!(
                        bounds = %config.bounds(),
                        targets = config.targets().len(),
                        "session configured"
                    );
                    State::AwaitingBatchSize(Session::new(config, dispatcher.clone()))
                }
                None => State::Terminated(Ending::NotConfigured),
            },
            State::AwaitingBatchSize(session) => {
                let message = if first_batch {
                    "Input the amount of requests or 'exit' to quit:"
                } else {
                    "Input another amount or 'exit' to quit:"
                };
                match read_batch_size(console, message).await {
                    Ok(Some(batch_size)) => State::Dispatching(session, batch_size),
                    Ok(None) => State::Exporting(session),
                    Err(err) => {
                        console_error = Some(err);
                        State::Exporting(session)
                    }
                }
            }
            State::Dispatching(mut session, batch_size) => {
                first_batch = false;
                let echoed = session
                    .run_round(batch_size.get(), |result| echo(console, result))
                    .await;
                match echoed {
                    Ok(()) => State::AwaitingBatchSize(session),
                    Err(err) => {
                        console_error = Some(err);
                        State::Exporting(session)
                    }
                }
            }
            State::Exporting(session) => State::Terminated(session.export(renderers)?),
            State::Terminated(ending) => {
                return match console_error {
                    Some(err) => {
                        tracing::error!(
                            error = &err as &dyn std::error::Error,
                            ?ending,
                            "console failed during the session"
                        );
                        Err(SessionError::Console(err))
                    }
                    None => Ok(ending),
                };
            }
        };
    }
}

/// Reads batch sizes until a valid one or the exit sentinel is entered.
async fn read_batch_size<R, W>(
    console: &mut Console<R, W>,
    message: &str,
) -> io::Result<Option<NonZeroUsize>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        let Some(answer) = console.prompt(message).await? else {
            return Ok(None);
        };
        match parse_batch_size(&answer) {
            Ok(Answer::Value(batch_size)) => return Ok(Some(batch_size)),
            Ok(Answer::Exit) => return Ok(None),
            Err(message) => console.reject(message)?,
        }
    }
}

async fn read_config<R, W>(
    console: &mut Console<R, W>,
    catalog: &[TargetSpec],
) -> Result<Option<SessionConfig>, SessionError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let names: Vec<_> = catalog.iter().map(|spec| spec.name.as_str()).collect();
    let message = format!(
        "Select targets separated by commas [{}], 'all' or empty for all, 'exit' to quit:",
        names.join(", ")
    );
    let specs = loop {
        let Some(answer) = console.prompt(&message).await? else {
            return Ok(None);
        };
        match parse_selection(&answer, catalog) {
            Ok(Answer::Value(specs)) => break specs,
            Ok(Answer::Exit) => return Ok(None),
            Err(message) => console.reject(message)?,
        }
    };

    let Some(from) = read_bound(console, LOWER_BOUND_PROMPT).await? else {
        return Ok(None);
    };
    let bounds = loop {
        let Some(to) = read_bound(console, UPPER_BOUND_PROMPT).await? else {
            return Ok(None);
        };
        match Bounds::new(from, to) {
            Some(bounds) => break bounds,
            None => console.reject(format!("The upper bound must not be less than {from}"))?,
        }
    };

    SessionConfig::resolve(bounds, specs).map(Some)
}

async fn read_bound<R, W>(console: &mut Console<R, W>, message: &str) -> io::Result<Option<i64>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        let Some(answer) = console.prompt(message).await? else {
            return Ok(None);
        };
        match parse_bound(&answer) {
            Ok(Answer::Value(bound)) => return Ok(Some(bound)),
            Ok(Answer::Exit) => return Ok(None),
            Err(message) => console.reject(message)?,
        }
    }
}

fn echo<R, W>(console: &mut Console<R, W>, result: &BatchResult) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let separator = "#".repeat(SEPARATOR_WIDTH);
    console.say(format_args!(
        "Measuring {} calls to {}\n{separator}",
        result.batch_size(),
        result.target().host()
    ))?;
    for record in result.records() {
        console.say(record)?;
    }
    console.say(format_args!("{separator}\n"))
}
