//! Renderers that turn a [`Snapshot`] of the measurement store into a report.
//!
//! Renderers only run at the end of a session and only if at least one round was recorded. They
//! receive a read-only view and can never modify the store, so a failing renderer leaves the
//! measurements intact.

use std::io;
use std::path::PathBuf;

use crate::measurement::Snapshot;

mod csv;
mod summary;

pub use self::csv::CsvReport;
pub use self::summary::ConsoleSummary;

/// Errors that can occur while rendering a report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The output directory could not be created.
    #[error("failed to create report directory `{}`", path.display())]
    CreateDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        source: io::Error,
    },
    /// A report file could not be written.
    #[error("failed to write report file `{}`", path.display())]
    Write {
        /// The file that could not be written.
        path: PathBuf,
        /// The underlying CSV error.
        source: ::csv::Error,
    },
    /// Writing to the console failed.
    #[error("failed to write report to the console")]
    Console(#[from] io::Error),
}

/// Renders the measurements of a finished session.
pub trait ReportRenderer {
    /// Renders the full snapshot. Called at most once per session.
    fn render(&mut self, snapshot: Snapshot<'_>) -> Result<(), ReportError>;
}

impl<R: ReportRenderer + ?Sized> ReportRenderer for Box<R> {
    fn render(&mut self, snapshot: Snapshot<'_>) -> Result<(), ReportError> {
        (**self).render(snapshot)
    }
}

/// Formats a duration as fractional milliseconds.
pub(crate) fn millis(duration: std::time::Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}
