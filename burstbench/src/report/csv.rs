//! CSV export with one file per batch size.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat, Utc};
use csv::Writer;
use serde::Serialize;

use super::{ReportError, ReportRenderer, millis};
use crate::measurement::{Outcome, SizeGroup, Snapshot};

/// One row of the CSV report.
#[derive(Debug, Serialize)]
struct Row<'a> {
    target: &'a str,
    host: &'a str,
    round: usize,
    index: usize,
    called_at: String,
    sent_at: String,
    delay_ms: f64,
    elapsed_ms: f64,
    status: Option<u16>,
    error: Option<&'a str>,
}

/// Writes one `<batch size>-requests.csv` file per batch size into a directory.
///
/// Rows are grouped by target in the order the targets were measured, and by round within each
/// target. Timestamps are written in local time with microsecond precision.
#[derive(Debug)]
pub struct CsvReport {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl CsvReport {
    /// Creates a renderer writing into the given directory. The directory is created if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    /// Creates a renderer writing into a fresh, timestamped directory below the system temp dir.
    pub fn in_temp_dir() -> Self {
        let name = format!("burstbench-{}", Local::now().format("%Y%m%d-%H%M%S"));
        Self::new(std::env::temp_dir().join(name))
    }

    /// The files written by the last call to [`render`](ReportRenderer::render).
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write_group(&self, group: &SizeGroup) -> Result<PathBuf, ReportError> {
        let path = self
            .dir
            .join(format!("{}-requests.csv", group.batch_size()));

        write_rows(&path, group).map_err(|source| ReportError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}

impl ReportRenderer for CsvReport {
    fn render(&mut self, snapshot: Snapshot<'_>) -> Result<(), ReportError> {
        fs::create_dir_all(&self.dir).map_err(|source| ReportError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        self.written.clear();
        for group in snapshot.groups() {
            let path = self.write_group(group)?;
            tracing::info!(path = %path.display(), "wrote report");
            self.written.push(path);
        }

        Ok(())
    }
}

fn write_rows(path: &Path, group: &SizeGroup) -> Result<(), csv::Error> {
    let mut writer = Writer::from_path(path)?;

    for rounds in group.targets() {
        let target = rounds.target();
        for (round, result) in rounds.rounds().iter().enumerate() {
            for record in result.records() {
                let (status, error) = match &record.outcome {
                    Outcome::Response { status } => (Some(*status), None),
                    Outcome::Failed { reason } => (None, Some(reason.as_str())),
                };

                writer.serialize(Row {
                    target: target.name(),
                    host: target.host(),
                    round: round + 1,
                    index: record.index,
                    called_at: timestamp(record.called_at),
                    sent_at: timestamp(record.sent_at),
                    delay_ms: millis(record.delay()),
                    elapsed_ms: millis(record.elapsed),
                    status,
                    error,
                })?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

fn timestamp(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::measurement::{BatchResult, MeasurementStore, TimingRecord};
    use crate::target::Target;

    fn round(name: &str, outcomes: &[Outcome]) -> BatchResult {
        let called_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let records = outcomes
            .iter()
            .enumerate()
            .map(|(index, outcome)| TimingRecord {
                index,
                called_at,
                sent_at: called_at + chrono::Duration::milliseconds(2),
                elapsed: Duration::from_millis(40),
                outcome: outcome.clone(),
            })
            .collect();
        let target = Target::new(name, format!("http://{name}.test/x").parse().unwrap());
        BatchResult::new(target, outcomes.len(), records)
    }

    #[test]
    fn writes_one_file_per_batch_size() {
        let ok = Outcome::Response { status: 200 };
        let failed = Outcome::Failed {
            reason: "connection failed: refused".into(),
        };

        let mut store = MeasurementStore::new();
        store.record(round("a", &[ok.clone(), failed]));
        store.record(round("b", &[ok.clone(), ok.clone()]));
        store.record(round("a", &[ok]));

        let tempdir = tempfile::tempdir().unwrap();
        let mut report = CsvReport::new(tempdir.path().join("out"));
        report.render(store.snapshot()).unwrap();

        let names: Vec<_> = report
            .written()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["2-requests.csv", "1-requests.csv"]);

        let contents = fs::read_to_string(&report.written()[0]).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(
            lines[0],
            "target,host,round,index,called_at,sent_at,delay_ms,elapsed_ms,status,error"
        );
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("a,a.test,1,0,"));
        assert!(lines[1].ends_with(",2.0,40.0,200,"));
        assert!(lines[2].ends_with(",,connection failed: refused"));
        assert!(lines[3].starts_with("b,b.test,1,0,"));
    }

    #[test]
    fn reports_unwritable_directory() {
        let tempdir = tempfile::tempdir().unwrap();
        let blocker = tempdir.path().join("file");
        fs::write(&blocker, b"not a directory").unwrap();

        let mut store = MeasurementStore::new();
        store.record(round("a", &[Outcome::Response { status: 200 }]));

        let mut report = CsvReport::new(blocker.join("out"));
        let err = report.render(store.snapshot()).unwrap_err();
        assert!(matches!(err, ReportError::CreateDir { .. }));
        assert_eq!(store.len(), 1);
    }
}
