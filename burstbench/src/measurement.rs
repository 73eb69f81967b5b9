//! Timing records and the in-memory store that aggregates them across rounds.
//!
//! The [`MeasurementStore`] groups [`BatchResult`]s by batch size first and by target second.
//! Both levels keep insertion order, so a report lists batch sizes and targets in the order they
//! were first measured during the session.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::target::Target;

/// How a single request ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The server sent a response. The status code is recorded but not interpreted.
    Response {
        /// The HTTP status code of the response.
        status: u16,
    },
    /// The request failed at the transport level.
    Failed {
        /// Human readable reason of the failure.
        reason: String,
    },
}

impl Outcome {
    /// Returns `true` if the request failed at the transport level.
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

/// The measurement of a single request within a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimingRecord {
    /// Position of the request within its batch.
    pub index: usize,
    /// When the batch was initiated. Identical for all records of a batch.
    pub called_at: DateTime<Utc>,
    /// When this request was handed to the transport.
    pub sent_at: DateTime<Utc>,
    /// Round-trip duration, measured with a monotonic clock until the response or the failure.
    pub elapsed: Duration,
    /// Whether a response arrived.
    pub outcome: Outcome,
}

impl TimingRecord {
    /// The scheduling lag between batch initiation and the transmission of this request.
    pub fn delay(&self) -> Duration {
        (self.sent_at - self.called_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

impl fmt::Display for TimingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3} {} {} delay: {:>10.3?} elapsed: {:>10.3?}",
            self.index,
            self.called_at.format("%H:%M:%S%.6f"),
            self.sent_at.format("%H:%M:%S%.6f"),
            self.delay(),
            self.elapsed,
        )?;
        match &self.outcome {
            Outcome::Response { status } => write!(f, " status: {status}"),
            Outcome::Failed { reason } => write!(f, " FAILED: {reason}"),
        }
    }
}

/// All records produced by one dispatch round against one target.
#[derive(Clone, Debug)]
pub struct BatchResult {
    target: Target,
    batch_size: usize,
    records: Vec<TimingRecord>,
}

impl BatchResult {
    /// Creates a batch result, ordering the records by their index.
    pub fn new(target: Target, batch_size: usize, mut records: Vec<TimingRecord>) -> Self {
        records.sort_by_key(|record| record.index);
        Self {
            target,
            batch_size,
            records,
        }
    }

    /// The target this round was run against.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The number of requests requested for this round.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The records of this round, ordered by index.
    pub fn records(&self) -> &[TimingRecord] {
        &self.records
    }

    /// The number of records flagged as transport failures.
    pub fn failures(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.outcome.is_failure())
            .count()
    }
}

/// All rounds run against one target at one batch size.
#[derive(Debug)]
pub struct TargetRounds {
    target: Target,
    rounds: Vec<BatchResult>,
}

impl TargetRounds {
    /// The target these rounds were run against.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The rounds in the order they were recorded.
    pub fn rounds(&self) -> &[BatchResult] {
        &self.rounds
    }

    /// Iterates over the records of all rounds.
    pub fn records(&self) -> impl Iterator<Item = &TimingRecord> {
        self.rounds.iter().flat_map(|round| round.records())
    }
}

/// All targets measured at one batch size.
#[derive(Debug)]
pub struct SizeGroup {
    batch_size: usize,
    targets: Vec<TargetRounds>,
}

impl SizeGroup {
    /// The batch size shared by every round in this group.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The targets in the order they were first recorded at this batch size.
    pub fn targets(&self) -> &[TargetRounds] {
        &self.targets
    }

    /// Looks up the rounds for a target by name.
    pub fn get(&self, target: &str) -> Option<&TargetRounds> {
        self.targets.iter().find(|t| t.target.name() == target)
    }
}

/// Append-only store of batch results, keyed by batch size and then by target.
#[derive(Debug, Default)]
pub struct MeasurementStore {
    groups: Vec<SizeGroup>,
    rounds: usize,
}

impl MeasurementStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a round, creating the batch size and target entries on first use.
    ///
    /// Repeated rounds for the same batch size and target accumulate rather than overwrite.
    pub fn record(&mut self, result: BatchResult) {
        let batch_size = result.batch_size();
        let position = match self.groups.iter().position(|g| g.batch_size == batch_size) {
            Some(position) => position,
            None => {
                self.groups.push(SizeGroup {
                    batch_size,
                    targets: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[position];

        let name = result.target().name();
        match group.targets.iter_mut().find(|t| t.target.name() == name) {
            Some(entry) => entry.rounds.push(result),
            None => group.targets.push(TargetRounds {
                target: result.target().clone(),
                rounds: vec![result],
            }),
        }

        self.rounds += 1;
    }

    /// Returns `true` if no round has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.rounds == 0
    }

    /// The total number of recorded rounds.
    pub fn len(&self) -> usize {
        self.rounds
    }

    /// Returns a read-only view for exporting.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot { store: self }
    }
}

/// A read-only view of a [`MeasurementStore`].
#[derive(Clone, Copy, Debug)]
pub struct Snapshot<'a> {
    store: &'a MeasurementStore,
}

impl<'a> Snapshot<'a> {
    /// The batch size groups in insertion order.
    pub fn groups(&self) -> &'a [SizeGroup] {
        &self.store.groups
    }

    /// The batch sizes in insertion order.
    pub fn batch_sizes(&self) -> impl Iterator<Item = usize> + 'a {
        self.store.groups.iter().map(|g| g.batch_size)
    }

    /// Looks up the group for a batch size.
    pub fn group(&self, batch_size: usize) -> Option<&'a SizeGroup> {
        self.store.groups.iter().find(|g| g.batch_size == batch_size)
    }

    /// Returns `true` if the underlying store has no rounds.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The total number of rounds in the underlying store.
    pub fn rounds(&self) -> usize {
        self.store.len()
    }
}
