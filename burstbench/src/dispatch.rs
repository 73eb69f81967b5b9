//! Fires bursts of concurrent GET requests and times each of them.

use std::sync::Arc;
use std::time::Duration;

use futures::future;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, Url};
use tokio::task::JoinError;

use crate::clock::{BatchEpoch, Clock, SystemClock};
use crate::measurement::{BatchResult, Outcome, TimingRecord};
use crate::target::Target;

/// Dispatches batches of concurrent requests against a [`Target`].
///
/// Every request of a batch runs as its own task. There is no concurrency cap, no timeout
/// besides the one configured on the [`Client`], and no retry.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    client: Client,
    clock: Arc<dyn Clock>,
    progress: bool,
}

impl Dispatcher {
    /// Creates a dispatcher that sends requests with the given client and uses the system clock.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            clock: Arc::new(SystemClock),
            progress: false,
        }
    }

    /// Replaces the clock used to timestamp batches.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Shows a progress bar on stderr while a batch is in flight.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    /// Sends `batch_size` concurrent GET requests to the target and waits for all of them.
    ///
    /// Always returns exactly `batch_size` records ordered by index. Requests that fail at the
    /// transport level are returned as [`Outcome::Failed`] records.
    pub async fn dispatch_batch(&self, target: &Target, batch_size: usize) -> BatchResult {
        if batch_size == 0 {
            return BatchResult::new(target.clone(), 0, Vec::new());
        }

        tracing::debug!(target_name = target.name(), batch_size, "dispatching batch");

        let bar = self.progress_bar(target, batch_size);
        let epoch = BatchEpoch::begin(self.clock.as_ref());

        let tasks: Vec<_> = (0..batch_size)
            .map(|index| {
                let client = self.client.clone();
                let clock = Arc::clone(&self.clock);
                let url = target.url().clone();
                let bar = bar.clone();
                tokio::spawn(async move {
                    let record = send_request(&client, clock.as_ref(), epoch, index, url).await;
                    bar.inc(1);
                    record
                })
            })
            .collect();

        let finished = future::join_all(tasks).await;
        bar.finish_and_clear();

        let records = collect_records(epoch, finished);
        let result = BatchResult::new(target.clone(), batch_size, records);
        tracing::debug!(
            target_name = target.name(),
            batch_size,
            failures = result.failures(),
            "batch complete"
        );
        result
    }

    fn progress_bar(&self, target: &Target, batch_size: usize) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }

        let bar =
            ProgressBar::new(batch_size as u64).with_message(format!("GET {}", target.host()));
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} {pos}/{len} {elapsed}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }
}

/// Turns the joined request tasks into records, in task order.
///
/// A task that panicked or was cancelled still yields a failed record for its index.
fn collect_records(
    epoch: BatchEpoch,
    finished: Vec<Result<TimingRecord, JoinError>>,
) -> Vec<TimingRecord> {
    finished
        .into_iter()
        .enumerate()
        .map(|(index, joined)| match joined {
            Ok(record) => record,
            Err(err) => {
                tracing::error!(
                    error = &err as &dyn std::error::Error,
                    index,
                    "request task did not complete"
                );
                TimingRecord {
                    index,
                    called_at: epoch.called_at(),
                    sent_at: epoch.called_at(),
                    elapsed: Duration::ZERO,
                    outcome: Outcome::Failed {
                        reason: format!("request task did not complete: {err}"),
                    },
                }
            }
        })
        .collect()
}

/// Sends a single request and measures it.
///
/// The response body is read to the end, so the elapsed time covers the complete response.
async fn send_request(
    client: &Client,
    clock: &dyn Clock,
    epoch: BatchEpoch,
    index: usize,
    url: Url,
) -> TimingRecord {
    let sent_at = epoch.now();
    let timer = clock.start_timer();

    let outcome = match client.get(url.clone()).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            match response.bytes().await {
                Ok(_) => Outcome::Response { status },
                Err(err) => Outcome::Failed {
                    reason: describe_error(&err),
                },
            }
        }
        Err(err) => Outcome::Failed {
            reason: describe_error(&err),
        },
    };

    let elapsed = timer.stop();

    if let Outcome::Failed { reason } = &outcome {
        tracing::warn!(index, %url, ?elapsed, %reason, "request failed");
    }

    TimingRecord {
        index,
        called_at: epoch.called_at(),
        sent_at,
        elapsed,
        outcome,
    }
}

fn describe_error(err: &reqwest::Error) -> String {
    let kind = if err.is_connect() {
        "connection failed"
    } else if err.is_timeout() {
        "timed out"
    } else if err.is_body() || err.is_decode() {
        "response body failed"
    } else if err.is_request() {
        "request failed"
    } else {
        "transport error"
    };

    match std::error::Error::source(err) {
        Some(source) => format!("{kind}: {source}"),
        None => kind.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_tasks_become_failed_records() {
        let epoch = BatchEpoch::begin(&SystemClock);

        let mut tasks = Vec::new();
        for index in 0..3 {
            tasks.push(tokio::spawn(async move {
                if index == 1 {
                    panic!("request task panicked");
                }
                TimingRecord {
                    index,
                    called_at: epoch.called_at(),
                    sent_at: epoch.now(),
                    elapsed: Duration::from_millis(1),
                    outcome: Outcome::Response { status: 200 },
                }
            }));
        }
        let cancelled = tokio::spawn(std::future::pending::<TimingRecord>());
        cancelled.abort();
        tasks.push(cancelled);

        let records = collect_records(epoch, future::join_all(tasks).await);

        assert_eq!(records.len(), 4);
        let indices: Vec<_> = records.iter().map(|r| r.index).collect();
        assert_eq!(indices, [0, 1, 2, 3]);
        assert_eq!(records[0].outcome, Outcome::Response { status: 200 });
        assert!(records[1].outcome.is_failure());
        assert_eq!(records[1].called_at, epoch.called_at());
        assert_eq!(records[1].sent_at, epoch.called_at());
        assert_eq!(records[2].outcome, Outcome::Response { status: 200 });
        assert!(records[3].outcome.is_failure());
    }

    #[tokio::test]
    async fn empty_batch_returns_immediately() {
        let target = Target::new("nowhere", "http://127.0.0.1:9/".parse().unwrap());
        let result = Dispatcher::new(Client::new())
            .dispatch_batch(&target, 0)
            .await;

        assert_eq!(result.batch_size(), 0);
        assert!(result.records().is_empty());
        assert_eq!(result.target(), &target);
    }
}
