//! A benchmark harness measuring the latency of HTTP endpoints under bursts of concurrent
//! requests.
//!
//! A [`Dispatcher`] sends a batch of `N` concurrent GET requests to a [`Target`] and times every
//! single one of them. Each [`TimingRecord`](measurement::TimingRecord) captures when the batch
//! was initiated, when the request was actually sent, and how long the round trip took. A
//! [`Session`] runs batches of increasing size against several targets in turn and collects all
//! results in a [`MeasurementStore`], which is finally rendered into reports.
//!
//! The harness is typically pointed at the same workload hosted on different deployment tiers,
//! for example the `burstbench-workload` prime service.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cli;
pub mod clock;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod measurement;
pub mod observability;
pub mod report;
pub mod session;
pub mod target;

pub use crate::dispatch::Dispatcher;
pub use crate::measurement::MeasurementStore;
pub use crate::session::Session;
pub use crate::target::Target;
