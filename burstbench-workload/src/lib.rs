//! The demo workload measured by `burstbench`.
//!
//! Exposes a CPU-bound "list all primes in a range" computation over HTTP, so the same workload
//! can be deployed to different hosting tiers and compared under identical load:
//!
//! - `GET /api/prime/check/{i}`: checks a single number.
//! - `GET /api/prime/between/{from}/{to}`: lists all primes in `from..to`.
//! - `GET /health`: liveness check.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod endpoints;
pub mod error;
pub mod primes;
pub mod web;
