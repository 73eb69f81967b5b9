//! Test utilities for `burstbench`.
//!
//! This crate provides an in-process workload server and helpers to produce failing endpoints.
//! See the modules for all available utilities.

pub mod server;
pub mod tracing;
