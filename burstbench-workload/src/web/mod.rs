//! The workload web server.
//!
//! The application is implemented in [`App`], which sets up routing and middleware. To listen to
//! incoming connections, use [`server()`], which opens a TCP listener and serves the application
//! until a termination signal arrives.
//!
//! For tests, `burstbench-test` starts an [`App`] in-process on a random port.

mod app;
mod middleware;
mod server;

pub use app::App;
pub use server::server;
