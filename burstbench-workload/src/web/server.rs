use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpSocket};
use tokio::signal::unix::SignalKind;

use crate::web::app::App;

/// The maximum backlog for TCP listen sockets before refusing connections.
///
/// Bursts from the benchmark open many connections at once.
const TCP_LISTEN_BACKLOG: u32 = 4096;

/// Runs the workload HTTP server on the given address until termination is requested.
pub async fn server(addr: SocketAddr) -> Result<()> {
    tracing::info!("Starting server");

    let listener = listen(addr).context("failed to start TCP listener")?;

    let server_handle = tokio::spawn(async move {
        App::new().graceful_shutdown(true).serve(listener).await
    });

    elegant_departure::tokio::depart()
        .on_termination()
        .on_sigint()
        .on_signal(SignalKind::hangup())
        .on_signal(SignalKind::quit())
        .await;

    let server_result = match server_handle.await {
        Ok(result) => result,
        Err(err) => Err(err.into()),
    };
    tracing::info!("Shutdown complete");
    server_result
}

fn listen(addr: SocketAddr) -> Result<TcpListener> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }?;

    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;

    let listener = socket.listen(TCP_LISTEN_BACKLOG)?;
    tracing::info!("HTTP server listening on {addr}");

    Ok(listener)
}
