use std::net::SocketAddr;

use anyhow::Result;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultOnFailure, TraceLayer};
use tracing::Level;

use crate::endpoints;
use crate::web::middleware as m;

/// The workload web server application.
#[derive(Debug)]
pub struct App {
    router: axum::Router,
    graceful_shutdown: bool,
}

impl App {
    /// Creates the application router with all middlewares.
    ///
    /// Use [`serve`](Self::serve) to run the server future.
    pub fn new() -> Self {
        // Layers added first are called first for requests, last for responses.
        let middleware = ServiceBuilder::new()
            .layer(CatchPanicLayer::custom(m::handle_panic))
            .layer(m::set_server_header())
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(m::make_http_span)
                    .on_failure(DefaultOnFailure::new().level(Level::DEBUG)),
            );

        App {
            router: endpoints::routes().layer(middleware),
            graceful_shutdown: false,
        }
    }

    /// Enables or disables graceful shutdown for the server.
    ///
    /// By default, graceful shutdown is disabled.
    pub fn graceful_shutdown(mut self, enable: bool) -> Self {
        self.graceful_shutdown = enable;
        self
    }

    /// Runs the web server on the given listener.
    ///
    /// With graceful shutdown enabled, the future resolves once shutdown was requested and all
    /// connections are closed. Otherwise it runs until dropped.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let service = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        if self.graceful_shutdown {
            let guard = elegant_departure::get_shutdown_guard();
            axum::serve(listener, service)
                .with_graceful_shutdown(guard.wait_owned())
                .await?;
        } else {
            axum::serve(listener, service).await?;
        }

        Ok(())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
