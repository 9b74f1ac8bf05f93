use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use relay::DealRelay;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::handlers::{handle_health, handle_webhook};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Failure to bind or run the HTTP server.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("HTTP server terminated unexpectedly: {0}")]
    Serve(#[source] std::io::Error),
}

/// Builds the router around a shared relay.
pub fn build_router(relay: Arc<DealRelay>) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/pipedrive-webhook", post(handle_webhook))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(relay)
}

/// Serves `router` on `addr` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish after `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, router: Router, shutdown: F) -> Result<(), ListenerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(%addr, "binding webhook listener");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })?;
    let local = listener.local_addr().unwrap_or(addr);
    info!(addr = %local, "webhook listener ready");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| {
            error!(addr = %local, error = %err, "HTTP server terminated unexpectedly");
            ListenerError::Serve(err)
        })?;

    info!("webhook listener stopped");
    Ok(())
}
