//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the routing table from validated configuration
//! - Start optional background services (metrics)
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The routing table is built before binding, so a bad backend URL
//!   means the port is never opened

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::observability::metrics;
use crate::routing::RouteError;

/// Fatal errors before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("[server] section not found in configuration")]
    MissingServer,

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Build the proxy from `config`, bind its listener and serve until `shutdown` fires.
pub async fn launch(
    config: ProxyConfig,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), StartupError> {
    let address = config
        .server
        .as_ref()
        .ok_or(StartupError::MissingServer)?
        .bind_address();

    let server = HttpServer::from_config(config)?;

    let observability = &server.config().observability;
    if observability.metrics_enabled {
        match observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(address.as_str())
        .await
        .map_err(|source| StartupError::Bind { address: address.clone(), source })?;

    tracing::info!(address = %address, "Reverse proxy server listening on {}...", address);

    server.run(listener, shutdown).await?;
    Ok(())
}
