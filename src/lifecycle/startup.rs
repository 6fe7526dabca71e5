//! Startup orchestration.
//!
//! Order: provider → access preparation → metrics → listener → serve.
//! Any error before the listener is bound is fatal.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::auth::{build_provider, AuthError};
use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid metrics address {0}")]
    MetricsAddress(String),

    #[error("Failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Run the proxy until `shutdown` fires.
pub async fn start(config: ProxyConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let provider = build_provider(&config)?;

    tracing::info!(method = %config.params.method, "Preparing access");
    provider.prepare_access().await?;

    if let Some(addr) = &config.observability.metrics_address {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| StartupError::MetricsAddress(addr.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.params.local)
        .await
        .map_err(|source| StartupError::Bind {
            addr: config.params.local.clone(),
            source,
        })?;

    let server = HttpServer::new(config.params, provider);
    server
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)
}
