//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (tracing)
//! - Bind server to listener
//! - Hand every request to the forwarding engine

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::auth::Provider;
use crate::config::Params;
use crate::http::forward::Forwarder;
use crate::observability::{LogSink, TracingSink};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    params: Arc<Params>,
}

impl HttpServer {
    /// Create a server that logs exchanges through `tracing`.
    pub fn new(params: Params, provider: Arc<dyn Provider>) -> Self {
        Self::with_sink(params, provider, Arc::new(TracingSink))
    }

    /// Create a server with a custom exchange log sink.
    pub fn with_sink(params: Params, provider: Arc<dyn Provider>, sink: Arc<dyn LogSink>) -> Self {
        let params = Arc::new(params);
        let state = AppState {
            forwarder: Arc::new(Forwarder::new(params.clone(), provider, sink)),
        };

        let router = Self::build_router(state);
        Self { router, params }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            remote = %self.params.remote,
            method = %self.params.method,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for driving the proxy without a listener.
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Catch-all handler: every method and path is forwarded.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.forwarder.handle(request).await
}
