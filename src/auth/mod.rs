//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyConfig
//!     → build_provider (select strategy from `method`)
//!     → Provider::prepare_access (once, before serving)
//!
//! Per request (http::forward):
//!     → Provider::modify (attach credentials to the outgoing request)
//!     → Provider::client (execute it)
//! ```
//!
//! # Design Decisions
//! - The forwarding engine only sees `dyn Provider`; it never knows which
//!   strategy is bound
//! - Token caching and refresh live inside each provider
//! - `modify` has no error channel: a provider that cannot produce
//!   credentials logs a warning and leaves the request untouched

pub mod aad;
pub mod auth_code;
pub mod basic;
pub mod client_credentials;
pub mod device_flow;
pub mod token;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AuthMethod, Params, ProxyConfig};
use crate::net::tls::build_transport;

pub use auth_code::AuthCode;
pub use basic::BasicAuth;
pub use client_credentials::ClientCredentials;
pub use device_flow::DeviceFlow;

/// Errors raised while obtaining credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token endpoint returned {status} {error}: {description}")]
    Endpoint {
        status: u16,
        error: String,
        description: String,
    },

    #[error("Malformed response from identity provider: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Device code expired before authorization completed")]
    Expired,

    #[error("Authorization denied: {0}")]
    Denied(String),

    #[error("Callback server error: {0}")]
    Callback(String),

    #[error("State mismatch in authorization callback")]
    StateMismatch,

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Transport setup failed: {0}")]
    Transport(#[from] std::io::Error),
}

/// An authentication strategy bound to the forwarding engine.
///
/// One instance serves every request for the lifetime of the process, so
/// implementations must tolerate concurrent `client` and `modify` calls.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Make sure a usable credential exists. Idempotent.
    async fn prepare_access(&self) -> Result<(), AuthError>;

    /// Transport used for calls to the remote.
    fn client(&self) -> &reqwest::Client;

    /// Attach credentials to an outgoing request in place.
    ///
    /// Must not change the method or the body.
    async fn modify(&self, params: &Params, request: &mut reqwest::Request);
}

/// Build the provider selected by `config.params.method`.
pub fn build_provider(config: &ProxyConfig) -> Result<Arc<dyn Provider>, AuthError> {
    let params = &config.params;
    let auth = &config.auth;
    let transport = build_transport(params.cert_path.as_deref(), params.insecure)?;

    let provider: Arc<dyn Provider> = match params.method {
        AuthMethod::Basic => Arc::new(BasicAuth::new(
            transport,
            required(&auth.username, "username")?,
            required(&auth.password, "password")?,
        )),
        AuthMethod::ClientCredentials => Arc::new(ClientCredentials::new(transport, auth)?),
        AuthMethod::DeviceFlow => Arc::new(DeviceFlow::new(transport, auth)?),
        AuthMethod::AuthCode => Arc::new(AuthCode::new(transport, auth)?),
    };

    tracing::info!(method = %params.method, "Authentication provider ready");
    Ok(provider)
}

pub(crate) fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, AuthError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AuthError::MissingParameter(name)),
    }
}
