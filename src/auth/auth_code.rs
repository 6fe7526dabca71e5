//! Interactive authorization-code grant.
//!
//! # Responsibilities
//! - Build the authorize URL and send the user to it
//! - Receive the code on a short-lived local callback server
//! - Exchange the code, then keep the token alive with the refresh grant
//!
//! # Design Decisions
//! - `state` is generated once per provider and checked on callback
//! - If no browser can be launched the URL is printed instead

use std::process::Command;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::Url;

use crate::auth::aad::{self, Endpoint, CALLBACK_PATH};
use crate::auth::token::{attach_bearer, Token, TokenCache, TokenEndpoint};
use crate::auth::{required, AuthError, Provider};
use crate::config::{AuthConfig, Params};

/// Query parameters the identity provider sends to the redirect URL.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

type CallbackSlot = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

pub struct AuthCode {
    transport: reqwest::Client,
    authorize_url: String,
    endpoint: TokenEndpoint,
    callback_addr: String,
    redirect_url: String,
    scope: String,
    state: String,
    open_browser: bool,
    cache: TokenCache,
}

impl AuthCode {
    pub fn new(transport: reqwest::Client, auth: &AuthConfig) -> Result<Self, AuthError> {
        let client_id = required(&auth.client_id, "client-id")?;
        let tenant = required(&auth.tenant_id, "tenant-id")?;

        let state = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        Ok(Self {
            transport,
            authorize_url: aad::endpoint(&auth.authority, tenant, Endpoint::Authorize),
            endpoint: TokenEndpoint::new(
                aad::endpoint(&auth.authority, tenant, Endpoint::Token),
                client_id,
                auth.client_secret.clone(),
            ),
            callback_addr: auth.authcode_addr.clone(),
            redirect_url: aad::callback_url(&auth.authcode_addr),
            scope: auth.scopes.join(" "),
            state,
            open_browser: auth.open_browser,
            cache: TokenCache::new(),
        })
    }

    /// URL the user visits to grant consent.
    pub fn consent_url(&self) -> Result<Url, AuthError> {
        Url::parse_with_params(
            &self.authorize_url,
            &[
                ("client_id", self.endpoint.client_id()),
                ("response_type", "code"),
                ("response_mode", "query"),
                ("redirect_uri", self.redirect_url.as_str()),
                ("scope", self.scope.as_str()),
                ("state", self.state.as_str()),
            ],
        )
        .map_err(|e| AuthError::Callback(format!("invalid authorize URL: {}", e)))
    }

    /// Serve the callback path until one redirect arrives.
    async fn await_callback(&self, listener: TcpListener) -> Result<CallbackParams, AuthError> {
        let (tx, rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let slot: CallbackSlot = Arc::new(Mutex::new(Some(tx)));

        let app = Router::new()
            .route(CALLBACK_PATH, get(callback_handler))
            .with_state(slot);

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        let received = rx
            .await
            .map_err(|_| AuthError::Callback("callback server closed".to_string()));

        let _ = stop_tx.send(());
        if let Ok(Err(e)) = server.await {
            tracing::warn!(error = %e, "Callback server stopped with an error");
        }
        received
    }

    async fn exchange_code(&self, code: &str) -> Result<Token, AuthError> {
        self.endpoint
            .exchange(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_url.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .await
    }

    async fn renew(&self, stale: Option<Arc<Token>>) -> Result<Token, AuthError> {
        match stale {
            Some(token) => self.endpoint.refresh(&token, &self.scope).await,
            None => Err(AuthError::NoRefreshToken),
        }
    }
}

async fn callback_handler(
    State(slot): State<CallbackSlot>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, &'static str) {
    let sender = match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(_) => None,
    };

    match sender {
        Some(tx) => {
            let _ = tx.send(params);
            (StatusCode::OK, "Authorization received. You can close this window.")
        }
        None => (StatusCode::GONE, "Authorization already handled."),
    }
}

#[async_trait]
impl Provider for AuthCode {
    async fn prepare_access(&self) -> Result<(), AuthError> {
        if self.cache.has_fresh() {
            return Ok(());
        }

        let listener = TcpListener::bind(&self.callback_addr).await?;
        let url = self.consent_url()?;

        if !self.open_browser || launch_browser(url.as_str()).is_err() {
            println!("Please open the following URL in your browser to sign in:");
            println!("  {}", url);
        }

        let callback = self.await_callback(listener).await?;
        if let Some(error) = callback.error {
            return Err(AuthError::Denied(format!(
                "{}: {}",
                error,
                callback.error_description.unwrap_or_default()
            )));
        }
        if callback.state.as_deref() != Some(self.state.as_str()) {
            return Err(AuthError::StateMismatch);
        }
        let code = callback
            .code
            .ok_or_else(|| AuthError::Callback("callback carried no code".to_string()))?;

        let token = self.exchange_code(&code).await?;
        self.cache.store(token);
        tracing::info!("Authorization code exchanged for access token");
        Ok(())
    }

    fn client(&self) -> &reqwest::Client {
        &self.transport
    }

    async fn modify(&self, _params: &Params, request: &mut reqwest::Request) {
        match self.cache.get_or_renew(|stale| self.renew(stale)).await {
            Ok(token) => attach_bearer(request, &token),
            Err(e) => tracing::warn!(error = %e, "No access token, forwarding without credentials"),
        }
    }
}

/// Open `url` in the platform's default browser.
fn launch_browser(url: &str) -> std::io::Result<()> {
    let mut command = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/c", "start", "", url]);
        c
    } else if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    let status = command.status()?;
    if status.success() {
        Ok(())
    } else {
        tracing::debug!(status = %status, "Browser launcher failed");
        Err(std::io::Error::new(std::io::ErrorKind::Other, "browser launcher failed"))
    }
}
