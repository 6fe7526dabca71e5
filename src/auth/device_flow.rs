//! Device authorization grant (RFC 8628).
//!
//! The user is shown a short code and a verification URL; meanwhile the
//! proxy polls the token endpoint until the user finishes signing in.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use crate::auth::aad::{self, Endpoint};
use crate::auth::token::{attach_bearer, parse_response, Token, TokenCache, TokenEndpoint};
use crate::auth::{required, AuthError, Provider};
use crate::config::{AuthConfig, Params};

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Added to the polling interval each time the server answers `slow_down`.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Lower bound on the polling interval, whatever the server advertises.
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

fn default_interval() -> u64 {
    5
}

/// Device authorization response.
#[derive(Debug, Deserialize)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
    #[serde(default)]
    pub message: Option<String>,
}

fn poll_interval(secs: u64) -> Duration {
    Duration::from_secs(secs).max(MIN_POLL_INTERVAL)
}

pub struct DeviceFlow {
    transport: reqwest::Client,
    device_code_url: String,
    endpoint: TokenEndpoint,
    scope: String,
    cache: TokenCache,
}

impl DeviceFlow {
    pub fn new(transport: reqwest::Client, auth: &AuthConfig) -> Result<Self, AuthError> {
        let client_id = required(&auth.client_id, "client-id")?;
        let tenant = required(&auth.tenant_id, "tenant-id")?;

        Ok(Self {
            transport,
            device_code_url: aad::endpoint(&auth.authority, tenant, Endpoint::DeviceCode),
            // Public client: no secret is sent.
            endpoint: TokenEndpoint::new(
                aad::endpoint(&auth.authority, tenant, Endpoint::Token),
                client_id,
                None,
            ),
            scope: auth.scopes.join(" "),
            cache: TokenCache::new(),
        })
    }

    async fn request_device_code(&self) -> Result<DeviceAuthorization, AuthError> {
        let response = self
            .endpoint
            .http()
            .post(&self.device_code_url)
            .form(&[("client_id", self.endpoint.client_id()), ("scope", self.scope.as_str())])
            .send()
            .await?;
        parse_response(response).await
    }

    async fn poll(&self, device: &DeviceAuthorization) -> Result<Token, AuthError> {
        // `None` when the advertised lifetime overflows: poll until the server
        // itself reports expiry.
        let deadline = Instant::now().checked_add(Duration::from_secs(device.expires_in));
        let mut interval = poll_interval(device.interval);

        loop {
            tokio::time::sleep(interval).await;
            if deadline.map_or(false, |at| Instant::now() >= at) {
                return Err(AuthError::Expired);
            }

            let result = self
                .endpoint
                .exchange(&[
                    ("grant_type", DEVICE_CODE_GRANT),
                    ("device_code", device.device_code.as_str()),
                ])
                .await;

            match result {
                Ok(token) => return Ok(token),
                Err(AuthError::Endpoint { status, error, description }) => match error.as_str() {
                    "authorization_pending" => {
                        tracing::debug!("Waiting for device authorization");
                    }
                    "slow_down" => {
                        interval += SLOW_DOWN_STEP;
                        tracing::debug!(interval = ?interval, "Device flow asked to slow down");
                    }
                    "expired_token" => return Err(AuthError::Expired),
                    "access_denied" | "authorization_declined" => {
                        return Err(AuthError::Denied(description))
                    }
                    _ => {
                        return Err(AuthError::Endpoint {
                            status,
                            error,
                            description,
                        })
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn renew(&self, stale: Option<Arc<Token>>) -> Result<Token, AuthError> {
        match stale {
            Some(token) => self.endpoint.refresh(&token, &self.scope).await,
            None => Err(AuthError::NoRefreshToken),
        }
    }
}

#[async_trait]
impl Provider for DeviceFlow {
    async fn prepare_access(&self) -> Result<(), AuthError> {
        if self.cache.has_fresh() {
            return Ok(());
        }

        let device = self.request_device_code().await?;
        match &device.message {
            Some(message) => println!("{}", message),
            None => println!(
                "To sign in, open {} and enter the code {}",
                device.verification_uri, device.user_code
            ),
        }

        let token = self.poll(&device).await?;
        self.cache.store(token);
        tracing::info!("Device authorization completed");
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
