//! Machine-to-machine client-credentials grant.

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::aad::{self, Endpoint};
use crate::auth::token::{attach_bearer, Token, TokenCache, TokenEndpoint};
use crate::auth::{required, AuthError, Provider};
use crate::config::{AuthConfig, Params};

/// Exchanges the client id and secret for an access token.
///
/// This grant issues no refresh token, so an expired token is replaced by
/// running the exchange again.
pub struct ClientCredentials {
    transport: reqwest::Client,
    endpoint: TokenEndpoint,
    scope: String,
    cache: TokenCache,
}

impl ClientCredentials {
    pub fn new(transport: reqwest::Client, auth: &AuthConfig) -> Result<Self, AuthError> {
        let client_id = required(&auth.client_id, "client-id")?;
        let secret = required(&auth.client_secret, "client-secret")?;
        let tenant = required(&auth.tenant_id, "tenant-id")?;

        Ok(Self {
            transport,
            endpoint: TokenEndpoint::new(
                aad::endpoint(&auth.authority, tenant, Endpoint::Token),
                client_id,
                Some(secret.to_string()),
            ),
            scope: auth.client_scopes.join(" "),
            cache: TokenCache::new(),
        })
    }

    async fn fetch(&self) -> Result<Token, AuthError> {
        tracing::debug!(client_id = %self.endpoint.client_id(), "Requesting client-credentials token");
        self.endpoint
            .exchange(&[("grant_type", "client_credentials"), ("scope", self.scope.as_str())])
            .await
    }

    async fn token(&self) -> Result<Arc<Token>, AuthError> {
        self.cache.get_or_renew(|_| self.fetch()).await
    }
}

#[async_trait]
impl Provider for ClientCredentials {
    async fn prepare_access(&self) -> Result<(), AuthError> {
        self.token().await?;
        tracing::info!("Client-credentials token acquired");
        Ok(())
    }

    fn client(&self) -> &reqwest::Client {
        &self.transport
    }

    async fn modify(&self, _params: &Params, request: &mut reqwest::Request) {
        match self.token().await {
            Ok(token) => attach_bearer(request, &token),
            Err(e) => tracing::warn!(error = %e, "No access token, forwarding without credentials"),
        }
    }
}
