//! OAuth 2.0 token exchange and caching shared by the token-based providers.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::auth::AuthError;

/// Tokens are renewed this long before they actually expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// An access token with its refresh token and expiry.
#[derive(Debug, Clone)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<Instant>,
}

impl Token {
    pub fn from_response(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            // A lifetime past what `Instant` can represent never expires.
            expires_at: response
                .expires_in
                .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs))),
        }
    }

    /// True while the token is usable for at least `EXPIRY_MARGIN` more.
    pub fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(at) => Instant::now() + EXPIRY_MARGIN < at,
            None => true,
        }
    }
}

/// Client for a tenant's token endpoint.
pub struct TokenEndpoint {
    http: reqwest::Client,
    url: String,
    client_id: String,
    client_secret: Option<String>,
}

impl TokenEndpoint {
    pub fn new(url: impl Into<String>, client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// POST a grant to the token endpoint.
    pub async fn exchange(&self, grant: &[(&str, &str)]) -> Result<Token, AuthError> {
        let mut form: Vec<(&str, &str)> = vec![("client_id", self.client_id.as_str())];
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.as_str()));
        }
        form.extend_from_slice(grant);

        let response = self.http.post(&self.url).form(&form).send().await?;
        let token: TokenResponse = parse_response(response).await?;
        Ok(Token::from_response(token))
    }

    /// Redeem a refresh token. The previous refresh token is kept when the
    /// endpoint does not rotate it.
    pub async fn refresh(&self, current: &Token, scope: &str) -> Result<Token, AuthError> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .ok_or(AuthError::NoRefreshToken)?;

        tracing::debug!(client_id = %self.client_id, "Refreshing access token");
        let mut token = self
            .exchange(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("scope", scope),
            ])
            .await?;
        if token.refresh_token.is_none() {
            token.refresh_token = current.refresh_token.clone();
        }
        Ok(token)
    }
}

/// Decode a JSON body, mapping OAuth error payloads to `AuthError::Endpoint`.
pub(crate) async fn parse_response<T>(response: reqwest::Response) -> Result<T, AuthError>
where
    T: serde::de::DeserializeOwned,
{
    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        return Ok(serde_json::from_slice(&body)?);
    }

    match serde_json::from_slice::<ErrorResponse>(&body) {
        Ok(err) => Err(AuthError::Endpoint {
            status: status.as_u16(),
            error: err.error,
            description: err.error_description.unwrap_or_default(),
        }),
        Err(_) => Err(AuthError::Endpoint {
            status: status.as_u16(),
            error: "http_error".to_string(),
            description: String::from_utf8_lossy(&body).into_owned(),
        }),
    }
}

/// Shared token slot. Reads are lock-free; renewals are single-flight.
pub struct TokenCache {
    current: ArcSwapOption<Token>,
    renewal: Mutex<()>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            renewal: Mutex::new(()),
        }
    }

    pub fn load(&self) -> Option<Arc<Token>> {
        self.current.load_full()
    }

    pub fn store(&self, token: Token) -> Arc<Token> {
        let token = Arc::new(token);
        self.current.store(Some(token.clone()));
        token
    }

    pub fn has_fresh(&self) -> bool {
        self.load().map_or(false, |t| t.is_fresh())
    }

    /// Return the cached token, renewing it first if it is missing or stale.
    ///
    /// `renew` receives the stale token (if any). Concurrent callers wait for
    /// a single renewal instead of each hitting the token endpoint.
    pub async fn get_or_renew<F, Fut>(&self, renew: F) -> Result<Arc<Token>, AuthError>
    where
        F: FnOnce(Option<Arc<Token>>) -> Fut,
        Fut: Future<Output = Result<Token, AuthError>>,
    {
        if let Some(token) = self.load().filter(|t| t.is_fresh()) {
            return Ok(token);
        }

        let _guard = self.renewal.lock().await;
        let stale = self.load();
        if let Some(token) = stale.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.clone());
        }

        let token = renew(stale).await?;
        Ok(self.store(token))
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Set `Authorization: Bearer` on an outgoing request.
pub fn attach_bearer(request: &mut reqwest::Request, token: &Token) {
    match HeaderValue::from_str(&format!("Bearer {}", token.access_token)) {
        Ok(mut value) => {
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Err(_) => tracing::warn!("Access token is not a valid header value"),
    }
}
