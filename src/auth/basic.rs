//! Static username/password credentials.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderValue, AUTHORIZATION};

use crate::auth::{AuthError, Provider};
use crate::config::Params;

/// Attaches `Authorization: Basic` to every outgoing request.
pub struct BasicAuth {
    transport: reqwest::Client,
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(transport: reqwest::Client, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            transport,
            username: username.into(),
            password: password.into(),
        }
    }

    fn header_value(&self) -> Option<HeaderValue> {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        let mut value = HeaderValue::from_str(&format!("Basic {}", encoded)).ok()?;
        value.set_sensitive(true);
        Some(value)
    }
}

#[async_trait]
impl Provider for BasicAuth {
    async fn prepare_access(&self) -> Result<(), AuthError> {
        Ok(())
    }

    fn client(&self) -> &reqwest::Client {
        &self.transport
    }

    async fn modify(&self, _params: &Params, request: &mut reqwest::Request) {
        match self.header_value() {
            Some(value) => {
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            None => tracing::warn!("Basic credentials are not a valid header value"),
        }
    }
}
