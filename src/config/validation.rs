//! Configuration validation.
//!
//! Serde handles the syntax; this module checks that the values required by
//! the selected authentication method are present. All problems are reported
//! at once rather than stopping at the first one.

use std::fmt;

use crate::config::schema::{AuthMethod, ProxyConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required value is absent or empty.
    Missing(&'static str),
    /// The local bind address cannot be parsed.
    InvalidLocal(String),
    /// The cert file is set but does not exist.
    CertNotFound(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Missing(name) => write!(f, "missing required value: {}", name),
            ValidationError::InvalidLocal(addr) => write!(f, "invalid local address: {}", addr),
            ValidationError::CertNotFound(path) => write!(f, "certificate file not found: {}", path),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a loaded configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let params = &config.params;
    let auth = &config.auth;

    if params.local.is_empty() {
        errors.push(ValidationError::Missing("local"));
    } else if !has_port(&params.local) {
        errors.push(ValidationError::InvalidLocal(params.local.clone()));
    }

    if params.remote.is_empty() {
        errors.push(ValidationError::Missing("remote"));
    }

    if let Some(path) = &params.cert_path {
        if !path.exists() {
            errors.push(ValidationError::CertNotFound(path.display().to_string()));
        }
    }

    let required: Vec<(&'static str, &Option<String>)> = match params.method {
        AuthMethod::Basic => vec![("username", &auth.username), ("password", &auth.password)],
        AuthMethod::AuthCode | AuthMethod::DeviceFlow => {
            vec![("client-id", &auth.client_id), ("tenant-id", &auth.tenant_id)]
        }
        AuthMethod::ClientCredentials => vec![
            ("client-id", &auth.client_id),
            ("client-secret", &auth.client_secret),
            ("tenant-id", &auth.tenant_id),
        ],
    };

    for (name, value) in required {
        if value.as_deref().map_or(true, str::is_empty) {
            errors.push(ValidationError::Missing(name));
        }
    }

    if params.method == AuthMethod::AuthCode && auth.authcode_addr.is_empty() {
        errors.push(ValidationError::Missing("authcode-addr"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A bind address must name a port; the host may be an IP or a name.
fn has_port(addr: &str) -> bool {
    addr.rsplit_once(':')
        .map_or(false, |(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
}
