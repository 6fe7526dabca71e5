//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Forwarding parameters shared by every request.
    pub params: Params,

    /// Credentials and endpoints for the selected authentication method.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ProxyConfig {
    /// Debug mode overrides the logging policies with the most verbose ones.
    pub fn apply_debug_mode(&mut self) {
        if self.observability.debug_mode {
            self.params.whenlog = WhenLog::Always;
            self.params.whatlog = WhatLog::Detailed;
        }
    }
}

/// Process-wide forwarding parameters. Read-only once the server starts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Params {
    /// Local bind address (e.g., "127.0.0.1:3100").
    pub local: String,

    /// Remote endpoint as `host[:port]`.
    pub remote: String,

    /// Authentication method bound for the process lifetime.
    pub method: AuthMethod,

    /// Optional PEM root certificate to trust.
    pub cert_path: Option<PathBuf>,

    /// Skip certificate verification for outbound calls.
    pub insecure: bool,

    /// When an exchange is logged.
    pub whenlog: WhenLog,

    /// What an exchange log contains.
    pub whatlog: WhatLog,
}

pub const DEFAULT_LOCAL_ADDR: &str = "127.0.0.1:3100";

impl Default for Params {
    fn default() -> Self {
        Self {
            local: DEFAULT_LOCAL_ADDR.to_string(),
            remote: String::new(),
            method: AuthMethod::default(),
            cert_path: None,
            insecure: false,
            whenlog: WhenLog::default(),
            whatlog: WhatLog::default(),
        }
    }
}

/// Authentication strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum AuthMethod {
    /// Static username and password.
    #[default]
    #[serde(rename = "basic")]
    Basic,
    /// Interactive authorization-code consent.
    #[serde(rename = "authcode")]
    AuthCode,
    /// Machine-to-machine client credentials.
    #[serde(rename = "client")]
    ClientCredentials,
    /// Polling device authorization.
    #[serde(rename = "device")]
    DeviceFlow,
}

/// Condition under which an exchange is logged.
///
/// `OnError` logs only exchanges that aborted before a response was produced;
/// any completed exchange, whatever its status, is not logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum WhenLog {
    #[default]
    #[serde(rename = "onError")]
    OnError,
    #[serde(rename = "onNon200")]
    OnNon200,
    #[serde(rename = "always")]
    Always,
}

/// Amount of detail in an exchange log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize, Serialize)]
pub enum WhatLog {
    /// Method, URL, status and error messages.
    #[default]
    #[serde(rename = "basic")]
    Basic,
    /// Everything in `Basic` plus request and response bodies.
    #[serde(rename = "detailed")]
    Detailed,
}

/// Error returned when a policy or method name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unexpected {kind} value {value:?}, expected one of: {expected}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl FromStr for AuthMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "authcode" => Ok(Self::AuthCode),
            "client" => Ok(Self::ClientCredentials),
            "device" => Ok(Self::DeviceFlow),
            _ => Err(UnknownVariant {
                kind: "method",
                value: s.to_string(),
                expected: "basic, authcode, client, device",
            }),
        }
    }
}

impl FromStr for WhenLog {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "onError" => Ok(Self::OnError),
            "onNon200" => Ok(Self::OnNon200),
            "always" => Ok(Self::Always),
            _ => Err(UnknownVariant {
                kind: "whenlog",
                value: s.to_string(),
                expected: "always, onNon200, onError",
            }),
        }
    }
}

impl FromStr for WhatLog {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "detailed" => Ok(Self::Detailed),
            _ => Err(UnknownVariant {
                kind: "whatlog",
                value: s.to_string(),
                expected: "basic, detailed",
            }),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Basic => "basic",
            Self::AuthCode => "authcode",
            Self::ClientCredentials => "client",
            Self::DeviceFlow => "device",
        };
        f.write_str(name)
    }
}

/// Credentials and identity-provider endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Basic auth username.
    pub username: Option<String>,

    /// Basic auth password.
    pub password: Option<String>,

    /// OAuth application (client) ID.
    pub client_id: Option<String>,

    /// OAuth directory (tenant) ID.
    pub tenant_id: Option<String>,

    /// OAuth client secret.
    pub client_secret: Option<String>,

    /// Local address receiving authorization-code callbacks.
    pub authcode_addr: String,

    /// Base URL of the identity provider.
    pub authority: String,

    /// Scopes requested by the interactive flows.
    pub scopes: Vec<String>,

    /// Scopes requested by the client-credentials flow.
    pub client_scopes: Vec<String>,

    /// Try to open the system browser for authorization-code consent.
    pub open_browser: bool,
}

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            client_id: None,
            tenant_id: None,
            client_secret: None,
            authcode_addr: DEFAULT_LOCAL_ADDR.to_string(),
            authority: DEFAULT_AUTHORITY.to_string(),
            // "offline_access" asks for a refresh token.
            scopes: vec![
                "offline_access".to_string(),
                "api://285286f5-b97b-4b45-ba35-92a74f35756a/basic".to_string(),
            ],
            client_scopes: vec!["https://graph.microsoft.com/.default".to_string()],
            open_browser: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Force `whenlog = always` and `whatlog = detailed`.
    pub debug_mode: bool,

    /// Address for the Prometheus scrape endpoint. Disabled when unset.
    pub metrics_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_names() {
        assert_eq!("onError".parse::<WhenLog>().unwrap(), WhenLog::OnError);
        assert_eq!("onNon200".parse::<WhenLog>().unwrap(), WhenLog::OnNon200);
        assert_eq!("always".parse::<WhenLog>().unwrap(), WhenLog::Always);
        assert_eq!("detailed".parse::<WhatLog>().unwrap(), WhatLog::Detailed);
        assert!("onerror".parse::<WhenLog>().is_err());
        assert!("all".parse::<WhatLog>().is_err());
    }

    #[test]
    fn test_method_names() {
        for name in ["basic", "authcode", "client", "device"] {
            let method: AuthMethod = name.parse().unwrap();
            assert_eq!(method.to_string(), name);
        }
        assert!("kerberos".parse::<AuthMethod>().is_err());
    }

    #[test]
    fn test_debug_mode_overrides_policies() {
        let mut config = ProxyConfig::default();
        config.observability.debug_mode = true;
        config.apply_debug_mode();
        assert_eq!(config.params.whenlog, WhenLog::Always);
        assert_eq!(config.params.whatlog, WhatLog::Detailed);
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [params]
            remote = "example.com:443"
            method = "client"
            whenlog = "onNon200"
            "#,
        )
        .unwrap();
        assert_eq!(config.params.local, DEFAULT_LOCAL_ADDR);
        assert_eq!(config.params.method, AuthMethod::ClientCredentials);
        assert_eq!(config.params.whenlog, WhenLog::OnNon200);
        assert_eq!(config.params.whatlog, WhatLog::Basic);
        assert_eq!(config.auth.authority, DEFAULT_AUTHORITY);
    }
}
