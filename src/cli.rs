//! Command line interface.
//!
//! Flags map one-to-one onto [`ProxyConfig`]. With `--config` the TOML file
//! is used instead and the other flags are ignored.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::{AuthConfig, ObservabilityConfig, Params, DEFAULT_LOCAL_ADDR};
use crate::config::validation::validate_config;
use crate::config::{AuthMethod, ProxyConfig, WhatLog, WhenLog};

#[derive(Parser, Debug)]
#[command(name = "auth-proxy")]
#[command(about = "Forward local requests to a remote endpoint with credentials attached", long_about = None)]
pub struct Cli {
    /// Load all settings from a TOML file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Authentication method: basic, authcode, client or device
    #[arg(long, default_value = "basic")]
    pub method: AuthMethod,

    /// Local address to bind to
    #[arg(long, default_value = DEFAULT_LOCAL_ADDR)]
    pub local: String,

    /// Remote endpoint address
    #[arg(long, default_value = "")]
    pub remote: String,

    /// (Optional) File path to root CA
    #[arg(long = "cert")]
    pub cert_path: Option<PathBuf>,

    /// (Optional) Skip certificate verifications
    #[arg(long)]
    pub insecure: bool,

    /// Basic auth: username
    #[arg(long)]
    pub username: Option<String>,

    /// Basic auth: password
    #[arg(long)]
    pub password: Option<String>,

    /// OAuth: application (client) ID
    #[arg(long)]
    pub client_id: Option<String>,

    /// OAuth: directory (tenant) ID
    #[arg(long)]
    pub tenant_id: Option<String>,

    /// OAuth: client secret
    #[arg(long)]
    pub client_secret: Option<String>,

    /// OAuth: local address to receive callbacks
    #[arg(long, default_value = DEFAULT_LOCAL_ADDR)]
    pub authcode_addr: String,

    /// OAuth: print the consent URL instead of opening a browser
    #[arg(long)]
    pub no_browser: bool,

    /// When to print logs: always, onNon200 or onError
    #[arg(long, default_value = "onError")]
    pub whenlog: WhenLog,

    /// What logs contain: basic or detailed
    #[arg(long, default_value = "basic")]
    pub whatlog: WhatLog,

    /// Debug mode: sets whenlog to always and whatlog to detailed
    #[arg(long = "debugmode")]
    pub debug_mode: bool,

    /// (Optional) Address for the Prometheus metrics endpoint
    #[arg(long)]
    pub metrics_addr: Option<String>,
}

impl Cli {
    /// Turn the parsed flags (or the referenced file) into a validated config.
    pub fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        if let Some(path) = &self.config {
            return load_config(path);
        }

        let defaults = AuthConfig::default();
        let mut config = ProxyConfig {
            params: Params {
                local: self.local,
                remote: self.remote,
                method: self.method,
                cert_path: self.cert_path,
                insecure: self.insecure,
                whenlog: self.whenlog,
                whatlog: self.whatlog,
            },
            auth: AuthConfig {
                username: self.username,
                password: self.password,
                client_id: self.client_id,
                tenant_id: self.tenant_id,
                client_secret: self.client_secret,
                authcode_addr: self.authcode_addr,
                open_browser: !self.no_browser,
                ..defaults
            },
            observability: ObservabilityConfig {
                debug_mode: self.debug_mode,
                metrics_address: self.metrics_addr,
            },
        };
        config.apply_debug_mode();

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
