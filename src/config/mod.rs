//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line flags (cli.rs)      config file (TOML)
//!             \                      → loader.rs (parse & deserialize)
//!              \                    /
//!               → validation.rs (semantic checks)
//!               → ProxyConfig (validated, immutable)
//!               → Params shared via Arc with every request
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::{AuthConfig, AuthMethod, ObservabilityConfig, Params, ProxyConfig, WhatLog, WhenLog};
