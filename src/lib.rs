//! Authenticating reverse proxy library.

pub mod auth;
pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use auth::Provider;
pub use config::{Params, ProxyConfig};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
