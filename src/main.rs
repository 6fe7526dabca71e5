//! Authenticating reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────────┐
//!                 │                       AUTH PROXY                         │
//!   Local client  │  ┌─────────┐   ┌───────────┐   ┌──────────────────────┐  │
//!   ──────────────┼─▶│  http   │──▶│  forward  │──▶│ auth provider        │  │
//!                 │  │ server  │   │  engine   │   │ modify + client      │──┼──▶ Remote
//!                 │  └─────────┘   └─────┬─────┘   └──────────────────────┘  │    (HTTPS)
//!   ◀─────────────┼────────────────┐     │                                   │
//!                 │          ┌─────┴─────▼──┐                                │
//!                 │          │  completion  │  exactly one response,         │
//!                 │          │  + logging   │  policy-gated log block        │
//!                 │          └──────────────┘                                │
//!                 └──────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;

use auth_proxy::cli::Cli;
use auth_proxy::lifecycle::{start, Shutdown};
use auth_proxy::observability::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    init_tracing(config.observability.debug_mode);

    tracing::info!(
        local = %config.params.local,
        remote = %config.params.remote,
        method = %config.params.method,
        whenlog = ?config.params.whenlog,
        whatlog = ?config.params.whatlog,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    start(config, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
