//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Deliver per-exchange log blocks to a sink as one unit
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level configurable via `RUST_LOG`, debug mode raises the default
//! - An exchange block is a single event so concurrent requests never
//!   interleave inside a block

use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Target used for exchange log blocks.
pub const EXCHANGE_TARGET: &str = "auth_proxy::exchange";

/// Destination for completed exchange logs.
pub trait LogSink: Send + Sync {
    /// Emit one exchange block. Called at most once per request.
    fn emit(&self, block: &str);
}

/// Emits each block as a single `info` event on [`EXCHANGE_TARGET`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, block: &str) {
        tracing::info!(target: EXCHANGE_TARGET, "\n{}", block.trim_end());
    }
}

/// Keeps blocks in memory. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    blocks: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every block emitted so far.
    pub fn blocks(&self) -> Vec<String> {
        match self.blocks.lock() {
            Ok(blocks) => blocks.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LogSink for MemorySink {
    fn emit(&self, block: &str) {
        match self.blocks.lock() {
            Ok(mut blocks) => blocks.push(block.to_string()),
            Err(poisoned) => poisoned.into_inner().push(block.to_string()),
        }
    }
}

/// Install the global subscriber.
pub fn init_tracing(debug_mode: bool) {
    let default_filter = if debug_mode {
        "auth_proxy=debug,tower_http=debug"
    } else {
        "auth_proxy=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
