//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every exchange produces:
//!     → logging.rs (one text block per request, policy gated)
//!     → metrics.rs (counters, histograms)
//!
//! Everything else:
//!     → tracing events through the global subscriber
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{LogSink, MemorySink, TracingSink};
