//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing call to the remote
//!     → loopback.rs (pick http or https for the remote)
//!     → tls.rs (trust roots, insecure mode, transport client)
//! ```

pub mod loopback;
pub mod tls;

pub use loopback::is_loopback;
