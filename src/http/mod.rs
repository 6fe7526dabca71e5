//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound connection
//!     → server.rs (Axum setup, catch-all route)
//!     → forward.rs (per-request engine)
//!         → request.rs (target rewrite, outgoing request)
//!         → [auth provider attaches credentials, executes]
//!         → response.rs (buffer, gunzip)
//!     → completion.rs (terminal response, policy-gated log)
//!     → Send to client
//! ```

pub mod completion;
pub mod error;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use completion::Exchange;
pub use error::ForwardError;
pub use forward::Forwarder;
pub use server::HttpServer;
