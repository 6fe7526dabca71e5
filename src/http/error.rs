//! Per-request failures.
//!
//! None of these reach the caller: each one is written to the exchange log
//! and turned into a bare 502.

/// Reasons an exchange aborts before a response is produced.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("Error when reading the inbound request body:\n {0}")]
    InboundBody(#[source] axum::Error),

    #[error("Error when making the transport request:\n {0}")]
    Construction(#[from] url::ParseError),

    #[error("Error when sending the transport request:\n {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Error while decoding gzip data:\n {0}")]
    Decode(#[source] std::io::Error),
}
