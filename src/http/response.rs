//! Upstream response handling.
//!
//! # Responsibilities
//! - Read the upstream body fully
//! - Decompress when `Content-Encoding` is exactly `gzip`
//!
//! # Design Decisions
//! - Only status and body go back to the caller; upstream headers,
//!   including `Content-Encoding`, are dropped
//! - Any other encoding passes through untouched

use std::io::Read;

use axum::body::Bytes;
use axum::http::header::CONTENT_ENCODING;
use axum::http::StatusCode;
use flate2::read::MultiGzDecoder;

use crate::http::error::ForwardError;

/// Status and decoded body of an upstream response.
#[derive(Debug, Clone)]
pub struct Upstream {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Buffer the upstream response, decoding gzip bodies.
pub async fn read_upstream(response: reqwest::Response) -> Result<Upstream, ForwardError> {
    let status = response.status();
    let gzip = response
        .headers()
        .get(CONTENT_ENCODING)
        .map_or(false, |v| v.as_bytes() == b"gzip");

    let raw = response.bytes().await?;
    let body = if gzip { decode_gzip(&raw)? } else { raw };

    Ok(Upstream { status, body })
}

/// Decompress a gzip payload.
///
/// An empty payload has no gzip header and is rejected like any other
/// malformed stream.
pub fn decode_gzip(raw: &[u8]) -> Result<Bytes, ForwardError> {
    if raw.is_empty() {
        return Err(ForwardError::Decode(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "empty gzip stream",
        )));
    }

    let mut decoded = Vec::new();
    MultiGzDecoder::new(raw)
        .read_to_end(&mut decoded)
        .map_err(ForwardError::Decode)?;
    Ok(Bytes::from(decoded))
}
