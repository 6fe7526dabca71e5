//! Outgoing request construction.
//!
//! # Responsibilities
//! - Rewrite the inbound target onto the configured remote
//! - Pick `https`, or `http` when the remote is on this machine
//! - Carry method, headers and the buffered body over unchanged
//!
//! # Design Decisions
//! - The inbound header map is moved into the outgoing request rather than
//!   copied, so the provider mutates the same map the caller sent
//! - `Host` and `Transfer-Encoding` describe the inbound hop and are dropped;
//!   the transport derives them again for the outbound one

use axum::body::Bytes;
use axum::http::header::{HOST, TRANSFER_ENCODING};
use axum::http::{HeaderMap, Method, Uri};
use url::Url;

use crate::http::error::ForwardError;
use crate::net::is_loopback;

/// Absolute target of the inbound request's path and query on `remote`.
///
/// Parsing happens in [`build_outgoing`], after the target is logged.
pub fn target_url(remote: &str, uri: &Uri) -> String {
    let scheme = if is_loopback(remote) { "http" } else { "https" };
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());

    format!("{}://{}{}", scheme, remote, path_and_query)
}

/// Assemble the outgoing request from the pieces of the inbound one.
pub fn build_outgoing(
    method: Method,
    target: &str,
    mut headers: HeaderMap,
    body: Bytes,
) -> Result<reqwest::Request, ForwardError> {
    let url = Url::parse(target)?;

    headers.remove(HOST);
    headers.remove(TRANSFER_ENCODING);

    let mut request = reqwest::Request::new(method, url);
    *request.headers_mut() = headers;
    *request.body_mut() = Some(reqwest::Body::from(body));
    Ok(request)
}
