//! The forwarding engine.
//!
//! One call to [`Forwarder::handle`] proxies one inbound request to the
//! configured remote. Steps run strictly in order:
//!
//! ```text
//! buffer body → rewrite target → log request → build outgoing request
//!     → provider.modify → provider.client().execute
//!     → read + gunzip → log status → respond
//! ```
//!
//! Any failure before the response short-circuits with `?`; the
//! [`Exchange`] turns it into a 502 and logs it.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::Response;

use crate::auth::Provider;
use crate::config::Params;
use crate::http::completion::Exchange;
use crate::http::error::ForwardError;
use crate::http::request::{build_outgoing, target_url};
use crate::http::response::{read_upstream, Upstream};
use crate::observability::LogSink;

/// Proxies inbound requests through the bound provider.
pub struct Forwarder {
    params: Arc<Params>,
    provider: Arc<dyn Provider>,
    sink: Arc<dyn LogSink>,
}

impl Forwarder {
    pub fn new(params: Arc<Params>, provider: Arc<dyn Provider>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            params,
            provider,
            sink,
        }
    }

    /// Proxy one request. Always returns exactly one response.
    pub async fn handle(&self, inbound: Request<Body>) -> Response {
        let mut exchange = Exchange::begin(&self.params, inbound.method().clone(), self.sink.clone());
        let outcome = self.forward(inbound, &mut exchange).await;
        exchange.finish(outcome)
    }

    async fn forward(&self, inbound: Request<Body>, exchange: &mut Exchange) -> Result<Upstream, ForwardError> {
        let (parts, body) = inbound.into_parts();

        // Bodies are held in memory in full.
        let body = to_bytes(body, usize::MAX)
            .await
            .map_err(ForwardError::InboundBody)?;

        let target = target_url(&self.params.remote, &parts.uri);

        exchange.record(format_args!("Requesting: {} {}", parts.method, target));
        exchange.record_body(&body);

        let mut outgoing = build_outgoing(parts.method, &target, parts.headers, body)?;
        self.provider.modify(&self.params, &mut outgoing).await;

        let response = self.provider.client().execute(outgoing).await?;
        let upstream = read_upstream(response).await?;

        exchange.record(format_args!("Response status {}", upstream.status.as_u16()));
        exchange.record_body(&upstream.body);

        Ok(upstream)
    }
}
