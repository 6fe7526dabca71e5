//! Exchange finalization.
//!
//! Every inbound request owns one [`Exchange`]. It accumulates the log text,
//! produces the single terminal response in [`Exchange::finish`], and emits
//! the log (when the policy allows it) when it is dropped. Dropping happens
//! on every exit path, including a cancelled handler future or a panic, so
//! an aborted exchange is always logged.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::config::{Params, WhatLog, WhenLog};
use crate::http::error::ForwardError;
use crate::http::response::Upstream;
use crate::observability::{metrics, LogSink};

/// Decide whether an exchange is logged.
///
/// `status` is `None` for an aborted exchange, which is always logged.
/// `OnError` suppresses every completed exchange whatever its status.
pub fn should_log(whenlog: WhenLog, status: Option<StatusCode>) -> bool {
    match status {
        None => true,
        Some(status) => match whenlog {
            WhenLog::OnError => false,
            WhenLog::OnNon200 => status != StatusCode::OK,
            WhenLog::Always => true,
        },
    }
}

/// Per-request state from first byte to terminal response.
pub struct Exchange {
    log: String,
    logging: bool,
    completed: bool,
    whenlog: WhenLog,
    whatlog: WhatLog,
    method: Method,
    started: Instant,
    sink: Arc<dyn LogSink>,
}

impl Exchange {
    pub fn begin(params: &Params, method: Method, sink: Arc<dyn LogSink>) -> Self {
        Self {
            log: String::new(),
            logging: true,
            completed: false,
            whenlog: params.whenlog,
            whatlog: params.whatlog,
            method,
            started: Instant::now(),
            sink,
        }
    }

    /// Append one line to the log.
    pub fn record(&mut self, line: impl fmt::Display) {
        use fmt::Write;
        let _ = writeln!(self.log, "{}", line);
    }

    /// Append a body to the log when `whatlog` is detailed.
    pub fn record_body(&mut self, body: &[u8]) {
        if self.whatlog >= WhatLog::Detailed {
            self.record(String::from_utf8_lossy(body));
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Text accumulated so far.
    pub fn log(&self) -> &str {
        &self.log
    }

    /// Produce the terminal response for this exchange.
    ///
    /// A forwarded exchange answers with the upstream status and decoded body.
    /// An aborted one answers 502 with an empty body.
    pub fn finish(mut self, outcome: Result<Upstream, ForwardError>) -> Response {
        match outcome {
            Ok(upstream) => {
                let status = upstream.status;
                let response = (status, Body::from(upstream.body)).into_response();
                self.completed = true;
                self.logging &= should_log(self.whenlog, Some(status));
                metrics::record_exchange(self.method.as_str(), status.as_u16(), self.started);
                response
            }
            Err(err) => {
                tracing::debug!(error = %err, "Exchange aborted");
                self.record(err);
                metrics::record_exchange(
                    self.method.as_str(),
                    StatusCode::BAD_GATEWAY.as_u16(),
                    self.started,
                );
                (StatusCode::BAD_GATEWAY, Body::empty()).into_response()
            }
        }
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        if self.logging {
            self.sink.emit(&self.log);
        }
    }
}
