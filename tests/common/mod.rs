//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use auth_proxy::auth::Provider;
use auth_proxy::config::Params;
use auth_proxy::observability::LogSink;
use auth_proxy::{HttpServer, Shutdown};
use axum::{
    body::{Body, Bytes},
    extract::{Form, Path},
    http::{HeaderMap, Method, StatusCode},
    response::Response,
    routing::post,
    Json, Router,
};
use tokio::net::TcpListener;

/// Status, headers and body a programmable backend answers with.
pub type Reply = (u16, Vec<(&'static str, &'static str)>, Vec<u8>);

/// Serve `app` on an ephemeral loopback port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a backend that answers every request with `f()`.
pub async fn start_programmable_backend<F>(f: F) -> SocketAddr
where
    F: Fn() -> Reply + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let app = Router::new().fallback(move || {
        let f = f.clone();
        async move {
            let (status, headers, body) = f();
            let mut builder = Response::builder().status(status);
            for (name, value) in headers {
                builder = builder.header(name, value);
            }
            builder.body(Body::from(body)).unwrap()
        }
    });
    serve(app).await
}

/// Start a backend that returns a fixed status and body.
pub async fn start_mock_backend(status: u16, body: &'static str) -> SocketAddr {
    start_programmable_backend(move || (status, vec![], body.as_bytes().to_vec())).await
}

/// Start a backend that describes the request it received as
/// `method|authorization|x-req|host|path|body`.
pub async fn start_echo_backend() -> SocketAddr {
    async fn echo(method: Method, uri: axum::http::Uri, headers: HeaderMap, body: Bytes) -> String {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string()
        };
        format!(
            "{}|{}|{}|{}|{}|{}",
            method,
            header("authorization"),
            header("x-req"),
            header("host"),
            uri.path(),
            String::from_utf8_lossy(&body)
        )
    }

    serve(Router::new().fallback(echo)).await
}

/// An address on which nothing is listening.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Start the proxy in front of `params.remote`.
pub async fn start_proxy(
    params: Params,
    provider: Arc<dyn Provider>,
    sink: Arc<dyn LogSink>,
) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::with_sink(params, provider, sink);
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Answer of a mock identity provider: status and JSON body.
pub type IdpReply = (u16, serde_json::Value);

/// Start a mock identity provider. `f` receives the endpoint name
/// (`token`, `devicecode`) and the submitted form.
pub async fn start_identity_provider<F>(f: F) -> SocketAddr
where
    F: Fn(&str, &HashMap<String, String>) -> IdpReply + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let app = Router::new().route(
        "/{tenant}/oauth2/v2.0/{endpoint}",
        post(
            move |Path((_tenant, endpoint)): Path<(String, String)>,
                  Form(form): Form<HashMap<String, String>>| {
                let f = f.clone();
                async move {
                    let (status, body) = f(&endpoint, &form);
                    (StatusCode::from_u16(status).unwrap(), Json(body))
                }
            },
        ),
    );
    serve(app).await
}
