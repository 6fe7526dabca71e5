//! End-to-end exchanges through the proxy.

use std::io::Write;
use std::sync::Arc;

use auth_proxy::auth::BasicAuth;
use auth_proxy::config::{Params, WhatLog, WhenLog};
use auth_proxy::observability::MemorySink;
use flate2::write::GzEncoder;
use flate2::Compression;

mod common;

fn params(remote: impl ToString, whenlog: WhenLog, whatlog: WhatLog) -> Params {
    Params {
        remote: remote.to_string(),
        whenlog,
        whatlog,
        ..Params::default()
    }
}

fn basic_provider() -> Arc<BasicAuth> {
    Arc::new(BasicAuth::new(reqwest::Client::new(), "Aladdin", "open sesame"))
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[tokio::test]
async fn test_basic_log_has_request_line_and_status() {
    let backend = common::start_mock_backend(200, "ok").await;
    let sink = Arc::new(MemorySink::new());
    let (proxy, shutdown) = common::start_proxy(
        params(backend, WhenLog::Always, WhatLog::Basic),
        basic_provider(),
        sink.clone(),
    )
    .await;

    let res = common::client()
        .get(format!("http://{}/foo", proxy))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");

    let blocks = sink.blocks();
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].contains(&format!("GET http://{}/foo", backend)));
    assert!(blocks[0].contains("status 200"));
    assert!(!blocks[0].lines().any(|line| line == "ok"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_detailed_log_has_both_bodies() {
    let backend = common::start_programmable_backend(|| (201, vec![], b"created".to_vec())).await;
    let sink = Arc::new(MemorySink::new());
    let (proxy, shutdown) = common::start_proxy(
        params(backend, WhenLog::Always, WhatLog::Detailed),
        basic_provider(),
        sink.clone(),
    )
    .await;

    let res = common::client()
        .post(format!("http://{}/bar", proxy))
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 201);
    assert_eq!(res.text().await.unwrap(), "created");

    let blocks = sink.blocks();
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].contains("POST"));
    assert!(blocks[0].contains("payload"));
    assert!(blocks[0].contains("created"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_on_non200_policy() {
    let ok_backend = common::start_mock_backend(200, "fine").await;
    let missing_backend = common::start_mock_backend(404, "missing").await;

    let ok_sink = Arc::new(MemorySink::new());
    let (ok_proxy, ok_shutdown) = common::start_proxy(
        params(ok_backend, WhenLog::OnNon200, WhatLog::Basic),
        basic_provider(),
        ok_sink.clone(),
    )
    .await;

    let missing_sink = Arc::new(MemorySink::new());
    let (missing_proxy, missing_shutdown) = common::start_proxy(
        params(missing_backend, WhenLog::OnNon200, WhatLog::Basic),
        basic_provider(),
        missing_sink.clone(),
    )
    .await;

    let client = common::client();
    let res = client.get(format!("http://{}/", ok_proxy)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let res = client.get(format!("http://{}/", missing_proxy)).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "missing");

    assert!(ok_sink.blocks().is_empty());
    assert_eq!(missing_sink.blocks().len(), 1);
    assert!(missing_sink.blocks()[0].contains("status 404"));

    ok_shutdown.trigger();
    missing_shutdown.trigger();
}

#[tokio::test]
async fn test_on_error_policy_only_logs_aborts() {
    let ok_backend = common::start_mock_backend(200, "fine").await;
    let missing_backend = common::start_mock_backend(404, "missing").await;
    let client = common::client();

    for backend in [ok_backend, missing_backend] {
        let sink = Arc::new(MemorySink::new());
        let (proxy, shutdown) = common::start_proxy(
            params(backend, WhenLog::OnError, WhatLog::Basic),
            basic_provider(),
            sink.clone(),
        )
        .await;

        let res = client.get(format!("http://{}/", proxy)).send().await.unwrap();
        assert_ne!(res.status(), 502);
        assert!(sink.blocks().is_empty(), "completed exchanges are not logged under onError");
        shutdown.trigger();
    }

    let sink = Arc::new(MemorySink::new());
    let (proxy, shutdown) = common::start_proxy(
        params(common::closed_port(), WhenLog::OnError, WhatLog::Basic),
        basic_provider(),
        sink.clone(),
    )
    .await;

    let res = client.get(format!("http://{}/", proxy)).send().await.unwrap();
    assert_eq!(res.status(), 502);
    assert_eq!(sink.blocks().len(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_transport_failure_always_logged() {
    let client = common::client();

    for whenlog in [WhenLog::OnError, WhenLog::OnNon200, WhenLog::Always] {
        let sink = Arc::new(MemorySink::new());
        let (proxy, shutdown) = common::start_proxy(
            params(common::closed_port(), whenlog, WhatLog::Basic),
            basic_provider(),
            sink.clone(),
        )
        .await;

        let res = client
            .put(format!("http://{}/rpc", proxy))
            .body("{}")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 502);
        assert!(res.bytes().await.unwrap().is_empty());

        let blocks = sink.blocks();
        assert_eq!(blocks.len(), 1, "abort must be logged under {:?}", whenlog);
        assert!(blocks[0].contains("Error when sending the transport request"));

        shutdown.trigger();
    }
}

#[tokio::test]
async fn test_construction_failure_is_bad_gateway() {
    let sink = Arc::new(MemorySink::new());
    let (proxy, shutdown) = common::start_proxy(
        params("bad host:80", WhenLog::OnError, WhatLog::Basic),
        basic_provider(),
        sink.clone(),
    )
    .await;

    let res = common::client().get(format!("http://{}/x", proxy)).send().await.unwrap();
    assert_eq!(res.status(), 502);
    assert!(res.bytes().await.unwrap().is_empty());

    let blocks = sink.blocks();
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].contains("Requesting: GET https://bad host:80/x"));
    assert!(blocks[0].contains("Error when making the transport request"));
    let request_line = blocks[0].find("Requesting:").unwrap();
    let error_line = blocks[0].find("Error when making").unwrap();
    assert!(request_line < error_line);

    shutdown.trigger();
}

#[tokio::test]
async fn test_gzip_body_is_decompressed() {
    let backend = common::start_programmable_backend(|| {
        (200, vec![("content-encoding", "gzip")], gzip(b"hello"))
    })
    .await;
    let sink = Arc::new(MemorySink::new());
    let (proxy, shutdown) = common::start_proxy(
        params(backend, WhenLog::Always, WhatLog::Detailed),
        basic_provider(),
        sink.clone(),
    )
    .await;

    let res = common::client().get(format!("http://{}/", proxy)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().get("content-encoding").is_none());
    assert_eq!(res.text().await.unwrap(), "hello");
    assert!(sink.blocks()[0].contains("hello"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_other_encodings_pass_through() {
    let backend = common::start_programmable_backend(|| {
        (200, vec![("content-encoding", "x-custom")], b"opaque bytes".to_vec())
    })
    .await;
    let (proxy, shutdown) = common::start_proxy(
        params(backend, WhenLog::OnError, WhatLog::Basic),
        basic_provider(),
        Arc::new(MemorySink::new()),
    )
    .await;

    let res = common::client().get(format!("http://{}/", proxy)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().get("content-encoding").is_none());
    assert_eq!(res.text().await.unwrap(), "opaque bytes");

    shutdown.trigger();
}

#[tokio::test]
async fn test_malformed_gzip_is_bad_gateway() {
    let backend = common::start_programmable_backend(|| {
        (200, vec![("content-encoding", "gzip")], b"this is not gzip".to_vec())
    })
    .await;
    let sink = Arc::new(MemorySink::new());
    let (proxy, shutdown) = common::start_proxy(
        params(backend, WhenLog::OnError, WhatLog::Basic),
        basic_provider(),
        sink.clone(),
    )
    .await;

    let res = common::client().get(format!("http://{}/", proxy)).send().await.unwrap();
    assert_eq!(res.status(), 502);
    assert!(res.bytes().await.unwrap().is_empty());

    let blocks = sink.blocks();
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].contains("Error while decoding gzip data"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_empty_gzip_body_is_bad_gateway() {
    let backend = common::start_programmable_backend(|| {
        (200, vec![("content-encoding", "gzip")], Vec::new())
    })
    .await;
    let sink = Arc::new(MemorySink::new());
    let (proxy, shutdown) = common::start_proxy(
        params(backend, WhenLog::OnError, WhatLog::Basic),
        basic_provider(),
        sink.clone(),
    )
    .await;

    let res = common::client().get(format!("http://{}/", proxy)).send().await.unwrap();
    assert_eq!(res.status(), 502);
    assert!(res.bytes().await.unwrap().is_empty());

    let blocks = sink.blocks();
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].contains("Error while decoding gzip data"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_forwarded_with_credentials() {
    let backend = common::start_echo_backend().await;
    let (proxy, shutdown) = common::start_proxy(
        params(backend, WhenLog::OnError, WhatLog::Basic),
        basic_provider(),
        Arc::new(MemorySink::new()),
    )
    .await;

    let body = common::client()
        .patch(format!("http://{}/chain/blocks?latest=true", proxy))
        .header("x-req", "abc")
        .body("{\"id\":1}")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let fields: Vec<&str> = body.splitn(6, '|').collect();
    assert_eq!(fields[0], "PATCH");
    assert_eq!(fields[1], "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    assert_eq!(fields[2], "abc");
    assert_eq!(fields[3], backend.to_string());
    assert_eq!(fields[4], "/chain/blocks");
    assert_eq!(fields[5], "{\"id\":1}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_requests_keep_their_headers() {
    let backend = common::start_echo_backend().await;
    let (proxy, shutdown) = common::start_proxy(
        params(backend, WhenLog::Always, WhatLog::Basic),
        basic_provider(),
        Arc::new(MemorySink::new()),
    )
    .await;

    let client = common::client();
    let mut handles = Vec::new();
    for i in 0..32 {
        let client = client.clone();
        let url = format!("http://{}/req/{}", proxy, i);
        handles.push(tokio::spawn(async move {
            let body = client
                .post(&url)
                .header("x-req", i.to_string())
                .header("authorization", format!("Bearer caller-{}", i))
                .body(format!("body-{}", i))
                .send()
                .await
                .unwrap()
                .text()
                .await
                .unwrap();
            (i, body)
        }));
    }

    for handle in handles {
        let (i, body) = handle.await.unwrap();
        let fields: Vec<&str> = body.splitn(6, '|').collect();
        assert_eq!(fields[1], "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
        assert_eq!(fields[2], i.to_string());
        assert_eq!(fields[4], format!("/req/{}", i));
        assert_eq!(fields[5], format!("body-{}", i));
    }

    shutdown.trigger();
}
