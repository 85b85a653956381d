//! End-to-end tests for the reverse-proxy fallback.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use api_gateway::config::GatewayConfig;
use serde_json::{json, Value};

mod common;

#[tokio::test]
async fn test_equal_weights_distribute_evenly() {
    let (a, hits_a) = common::start_counting_backend("a").await;
    let (b, hits_b) = common::start_counting_backend("b").await;
    let (c, hits_c) = common::start_counting_backend("c").await;

    let mut config = GatewayConfig::default();
    common::add_proxy_route(&mut config, "web", "/web", &[a, b, c]);
    let gateway = common::start_gateway(config, common::StubBackends::new().services()).await;
    let client = common::client();

    for _ in 0..300 {
        let res = client.get(gateway.url("/web/page")).send().await.unwrap();
        assert_eq!(res.status(), 200);
    }

    for hits in [&hits_a, &hits_b, &hits_c] {
        let n = hits.load(Ordering::SeqCst);
        assert!((90..=110).contains(&n), "uneven distribution: {n}");
    }
}

#[tokio::test]
async fn test_uri_and_headers_rewritten() {
    let seen = Arc::new(Mutex::new(None));
    let slot = seen.clone();
    let backend = common::start_programmable_backend(move |req| {
        let slot = slot.clone();
        async move {
            *slot.lock().unwrap() = Some(req);
            (200, "ok".to_string())
        }
    })
    .await;

    let mut config = GatewayConfig::default();
    common::add_proxy_route(&mut config, "web", "/web", &[backend]);
    let gateway = common::start_gateway(config, common::StubBackends::new().services()).await;

    let res = common::client()
        .get(gateway.url("/web/users/42?expand=true"))
        .header("x-request-id", "trace-me")
        .header("connection", "keep-alive, x-secret")
        .header("x-secret", "hop")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-request-id"], "trace-me");

    let seen = seen.lock().unwrap().clone().unwrap();
    assert_eq!(seen.request_line, "GET /users/42?expand=true HTTP/1.1");
    assert_eq!(seen.header("host"), Some(backend.to_string().as_str()));
    assert_eq!(seen.header("x-request-id"), Some("trace-me"));
    assert_eq!(seen.header("x-forwarded-for"), Some("127.0.0.1"));
    assert_eq!(seen.header("x-forwarded-proto"), Some("http"));
    assert_eq!(seen.header("x-forwarded-host"), Some(gateway.addr.to_string().as_str()));
    assert!(seen.header("x-secret").is_none());
}

#[tokio::test]
async fn test_get_retries_on_another_destination() {
    let dead = common::dead_address().await;
    let (live, hits) = common::start_counting_backend("live").await;

    let mut config = GatewayConfig::default();
    common::add_proxy_route(&mut config, "web", "/web", &[dead, live]);
    let gateway = common::start_gateway(config, common::StubBackends::new().services()).await;

    let res = common::client().get(gateway.url("/web/a")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "live");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_post_is_never_retried() {
    let dead = common::dead_address().await;
    let (live, hits) = common::start_counting_backend("live").await;

    let mut config = GatewayConfig::default();
    common::add_proxy_route(&mut config, "web", "/web", &[dead, live]);
    let gateway = common::start_gateway(config, common::StubBackends::new().services()).await;

    let res = common::client()
        .post(gateway.url("/web/a"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "PROXY_FORWARD_FAILED");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_all_destinations_down() {
    let dead = common::dead_address().await;

    let mut config = GatewayConfig::default();
    common::add_proxy_route(&mut config, "web", "/web", &[dead]);
    let gateway = common::start_gateway(config, common::StubBackends::new().services()).await;
    let client = common::client();

    // First attempt fails on connect and marks the only destination unhealthy.
    let res = client.get(gateway.url("/web/a")).send().await.unwrap();
    assert_eq!(res.status(), 502);

    // Within the cooldown nothing is eligible.
    let res = client.get(gateway.url("/web/a")).send().await.unwrap();
    assert_eq!(res.status(), 503);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "CLUSTER_UNAVAILABLE");
}

#[tokio::test]
async fn test_bridge_routes_take_precedence_over_proxy() {
    let (backend, hits) = common::start_counting_backend("proxied").await;
    let stubs = common::StubBackends::new();

    let mut config = GatewayConfig::default();
    common::add_proxy_route(&mut config, "legacy", "/api", &[backend]);
    let gateway = common::start_gateway(config, stubs.services()).await;
    let client = common::client();

    let res = client
        .post(gateway.url("/api/v1/Logger/log"))
        .json(&json!({"name": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(stubs.calls(), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    let res = client.get(gateway.url("/api/v1/Other/thing")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "proxied");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
