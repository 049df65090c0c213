//! HTTP 服务客户端测试

mod common;

use beacon::client::{DEFAULT_CONTENT_TYPE, RequestBuilder, ServiceClient};
use beacon::discovery::{Endpoint, StaticPublisher, round_robin};
use beacon::error::BeaconError;
use common::received_at;
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(servers: &[&MockServer]) -> ServiceClient {
    let endpoints: Vec<Endpoint> = servers
        .iter()
        .map(|s| Endpoint::http(s.address().ip().to_string(), s.address().port()))
        .collect();
    let lb = round_robin(Arc::new(StaticPublisher::new(endpoints)))
        .await
        .expect("Failed to create load balancer");
    ServiceClient::new("downstream", lb).expect("Failed to create client")
}

/// 测试：没有下游端点时返回 NoEndpointsAvailable
#[tokio::test]
async fn test_no_downstream_service() {
    let client = client_for(&[]).await;
    let builder = RequestBuilder::new("test", Method::GET, "/wtf");

    let result = client.execute(&builder).await;
    assert!(matches!(result, Err(BeaconError::NoEndpointsAvailable)));
}

/// 测试：请求带上路径、查询参数、请求头和 JSON Content-Type
#[tokio::test]
async fn test_execute_builds_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/items"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"ok":true}"#, "application/json"))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&[&server]).await;

    let mut builder = RequestBuilder::new("req-1", Method::POST, "/v1/items")
        .json_payload(&serde_json::json!({"name": "widget"}))
        .expect("Failed to encode payload");
    builder.add_header("X-Request-Id", "req-1");
    builder.set_query(Some(HashMap::from([("page".to_string(), "2".to_string())])));

    let response = client.execute(&builder).await.expect("request failed");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("invalid json");
    assert_eq!(body["ok"], true);

    let requests = received_at(&server, "/v1/items").await;
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.url.query(), Some("page=2"));
    assert_eq!(
        request.headers.get("content-type").and_then(|v| v.to_str().ok()),
        Some(DEFAULT_CONTENT_TYPE)
    );
    assert_eq!(
        request.headers.get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-1")
    );
    let body: serde_json::Value = request.body_json().expect("request body is not json");
    assert_eq!(body["name"], "widget");
}

/// 测试：add_header 不覆盖已有的值，set_query(None) 保留原参数
#[test]
fn test_builder_header_and_query_rules() {
    let mut builder = RequestBuilder::new("id", Method::GET, "/");

    builder.add_header("Authorization", "first");
    builder.add_header("Authorization", "second");
    assert_eq!(builder.headers()["Authorization"], "first");

    builder.set_query(Some(HashMap::from([("a".to_string(), "1".to_string())])));
    builder.set_query(None);
    assert_eq!(builder.query()["a"], "1");
}

/// 测试：请求钩子和响应钩子都会执行
#[tokio::test]
async fn test_hooks_run_around_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let client = client_for(&[&server]).await;

    let request_calls = Arc::new(AtomicUsize::new(0));
    let response_status = Arc::new(AtomicUsize::new(0));

    let mut builder = RequestBuilder::new("hooks", Method::GET, "/missing");
    let calls = request_calls.clone();
    builder.add_request_hook(move |request| {
        calls.fetch_add(1, Ordering::SeqCst);
        request.headers_mut().insert(
            "x-hooked",
            http::HeaderValue::from_static("yes"),
        );
    });
    let status = response_status.clone();
    builder.add_response_hook(move |response| {
        status.store(response.status().as_u16() as usize, Ordering::SeqCst);
    });

    // 非 2xx 响应原样返回给调用方
    let response = client.execute(&builder).await.expect("request failed");
    assert_eq!(response.status(), 404);

    assert_eq!(request_calls.load(Ordering::SeqCst), 1);
    assert_eq!(response_status.load(Ordering::SeqCst), 404);
    let requests = received_at(&server, "/missing").await;
    assert_eq!(
        requests[0].headers.get("x-hooked").and_then(|v| v.to_str().ok()),
        Some("yes")
    );
}

/// 测试：请求在多个下游之间轮询
#[tokio::test]
async fn test_requests_round_robin_across_servers() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    for server in [&first, &second] {
        // 析构时校验每个下游恰好收到两次请求
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(server)
            .await;
    }
    let client = client_for(&[&first, &second]).await;
    let builder = RequestBuilder::new("rr", Method::GET, "/ping");

    for _ in 0..4 {
        client.execute(&builder).await.expect("request failed");
    }

    assert_eq!(received_at(&first, "/ping").await.len(), 2);
    assert_eq!(received_at(&second, "/ping").await.len(), 2);
}

/// 测试：下游不可达时返回 Request 错误
#[tokio::test]
async fn test_transport_error_is_request_error() {
    let lb = round_robin(Arc::new(StaticPublisher::new(vec![Endpoint::http(
        "127.0.0.1",
        1,
    )])))
    .await
    .expect("Failed to create load balancer");
    let client = ServiceClient::new("unreachable", lb).expect("Failed to create client");

    let result = client
        .execute(&RequestBuilder::new("x", Method::GET, "/"))
        .await;
    assert!(matches!(result, Err(BeaconError::Request(_))));
}

/// 测试：停止客户端会停止负载均衡器
#[tokio::test]
async fn test_stop_releases_load_balancer() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let client = client_for(&[&server]).await;
    assert_eq!(client.service_name(), "downstream");

    client.stop();
    let result = client
        .execute(&RequestBuilder::new("x", Method::GET, "/"))
        .await;
    assert!(matches!(result, Err(BeaconError::CacheStopped)));
}
