#![cfg(feature = "cli")]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use ollama_gateway::{
    build_router, AppState, Config, MetricsAggregator, OllamaClient, OllamaGateway,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn router_for(base_url: &str) -> (Router, Arc<MetricsAggregator>) {
    let metrics = Arc::new(MetricsAggregator::new());
    let client = OllamaClient::new(base_url, Duration::from_secs(10)).unwrap();
    let gateway = Arc::new(OllamaGateway::with_clients(
        client.clone(),
        client,
        Duration::from_secs(10),
        metrics.clone(),
    ));
    let cfg = Config {
        ollama_base_url: base_url.to_string(),
        ..Default::default()
    };
    (build_router(AppState::new(gateway), &cfg), metrics)
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn blank_prompt_is_rejected() {
    let server = mockito::Server::new_async().await;
    let (router, metrics) = router_for(&server.url());

    let (status, body) = send(router, post_json("/api/chat/generate", json!({"prompt": "  "}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Prompt is required");
    assert!(metrics.snapshot().endpoints.is_empty());
}

#[tokio::test]
async fn generate_wraps_upstream_reply() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_body(json!({"model": "llama2", "response": "pong", "done": true}).to_string())
        .create_async()
        .await;
    let (router, metrics) = router_for(&server.url());

    let (status, body) = send(router, post_json("/api/chat/generate", json!({"prompt": "ping"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["response"], "pong");
    assert_eq!(metrics.snapshot().usage["llama2"], 1);
}

#[tokio::test]
async fn model_manager_pull_accepts_camel_case_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/pull")
        .with_status(200)
        .with_body("{\"status\":\"success\"}\n")
        .create_async()
        .await;
    let (router, _) = router_for(&server.url());

    let (status, body) = send(
        router,
        post_json("/api/modelmanager/pull", json!({"modelName": "llama3"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], true);
}

#[tokio::test]
async fn chat_pull_with_blank_name_is_rejected() {
    let server = mockito::Server::new_async().await;
    let (router, _) = router_for(&server.url());

    let (status, body) = send(router, post_json("/api/chat/pull-model", json!(""))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Model name is required");
}

#[tokio::test]
async fn list_route_returns_sorted_catalog() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(json!({"models": [{"name": "b", "size": 1}, {"name": "a", "size": 2048}]}).to_string())
        .create_async()
        .await;
    let (router, _) = router_for(&server.url());

    let (status, body) = send(router, get("/api/modelmanager/list")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "a");
    assert_eq!(body["data"][0]["size"], "2 KB");
    assert_eq!(body["data"][1]["name"], "b");
}

#[tokio::test]
async fn delete_route_reports_status_and_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", "/api/delete")
        .with_status(404)
        .with_body("not found")
        .create_async()
        .await;
    let (router, _) = router_for(&server.url());

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/modelmanager/ghost")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("404"), "{}", error);
    assert!(error.contains("not found"), "{}", error);
}

#[tokio::test]
async fn health_reports_unavailable_upstream() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/").with_status(500).create_async().await;
    let (router, _) = router_for(&server.url());

    let (status, body) = send(router, get("/api/health")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "Unhealthy");
    assert_eq!(body["ollama"], "Disconnected");
}

#[tokio::test]
async fn metrics_routes_expose_aggregated_stats() {
    let server = mockito::Server::new_async().await;
    let (router, metrics) = router_for(&server.url());
    for ms in [10.0, 20.0, 30.0] {
        metrics.record_latency("chat/generate", ms);
    }
    metrics.record_usage("llama2", 7);

    let (status, body) = send(router.clone(), get("/api/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"]["chat/generate"]["count"], 3);
    assert_eq!(body["usage"]["llama2"], 7);

    let (status, body) = send(router, get("/api/metrics/summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_requests"], 3);
    assert_eq!(body["total_model_usage"], 7);
}
