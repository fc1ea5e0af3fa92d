use std::sync::Arc;
use std::time::Duration;

use mockito::Matcher;
use ollama_gateway::{
    ChatRequest, MetricsAggregator, OllamaClient, OllamaGateway,
};
use serde_json::json;

fn gateway_for(base_url: &str) -> (OllamaGateway, Arc<MetricsAggregator>) {
    let metrics = Arc::new(MetricsAggregator::new());
    let client = OllamaClient::new(base_url, Duration::from_secs(10)).unwrap();
    let gateway = OllamaGateway::with_clients(
        client.clone(),
        client,
        Duration::from_secs(10),
        metrics.clone(),
    );
    (gateway, metrics)
}

#[tokio::test]
async fn list_models_is_sorted_and_normalized() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(
            json!({
                "models": [
                    {"name": "mistral", "size": 4109865159u64, "modified_at": "2024-05-01T10:00:00Z"},
                    {"name": "codellama", "size": "1536", "modified_at": "not-a-date"},
                    {"size": 10}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let (gateway, metrics) = gateway_for(&server.url());
    let result = gateway.list_models().await;

    assert!(result.success);
    let models = result.data.unwrap();
    let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Unknown", "codellama", "mistral"]);
    assert_eq!(models[1].size, "1.5 KB");
    assert!(models[1].modified_at_estimated);
    assert_eq!(models[2].size, "3.83 GB");
    assert!(!models[2].modified_at_estimated);
    assert_eq!(metrics.snapshot().endpoints["models/list"].count, 1);
}

#[tokio::test]
async fn list_models_failure_carries_status_and_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(503)
        .with_body("loading")
        .create_async()
        .await;

    let (gateway, _) = gateway_for(&server.url());
    let result = gateway.list_models().await;

    assert!(!result.success);
    assert!(result.data.is_none());
    assert_eq!(
        result.error.as_deref(),
        Some("Failed to fetch models: 503 Service Unavailable - loading")
    );
}

#[tokio::test]
async fn generate_records_latency_and_usage() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({
            "model": "llama2",
            "prompt": "hi",
            "stream": false,
            "options": {"temperature": 0.7, "num_predict": 1000}
        })))
        .with_status(200)
        .with_body(json!({"model": "llama2", "response": "Hello there!", "done": true}).to_string())
        .create_async()
        .await;

    let (gateway, metrics) = gateway_for(&server.url());
    let request: ChatRequest =
        serde_json::from_value(json!({"prompt": "hi", "options": {}})).unwrap();
    let result = gateway.generate(&request).await;

    mock.assert_async().await;
    assert!(result.success);
    assert_eq!(result.data.unwrap().response, "Hello there!");

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.endpoints["chat/generate"].count, 1);
    assert_eq!(snapshot.usage["llama2"], 3);
}

#[tokio::test]
async fn generate_failure_does_not_record_usage() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/generate")
        .with_status(404)
        .with_body("model 'ghost' not found")
        .create_async()
        .await;

    let (gateway, metrics) = gateway_for(&server.url());
    let request: ChatRequest =
        serde_json::from_value(json!({"model": "ghost", "prompt": "hi"})).unwrap();
    let result = gateway.generate(&request).await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("API Error: 404 Not Found - model 'ghost' not found")
    );
    let snapshot = metrics.snapshot();
    assert!(snapshot.usage.is_empty());
    assert_eq!(snapshot.endpoints["chat/generate"].count, 1);
}

#[tokio::test]
async fn pull_reports_progress_through_hook() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/pull")
        .with_status(200)
        .with_body("{\"status\":\"pulling manifest\"}\n{\"status\":\"success\"}\n")
        .create_async()
        .await;

    let (gateway, metrics) = gateway_for(&server.url());
    let mut seen = Vec::new();
    let result = gateway.pull_model("llama3", |s| seen.push(s.to_string())).await;

    assert!(result.success);
    assert_eq!(result.data, Some(true));
    assert_eq!(
        seen,
        vec![
            "Starting download of llama3...",
            "pulling manifest",
            "success",
            "Successfully downloaded llama3",
        ]
    );
    assert_eq!(metrics.snapshot().endpoints["models/pull"].count, 1);
}

#[tokio::test]
async fn pull_upstream_failure_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/pull")
        .with_status(404)
        .with_body("model not found")
        .create_async()
        .await;

    let (gateway, _) = gateway_for(&server.url());
    let mut seen = Vec::new();
    let result = gateway.pull_model("ghost", |s| seen.push(s.to_string())).await;

    assert!(!result.success);
    assert_eq!(result.data, Some(false));
    assert_eq!(
        result.error.as_deref(),
        Some("Pull failed: 404 Not Found - model not found")
    );
    assert_eq!(seen, vec!["Starting download of ghost..."]);
}

#[tokio::test]
async fn delete_failure_embeds_status_and_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", "/api/delete")
        .match_body(Matcher::Json(json!({"name": "ghost"})))
        .with_status(404)
        .with_body("{\"error\":\"model 'ghost' not found\"}")
        .create_async()
        .await;

    let (gateway, _) = gateway_for(&server.url());
    let result = gateway.delete_model("ghost").await;

    assert!(!result.success);
    assert_eq!(result.data, Some(false));
    assert_eq!(
        result.error.as_deref(),
        Some("Delete failed: 404 Not Found - {\"error\":\"model 'ghost' not found\"}")
    );
}

#[tokio::test]
async fn details_are_normalized() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/show")
        .match_body(Matcher::Json(json!({"name": "llama3"})))
        .with_status(200)
        .with_body(
            json!({
                "modified_at": "2024-05-01T10:00:00Z",
                "details": {
                    "format": "gguf",
                    "family": "llama",
                    "parameters": {"num_ctx": 4096}
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let (gateway, _) = gateway_for(&server.url());
    let details = gateway.model_details("llama3").await.data.unwrap();

    assert_eq!(details.name, "llama3");
    assert_eq!(details.format, "gguf");
    assert_eq!(details.family, "llama");
    assert_eq!(details.parameters, vec!["num_ctx: 4096"]);
    assert!(!details.modified_at_estimated);
}

#[tokio::test]
async fn availability_is_case_insensitive() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(json!({"models": [{"name": "Llama3:latest", "size": 1}]}).to_string())
        .expect(2)
        .create_async()
        .await;

    let (gateway, _) = gateway_for(&server.url());
    assert_eq!(gateway.is_model_available("llama3:LATEST").await.data, Some(true));
    assert_eq!(gateway.is_model_available("mistral").await.data, Some(false));
}

#[tokio::test]
async fn health_probe_follows_upstream_status() {
    let mut server = mockito::Server::new_async().await;
    let up = server
        .mock("GET", "/")
        .with_status(200)
        .with_body("Ollama is running")
        .create_async()
        .await;

    let (gateway, _) = gateway_for(&server.url());
    assert!(gateway.is_healthy().await);
    up.remove_async().await;

    server.mock("GET", "/").with_status(500).create_async().await;
    assert!(!gateway.is_healthy().await);
}
