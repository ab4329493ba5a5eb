use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;
use webhook_relay::application::context::AppContext;
use webhook_relay::config::Settings;
use webhook_relay::infrastructure::db::repositories::Repositories;
use webhook_relay::infrastructure::http::{
    OutboundRequest, TransportError, TransportResponse, WebhookTransport,
};
use webhook_relay::infrastructure::queue::{InProcessQueue, QueueReceiver};
use webhook_relay::interface::http;
use webhook_relay::interface::http::state::AppState;

struct UnusedTransport;

#[async_trait]
impl WebhookTransport for UnusedTransport {
    async fn post(&self, _request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        Err(TransportError::Request("not used".to_string()))
    }
}

fn state() -> (AppState, QueueReceiver) {
    let (queue, receiver) = InProcessQueue::new();
    let ctx = AppContext::new(
        Repositories::in_memory(),
        Settings::default(),
        Arc::new(queue),
        Arc::new(UnusedTransport),
    );
    let state = AppState {
        ctx: Arc::new(ctx),
        metrics: None,
    };
    (state, receiver)
}

async fn get(state: AppState, uri: &str) -> axum::response::Response {
    http::app(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn given_no_owner_header_when_probing_health_and_ready_should_answer() {
    let (state, _receiver) = state();

    let health = get(state.clone(), "/health").await;
    let ready = get(state, "/ready").await;

    assert_eq!(health.status(), StatusCode::OK);
    assert!(health.headers().contains_key("x-request-id"));
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
async fn given_catalogue_request_when_listing_event_types_should_return_all_nine() {
    let (state, _receiver) = state();

    let response = get(state, "/event-types").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    let types: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["event_type"].as_str().unwrap())
        .collect();
    assert_eq!(types.len(), 9);
    assert!(types.contains(&"application.status_changed"));
}

#[tokio::test]
async fn given_metrics_disabled_when_scraped_should_be_unavailable() {
    let (state, _receiver) = state();

    let response = get(state, "/metrics").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
