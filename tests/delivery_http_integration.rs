use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
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

// Attempts stay pending: nothing drains the receiver.
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

async fn send(
    state: &AppState,
    method: &str,
    uri: &str,
    owner: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Owner-Id", owner);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = http::app(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn register(state: &AppState, owner: &str, events: Value) -> String {
    let (status, json) = send(
        state,
        "POST",
        "/endpoints",
        owner,
        Some(json!({"name": "receiver", "url": "https://hooks.example.com/in", "events": events})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn given_subscribed_endpoints_when_event_posted_should_create_one_attempt_each() {
    let (state, _receiver) = state();
    let owner = uuid::Uuid::new_v4().to_string();
    register(&state, &owner, json!(["application.created"])).await;
    register(&state, &owner, json!(["application.created", "company.created"])).await;
    register(&state, &owner, json!(["company.created"])).await;

    let (status, json) = send(
        &state,
        "POST",
        "/events",
        &owner,
        Some(json!({"event_type": "application.created", "payload": {"application_id": 7}})),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["attempt_ids"].as_array().unwrap().len(), 2);
    assert!(json["event_id"].is_string());
}

#[tokio::test]
async fn given_bad_events_when_posted_should_reject() {
    let (state, _receiver) = state();
    let owner = uuid::Uuid::new_v4().to_string();
    let other = uuid::Uuid::new_v4().to_string();

    let (unknown, unknown_body) = send(
        &state,
        "POST",
        "/events",
        &owner,
        Some(json!({"event_type": "job.created"})),
    )
    .await;
    let (foreign, foreign_body) = send(
        &state,
        "POST",
        "/events",
        &owner,
        Some(json!({"event_type": "company.created", "tenant_id": other})),
    )
    .await;

    assert_eq!(unknown, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(unknown_body["code"], "WHR_VALIDATION_FAILED");
    assert_eq!(foreign, StatusCode::FORBIDDEN);
    assert_eq!(foreign_body["code"], "WHR_AUTH_FORBIDDEN");
}

#[tokio::test]
async fn given_dispatched_event_when_listing_deliveries_should_filter_and_show_detail() {
    let (state, _receiver) = state();
    let owner = uuid::Uuid::new_v4().to_string();
    let endpoint_id = register(&state, &owner, json!(["interview.created"])).await;
    let (_, dispatched) = send(
        &state,
        "POST",
        "/events",
        &owner,
        Some(json!({"event_type": "interview.created", "payload": {"interview_id": 3}})),
    )
    .await;
    let attempt_id = dispatched["attempt_ids"][0].as_str().unwrap().to_string();

    let (list_status, list) = send(
        &state,
        "GET",
        &format!("/deliveries?endpoint_id={endpoint_id}&status=pending"),
        &owner,
        None,
    )
    .await;
    let (_, none_failed) = send(&state, "GET", "/deliveries?status=failed", &owner, None).await;
    let (detail_status, detail) =
        send(&state, "GET", &format!("/deliveries/{attempt_id}"), &owner, None).await;
    let (bad_status, _) = send(&state, "GET", "/deliveries?status=lost", &owner, None).await;

    assert_eq!(list_status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["items"][0]["id"], attempt_id.as_str());
    assert!(list["items"][0].get("payload").is_none());
    assert_eq!(none_failed["total"], 0);
    assert_eq!(detail_status, StatusCode::OK);
    assert_eq!(detail["attempt_number"], 1);
    assert_eq!(detail["payload"]["data"]["interview_id"], 3);
    assert!(detail["signature"].is_null());
    assert_eq!(bad_status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn given_pending_attempt_when_retried_should_conflict() {
    let (state, _receiver) = state();
    let owner = uuid::Uuid::new_v4().to_string();
    register(&state, &owner, json!(["company.created"])).await;
    let (_, dispatched) = send(
        &state,
        "POST",
        "/events",
        &owner,
        Some(json!({"event_type": "company.created"})),
    )
    .await;
    let attempt_id = dispatched["attempt_ids"][0].as_str().unwrap().to_string();

    let (status, problem) = send(
        &state,
        "POST",
        &format!("/deliveries/{attempt_id}/retry"),
        &owner,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(problem["code"], "WHR_DELIVERY_CONFLICT");
}

#[tokio::test]
async fn given_other_owner_when_reading_attempt_should_return_not_found() {
    let (state, _receiver) = state();
    let owner = uuid::Uuid::new_v4().to_string();
    let intruder = uuid::Uuid::new_v4().to_string();
    register(&state, &owner, json!(["company.created"])).await;
    let (_, dispatched) = send(
        &state,
        "POST",
        "/events",
        &owner,
        Some(json!({"event_type": "company.created"})),
    )
    .await;
    let attempt_id = dispatched["attempt_ids"][0].as_str().unwrap().to_string();

    let (status, problem) =
        send(&state, "GET", &format!("/deliveries/{attempt_id}"), &intruder, None).await;
    let (_, list) = send(&state, "GET", "/deliveries", &intruder, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["code"], "WHR_DELIVERY_NOT_FOUND");
    assert_eq!(list["total"], 0);
}
