use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::routing::post;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;
use webhook_relay::application::context::AppContext;
use webhook_relay::application::usecases::delivery_worker::DeliveryWorkerPool;
use webhook_relay::config::Settings;
use webhook_relay::domain::services::signer;
use webhook_relay::infrastructure::db::repositories::Repositories;
use webhook_relay::infrastructure::http::ReqwestTransport;
use webhook_relay::infrastructure::queue::InProcessQueue;
use webhook_relay::interface::http;
use webhook_relay::interface::http::state::AppState;

#[derive(Clone, Default)]
struct Receiver {
    statuses: Arc<Mutex<VecDeque<StatusCode>>>,
    received: Arc<Mutex<Vec<(HeaderMap, Bytes)>>>,
}

impl Receiver {
    fn requests(&self) -> Vec<(HeaderMap, Bytes)> {
        self.received.lock().unwrap().clone()
    }
}

async fn receive(State(receiver): State<Receiver>, headers: HeaderMap, body: Bytes) -> StatusCode {
    receiver.received.lock().unwrap().push((headers, body));
    receiver
        .statuses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or(StatusCode::OK)
}

async fn spawn_webhook_server(statuses: &[StatusCode]) -> (String, Receiver) {
    let receiver = Receiver::default();
    receiver.statuses.lock().unwrap().extend(statuses.iter().copied());
    let app = Router::new()
        .route("/hook", post(receive))
        .with_state(receiver.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/hook"), receiver)
}

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.webhook_delivery.allow_private_hosts = true;
    settings.webhook_delivery.backoff_initial_ms = 0;
    settings.webhook_delivery.jitter_ms = 0;
    settings.webhook_delivery.request_timeout_ms = 2_000;
    settings.webhook_delivery.worker_count = 2;
    settings
}

struct Relay {
    state: AppState,
    shutdown: tokio::sync::watch::Sender<bool>,
}

fn start_relay() -> Relay {
    let settings = settings();
    let (queue, receiver) = InProcessQueue::new();
    let transport = ReqwestTransport::new(&settings.webhook_delivery.user_agent).unwrap();
    let workers = settings.webhook_delivery.worker_count;
    let ctx = Arc::new(AppContext::new(
        Repositories::in_memory(),
        settings,
        Arc::new(queue),
        Arc::new(transport),
    ));
    let (shutdown, shutdown_rx) = tokio::sync::watch::channel(false);
    DeliveryWorkerPool::new(ctx.clone(), receiver, workers).start(shutdown_rx);

    Relay {
        state: AppState { ctx, metrics: None },
        shutdown,
    }
}

async fn call(state: &AppState, method: &str, uri: &str, owner: &str, body: Option<Value>) -> Value {
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
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

async fn wait_for_status(state: &AppState, owner: &str, status: &str, expected: u64) -> Value {
    for _ in 0..100 {
        let page = call(state, "GET", &format!("/deliveries?status={status}"), owner, None).await;
        if page["total"].as_u64() == Some(expected) {
            return page;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("no {status} deliveries after waiting");
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).unwrap().to_str().unwrap()
}

#[tokio::test]
async fn given_receiver_failing_once_when_event_dispatched_should_retry_and_deliver_signed_payloads() {
    let (url, receiver) = spawn_webhook_server(&[StatusCode::INTERNAL_SERVER_ERROR]).await;
    let relay = start_relay();
    let owner = uuid::Uuid::new_v4().to_string();
    let endpoint = call(
        &relay.state,
        "POST",
        "/endpoints",
        &owner,
        Some(json!({"name": "local", "url": url, "events": ["application.status_changed"]})),
    )
    .await;
    let secret = endpoint["secret"].as_str().unwrap().to_string();

    call(
        &relay.state,
        "POST",
        "/events",
        &owner,
        Some(json!({
            "event_type": "application.status_changed",
            "payload": {"application_id": 11, "status": "offer"},
        })),
    )
    .await;
    wait_for_status(&relay.state, &owner, "success", 1).await;
    let failed = wait_for_status(&relay.state, &owner, "failed", 1).await;

    let requests = receiver.requests();
    assert_eq!(requests.len(), 2);
    for (number, (headers, body)) in requests.iter().enumerate() {
        assert!(signer::verify(body, secret.as_bytes(), header(headers, "x-webhook-signature")));
        assert_eq!(header(headers, "x-webhook-event"), "application.status_changed");
        assert_eq!(header(headers, "x-webhook-attempt"), (number + 1).to_string());
    }
    assert_eq!(
        header(&requests[0].0, "x-webhook-event-id"),
        header(&requests[1].0, "x-webhook-event-id")
    );
    assert_ne!(
        header(&requests[0].0, "x-webhook-delivery-id"),
        header(&requests[1].0, "x-webhook-delivery-id")
    );
    let body: Value = serde_json::from_slice(&requests[1].1).unwrap();
    assert_eq!(body["data"]["status"], "offer");
    assert_eq!(failed["items"][0]["http_status_code"], 500);

    let _ = relay.shutdown.send(true);
}

#[tokio::test]
async fn given_receiver_rejecting_when_event_dispatched_should_not_retry() {
    let (url, receiver) = spawn_webhook_server(&[StatusCode::GONE]).await;
    let relay = start_relay();
    let owner = uuid::Uuid::new_v4().to_string();
    let endpoint = call(
        &relay.state,
        "POST",
        "/endpoints",
        &owner,
        Some(json!({"name": "gone", "url": url, "events": ["company.created"]})),
    )
    .await;

    call(
        &relay.state,
        "POST",
        "/events",
        &owner,
        Some(json!({"event_type": "company.created", "payload": {"company_id": 5}})),
    )
    .await;
    let failed = wait_for_status(&relay.state, &owner, "failed", 1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(receiver.requests().len(), 1);
    assert_eq!(failed["items"][0]["error_kind"], "http_status");
    let id = endpoint["id"].as_str().unwrap();
    let details = call(&relay.state, "GET", &format!("/endpoints/{id}"), &owner, None).await;
    assert_eq!(details["failure_count"], 1);
    assert_eq!(details["stats"]["failed_24h"], 1);

    let _ = relay.shutdown.send(true);
}

#[tokio::test]
async fn given_failed_delivery_when_retried_manually_should_deliver_new_chain() {
    let (url, receiver) = spawn_webhook_server(&[StatusCode::BAD_REQUEST]).await;
    let relay = start_relay();
    let owner = uuid::Uuid::new_v4().to_string();
    call(
        &relay.state,
        "POST",
        "/endpoints",
        &owner,
        Some(json!({"name": "flaky", "url": url, "events": ["interview.completed"]})),
    )
    .await;
    call(
        &relay.state,
        "POST",
        "/events",
        &owner,
        Some(json!({"event_type": "interview.completed", "payload": {"interview_id": 9}})),
    )
    .await;
    let failed = wait_for_status(&relay.state, &owner, "failed", 1).await;
    let failed_id = failed["items"][0]["id"].as_str().unwrap();

    let replay = call(
        &relay.state,
        "POST",
        &format!("/deliveries/{failed_id}/retry"),
        &owner,
        None,
    )
    .await;
    wait_for_status(&relay.state, &owner, "success", 1).await;

    let requests = receiver.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(replay["attempt_number"], 1);
    assert_ne!(replay["event_id"], failed["items"][0]["event_id"]);
    let body: Value = serde_json::from_slice(&requests[1].1).unwrap();
    assert_eq!(body["data"]["interview_id"], 9);

    let _ = relay.shutdown.send(true);
}
