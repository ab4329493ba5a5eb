use crate::interface::http::state::AppState;
use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: String,
}

/// Liveness only. Storage reachability is `/ready`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: state.ctx.settings.observability.service_name.clone(),
    })
}
