use crate::interface::http::state::AppState;
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Serialize)]
struct ReadyResponse {
    status: &'static str,
}

/// Builds the readiness route.
pub fn router() -> Router<AppState> {
    Router::new().route("/ready", get(ready))
}

async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.ctx.repos.ping().await {
        Ok(()) => (StatusCode::OK, Json(ReadyResponse { status: "ready" })),
        Err(e) => {
            warn!(error = %e, "readiness_check_failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    status: "not_ready",
                }),
            )
        }
    }
}
