// HTTP routes: delivery attempt history and manual retry.

use crate::application::usecases::get_delivery_attempt::{
    GetDeliveryAttemptError, GetDeliveryAttemptUseCase,
};
use crate::application::usecases::list_delivery_attempts::{
    ListDeliveryAttemptsError, ListDeliveryAttemptsQuery, ListDeliveryAttemptsUseCase,
};
use crate::application::usecases::retry_delivery::{RetryDeliveryError, RetryDeliveryUseCase};
use crate::domain::value_objects::ids::{AttemptId, EndpointId, OwnerId};
use crate::interface::http::dto::delivery::{
    DeliveryAttemptResponse, DeliveryListQuery, DeliveryListResponse,
};
use crate::interface::http::problem::{
    WHR_DELIVERY_CONFLICT, WHR_DELIVERY_NOT_FOUND, WHR_REQUEST_MALFORMED, WHR_VALIDATION_FAILED,
    problem, storage_unavailable,
};
use crate::interface::http::state::AppState;
use crate::interface::http::trace::TraceId;
use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};

/// Builds the delivery history routes.
pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/deliveries", get(list_deliveries))
        .route("/deliveries/:attempt_id", get(get_delivery))
        .route("/deliveries/:attempt_id/retry", post(retry_delivery))
}

fn malformed(detail: &str, trace_id: &TraceId) -> Response {
    problem(
        StatusCode::BAD_REQUEST,
        WHR_REQUEST_MALFORMED,
        Some(detail.to_string()),
        None,
        trace_id.value(),
    )
}

fn parse_attempt_id(raw: &str, trace_id: &TraceId) -> Result<AttemptId, Response> {
    uuid::Uuid::parse_str(raw)
        .map(AttemptId)
        .map_err(|_| malformed("invalid attempt_id", trace_id))
}

fn delivery_not_found(attempt_id: AttemptId, trace_id: &TraceId) -> Response {
    problem(
        StatusCode::NOT_FOUND,
        WHR_DELIVERY_NOT_FOUND,
        Some("delivery attempt not found".to_string()),
        Some(format!("/deliveries/{attempt_id}")),
        trace_id.value(),
    )
}

/// Lists attempts newest first, filtered by endpoint, status and event type.
async fn list_deliveries(
    State(state): State<AppState>,
    Extension(owner_id): Extension<OwnerId>,
    Extension(trace_id): Extension<TraceId>,
    query: Result<Query<DeliveryListQuery>, QueryRejection>,
) -> Response {
    // Step 1: Parse the query string.
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return malformed(&rejection.body_text(), &trace_id),
    };
    let endpoint_id = match query.endpoint_id.as_deref().map(uuid::Uuid::parse_str) {
        None => None,
        Some(Ok(id)) => Some(EndpointId(id)),
        Some(Err(_)) => return malformed("invalid endpoint_id", &trace_id),
    };

    // Step 2: Execute the use case.
    let result = ListDeliveryAttemptsUseCase::execute(
        &state.ctx,
        owner_id,
        ListDeliveryAttemptsQuery {
            endpoint_id,
            status: query.status,
            event_type: query.event_type,
            page: query.page,
            page_size: query.page_size,
        },
    )
    .await;

    // Step 3: Map output to HTTP response.
    match result {
        Ok(page) => (
            StatusCode::OK,
            Json(DeliveryListResponse {
                items: page.items.iter().map(DeliveryAttemptResponse::summary).collect(),
                total: page.total,
                page: page.page,
                page_size: page.page_size,
            }),
        )
            .into_response(),
        Err(ListDeliveryAttemptsError::Validation(detail)) => problem(
            StatusCode::UNPROCESSABLE_ENTITY,
            WHR_VALIDATION_FAILED,
            Some(detail),
            None,
            trace_id.value(),
        ),
        Err(ListDeliveryAttemptsError::Storage(_)) => storage_unavailable(trace_id.value()),
    }
}

async fn get_delivery(
    State(state): State<AppState>,
    Extension(owner_id): Extension<OwnerId>,
    Extension(trace_id): Extension<TraceId>,
    Path(attempt_id): Path<String>,
) -> Response {
    let attempt_id = match parse_attempt_id(&attempt_id, &trace_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match GetDeliveryAttemptUseCase::execute(&state.ctx, owner_id, attempt_id).await {
        Ok(attempt) => (StatusCode::OK, Json(DeliveryAttemptResponse::detail(&attempt))).into_response(),
        Err(GetDeliveryAttemptError::NotFound) => delivery_not_found(attempt_id, &trace_id),
        Err(GetDeliveryAttemptError::Storage(_)) => storage_unavailable(trace_id.value()),
    }
}

/// Replays a failed delivery as a new chain and returns its first attempt.
async fn retry_delivery(
    State(state): State<AppState>,
    Extension(owner_id): Extension<OwnerId>,
    Extension(trace_id): Extension<TraceId>,
    Path(attempt_id): Path<String>,
) -> Response {
    let attempt_id = match parse_attempt_id(&attempt_id, &trace_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match RetryDeliveryUseCase::execute(&state.ctx, owner_id, attempt_id).await {
        Ok(attempt) => (
            StatusCode::ACCEPTED,
            Json(DeliveryAttemptResponse::summary(&attempt)),
        )
            .into_response(),
        Err(RetryDeliveryError::NotFound) => delivery_not_found(attempt_id, &trace_id),
        Err(RetryDeliveryError::Conflict(detail)) => problem(
            StatusCode::CONFLICT,
            WHR_DELIVERY_CONFLICT,
            Some(detail),
            Some(format!("/deliveries/{attempt_id}")),
            trace_id.value(),
        ),
        Err(RetryDeliveryError::Storage(_)) => storage_unavailable(trace_id.value()),
    }
}
