// HTTP routes: webhook endpoint registry.

use crate::application::usecases::delete_endpoint::{DeleteEndpointError, DeleteEndpointUseCase};
use crate::application::usecases::get_endpoint::{GetEndpointError, GetEndpointUseCase};
use crate::application::usecases::list_endpoints::ListEndpointsUseCase;
use crate::application::usecases::register_endpoint::{
    RegisterEndpointCommand, RegisterEndpointError, RegisterEndpointUseCase,
};
use crate::application::usecases::rotate_secret::{RotateSecretError, RotateSecretUseCase};
use crate::application::usecases::send_test_webhook::{
    SendTestWebhookError, SendTestWebhookUseCase,
};
use crate::application::usecases::update_endpoint::{
    UpdateEndpointCommand, UpdateEndpointError, UpdateEndpointUseCase,
};
use crate::domain::value_objects::ids::{EndpointId, OwnerId};
use crate::interface::http::dto::endpoint::{
    EndpointDetailResponse, EndpointResponse, EndpointWithSecretResponse,
    RegisterEndpointRequest, TestWebhookRequest, TestWebhookResponse, UpdateEndpointRequest,
};
use crate::interface::http::problem::{
    WHR_ENDPOINT_NOT_FOUND, WHR_ENDPOINT_URL_REJECTED, WHR_REQUEST_MALFORMED,
    WHR_VALIDATION_FAILED, problem, storage_unavailable,
};
use crate::interface::http::state::AppState;
use crate::interface::http::trace::TraceId;
use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};

/// Builds the endpoint registry routes.
pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/endpoints", post(register_endpoint).get(list_endpoints))
        .route(
            "/endpoints/:endpoint_id",
            get(get_endpoint)
                .patch(update_endpoint)
                .delete(delete_endpoint),
        )
        .route("/endpoints/:endpoint_id/rotate-secret", post(rotate_secret))
        .route("/endpoints/:endpoint_id/test", post(send_test_webhook))
}

fn parse_endpoint_id(raw: &str, trace_id: &TraceId) -> Result<EndpointId, Response> {
    uuid::Uuid::parse_str(raw).map(EndpointId).map_err(|_| {
        problem(
            StatusCode::BAD_REQUEST,
            WHR_REQUEST_MALFORMED,
            Some("invalid endpoint_id".to_string()),
            None,
            trace_id.value(),
        )
    })
}

fn endpoint_not_found(endpoint_id: EndpointId, trace_id: &TraceId) -> Response {
    problem(
        StatusCode::NOT_FOUND,
        WHR_ENDPOINT_NOT_FOUND,
        Some("endpoint not found".to_string()),
        Some(format!("/endpoints/{endpoint_id}")),
        trace_id.value(),
    )
}

fn unprocessable(code: &str, detail: String, trace_id: &TraceId) -> Response {
    problem(
        StatusCode::UNPROCESSABLE_ENTITY,
        code,
        Some(detail),
        None,
        trace_id.value(),
    )
}

fn malformed_body(rejection: JsonRejection, trace_id: &TraceId) -> Response {
    problem(
        StatusCode::BAD_REQUEST,
        WHR_REQUEST_MALFORMED,
        Some(rejection.body_text()),
        None,
        trace_id.value(),
    )
}

/// Registers an endpoint and returns it with its signing secret.
async fn register_endpoint(
    State(state): State<AppState>,
    Extension(owner_id): Extension<OwnerId>,
    Extension(trace_id): Extension<TraceId>,
    payload: Result<Json<RegisterEndpointRequest>, JsonRejection>,
) -> Response {
    // Step 1: Parse the body.
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed_body(rejection, &trace_id),
    };

    // Step 2: Execute the use case.
    let result = RegisterEndpointUseCase::execute(
        &state.ctx,
        RegisterEndpointCommand {
            owner_id,
            name: payload.name,
            url: payload.url,
            events: payload.events,
            is_active: payload.is_active,
        },
    )
    .await;

    // Step 3: Map output to HTTP response.
    match result {
        Ok(endpoint) => (
            StatusCode::CREATED,
            Json(EndpointWithSecretResponse::from(&endpoint)),
        )
            .into_response(),
        Err(RegisterEndpointError::Validation(detail)) => {
            unprocessable(WHR_VALIDATION_FAILED, detail, &trace_id)
        }
        Err(RegisterEndpointError::Configuration(e)) => {
            unprocessable(WHR_ENDPOINT_URL_REJECTED, e.to_string(), &trace_id)
        }
        Err(RegisterEndpointError::Storage(_)) => storage_unavailable(trace_id.value()),
    }
}

async fn list_endpoints(
    State(state): State<AppState>,
    Extension(owner_id): Extension<OwnerId>,
    Extension(trace_id): Extension<TraceId>,
) -> Response {
    match ListEndpointsUseCase::execute(&state.ctx, owner_id).await {
        Ok(endpoints) => {
            let body: Vec<EndpointResponse> = endpoints.iter().map(EndpointResponse::from).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(_) => storage_unavailable(trace_id.value()),
    }
}

/// Returns one endpoint with its 24h delivery counts.
async fn get_endpoint(
    State(state): State<AppState>,
    Extension(owner_id): Extension<OwnerId>,
    Extension(trace_id): Extension<TraceId>,
    Path(endpoint_id): Path<String>,
) -> Response {
    let endpoint_id = match parse_endpoint_id(&endpoint_id, &trace_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match GetEndpointUseCase::execute(&state.ctx, owner_id, endpoint_id).await {
        Ok(details) => (StatusCode::OK, Json(EndpointDetailResponse::from(&details))).into_response(),
        Err(GetEndpointError::NotFound) => endpoint_not_found(endpoint_id, &trace_id),
        Err(GetEndpointError::Storage(_)) => storage_unavailable(trace_id.value()),
    }
}

/// Applies a partial update. Setting `is_active: false` stops pending retries.
async fn update_endpoint(
    State(state): State<AppState>,
    Extension(owner_id): Extension<OwnerId>,
    Extension(trace_id): Extension<TraceId>,
    Path(endpoint_id): Path<String>,
    payload: Result<Json<UpdateEndpointRequest>, JsonRejection>,
) -> Response {
    // Step 1: Parse the path and body.
    let endpoint_id = match parse_endpoint_id(&endpoint_id, &trace_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed_body(rejection, &trace_id),
    };

    // Step 2: Execute the use case.
    let result = UpdateEndpointUseCase::execute(
        &state.ctx,
        owner_id,
        endpoint_id,
        UpdateEndpointCommand {
            name: payload.name,
            url: payload.url,
            events: payload.events,
            is_active: payload.is_active,
        },
    )
    .await;

    // Step 3: Map output to HTTP response.
    match result {
        Ok(endpoint) => (StatusCode::OK, Json(EndpointResponse::from(&endpoint))).into_response(),
        Err(UpdateEndpointError::NotFound) => endpoint_not_found(endpoint_id, &trace_id),
        Err(UpdateEndpointError::Validation(detail)) => {
            unprocessable(WHR_VALIDATION_FAILED, detail, &trace_id)
        }
        Err(UpdateEndpointError::Configuration(e)) => {
            unprocessable(WHR_ENDPOINT_URL_REJECTED, e.to_string(), &trace_id)
        }
        Err(UpdateEndpointError::Storage(_)) => storage_unavailable(trace_id.value()),
    }
}

async fn delete_endpoint(
    State(state): State<AppState>,
    Extension(owner_id): Extension<OwnerId>,
    Extension(trace_id): Extension<TraceId>,
    Path(endpoint_id): Path<String>,
) -> Response {
    let endpoint_id = match parse_endpoint_id(&endpoint_id, &trace_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match DeleteEndpointUseCase::execute(&state.ctx, owner_id, endpoint_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(DeleteEndpointError::NotFound) => endpoint_not_found(endpoint_id, &trace_id),
        Err(DeleteEndpointError::Storage(_)) => storage_unavailable(trace_id.value()),
    }
}

/// Issues a new secret. The old one stops being used immediately.
async fn rotate_secret(
    State(state): State<AppState>,
    Extension(owner_id): Extension<OwnerId>,
    Extension(trace_id): Extension<TraceId>,
    Path(endpoint_id): Path<String>,
) -> Response {
    let endpoint_id = match parse_endpoint_id(&endpoint_id, &trace_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match RotateSecretUseCase::execute(&state.ctx, owner_id, endpoint_id).await {
        Ok(endpoint) => (
            StatusCode::OK,
            Json(EndpointWithSecretResponse::from(&endpoint)),
        )
            .into_response(),
        Err(RotateSecretError::NotFound) => endpoint_not_found(endpoint_id, &trace_id),
        Err(RotateSecretError::Storage(_)) => storage_unavailable(trace_id.value()),
    }
}

/// Sends a signed sample payload and reports the receiver's answer. The body is optional.
async fn send_test_webhook(
    State(state): State<AppState>,
    Extension(owner_id): Extension<OwnerId>,
    Extension(trace_id): Extension<TraceId>,
    Path(endpoint_id): Path<String>,
    body: Bytes,
) -> Response {
    // Step 1: Parse the path and the optional body.
    let endpoint_id = match parse_endpoint_id(&endpoint_id, &trace_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let payload = if body.is_empty() {
        TestWebhookRequest::default()
    } else {
        match serde_json::from_slice::<TestWebhookRequest>(&body) {
            Ok(payload) => payload,
            Err(e) => {
                return problem(
                    StatusCode::BAD_REQUEST,
                    WHR_REQUEST_MALFORMED,
                    Some(e.to_string()),
                    None,
                    trace_id.value(),
                );
            }
        }
    };

    // Step 2: Execute and report.
    match SendTestWebhookUseCase::execute(&state.ctx, owner_id, endpoint_id, payload.event).await {
        Ok(result) => (StatusCode::OK, Json(TestWebhookResponse::from(result))).into_response(),
        Err(SendTestWebhookError::NotFound) => endpoint_not_found(endpoint_id, &trace_id),
        Err(SendTestWebhookError::Validation(detail)) => {
            unprocessable(WHR_VALIDATION_FAILED, detail, &trace_id)
        }
        Err(SendTestWebhookError::Storage(_)) => storage_unavailable(trace_id.value()),
    }
}
