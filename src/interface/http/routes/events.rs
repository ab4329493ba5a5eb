// HTTP routes: event catalogue and inbound dispatch.

use crate::application::usecases::dispatch_event::DispatchEventUseCase;
use crate::domain::entities::domain_event::DomainEvent;
use crate::domain::entities::event_type::EventType;
use crate::domain::value_objects::ids::{EventId, OwnerId};
use crate::domain::value_objects::timestamps::Timestamp;
use crate::interface::http::dto::event::{
    DispatchEventRequest, DispatchEventResponse, EventTypeResponse,
};
use crate::interface::http::problem::{
    WHR_AUTH_FORBIDDEN, WHR_REQUEST_MALFORMED, WHR_VALIDATION_FAILED, problem,
    storage_unavailable,
};
use crate::interface::http::state::AppState;
use crate::interface::http::trace::TraceId;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Builds the event routes.
pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/event-types", get(list_event_types))
        .route("/events", post(dispatch_event))
}

async fn list_event_types() -> Json<Vec<EventTypeResponse>> {
    Json(
        EventType::ALL
            .iter()
            .map(|e| EventTypeResponse {
                event_type: e.as_str(),
                description: e.description(),
            })
            .collect(),
    )
}

/// Accepts a domain event and fans it out to the caller's subscribed endpoints.
async fn dispatch_event(
    State(state): State<AppState>,
    Extension(owner_id): Extension<OwnerId>,
    Extension(trace_id): Extension<TraceId>,
    payload: Result<Json<DispatchEventRequest>, JsonRejection>,
) -> Response {
    let trace = trace_id.value();
    let malformed = |detail: String| {
        problem(
            StatusCode::BAD_REQUEST,
            WHR_REQUEST_MALFORMED,
            Some(detail),
            Some("/events".to_string()),
            trace.clone(),
        )
    };
    // Step 1: Parse the body.
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed(rejection.body_text()),
    };
    let event_type = match EventType::parse(payload.event_type.trim()) {
        Ok(event_type) => event_type,
        Err(e) => {
            return problem(
                StatusCode::UNPROCESSABLE_ENTITY,
                WHR_VALIDATION_FAILED,
                Some(e.to_string()),
                Some("/events".to_string()),
                trace.clone(),
            );
        }
    };

    // Step 2: Events are only dispatched for the calling tenant.
    if let Some(tenant) = payload.tenant_id.as_deref() {
        match uuid::Uuid::parse_str(tenant) {
            Ok(id) if OwnerId(id) == owner_id => {}
            Ok(_) => {
                return problem(
                    StatusCode::FORBIDDEN,
                    WHR_AUTH_FORBIDDEN,
                    Some("tenant_id does not match X-Owner-Id".to_string()),
                    Some("/events".to_string()),
                    trace.clone(),
                );
            }
            Err(_) => return malformed("invalid tenant_id".to_string()),
        }
    }

    // Step 3: Build the event, keeping producer-supplied identity when present.
    let mut event = DomainEvent::new(event_type, owner_id, payload.payload);
    if let Some(raw) = payload.event_id.as_deref() {
        match uuid::Uuid::parse_str(raw) {
            Ok(id) => event.event_id = EventId(id),
            Err(_) => return malformed("invalid event_id".to_string()),
        }
    }
    if let Some(raw) = payload.occurred_at.as_deref() {
        match OffsetDateTime::parse(raw, &Rfc3339) {
            Ok(at) => event.occurred_at = Timestamp::from(at),
            Err(_) => return malformed("invalid occurred_at timestamp".to_string()),
        }
    }

    // Step 4: Dispatch and report the created attempts.
    match DispatchEventUseCase::execute(&state.ctx, &event).await {
        Ok(ids) => (
            StatusCode::ACCEPTED,
            Json(DispatchEventResponse {
                event_id: event.event_id.to_string(),
                attempt_ids: ids.iter().map(|id| id.to_string()).collect(),
            }),
        )
            .into_response(),
        Err(_) => storage_unavailable(trace.clone()),
    }
}
