use crate::application::context::AppContext;
use crate::domain::entities::delivery_attempt::DeliveryAttempt;
use crate::domain::entities::webhook_endpoint::WebhookEndpoint;
use crate::domain::value_objects::ids::{AttemptId, EndpointId, OwnerId};

/// Records of other owners are reported exactly like missing ones.
#[derive(Debug)]
pub enum OwnedLookupError {
    NotFound,
    Storage(String),
}

pub async fn owned_endpoint(
    ctx: &AppContext,
    owner_id: OwnerId,
    endpoint_id: EndpointId,
) -> Result<WebhookEndpoint, OwnedLookupError> {
    let endpoint = ctx
        .repos
        .webhook_endpoint
        .get(endpoint_id)
        .await
        .map_err(|e| OwnedLookupError::Storage(format!("{e:?}")))?;

    match endpoint {
        Some(endpoint) if endpoint.owner_id == owner_id => Ok(endpoint),
        _ => Err(OwnedLookupError::NotFound),
    }
}

pub async fn owned_attempt(
    ctx: &AppContext,
    owner_id: OwnerId,
    attempt_id: AttemptId,
) -> Result<DeliveryAttempt, OwnedLookupError> {
    let attempt = ctx
        .repos
        .delivery_attempt
        .get(attempt_id)
        .await
        .map_err(|e| OwnedLookupError::Storage(format!("{e:?}")))?;

    match attempt {
        Some(attempt) if attempt.owner_id == owner_id => Ok(attempt),
        _ => Err(OwnedLookupError::NotFound),
    }
}
