// Use case: get_delivery_attempt.

use crate::application::context::AppContext;
use crate::application::shared::ownership::{OwnedLookupError, owned_attempt};
use crate::domain::entities::delivery_attempt::DeliveryAttempt;
use crate::domain::value_objects::ids::{AttemptId, OwnerId};

pub struct GetDeliveryAttemptUseCase;

#[derive(Debug)]
pub enum GetDeliveryAttemptError {
    NotFound,
    Storage(String),
}

impl GetDeliveryAttemptUseCase {
    pub async fn execute(
        ctx: &AppContext,
        owner_id: OwnerId,
        attempt_id: AttemptId,
    ) -> Result<DeliveryAttempt, GetDeliveryAttemptError> {
        owned_attempt(ctx, owner_id, attempt_id)
            .await
            .map_err(|e| match e {
                OwnedLookupError::NotFound => GetDeliveryAttemptError::NotFound,
                OwnedLookupError::Storage(msg) => GetDeliveryAttemptError::Storage(msg),
            })
    }
}
