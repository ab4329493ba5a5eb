// Use case: retry_delivery.

use crate::application::context::AppContext;
use crate::application::shared::ownership::{OwnedLookupError, owned_attempt, owned_endpoint};
use crate::domain::entities::delivery_attempt::{DeliveryAttempt, DeliveryStatus};
use crate::domain::value_objects::ids::{AttemptId, OwnerId};
use crate::domain::value_objects::timestamps::Timestamp;
use tracing::{info, warn};

/// Replays a failed delivery as a brand-new chain. Existing chains are never reopened.
pub struct RetryDeliveryUseCase;

#[derive(Debug)]
pub enum RetryDeliveryError {
    NotFound,
    /// The attempt is pending, succeeded, or already has a successor.
    Conflict(String),
    Storage(String),
}

impl RetryDeliveryUseCase {
    pub async fn execute(
        ctx: &AppContext,
        owner_id: OwnerId,
        attempt_id: AttemptId,
    ) -> Result<DeliveryAttempt, RetryDeliveryError> {
        // Step 1: Only a terminal, unsuccessful attempt can be replayed.
        let attempt = owned_attempt(ctx, owner_id, attempt_id)
            .await
            .map_err(Self::lookup_error)?;
        if !matches!(
            attempt.status,
            DeliveryStatus::Failed | DeliveryStatus::Exhausted
        ) {
            return Err(RetryDeliveryError::Conflict(format!(
                "attempt is {}",
                attempt.status.as_str()
            )));
        }

        // Step 2: It must also be the last attempt of its chain.
        let chain = ctx
            .repos
            .delivery_attempt
            .list_chain(attempt.endpoint_id, attempt.event_id)
            .await
            .map_err(|e| RetryDeliveryError::Storage(format!("{e:?}")))?;
        if chain
            .iter()
            .any(|other| other.attempt_number > attempt.attempt_number)
        {
            return Err(RetryDeliveryError::Conflict(
                "a later attempt exists for this delivery".to_string(),
            ));
        }

        // Step 3: The endpoint still has to exist.
        owned_endpoint(ctx, owner_id, attempt.endpoint_id)
            .await
            .map_err(Self::lookup_error)?;

        // Step 4: Start the new chain and submit it.
        let replay = attempt.replay(Timestamp::now_utc());
        let stored = ctx
            .repos
            .delivery_attempt
            .insert(&replay)
            .await
            .map_err(|e| RetryDeliveryError::Storage(format!("{e:?}")))?;
        if let Err(e) = ctx.queue.enqueue(stored.id, time::Duration::ZERO).await {
            warn!(attempt_id = %stored.id, error = %e, "webhook_manual_retry_enqueue_failed");
        }

        info!(
            attempt_id = %stored.id,
            replay_of = %attempt.id,
            event_id = %stored.event_id,
            "webhook_manual_retry"
        );
        Ok(stored)
    }

    fn lookup_error(err: OwnedLookupError) -> RetryDeliveryError {
        match err {
            OwnedLookupError::NotFound => RetryDeliveryError::NotFound,
            OwnedLookupError::Storage(msg) => RetryDeliveryError::Storage(msg),
        }
    }
}
