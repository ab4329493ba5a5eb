use crate::domain::entities::delivery_attempt::{DeliveryAttempt, DeliveryStatus};
use crate::domain::entities::event_type::EventType;
use crate::domain::value_objects::ids::{AttemptId, EndpointId, EventId, OwnerId};
use crate::domain::value_objects::timestamps::Timestamp;
use crate::infrastructure::db::dto::{DeliveryAttemptQuery, DeliveryAttemptRow, DeliveryStatsRow};
use crate::infrastructure::db::stores::delivery_attempt_store::{
    DeliveryAttemptRepositoryError, DeliveryAttemptStore,
};
use std::sync::Arc;
use tracing::error;

/// History filter. Owner scoping is mandatory; the rest narrows the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAttemptFilter {
    pub owner_id: OwnerId,
    pub endpoint_id: Option<EndpointId>,
    pub status: Option<DeliveryStatus>,
    pub event_type: Option<EventType>,
}

impl DeliveryAttemptFilter {
    pub fn for_owner(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            endpoint_id: None,
            status: None,
            event_type: None,
        }
    }

    fn to_query(&self) -> DeliveryAttemptQuery {
        DeliveryAttemptQuery {
            owner_id: self.owner_id.0,
            endpoint_id: self.endpoint_id.map(|id| id.0),
            status: self.status.map(|s| s.as_str().to_string()),
            event_type: self.event_type.map(|e| e.as_str().to_string()),
        }
    }
}

pub struct DeliveryAttemptRepository {
    store: Arc<dyn DeliveryAttemptStore>,
}

fn decode(row: DeliveryAttemptRow) -> Result<DeliveryAttempt, DeliveryAttemptRepositoryError> {
    let attempt_id = row.id;
    row.into_attempt().map_err(|e| {
        error!(attempt_id = %attempt_id, error = %e, "delivery_attempt_row_invalid");
        DeliveryAttemptRepositoryError::InvalidInput
    })
}

fn decode_all(
    rows: Vec<DeliveryAttemptRow>,
) -> Result<Vec<DeliveryAttempt>, DeliveryAttemptRepositoryError> {
    rows.into_iter().map(decode).collect()
}

impl DeliveryAttemptRepository {
    /// Build a repository that uses the given store implementation.
    pub fn new(store: Arc<dyn DeliveryAttemptStore>) -> Self {
        Self { store }
    }

    /// Fetch an attempt by its ID. Returns `None` if it doesn't exist.
    pub async fn get(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Option<DeliveryAttempt>, DeliveryAttemptRepositoryError> {
        self.store.get(attempt_id.0).await?.map(decode).transpose()
    }

    /// Create an attempt and return what was stored.
    pub async fn insert(
        &self,
        attempt: &DeliveryAttempt,
    ) -> Result<DeliveryAttempt, DeliveryAttemptRepositoryError> {
        let stored = self
            .store
            .insert(&DeliveryAttemptRow::from_attempt(attempt))
            .await?;
        decode(stored)
    }

    /// Store the outcome of a pending attempt.
    pub async fn complete(
        &self,
        attempt: &DeliveryAttempt,
    ) -> Result<DeliveryAttempt, DeliveryAttemptRepositoryError> {
        let stored = self
            .store
            .complete(&DeliveryAttemptRow::from_attempt(attempt))
            .await?;
        decode(stored)
    }

    /// Store the outcome of `attempt` and create `next` atomically. Returns the stored successor.
    pub async fn complete_with_successor(
        &self,
        attempt: &DeliveryAttempt,
        next: &DeliveryAttempt,
    ) -> Result<DeliveryAttempt, DeliveryAttemptRepositoryError> {
        let stored = self
            .store
            .complete_with_successor(
                &DeliveryAttemptRow::from_attempt(attempt),
                &DeliveryAttemptRow::from_attempt(next),
            )
            .await?;
        decode(stored)
    }

    /// One page of attempts matching the filter, newest first.
    pub async fn list(
        &self,
        filter: &DeliveryAttemptFilter,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<DeliveryAttempt>, DeliveryAttemptRepositoryError> {
        decode_all(self.store.list(&filter.to_query(), limit, offset).await?)
    }

    pub async fn count(
        &self,
        filter: &DeliveryAttemptFilter,
    ) -> Result<u64, DeliveryAttemptRepositoryError> {
        let total = self.store.count(&filter.to_query()).await?;
        Ok(total.max(0) as u64)
    }

    /// Every attempt of the chain `(endpoint_id, event_id)`, ordered by attempt number.
    pub async fn list_chain(
        &self,
        endpoint_id: EndpointId,
        event_id: EventId,
    ) -> Result<Vec<DeliveryAttempt>, DeliveryAttemptRepositoryError> {
        decode_all(self.store.list_chain(endpoint_id.0, event_id.0).await?)
    }

    /// Lease a pending attempt for one send. `None` means someone else owns it or it is done.
    pub async fn claim(
        &self,
        attempt_id: AttemptId,
        now: Timestamp,
        lease_expires_at: Timestamp,
    ) -> Result<Option<DeliveryAttempt>, DeliveryAttemptRepositoryError> {
        self.store
            .claim(attempt_id.0, now.as_inner(), lease_expires_at.as_inner())
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn claim_stale_pending(
        &self,
        before: Timestamp,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<DeliveryAttempt>, DeliveryAttemptRepositoryError> {
        decode_all(
            self.store
                .claim_stale_pending(before.as_inner(), now.as_inner(), limit)
                .await?,
        )
    }

    /// Attempt counts for one endpoint since `since`.
    pub async fn stats(
        &self,
        endpoint_id: EndpointId,
        since: Timestamp,
    ) -> Result<DeliveryStatsRow, DeliveryAttemptRepositoryError> {
        self.store.stats(endpoint_id.0, since.as_inner()).await
    }

    pub async fn delete_completed_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<u64, DeliveryAttemptRepositoryError> {
        self.store.delete_completed_before(cutoff.as_inner()).await
    }
}
