use crate::infrastructure::db::database::DatabaseError;
use crate::infrastructure::db::dto::{DeliveryAttemptQuery, DeliveryAttemptRow, DeliveryStatsRow};
use async_trait::async_trait;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryAttemptRepositoryError {
    NotFound,
    Conflict,
    InvalidInput,
    StorageUnavailable,
}

impl From<DatabaseError> for DeliveryAttemptRepositoryError {
    fn from(_: DatabaseError) -> Self {
        DeliveryAttemptRepositoryError::StorageUnavailable
    }
}

#[async_trait]
pub trait DeliveryAttemptStore: Send + Sync {
    /// Fetch an attempt by its ID. Returns `None` if it doesn't exist.
    async fn get(
        &self,
        attempt_id: uuid::Uuid,
    ) -> Result<Option<DeliveryAttemptRow>, DeliveryAttemptRepositoryError>;
    /// Create an attempt. A duplicate `(endpoint_id, event_id, attempt_number)` is a conflict.
    async fn insert(
        &self,
        row: &DeliveryAttemptRow,
    ) -> Result<DeliveryAttemptRow, DeliveryAttemptRepositoryError>;
    /// Store the outcome of a pending attempt. Already completed attempts are a conflict.
    async fn complete(
        &self,
        row: &DeliveryAttemptRow,
    ) -> Result<DeliveryAttemptRow, DeliveryAttemptRepositoryError>;
    /// Store the outcome of a pending attempt and its successor in one unit.
    async fn complete_with_successor(
        &self,
        row: &DeliveryAttemptRow,
        next: &DeliveryAttemptRow,
    ) -> Result<DeliveryAttemptRow, DeliveryAttemptRepositoryError>;
    /// List attempts matching the query, newest first.
    async fn list(
        &self,
        query: &DeliveryAttemptQuery,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<DeliveryAttemptRow>, DeliveryAttemptRepositoryError>;
    /// Count attempts matching the query.
    async fn count(&self, query: &DeliveryAttemptQuery)
    -> Result<i64, DeliveryAttemptRepositoryError>;
    /// Every attempt of one chain, ordered by attempt number.
    async fn list_chain(
        &self,
        endpoint_id: uuid::Uuid,
        event_id: uuid::Uuid,
    ) -> Result<Vec<DeliveryAttemptRow>, DeliveryAttemptRepositoryError>;
    /// Lease a pending attempt until `lease_expires_at`.
    ///
    /// Returns `None` when the attempt is gone, no longer pending, or still
    /// leased by another worker at `now`.
    async fn claim(
        &self,
        attempt_id: uuid::Uuid,
        now: OffsetDateTime,
        lease_expires_at: OffsetDateTime,
    ) -> Result<Option<DeliveryAttemptRow>, DeliveryAttemptRepositoryError>;
    /// Mark up to `limit` overdue attempts as enqueued at `now` and return them, oldest first.
    ///
    /// An attempt qualifies when it is pending, unleased at `now`, and both
    /// scheduled and last enqueued at or before `before`.
    async fn claim_stale_pending(
        &self,
        before: OffsetDateTime,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<DeliveryAttemptRow>, DeliveryAttemptRepositoryError>;
    /// Attempt counts of one endpoint created since `since`.
    async fn stats(
        &self,
        endpoint_id: uuid::Uuid,
        since: OffsetDateTime,
    ) -> Result<DeliveryStatsRow, DeliveryAttemptRepositoryError>;
    /// Delete non-pending attempts created before `cutoff` and return how many were removed.
    async fn delete_completed_before(
        &self,
        cutoff: OffsetDateTime,
    ) -> Result<u64, DeliveryAttemptRepositoryError>;
}
