use crate::infrastructure::db::database::DatabaseError;
use crate::infrastructure::db::dto::WebhookEndpointRow;
use async_trait::async_trait;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEndpointRepositoryError {
    NotFound,
    Conflict,
    InvalidInput,
    StorageUnavailable,
}

impl From<DatabaseError> for WebhookEndpointRepositoryError {
    fn from(_: DatabaseError) -> Self {
        WebhookEndpointRepositoryError::StorageUnavailable
    }
}

#[async_trait]
pub trait WebhookEndpointStore: Send + Sync {
    /// Fetch an endpoint by its ID. Returns `None` if it doesn't exist.
    async fn get(
        &self,
        endpoint_id: uuid::Uuid,
    ) -> Result<Option<WebhookEndpointRow>, WebhookEndpointRepositoryError>;
    /// List every endpoint of an owner, newest first.
    async fn list_by_owner(
        &self,
        owner_id: uuid::Uuid,
    ) -> Result<Vec<WebhookEndpointRow>, WebhookEndpointRepositoryError>;
    /// List the owner's active endpoints subscribed to `event_type` and below the failure threshold.
    async fn list_subscribed(
        &self,
        owner_id: uuid::Uuid,
        event_type: &str,
        max_consecutive_failures: i32,
    ) -> Result<Vec<WebhookEndpointRow>, WebhookEndpointRepositoryError>;
    /// Create an endpoint and return exactly what was stored in the database.
    async fn insert(
        &self,
        row: &WebhookEndpointRow,
    ) -> Result<WebhookEndpointRow, WebhookEndpointRepositoryError>;
    /// Overwrite the owner-editable fields of an endpoint.
    ///
    /// The failure counter and health timestamps are left alone; they only
    /// change through `record_outcome` and `reset_failures`.
    async fn update(
        &self,
        row: &WebhookEndpointRow,
    ) -> Result<WebhookEndpointRow, WebhookEndpointRepositoryError>;
    /// Atomically reset or bump the failure counter after a chain finished.
    async fn record_outcome(
        &self,
        endpoint_id: uuid::Uuid,
        succeeded: bool,
        at: OffsetDateTime,
    ) -> Result<(), WebhookEndpointRepositoryError>;
    /// Clear the consecutive failure counter.
    async fn reset_failures(&self, endpoint_id: uuid::Uuid)
    -> Result<(), WebhookEndpointRepositoryError>;
    /// Delete an endpoint by its ID. Returns an error if it doesn't exist.
    async fn delete(&self, endpoint_id: uuid::Uuid) -> Result<(), WebhookEndpointRepositoryError>;
}
