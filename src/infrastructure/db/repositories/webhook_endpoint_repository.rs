use crate::domain::entities::event_type::EventType;
use crate::domain::entities::webhook_endpoint::WebhookEndpoint;
use crate::domain::value_objects::ids::{EndpointId, OwnerId};
use crate::domain::value_objects::timestamps::Timestamp;
use crate::infrastructure::db::dto::WebhookEndpointRow;
use crate::infrastructure::db::stores::webhook_endpoint_store::{
    WebhookEndpointRepositoryError, WebhookEndpointStore,
};
use std::sync::Arc;
use tracing::error;

pub struct WebhookEndpointRepository {
    store: Arc<dyn WebhookEndpointStore>,
}

fn decode(row: WebhookEndpointRow) -> Result<WebhookEndpoint, WebhookEndpointRepositoryError> {
    let endpoint_id = row.id;
    row.into_endpoint().map_err(|e| {
        error!(endpoint_id = %endpoint_id, error = %e, "webhook_endpoint_row_invalid");
        WebhookEndpointRepositoryError::InvalidInput
    })
}

impl WebhookEndpointRepository {
    /// Build a repository that uses the given store implementation.
    pub fn new(store: Arc<dyn WebhookEndpointStore>) -> Self {
        Self { store }
    }

    /// Fetch an endpoint by its ID. Returns `None` if it doesn't exist.
    pub async fn get(
        &self,
        endpoint_id: EndpointId,
    ) -> Result<Option<WebhookEndpoint>, WebhookEndpointRepositoryError> {
        self.store.get(endpoint_id.0).await?.map(decode).transpose()
    }

    /// List every endpoint of an owner, newest first.
    pub async fn list_by_owner(
        &self,
        owner_id: OwnerId,
    ) -> Result<Vec<WebhookEndpoint>, WebhookEndpointRepositoryError> {
        self.store
            .list_by_owner(owner_id.0)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Endpoints that should receive `event_type` for this owner right now.
    pub async fn list_subscribed(
        &self,
        owner_id: OwnerId,
        event_type: EventType,
        max_consecutive_failures: u32,
    ) -> Result<Vec<WebhookEndpoint>, WebhookEndpointRepositoryError> {
        let threshold = max_consecutive_failures.min(i32::MAX as u32) as i32;
        self.store
            .list_subscribed(owner_id.0, event_type.as_str(), threshold)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Create an endpoint and return what was actually stored in the database.
    pub async fn insert(
        &self,
        endpoint: &WebhookEndpoint,
    ) -> Result<WebhookEndpoint, WebhookEndpointRepositoryError> {
        let stored = self
            .store
            .insert(&WebhookEndpointRow::from_endpoint(endpoint))
            .await?;
        decode(stored)
    }

    /// Persist name, url, secret, subscriptions and activation of an endpoint.
    pub async fn update(
        &self,
        endpoint: &WebhookEndpoint,
    ) -> Result<WebhookEndpoint, WebhookEndpointRepositoryError> {
        let stored = self
            .store
            .update(&WebhookEndpointRow::from_endpoint(endpoint))
            .await?;
        decode(stored)
    }

    /// Reset (success) or bump (terminal failure) the consecutive failure counter.
    pub async fn record_outcome(
        &self,
        endpoint_id: EndpointId,
        succeeded: bool,
        at: Timestamp,
    ) -> Result<(), WebhookEndpointRepositoryError> {
        self.store
            .record_outcome(endpoint_id.0, succeeded, at.as_inner())
            .await
    }

    pub async fn reset_failures(
        &self,
        endpoint_id: EndpointId,
    ) -> Result<(), WebhookEndpointRepositoryError> {
        self.store.reset_failures(endpoint_id.0).await
    }

    /// Delete an endpoint by its ID. Returns an error if it doesn't exist.
    pub async fn delete(&self, endpoint_id: EndpointId) -> Result<(), WebhookEndpointRepositoryError> {
        self.store.delete(endpoint_id.0).await
    }
}
