// Use case: delete_endpoint.

use crate::application::context::AppContext;
use crate::application::shared::ownership::{OwnedLookupError, owned_endpoint};
use crate::domain::value_objects::ids::{EndpointId, OwnerId};
use crate::infrastructure::db::stores::webhook_endpoint_store::WebhookEndpointRepositoryError;
use tracing::info;

/// Removes an endpoint. Its pending attempts fail as `endpoint_missing` when they next run.
pub struct DeleteEndpointUseCase;

#[derive(Debug)]
pub enum DeleteEndpointError {
    NotFound,
    Storage(String),
}

impl DeleteEndpointUseCase {
    pub async fn execute(
        ctx: &AppContext,
        owner_id: OwnerId,
        endpoint_id: EndpointId,
    ) -> Result<(), DeleteEndpointError> {
        // Step 1: Confirm ownership.
        owned_endpoint(ctx, owner_id, endpoint_id)
            .await
            .map_err(|e| match e {
                OwnedLookupError::NotFound => DeleteEndpointError::NotFound,
                OwnedLookupError::Storage(msg) => DeleteEndpointError::Storage(msg),
            })?;

        // Step 2: Delete.
        ctx.repos
            .webhook_endpoint
            .delete(endpoint_id)
            .await
            .map_err(|e| match e {
                WebhookEndpointRepositoryError::NotFound => DeleteEndpointError::NotFound,
                other => DeleteEndpointError::Storage(format!("{other:?}")),
            })?;

        info!(endpoint_id = %endpoint_id, "webhook_endpoint_deleted");
        Ok(())
    }
}
