// Use case: list_endpoints.

use crate::application::context::AppContext;
use crate::domain::entities::webhook_endpoint::WebhookEndpoint;
use crate::domain::value_objects::ids::OwnerId;

/// Lists an owner's endpoints, newest first.
pub struct ListEndpointsUseCase;

#[derive(Debug)]
pub enum ListEndpointsError {
    Storage(String),
}

impl ListEndpointsUseCase {
    pub async fn execute(
        ctx: &AppContext,
        owner_id: OwnerId,
    ) -> Result<Vec<WebhookEndpoint>, ListEndpointsError> {
        ctx.repos
            .webhook_endpoint
            .list_by_owner(owner_id)
            .await
            .map_err(|e| ListEndpointsError::Storage(format!("{e:?}")))
    }
}
