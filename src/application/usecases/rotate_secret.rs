// Use case: rotate_secret.

use crate::application::context::AppContext;
use crate::application::shared::ownership::{OwnedLookupError, owned_endpoint};
use crate::domain::entities::webhook_endpoint::WebhookEndpoint;
use crate::domain::value_objects::ids::{EndpointId, OwnerId};
use crate::domain::value_objects::timestamps::Timestamp;
use crate::infrastructure::db::stores::webhook_endpoint_store::WebhookEndpointRepositoryError;
use tracing::info;

/// Replaces an endpoint's signing secret. Attempts sent afterwards use the new one.
pub struct RotateSecretUseCase;

#[derive(Debug)]
pub enum RotateSecretError {
    NotFound,
    Storage(String),
}

impl RotateSecretUseCase {
    pub async fn execute(
        ctx: &AppContext,
        owner_id: OwnerId,
        endpoint_id: EndpointId,
    ) -> Result<WebhookEndpoint, RotateSecretError> {
        // Step 1: Load the owner's endpoint.
        let mut endpoint = owned_endpoint(ctx, owner_id, endpoint_id)
            .await
            .map_err(|e| match e {
                OwnedLookupError::NotFound => RotateSecretError::NotFound,
                OwnedLookupError::Storage(msg) => RotateSecretError::Storage(msg),
            })?;

        // Step 2: Generate and persist the new secret.
        endpoint.rotate_secret(Timestamp::now_utc());
        let stored = ctx
            .repos
            .webhook_endpoint
            .update(&endpoint)
            .await
            .map_err(|e| match e {
                WebhookEndpointRepositoryError::NotFound => RotateSecretError::NotFound,
                other => RotateSecretError::Storage(format!("{other:?}")),
            })?;

        info!(endpoint_id = %stored.id, "webhook_secret_rotated");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::RotateSecretUseCase;
    use crate::application::context::test_support::{seed_endpoint, test_context};
    use crate::domain::entities::event_type::EventType;
    use crate::domain::value_objects::ids::OwnerId;

    #[tokio::test]
    async fn given_endpoint_when_rotated_should_persist_new_secret() {
        let ctx = test_context();
        let owner = OwnerId::new();
        let endpoint = seed_endpoint(&ctx, owner, &[EventType::CompanyCreated]).await;

        let rotated = RotateSecretUseCase::execute(&ctx, owner, endpoint.id)
            .await
            .unwrap();

        assert_ne!(rotated.secret, endpoint.secret);
        let stored = ctx
            .repos
            .webhook_endpoint
            .get(endpoint.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.secret, rotated.secret);
    }
}
