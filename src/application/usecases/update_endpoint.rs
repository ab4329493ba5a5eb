// Use case: update_endpoint.

use crate::application::context::AppContext;
use crate::application::shared::endpoint_fields::{parse_event_types, validate_name};
use crate::application::shared::ownership::{OwnedLookupError, owned_endpoint};
use crate::domain::entities::webhook_endpoint::{EndpointUpdate, WebhookEndpoint};
use crate::domain::value_objects::ids::{EndpointId, OwnerId};
use crate::domain::value_objects::timestamps::Timestamp;
use crate::domain::workflows::delivery_outcome::{DeliveryError, validate_endpoint_url};
use crate::infrastructure::db::stores::webhook_endpoint_store::WebhookEndpointRepositoryError;
use tracing::info;

/// Partially updates an endpoint. Deactivating it cancels pending retries at their next run.
pub struct UpdateEndpointUseCase;

#[derive(Debug)]
pub enum UpdateEndpointError {
    NotFound,
    Validation(String),
    Configuration(DeliveryError),
    Storage(String),
}

#[derive(Debug, Clone, Default)]
pub struct UpdateEndpointCommand {
    pub name: Option<String>,
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl UpdateEndpointUseCase {
    pub async fn execute(
        ctx: &AppContext,
        owner_id: OwnerId,
        endpoint_id: EndpointId,
        cmd: UpdateEndpointCommand,
    ) -> Result<WebhookEndpoint, UpdateEndpointError> {
        // Step 1: Validate each provided field.
        let name = cmd
            .name
            .as_deref()
            .map(validate_name)
            .transpose()
            .map_err(UpdateEndpointError::Validation)?;
        let subscribed_event_types = cmd
            .events
            .as_deref()
            .map(parse_event_types)
            .transpose()
            .map_err(UpdateEndpointError::Validation)?;
        let url = cmd.url.map(|url| url.trim().to_string());
        if let Some(url) = &url {
            validate_endpoint_url(url, ctx.settings.webhook_delivery.allow_private_hosts)
                .map_err(UpdateEndpointError::Configuration)?;
        }

        // Step 2: Load the owner's endpoint and apply the change.
        let mut endpoint = owned_endpoint(ctx, owner_id, endpoint_id)
            .await
            .map_err(|e| match e {
                OwnedLookupError::NotFound => UpdateEndpointError::NotFound,
                OwnedLookupError::Storage(msg) => UpdateEndpointError::Storage(msg),
            })?;
        let reactivating = cmd.is_active == Some(true) && !endpoint.is_active;
        endpoint.apply_update(
            EndpointUpdate {
                name,
                url,
                subscribed_event_types,
                is_active: cmd.is_active,
            },
            Timestamp::now_utc(),
        );

        // Step 3: Persist the edited fields.
        let map_err = |e: WebhookEndpointRepositoryError| match e {
            WebhookEndpointRepositoryError::NotFound => UpdateEndpointError::NotFound,
            other => UpdateEndpointError::Storage(format!("{other:?}")),
        };
        let mut stored = ctx
            .repos
            .webhook_endpoint
            .update(&endpoint)
            .await
            .map_err(map_err)?;

        // Step 4: Re-enabling clears the auto-disable counter in its own write.
        if reactivating {
            ctx.repos
                .webhook_endpoint
                .reset_failures(stored.id)
                .await
                .map_err(map_err)?;
            stored.failure_count = 0;
        }

        info!(endpoint_id = %stored.id, is_active = stored.is_active, "webhook_endpoint_updated");
        Ok(stored)
    }
}
