// Use case: register_endpoint.

use crate::application::context::AppContext;
use crate::application::shared::endpoint_fields::{parse_event_types, validate_name};
use crate::domain::entities::webhook_endpoint::WebhookEndpoint;
use crate::domain::value_objects::ids::OwnerId;
use crate::domain::value_objects::timestamps::Timestamp;
use crate::domain::workflows::delivery_outcome::{DeliveryError, validate_endpoint_url};
use tracing::info;

/// Registers a receiver URL for an owner and issues its signing secret.
pub struct RegisterEndpointUseCase;

#[derive(Debug)]
pub enum RegisterEndpointError {
    Validation(String),
    Configuration(DeliveryError),
    Storage(String),
}

#[derive(Debug, Clone)]
pub struct RegisterEndpointCommand {
    pub owner_id: OwnerId,
    pub name: String,
    pub url: String,
    pub events: Vec<String>,
    pub is_active: bool,
}

impl RegisterEndpointUseCase {
    /// Validate and store a new endpoint. The returned endpoint carries the fresh secret.
    pub async fn execute(
        ctx: &AppContext,
        cmd: RegisterEndpointCommand,
    ) -> Result<WebhookEndpoint, RegisterEndpointError> {
        // Step 1: Validate the label and the subscription set.
        let name = validate_name(&cmd.name).map_err(RegisterEndpointError::Validation)?;
        let events = parse_event_types(&cmd.events).map_err(RegisterEndpointError::Validation)?;

        // Step 2: Reject URLs the delivery client must never call.
        let url = cmd.url.trim().to_string();
        validate_endpoint_url(&url, ctx.settings.webhook_delivery.allow_private_hosts)
            .map_err(RegisterEndpointError::Configuration)?;

        // Step 3: Persist with a newly generated secret.
        let endpoint = WebhookEndpoint::register(
            cmd.owner_id,
            name,
            url,
            events,
            cmd.is_active,
            Timestamp::now_utc(),
        );
        let stored = ctx
            .repos
            .webhook_endpoint
            .insert(&endpoint)
            .await
            .map_err(|e| RegisterEndpointError::Storage(format!("{e:?}")))?;

        info!(endpoint_id = %stored.id, owner_id = %stored.owner_id, "webhook_endpoint_registered");
        Ok(stored)
    }
}
