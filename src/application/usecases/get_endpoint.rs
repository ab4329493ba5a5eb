// Use case: get_endpoint.

use crate::application::context::AppContext;
use crate::application::shared::ownership::{OwnedLookupError, owned_endpoint};
use crate::domain::entities::webhook_endpoint::WebhookEndpoint;
use crate::domain::value_objects::ids::{EndpointId, OwnerId};
use crate::domain::value_objects::timestamps::Timestamp;

/// Loads one endpoint together with its delivery counts for the last 24 hours.
pub struct GetEndpointUseCase;

#[derive(Debug)]
pub enum GetEndpointError {
    NotFound,
    Storage(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointDeliveryStats {
    pub total_24h: u64,
    pub successful_24h: u64,
    pub failed_24h: u64,
}

#[derive(Debug, Clone)]
pub struct EndpointDetails {
    pub endpoint: WebhookEndpoint,
    pub stats: EndpointDeliveryStats,
}

impl GetEndpointUseCase {
    pub async fn execute(
        ctx: &AppContext,
        owner_id: OwnerId,
        endpoint_id: EndpointId,
    ) -> Result<EndpointDetails, GetEndpointError> {
        // Step 1: Load the endpoint, hiding other owners' records.
        let endpoint = owned_endpoint(ctx, owner_id, endpoint_id)
            .await
            .map_err(|e| match e {
                OwnedLookupError::NotFound => GetEndpointError::NotFound,
                OwnedLookupError::Storage(msg) => GetEndpointError::Storage(msg),
            })?;

        // Step 2: Count attempts created in the last day.
        let since = Timestamp::now_utc().minus(time::Duration::hours(24));
        let row = ctx
            .repos
            .delivery_attempt
            .stats(endpoint.id, since)
            .await
            .map_err(|e| GetEndpointError::Storage(format!("{e:?}")))?;

        Ok(EndpointDetails {
            endpoint,
            stats: EndpointDeliveryStats {
                total_24h: row.total.max(0) as u64,
                successful_24h: row.successful.max(0) as u64,
                failed_24h: row.failed.max(0) as u64,
            },
        })
    }
}
