use std::sync::Arc;

use crate::config::Settings;
use crate::domain::workflows::retry_policy::RetryPolicy;
use crate::infrastructure::db::repositories::Repositories;
use crate::infrastructure::http::WebhookTransport;
use crate::infrastructure::queue::DeliveryQueue;

/// Shared application resources used by use cases and services.
pub struct AppContext {
    pub repos: Repositories,
    pub settings: Settings,
    pub queue: Arc<dyn DeliveryQueue>,
    pub transport: Arc<dyn WebhookTransport>,
}

impl AppContext {
    /// Build a new application context with shared repositories and collaborators.
    pub fn new(
        repos: Repositories,
        settings: Settings,
        queue: Arc<dyn DeliveryQueue>,
        transport: Arc<dyn WebhookTransport>,
    ) -> Self {
        Self {
            repos,
            settings,
            queue,
            transport,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_settings(&self.settings.webhook_delivery)
    }
}
