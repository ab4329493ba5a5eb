use std::sync::Arc;

use crate::infrastructure::db::database::{Database, DatabaseError};
use crate::infrastructure::db::memory::{DeliveryAttemptStoreMemory, WebhookEndpointStoreMemory};
use crate::infrastructure::db::postgres::PostgresDatabase;
use crate::infrastructure::db::postgres::delivery_attempt_store_postgres::DeliveryAttemptStorePostgres;
use crate::infrastructure::db::postgres::webhook_endpoint_store_postgres::WebhookEndpointStorePostgres;
use crate::infrastructure::db::repositories::delivery_attempt_repository::DeliveryAttemptRepository;
use crate::infrastructure::db::repositories::webhook_endpoint_repository::WebhookEndpointRepository;

#[derive(Clone)]
pub struct Repositories {
    pub db: Option<Arc<PostgresDatabase>>,
    pub webhook_endpoint: Arc<WebhookEndpointRepository>,
    pub delivery_attempt: Arc<DeliveryAttemptRepository>,
}

impl Repositories {
    /// Build all repositories backed by Postgres stores.
    pub fn postgres(db: Arc<PostgresDatabase>) -> Self {
        let endpoint_store = Arc::new(WebhookEndpointStorePostgres::new(db.clone()));
        let attempt_store = Arc::new(DeliveryAttemptStorePostgres::new(db.clone()));

        Self {
            db: Some(db),
            webhook_endpoint: Arc::new(WebhookEndpointRepository::new(endpoint_store)),
            delivery_attempt: Arc::new(DeliveryAttemptRepository::new(attempt_store)),
        }
    }

    /// Build all repositories backed by process-local stores.
    pub fn in_memory() -> Self {
        Self {
            db: None,
            webhook_endpoint: Arc::new(WebhookEndpointRepository::new(Arc::new(
                WebhookEndpointStoreMemory::new(),
            ))),
            delivery_attempt: Arc::new(DeliveryAttemptRepository::new(Arc::new(
                DeliveryAttemptStoreMemory::new(),
            ))),
        }
    }

    /// Check that the backing storage answers. In-memory storage always does.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        let Some(db) = self.db.as_ref() else {
            return Ok(());
        };
        db.execute("SELECT 1").await.map(|_| ())
    }
}
