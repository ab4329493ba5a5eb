pub mod delivery_attempt_store_memory;
pub mod webhook_endpoint_store_memory;

pub use delivery_attempt_store_memory::DeliveryAttemptStoreMemory;
pub use webhook_endpoint_store_memory::WebhookEndpointStoreMemory;
