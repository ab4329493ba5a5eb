pub mod delivery_attempt_store;
pub mod webhook_endpoint_store;
