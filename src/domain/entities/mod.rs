pub mod delivery_attempt;
pub mod domain_event;
pub mod event_type;
pub mod webhook_endpoint;
