pub mod deliveries;
pub mod endpoints;
pub mod events;
pub mod health;
pub mod metrics;
pub mod ready;
