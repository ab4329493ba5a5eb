pub mod delivery_attempt;
pub mod webhook_endpoint;

pub use delivery_attempt::{DeliveryAttemptQuery, DeliveryAttemptRow, DeliveryStatsRow};
pub use webhook_endpoint::WebhookEndpointRow;

/// A stored row that no longer maps onto the domain model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("row decode error: {0}")]
pub struct RowDecodeError(pub String);
