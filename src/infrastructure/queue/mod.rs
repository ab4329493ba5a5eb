pub mod in_process;

use crate::domain::value_objects::ids::AttemptId;
use async_trait::async_trait;
use thiserror::Error;

pub use in_process::{InProcessQueue, QueueReceiver};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("delivery queue is closed")]
    Closed,
}

/// Submission side of the delivery job queue.
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    /// Make `attempt_id` available to workers after `delay` (zero = now).
    async fn enqueue(&self, attempt_id: AttemptId, delay: time::Duration) -> Result<(), QueueError>;
}
