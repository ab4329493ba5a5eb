use crate::domain::value_objects::ids::AttemptId;
use crate::infrastructure::queue::{DeliveryQueue, QueueError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::warn;

/// Unbounded tokio channel feeding the worker pool.
///
/// Delayed jobs sit in a spawned timer task, not in a worker.
#[derive(Clone)]
pub struct InProcessQueue {
    sender: mpsc::UnboundedSender<AttemptId>,
}

/// Consumer side shared by every worker of the pool.
#[derive(Clone)]
pub struct QueueReceiver {
    inner: Arc<Mutex<mpsc::UnboundedReceiver<AttemptId>>>,
}

impl QueueReceiver {
    /// Wait for the next job. `None` once every sender is gone.
    pub async fn recv(&self) -> Option<AttemptId> {
        self.inner.lock().await.recv().await
    }
}

impl InProcessQueue {
    pub fn new() -> (Self, QueueReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self { sender },
            QueueReceiver {
                inner: Arc::new(Mutex::new(receiver)),
            },
        )
    }
}

#[async_trait]
impl DeliveryQueue for InProcessQueue {
    async fn enqueue(&self, attempt_id: AttemptId, delay: time::Duration) -> Result<(), QueueError> {
        // Step 1: Refuse work once the pool has shut down.
        if self.sender.is_closed() {
            return Err(QueueError::Closed);
        }

        // Step 2: Hand immediate jobs straight to the channel.
        if !delay.is_positive() {
            return self
                .sender
                .send(attempt_id)
                .map_err(|_| QueueError::Closed);
        }

        // Step 3: Park delayed jobs in a timer task.
        let sender = self.sender.clone();
        let sleep = std::time::Duration::from_millis(delay.whole_milliseconds().max(0) as u64);
        tokio::spawn(async move {
            tokio::time::sleep(sleep).await;
            if sender.send(attempt_id).is_err() {
                warn!(attempt_id = %attempt_id, "delayed_enqueue_dropped");
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[tokio::test]
    async fn given_immediate_job_when_enqueued_should_be_received() {
        let (queue, receiver) = InProcessQueue::new();
        let id = AttemptId::new();

        queue.enqueue(id, Duration::ZERO).await.unwrap();

        assert_eq!(receiver.recv().await, Some(id));
    }

    #[tokio::test(start_paused = true)]
    async fn given_delayed_job_when_enqueued_should_arrive_after_delay() {
        let (queue, receiver) = InProcessQueue::new();
        let delayed = AttemptId::new();
        let immediate = AttemptId::new();

        queue.enqueue(delayed, Duration::seconds(60)).await.unwrap();
        queue.enqueue(immediate, Duration::ZERO).await.unwrap();

        assert_eq!(receiver.recv().await, Some(immediate));
        assert_eq!(receiver.recv().await, Some(delayed));
    }

    #[tokio::test]
    async fn given_dropped_receiver_when_enqueued_should_report_closed() {
        let (queue, receiver) = InProcessQueue::new();
        drop(receiver);

        let result = queue.enqueue(AttemptId::new(), Duration::ZERO).await;

        assert_eq!(result, Err(QueueError::Closed));
    }
}
