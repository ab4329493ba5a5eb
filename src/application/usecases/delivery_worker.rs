// Use case: delivery_worker.

use crate::application::context::AppContext;
use crate::application::usecases::attempt_delivery::AttemptDeliveryUseCase;
use crate::infrastructure::queue::QueueReceiver;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Fixed-size pool of tasks pulling attempt ids off the delivery queue.
pub struct DeliveryWorkerPool {
    ctx: Arc<AppContext>,
    receiver: QueueReceiver,
    worker_count: usize,
}

impl DeliveryWorkerPool {
    pub fn new(ctx: Arc<AppContext>, receiver: QueueReceiver, worker_count: usize) -> Self {
        Self {
            ctx,
            receiver,
            worker_count: worker_count.max(1),
        }
    }

    /// Spawn the workers. Each one stops when `shutdown` flips to `true` or the queue closes.
    pub fn start(self, shutdown: tokio::sync::watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        (1..=self.worker_count)
            .map(|id| {
                let worker_id = format!("webhook-worker-{id}");
                tokio::spawn(Self::run_worker(
                    worker_id,
                    self.ctx.clone(),
                    self.receiver.clone(),
                    shutdown.clone(),
                ))
            })
            .collect()
    }

    async fn run_worker(
        worker_id: String,
        ctx: Arc<AppContext>,
        receiver: QueueReceiver,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        info!(worker_id = %worker_id, "webhook_worker_started");
        loop {
            if *shutdown.borrow() {
                break;
            }

            // Step 1: Wait for a job or shutdown, whichever comes first.
            let attempt_id = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                next = receiver.recv() => match next {
                    Some(attempt_id) => attempt_id,
                    None => break,
                },
            };

            // Step 2: Run the attempt to completion. Errors are logged; the stale sweep retries.
            if let Err(e) = AttemptDeliveryUseCase::execute(&ctx, attempt_id).await {
                error!(worker_id = %worker_id, attempt_id = %attempt_id, error = ?e, "webhook_attempt_failed");
            }
        }
        info!(worker_id = %worker_id, "webhook_worker_stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::DeliveryWorkerPool;
    use crate::application::context::AppContext;
    use crate::application::context::test_support::{ScriptedTransport, seed_endpoint};
    use crate::application::usecases::dispatch_event::DispatchEventUseCase;
    use crate::config::Settings;
    use crate::domain::entities::delivery_attempt::DeliveryStatus;
    use crate::domain::entities::domain_event::DomainEvent;
    use crate::domain::entities::event_type::EventType;
    use crate::domain::value_objects::ids::OwnerId;
    use crate::infrastructure::db::repositories::Repositories;
    use crate::infrastructure::queue::InProcessQueue;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn given_dispatched_event_when_pool_runs_should_deliver_and_stop_on_shutdown() {
        let (queue, receiver) = InProcessQueue::new();
        let transport = Arc::new(ScriptedTransport::default());
        let ctx = Arc::new(AppContext::new(
            Repositories::in_memory(),
            Settings::default(),
            Arc::new(queue),
            transport.clone(),
        ));
        let owner = OwnerId::new();
        seed_endpoint(&ctx, owner, &[EventType::ApplicationStatusChanged]).await;
        seed_endpoint(&ctx, owner, &[EventType::ApplicationStatusChanged]).await;
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let handles = DeliveryWorkerPool::new(ctx.clone(), receiver, 2).start(shutdown_rx);

        let event = DomainEvent::new(
            EventType::ApplicationStatusChanged,
            owner,
            json!({"status": "offer"}),
        );
        let ids = DispatchEventUseCase::execute(&ctx, &event).await.unwrap();
        assert_eq!(ids.len(), 2);

        let mut delivered = false;
        for _ in 0..200 {
            let mut done = 0;
            for id in &ids {
                let attempt = ctx.repos.delivery_attempt.get(*id).await.unwrap().unwrap();
                if attempt.status == DeliveryStatus::Success {
                    done += 1;
                }
            }
            if done == ids.len() {
                delivered = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(delivered);
        assert_eq!(transport.requests().len(), 2);

        shutdown_tx.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
