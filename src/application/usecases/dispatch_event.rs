// Use case: dispatch_event.

use crate::application::context::AppContext;
use crate::domain::entities::delivery_attempt::DeliveryAttempt;
use crate::domain::entities::domain_event::DomainEvent;
use crate::domain::value_objects::ids::AttemptId;
use crate::domain::value_objects::timestamps::Timestamp;
use crate::infrastructure::db::stores::delivery_attempt_store::DeliveryAttemptRepositoryError;
use metrics::counter;
use tracing::{debug, error, info, warn};

/// Fans a domain event out to every subscribed endpoint of its tenant.
pub struct DispatchEventUseCase;

#[derive(Debug)]
pub enum DispatchEventError {
    Storage(String),
}

impl DispatchEventUseCase {
    /// Create attempt #1 for each matching endpoint and submit it. Returns the created ids.
    pub async fn execute(
        ctx: &AppContext,
        event: &DomainEvent,
    ) -> Result<Vec<AttemptId>, DispatchEventError> {
        // Step 1: Find active, healthy endpoints subscribed to this event type.
        let endpoints = ctx
            .repos
            .webhook_endpoint
            .list_subscribed(
                event.tenant_id,
                event.event_type,
                ctx.settings.webhook_delivery.max_consecutive_failures,
            )
            .await
            .map_err(|e| DispatchEventError::Storage(format!("{e:?}")))?;

        if endpoints.is_empty() {
            debug!(event_id = %event.event_id, event_type = event.event_type.as_str(), "webhook_dispatch_no_subscribers");
            return Ok(Vec::new());
        }

        // Step 2: Persist one pending attempt per endpoint, then hand it to the queue.
        let now = Timestamp::now_utc();
        let mut created = Vec::with_capacity(endpoints.len());
        for endpoint in &endpoints {
            let attempt = DeliveryAttempt::first(endpoint, event, now);
            let stored = match ctx.repos.delivery_attempt.insert(&attempt).await {
                Ok(stored) => stored,
                // Same event dispatched twice: the chain already exists.
                Err(DeliveryAttemptRepositoryError::Conflict) => continue,
                Err(e) => return Err(DispatchEventError::Storage(format!("{e:?}"))),
            };

            if let Err(e) = ctx.queue.enqueue(stored.id, time::Duration::ZERO).await {
                warn!(attempt_id = %stored.id, error = %e, "webhook_dispatch_enqueue_failed");
            }
            created.push(stored.id);
        }

        // Step 3: Report what was scheduled.
        counter!("webhook_dispatched_total", "event_type" => event.event_type.as_str())
            .increment(created.len() as u64);
        info!(
            event_id = %event.event_id,
            event_type = event.event_type.as_str(),
            tenant_id = %event.tenant_id,
            attempts = created.len(),
            "webhook_dispatched"
        );
        Ok(created)
    }

    /// Fire-and-forget entry point for event producers. Errors are logged, never returned.
    pub async fn notify(ctx: &AppContext, event: &DomainEvent) -> Vec<AttemptId> {
        match Self::execute(ctx, event).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(event_id = %event.event_id, error = ?e, "webhook_dispatch_failed");
                Vec::new()
            }
        }
    }
}
