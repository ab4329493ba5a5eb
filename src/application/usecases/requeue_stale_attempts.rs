// Use case: requeue_stale_attempts.

use crate::application::context::AppContext;
use crate::domain::value_objects::timestamps::Timestamp;
use tracing::{info, warn};

/// Re-submits pending attempts whose queue entry was lost (crash, restart, dropped timer).
pub struct RequeueStaleAttemptsUseCase;

#[derive(Debug)]
pub enum RequeueStaleAttemptsError {
    Storage(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequeueStaleAttemptsResult {
    pub requeued: usize,
}

impl RequeueStaleAttemptsUseCase {
    /// Enqueue pending attempts that should have run at least `requeue_grace_ms` ago.
    ///
    /// Each returned attempt is stamped as enqueued at `now`, so later sweeps
    /// leave it alone for another grace period. Attempts leased by a worker are
    /// skipped.
    pub async fn run_once(
        ctx: &AppContext,
        now: Timestamp,
        limit: u32,
    ) -> Result<RequeueStaleAttemptsResult, RequeueStaleAttemptsError> {
        // Step 1: Claim overdue pending attempts that nobody is working on.
        let grace = time::Duration::milliseconds(
            ctx.settings.webhook_delivery.requeue_grace_ms.min(i64::MAX as u64) as i64,
        );
        let stale = ctx
            .repos
            .delivery_attempt
            .claim_stale_pending(now.minus(grace), now, limit)
            .await
            .map_err(|e| RequeueStaleAttemptsError::Storage(format!("{e:?}")))?;

        // Step 2: Submit each one for immediate execution. Duplicates are skipped by the attempter.
        let mut requeued = 0;
        for attempt in stale {
            match ctx.queue.enqueue(attempt.id, time::Duration::ZERO).await {
                Ok(()) => requeued += 1,
                Err(e) => {
                    warn!(attempt_id = %attempt.id, error = %e, "webhook_requeue_failed");
                    break;
                }
            }
        }

        if requeued > 0 {
            info!(requeued, "webhook_stale_attempts_requeued");
        }
        Ok(RequeueStaleAttemptsResult { requeued })
    }

    /// Run the sweep at a fixed interval until shutdown.
    pub async fn run_loop(
        ctx: &AppContext,
        interval: time::Duration,
        limit: u32,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Result<(), RequeueStaleAttemptsError> {
        // Step 1: Loop until shutdown is triggered.
        loop {
            if *shutdown.borrow() {
                break;
            }

            // Step 2: Run a sweep; storage hiccups are retried on the next tick.
            if let Err(e) = Self::run_once(ctx, Timestamp::now_utc(), limit).await {
                warn!(error = ?e, "webhook_requeue_sweep_failed");
            }

            // Step 3: Sleep until the next pass or shutdown.
            let sleep_duration =
                std::time::Duration::from_millis(interval.whole_milliseconds().max(0) as u64);
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(sleep_duration) => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::RequeueStaleAttemptsUseCase;
    use crate::application::context::test_support::{harness, seed_endpoint};
    use crate::domain::entities::delivery_attempt::{AttemptResult, DeliveryAttempt, DeliveryStatus};
    use crate::domain::entities::domain_event::DomainEvent;
    use crate::domain::entities::event_type::EventType;
    use crate::domain::value_objects::ids::OwnerId;
    use crate::domain::value_objects::timestamps::Timestamp;
    use serde_json::json;
    use time::Duration;

    #[tokio::test]
    async fn given_overdue_and_fresh_pending_when_swept_should_requeue_only_overdue() {
        let h = harness();
        let owner = OwnerId::new();
        let endpoint = seed_endpoint(&h.ctx, owner, &[EventType::CompanyCreated]).await;
        let now = Timestamp::now_utc();
        let old = now.minus(Duration::minutes(10));

        let overdue = DeliveryAttempt::first(
            &endpoint,
            &DomainEvent::new(EventType::CompanyCreated, owner, json!({})),
            old,
        );
        let fresh = DeliveryAttempt::first(
            &endpoint,
            &DomainEvent::new(EventType::CompanyCreated, owner, json!({})),
            now,
        );
        let mut done = DeliveryAttempt::first(
            &endpoint,
            &DomainEvent::new(EventType::CompanyCreated, owner, json!({})),
            old,
        );
        done.complete(DeliveryStatus::Success, AttemptResult::default(), old)
            .unwrap();
        for attempt in [&overdue, &fresh, &done] {
            h.ctx.repos.delivery_attempt.insert(attempt).await.unwrap();
        }

        let result = RequeueStaleAttemptsUseCase::run_once(&h.ctx, now, 100)
            .await
            .unwrap();

        assert_eq!(result.requeued, 1);
        assert_eq!(h.queue.jobs(), vec![(overdue.id, Duration::ZERO)]);
    }

    #[tokio::test]
    async fn given_overdue_attempt_when_swept_repeatedly_should_enqueue_it_once() {
        let h = harness();
        let owner = OwnerId::new();
        let endpoint = seed_endpoint(&h.ctx, owner, &[EventType::CompanyCreated]).await;
        let now = Timestamp::now_utc();
        let overdue = DeliveryAttempt::first(
            &endpoint,
            &DomainEvent::new(EventType::CompanyCreated, owner, json!({})),
            now.minus(Duration::minutes(10)),
        );
        h.ctx.repos.delivery_attempt.insert(&overdue).await.unwrap();

        for tick in 0..3 {
            let at = now.plus(Duration::seconds(30 * tick));
            RequeueStaleAttemptsUseCase::run_once(&h.ctx, at, 100)
                .await
                .unwrap();
        }

        assert_eq!(h.queue.jobs(), vec![(overdue.id, Duration::ZERO)]);
    }

    #[tokio::test]
    async fn given_unrun_requeue_when_grace_passes_again_should_enqueue_once_more() {
        let h = harness();
        let owner = OwnerId::new();
        let endpoint = seed_endpoint(&h.ctx, owner, &[EventType::CompanyCreated]).await;
        let now = Timestamp::now_utc();
        let overdue = DeliveryAttempt::first(
            &endpoint,
            &DomainEvent::new(EventType::CompanyCreated, owner, json!({})),
            now.minus(Duration::minutes(10)),
        );
        h.ctx.repos.delivery_attempt.insert(&overdue).await.unwrap();

        RequeueStaleAttemptsUseCase::run_once(&h.ctx, now, 100).await.unwrap();
        let later_at = now.plus(Duration::minutes(3));
        let later = RequeueStaleAttemptsUseCase::run_once(&h.ctx, later_at, 100)
            .await
            .unwrap();

        assert_eq!(later.requeued, 1);
        assert_eq!(h.queue.jobs().len(), 2);
    }

    #[tokio::test]
    async fn given_attempt_leased_by_worker_when_swept_should_skip_it() {
        let h = harness();
        let owner = OwnerId::new();
        let endpoint = seed_endpoint(&h.ctx, owner, &[EventType::CompanyCreated]).await;
        let now = Timestamp::now_utc();
        let overdue = DeliveryAttempt::first(
            &endpoint,
            &DomainEvent::new(EventType::CompanyCreated, owner, json!({})),
            now.minus(Duration::minutes(10)),
        );
        h.ctx.repos.delivery_attempt.insert(&overdue).await.unwrap();
        h.ctx
            .repos
            .delivery_attempt
            .claim(overdue.id, now, now.plus(Duration::minutes(5)))
            .await
            .unwrap()
            .unwrap();

        let result = RequeueStaleAttemptsUseCase::run_once(&h.ctx, now, 100)
            .await
            .unwrap();

        assert_eq!(result.requeued, 0);
        assert!(h.queue.jobs().is_empty());
    }

    #[tokio::test]
    async fn given_shutdown_signal_when_looping_should_exit() {
        let h = harness();
        let (tx, rx) = tokio::sync::watch::channel(false);
        tx.send(true).unwrap();

        let result =
            RequeueStaleAttemptsUseCase::run_loop(&h.ctx, Duration::seconds(60), 10, rx).await;

        assert!(result.is_ok());
    }
}
