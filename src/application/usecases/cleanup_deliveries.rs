// Use case: cleanup_deliveries.

use crate::application::context::AppContext;
use crate::domain::value_objects::timestamps::Timestamp;
use tracing::{info, warn};

/// Deletes completed attempt records that are past the retention window.
pub struct CleanupDeliveriesUseCase;

#[derive(Debug)]
pub enum CleanupDeliveriesError {
    Storage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupDeliveriesResult {
    pub deleted: u64,
}

impl CleanupDeliveriesUseCase {
    /// Remove terminal attempts created more than `retention_days` before `now`.
    pub async fn execute(
        ctx: &AppContext,
        now: Timestamp,
    ) -> Result<CleanupDeliveriesResult, CleanupDeliveriesError> {
        // Step 1: Compute the cutoff. Pending attempts are never deleted.
        let retention = time::Duration::days(ctx.settings.webhook_delivery.retention_days as i64);
        let cutoff = now.minus(retention);

        // Step 2: Delete and report.
        let deleted = ctx
            .repos
            .delivery_attempt
            .delete_completed_before(cutoff)
            .await
            .map_err(|e| CleanupDeliveriesError::Storage(format!("{e:?}")))?;

        if deleted > 0 {
            info!(deleted, cutoff = %cutoff.to_rfc3339(), "webhook_attempts_cleaned_up");
        }
        Ok(CleanupDeliveriesResult { deleted })
    }

    /// Run the cleanup at a fixed interval until shutdown.
    pub async fn run_loop(
        ctx: &AppContext,
        interval: time::Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Result<(), CleanupDeliveriesError> {
        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Err(e) = Self::execute(ctx, Timestamp::now_utc()).await {
                warn!(error = ?e, "webhook_cleanup_failed");
            }

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
