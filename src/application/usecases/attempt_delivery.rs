// Use case: attempt_delivery.

use crate::application::context::AppContext;
use crate::application::shared::outbound::{DeliveryHeaders, signed_request};
use crate::domain::entities::delivery_attempt::{
    AttemptResult, DeliveryAttempt, DeliveryStatus, ErrorKind, response_snippet,
};
use crate::domain::value_objects::ids::AttemptId;
use crate::domain::value_objects::timestamps::Timestamp;
use crate::domain::workflows::delivery_outcome::{DeliveryError, StatusClass, classify_status};
use crate::infrastructure::db::stores::delivery_attempt_store::DeliveryAttemptRepositoryError;
use crate::infrastructure::db::stores::webhook_endpoint_store::WebhookEndpointRepositoryError;
use crate::infrastructure::http::TransportError;
use metrics::{counter, histogram};
use time::Duration;
use tracing::{debug, info, warn};

/// Executes one delivery attempt: sign, POST, classify, record, schedule the successor.
pub struct AttemptDeliveryUseCase;

#[derive(Debug)]
pub enum AttemptDeliveryError {
    Storage(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// No record with this id.
    Missing,
    /// The attempt already left `pending` (duplicate job or concurrent worker).
    Skipped(DeliveryStatus),
    /// Scheduled in the future; its timer will submit it again.
    NotDue,
    /// Another worker holds the lease and is sending it right now.
    InFlight,
    Delivered { http_status: u16 },
    /// Terminal failure without retry.
    Rejected(DeliveryError),
    RetryScheduled { next_attempt_id: AttemptId, delay: Duration },
    Exhausted(DeliveryError),
}

impl AttemptOutcome {
    fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Missing => "missing",
            AttemptOutcome::Skipped(_) => "skipped",
            AttemptOutcome::NotDue => "not_due",
            AttemptOutcome::InFlight => "in_flight",
            AttemptOutcome::Delivered { .. } => "success",
            AttemptOutcome::Rejected(_) => "failed",
            AttemptOutcome::RetryScheduled { .. } => "retry",
            AttemptOutcome::Exhausted(_) => "exhausted",
        }
    }
}

impl AttemptDeliveryUseCase {
    /// Run the attempt identified by `attempt_id` to completion.
    pub async fn execute(
        ctx: &AppContext,
        attempt_id: AttemptId,
    ) -> Result<AttemptOutcome, AttemptDeliveryError> {
        // Step 1: Load the attempt; terminal records are never executed again.
        let Some(attempt) = ctx
            .repos
            .delivery_attempt
            .get(attempt_id)
            .await
            .map_err(|e| AttemptDeliveryError::Storage(format!("{e:?}")))?
        else {
            warn!(attempt_id = %attempt_id, "webhook_attempt_missing");
            return Ok(AttemptOutcome::Missing);
        };
        if !attempt.is_pending() {
            debug!(attempt_id = %attempt_id, status = attempt.status.as_str(), "webhook_attempt_skipped");
            return Ok(AttemptOutcome::Skipped(attempt.status));
        }
        let now = Timestamp::now_utc();
        if attempt.scheduled_at > now {
            return Ok(AttemptOutcome::NotDue);
        }

        // Step 2: Lease the attempt; only the lease holder may send it.
        let settings = &ctx.settings.webhook_delivery;
        let lease_ms = settings
            .request_timeout_ms
            .saturating_add(settings.requeue_grace_ms)
            .min(i64::MAX as u64) as i64;
        let claimed = ctx
            .repos
            .delivery_attempt
            .claim(attempt_id, now, now.plus(Duration::milliseconds(lease_ms)))
            .await
            .map_err(|e| AttemptDeliveryError::Storage(format!("{e:?}")))?;
        let Some(mut attempt) = claimed else {
            return Self::lost_claim(ctx, attempt_id).await;
        };

        // Step 3: Short-circuit when the endpoint is gone or deactivated.
        let endpoint = ctx
            .repos
            .webhook_endpoint
            .get(attempt.endpoint_id)
            .await
            .map_err(|e| AttemptDeliveryError::Storage(format!("{e:?}")))?
            .filter(|endpoint| endpoint.owner_id == attempt.owner_id);
        let endpoint = match endpoint {
            Some(endpoint) if endpoint.is_active => endpoint,
            Some(_) => {
                let result = AttemptResult::error(ErrorKind::EndpointInactive, "endpoint inactive");
                let outcome =
                    AttemptOutcome::Rejected(DeliveryError::Configuration("endpoint inactive".to_string()));
                return Self::finish(ctx, &mut attempt, DeliveryStatus::Failed, result, outcome, now).await;
            }
            None => {
                let result = AttemptResult::error(ErrorKind::EndpointMissing, "endpoint deleted");
                let outcome =
                    AttemptOutcome::Rejected(DeliveryError::Configuration("endpoint deleted".to_string()));
                return Self::finish(ctx, &mut attempt, DeliveryStatus::Failed, result, outcome, now).await;
            }
        };

        // Step 4: Serialize canonically and sign with the secret as it is now.
        let body = match serde_json::to_vec(&attempt.payload) {
            Ok(body) => body,
            Err(e) => {
                let result = AttemptResult::error(ErrorKind::Serialization, e.to_string());
                let outcome = AttemptOutcome::Rejected(DeliveryError::Configuration(e.to_string()));
                return Self::finish(ctx, &mut attempt, DeliveryStatus::Failed, result, outcome, now).await;
            }
        };
        let signed = signed_request(
            &endpoint.url,
            &endpoint.secret,
            body,
            DeliveryHeaders {
                event: attempt.event_type.as_str(),
                event_id: attempt.event_id.to_string(),
                delivery_id: attempt.id.to_string(),
                attempt_number: attempt.attempt_number,
            },
            settings,
            settings.request_timeout_ms,
            now,
        );
        attempt.signature = Some(signed.signature);

        // Step 5: POST and time the round trip.
        let started = std::time::Instant::now();
        let response = ctx.transport.post(signed.request).await;
        histogram!("webhook_attempt_duration_ms").record(started.elapsed().as_millis() as f64);
        let now = Timestamp::now_utc();

        // Step 6: Classify into success, permanent failure or transient failure.
        let limit = settings.response_snippet_limit;
        let (result, error) = match response {
            Ok(resp) => {
                let snippet = Some(response_snippet(&resp.body, limit));
                match classify_status(resp.status) {
                    StatusClass::Success => {
                        let result = AttemptResult {
                            http_status_code: Some(resp.status),
                            response_snippet: snippet,
                            ..AttemptResult::default()
                        };
                        let outcome = AttemptOutcome::Delivered {
                            http_status: resp.status,
                        };
                        return Self::finish(ctx, &mut attempt, DeliveryStatus::Success, result, outcome, now)
                            .await;
                    }
                    StatusClass::Permanent => {
                        let reason = format!("receiver answered {}", resp.status);
                        let result = AttemptResult {
                            http_status_code: Some(resp.status),
                            response_snippet: snippet,
                            error_kind: Some(ErrorKind::HttpStatus),
                            error_message: Some(reason.clone()),
                        };
                        let outcome = AttemptOutcome::Rejected(DeliveryError::PermanentDelivery {
                            status: resp.status,
                            reason,
                        });
                        return Self::finish(ctx, &mut attempt, DeliveryStatus::Failed, result, outcome, now)
                            .await;
                    }
                    StatusClass::Transient => {
                        let reason = format!("receiver answered {}", resp.status);
                        let result = AttemptResult {
                            http_status_code: Some(resp.status),
                            response_snippet: snippet,
                            error_kind: Some(ErrorKind::HttpStatus),
                            error_message: Some(reason.clone()),
                        };
                        let error = DeliveryError::TransientDelivery {
                            kind: ErrorKind::HttpStatus,
                            status: Some(resp.status),
                            reason,
                        };
                        (result, error)
                    }
                }
            }
            Err(err) => {
                let kind = match err {
                    TransportError::Timeout => ErrorKind::Timeout,
                    TransportError::Connection(_) | TransportError::Request(_) => {
                        ErrorKind::Connection
                    }
                };
                let reason = err.to_string();
                let error = DeliveryError::TransientDelivery {
                    kind,
                    status: None,
                    reason: reason.clone(),
                };
                (AttemptResult::error(kind, reason), error)
            }
        };

        // Step 7: Transient failure. Either schedule the next attempt or give up.
        let policy = ctx.retry_policy();
        match policy.next_attempt(attempt.attempt_number, settings.max_attempts) {
            Some(delay) => {
                let delay = policy.with_jitter(delay, rand::random::<u64>());
                Self::schedule_retry(ctx, &mut attempt, result, error, delay, now).await
            }
            None => {
                let outcome = AttemptOutcome::Exhausted(DeliveryError::RetryBudgetExhausted {
                    attempts: attempt.attempt_number,
                });
                Self::finish(ctx, &mut attempt, DeliveryStatus::Exhausted, result, outcome, now).await
            }
        }
    }

    /// Explain why the lease could not be taken: the attempt finished, vanished, or is in flight.
    async fn lost_claim(
        ctx: &AppContext,
        attempt_id: AttemptId,
    ) -> Result<AttemptOutcome, AttemptDeliveryError> {
        let current = ctx
            .repos
            .delivery_attempt
            .get(attempt_id)
            .await
            .map_err(|e| AttemptDeliveryError::Storage(format!("{e:?}")))?;
        let outcome = match current {
            None => AttemptOutcome::Missing,
            Some(attempt) if attempt.is_pending() => AttemptOutcome::InFlight,
            Some(attempt) => AttemptOutcome::Skipped(attempt.status),
        };
        debug!(attempt_id = %attempt_id, outcome = outcome.label(), "webhook_attempt_claim_lost");
        Ok(outcome)
    }

    async fn schedule_retry(
        ctx: &AppContext,
        attempt: &mut DeliveryAttempt,
        result: AttemptResult,
        error: DeliveryError,
        delay: Duration,
        now: Timestamp,
    ) -> Result<AttemptOutcome, AttemptDeliveryError> {
        // Step 1: Close the current attempt and create its successor together.
        if attempt.complete(DeliveryStatus::Failed, result, now).is_err() {
            return Ok(AttemptOutcome::Skipped(attempt.status));
        }
        let next = attempt.next_in_chain(now.plus(delay), now);
        let stored = match ctx
            .repos
            .delivery_attempt
            .complete_with_successor(attempt, &next)
            .await
        {
            Ok(stored) => stored,
            Err(DeliveryAttemptRepositoryError::Conflict) => {
                return Ok(AttemptOutcome::Skipped(DeliveryStatus::Failed));
            }
            Err(e) => return Err(AttemptDeliveryError::Storage(format!("{e:?}"))),
        };

        // Step 2: Submit the successor with its delay; the stale sweep covers a lost submit.
        if let Err(e) = ctx.queue.enqueue(stored.id, delay).await {
            warn!(attempt_id = %stored.id, error = %e, "webhook_retry_enqueue_failed");
        }

        let outcome = AttemptOutcome::RetryScheduled {
            next_attempt_id: stored.id,
            delay,
        };
        Self::observe(attempt, &outcome, Some(&error));
        Ok(outcome)
    }

    /// Record a terminal outcome for `attempt` and update the endpoint's health.
    async fn finish(
        ctx: &AppContext,
        attempt: &mut DeliveryAttempt,
        status: DeliveryStatus,
        result: AttemptResult,
        outcome: AttemptOutcome,
        now: Timestamp,
    ) -> Result<AttemptOutcome, AttemptDeliveryError> {
        // Step 1: Persist the outcome; losing a race to another worker is not an error.
        if attempt.complete(status, result, now).is_err() {
            return Ok(AttemptOutcome::Skipped(attempt.status));
        }
        match ctx.repos.delivery_attempt.complete(attempt).await {
            Ok(_) => {}
            Err(DeliveryAttemptRepositoryError::Conflict) => {
                return Ok(AttemptOutcome::Skipped(status));
            }
            Err(e) => return Err(AttemptDeliveryError::Storage(format!("{e:?}"))),
        }

        // Step 2: Success resets the failure counter; a chain that ends badly bumps it.
        let endpoint_outcome = match &outcome {
            AttemptOutcome::Delivered { .. } => Some(true),
            AttemptOutcome::Exhausted(_)
            | AttemptOutcome::Rejected(DeliveryError::PermanentDelivery { .. }) => Some(false),
            _ => None,
        };
        if let Some(succeeded) = endpoint_outcome {
            Self::record_endpoint_outcome(ctx, attempt, succeeded, now).await;
        }

        Self::observe(attempt, &outcome, None);
        Ok(outcome)
    }

    async fn record_endpoint_outcome(
        ctx: &AppContext,
        attempt: &DeliveryAttempt,
        succeeded: bool,
        now: Timestamp,
    ) {
        match ctx
            .repos
            .webhook_endpoint
            .record_outcome(attempt.endpoint_id, succeeded, now)
            .await
        {
            Ok(()) | Err(WebhookEndpointRepositoryError::NotFound) => {}
            Err(e) => {
                warn!(endpoint_id = %attempt.endpoint_id, error = ?e, "webhook_endpoint_health_update_failed");
            }
        }
    }

    fn observe(attempt: &DeliveryAttempt, outcome: &AttemptOutcome, error: Option<&DeliveryError>) {
        let label = outcome.label();
        counter!("webhook_attempts_total", "outcome" => label).increment(1);
        let error = match (outcome, error) {
            (_, Some(err)) => Some(err.to_string()),
            (AttemptOutcome::Rejected(err) | AttemptOutcome::Exhausted(err), None) => {
                Some(err.to_string())
            }
            _ => None,
        };
        info!(
            attempt_id = %attempt.id,
            endpoint_id = %attempt.endpoint_id,
            event_id = %attempt.event_id,
            event_type = attempt.event_type.as_str(),
            attempt_number = attempt.attempt_number,
            http_status = attempt.http_status_code,
            outcome = label,
            error = error.as_deref().unwrap_or(""),
            "webhook_attempt"
        );
    }
}
