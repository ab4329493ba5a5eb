use crate::config::WebhookDelivery;
use time::Duration;

/// Backoff schedule for failed webhook deliveries.
///
/// Pure: the caller decides what to do with the returned delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

impl RetryPolicy {
    pub fn from_settings(settings: &WebhookDelivery) -> Self {
        Self {
            base_delay_ms: settings.backoff_initial_ms,
            max_delay_ms: settings.backoff_max_ms,
            jitter_ms: settings.jitter_ms,
        }
    }

    /// Delay before attempt `attempt_number + 1`, or `None` when the chain is out of budget.
    ///
    /// `attempt_number` is the attempt that just failed, starting at 1.
    pub fn next_attempt(&self, attempt_number: u32, max_attempts: u32) -> Option<Duration> {
        // Step 1: Stop once the chain already holds `max_attempts` records.
        if attempt_number >= max_attempts {
            return None;
        }

        // Step 2: Compute the exponential delay (2^(attempt-1)).
        let exp = 2_u64.saturating_pow(attempt_number.max(1) - 1);
        let raw = self.base_delay_ms.saturating_mul(exp);

        // Step 3: Cap at the max delay.
        let capped = raw.min(self.max_delay_ms);
        Some(Duration::milliseconds(capped.min(i64::MAX as u64) as i64))
    }

    /// Spread a delay by up to `jitter_ms`, derived from `seed`.
    pub fn with_jitter(&self, delay: Duration, seed: u64) -> Duration {
        if self.jitter_ms == 0 {
            return delay;
        }
        delay + Duration::milliseconds((seed % self.jitter_ms) as i64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 60_000,
            max_delay_ms: 900_000,
            jitter_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RetryPolicy;
    use time::Duration;

    #[test]
    fn given_attempts_when_next_attempt_should_grow_and_cap() {
        let policy = RetryPolicy {
            base_delay_ms: 500,
            max_delay_ms: 5_000,
            jitter_ms: 0,
        };

        assert_eq!(policy.next_attempt(1, 20), Some(Duration::milliseconds(500)));
        assert_eq!(policy.next_attempt(2, 20), Some(Duration::milliseconds(1_000)));
        assert_eq!(policy.next_attempt(3, 20), Some(Duration::milliseconds(2_000)));
        assert_eq!(policy.next_attempt(10, 20), Some(Duration::milliseconds(5_000)));
    }

    #[test]
    fn given_default_policy_when_next_attempt_should_follow_one_then_two_minutes() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.next_attempt(1, 3), Some(Duration::seconds(60)));
        assert_eq!(policy.next_attempt(2, 3), Some(Duration::seconds(120)));
        assert_eq!(policy.next_attempt(3, 3), None);
    }

    #[test]
    fn given_any_attempt_number_when_next_attempt_should_be_monotonic_and_bounded() {
        let policy = RetryPolicy::default();
        let mut previous = Duration::ZERO;

        for attempt in 1..64 {
            let delay = policy.next_attempt(attempt, u32::MAX).unwrap();
            assert!(delay >= previous);
            assert!(delay <= Duration::milliseconds(policy.max_delay_ms as i64));
            previous = delay;
        }
    }

    #[test]
    fn given_max_attempts_when_walking_chain_should_stop_at_budget() {
        let policy = RetryPolicy::default();
        for max_attempts in 1..6 {
            let mut chain_len = 1;
            while policy.next_attempt(chain_len, max_attempts).is_some() {
                chain_len += 1;
            }
            assert_eq!(chain_len, max_attempts);
        }
    }

    #[test]
    fn given_jitter_when_applied_should_stay_below_bound() {
        let policy = RetryPolicy {
            jitter_ms: 250,
            ..RetryPolicy::default()
        };
        let base = Duration::seconds(60);

        let jittered = policy.with_jitter(base, 1_234_567);

        assert!(jittered >= base);
        assert!(jittered < base + Duration::milliseconds(250));
        assert_eq!(RetryPolicy::default().with_jitter(base, 99), base);
    }
}
