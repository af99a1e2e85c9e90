//! Reconnect backoff policy
//!
//! The n-th consecutive reconnect attempt waits `base_delay * 2^(n-1)`,
//! optionally capped at `max_delay` and scaled by random jitter.

use rand::Rng;
use std::time::Duration;

/// Default delay before the first reconnect attempt
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default number of reconnect attempts before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Configuration for reconnecting the push channel
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first reconnect attempt
    pub base_delay: Duration,

    /// Maximum number of reconnect attempts since the last successful open
    pub max_attempts: u32,

    /// Upper bound for a single delay, if any
    pub max_delay: Option<Duration>,

    /// Whether to scale delays by a random factor between 0.5 and 1.5
    pub jitter: bool,
}

impl BackoffPolicy {
    /// Create a policy with the given attempt budget and default delays
    ///
    /// # Example
    ///
    /// ```rust
    /// use nest_sync::BackoffPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = BackoffPolicy::new(3);
    /// assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
    /// ```
    pub fn new(max_attempts: u32) -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_attempts,
            max_delay: None,
            jitter: false,
        }
    }

    /// Set the delay before the first reconnect attempt
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Cap individual delays
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait before reconnect attempt number `attempt` (1-indexed)
    ///
    /// Attempt 0 means "no failure yet" and maps to the base delay.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(Duration::MAX);

        let capped = match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        };

        if self.jitter {
            let factor = rand::thread_rng().gen_range(0.5..=1.5);
            Duration::try_from_secs_f64(capped.as_secs_f64() * factor).unwrap_or(capped)
        } else {
            capped
        }
    }

    /// Whether another reconnect is allowed after `attempt` failures
    pub fn allows(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.base_delay, Duration::from_millis(1000));
        assert_eq!(policy.max_attempts, 10);
        assert!(policy.max_delay.is_none());
        assert!(!policy.jitter);
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));

        for attempt in 1..=policy.max_attempts {
            let expected = 1000u64 * 2u64.pow(attempt - 1);
            assert_eq!(policy.delay_for(attempt).as_millis() as u64, expected);
        }
    }

    #[test]
    fn test_delay_respects_cap() {
        let policy = BackoffPolicy::new(10).with_max_delay(Duration::from_secs(5));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(4), Duration::from_secs(5));
        assert_eq!(policy.delay_for(9), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let policy = BackoffPolicy::new(5).with_jitter(true);
        for _ in 0..50 {
            let delay = policy.delay_for(2);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(3000));
        }
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let policy = BackoffPolicy::new(u32::MAX).with_base_delay(Duration::from_secs(u64::MAX / 2));
        assert_eq!(policy.delay_for(40), Duration::MAX);
    }

    #[test]
    fn test_allows() {
        let policy = BackoffPolicy::new(2);
        assert!(policy.allows(0));
        assert!(policy.allows(1));
        assert!(!policy.allows(2));
    }
}
