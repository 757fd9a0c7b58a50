//! Retry timing and the shared rate-limit backoff.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

use modsync_core::config::CatalogConfig;

/// Retry settings for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per call, first attempt included.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each one after.
    pub base_delay: Duration,
    /// Shared backoff after the first rate-limit signal.
    pub backoff_floor: Duration,
    /// Upper bound for the shared backoff.
    pub backoff_ceiling: Duration,
}

impl RetryPolicy {
    /// Exponential delay after failed attempt number `attempt` (1-based).
    pub fn exponential_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor)
    }

    /// Delay before the next attempt: the larger of the exponential delay
    /// and the server's `Retry-After`, plus up to 25% jitter.
    pub fn retry_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let delay = self
            .exponential_delay(attempt)
            .max(retry_after.unwrap_or(Duration::ZERO));
        delay + jitter(delay / 4)
    }
}

impl From<&CatalogConfig> for RetryPolicy {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.retry_base_delay(),
            backoff_floor: config.backoff_floor(),
            backoff_ceiling: config.backoff_ceiling(),
        }
    }
}

/// Delay applied before every request while the catalog is rate limiting.
///
/// Grows on 429 responses and drops to zero on any other outcome. Updates
/// are last-writer-wins.
#[derive(Debug)]
pub struct SharedBackoff {
    current: Mutex<Duration>,
    floor: Duration,
    ceiling: Duration,
}

impl SharedBackoff {
    /// Create a backoff that starts at zero.
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Self {
            current: Mutex::new(Duration::ZERO),
            floor,
            ceiling: ceiling.max(floor),
        }
    }

    /// Current backoff.
    pub fn current(&self) -> Duration {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// React to a rate-limit signal: start at the floor, then double up to
    /// the ceiling. Returns the new value.
    pub fn escalate(&self) -> Duration {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = if current.is_zero() {
            self.floor
        } else {
            current.saturating_mul(2).min(self.ceiling)
        };
        *current
    }

    /// Clear the backoff after a non-rate-limited outcome.
    pub fn reset(&self) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Duration::ZERO;
    }

    /// Sleep to apply before the next request: `backoff + rand(0..=backoff)`.
    pub fn pre_request_delay(&self) -> Duration {
        let backoff = self.current();
        if backoff.is_zero() {
            return Duration::ZERO;
        }
        backoff + jitter(backoff)
    }
}

/// Uniform random duration in `0..=max`.
fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}

/// Parse a `Retry-After` value given as delta-seconds or an HTTP date.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    Some(
        (at.with_timezone(&Utc) - now)
            .to_std()
            .unwrap_or(Duration::ZERO),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            backoff_floor: Duration::from_secs(1),
            backoff_ceiling: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_exponential_delay_doubles() {
        let policy = policy();
        assert_eq!(policy.exponential_delay(1), Duration::from_millis(250));
        assert_eq!(policy.exponential_delay(2), Duration::from_millis(500));
        assert_eq!(policy.exponential_delay(3), Duration::from_millis(1000));
    }

    #[test]
    fn test_retry_delay_honors_retry_after_and_bounds_jitter() {
        let policy = policy();
        for _ in 0..100 {
            let delay = policy.retry_delay(1, Some(Duration::from_secs(2)));
            assert!(delay >= Duration::from_secs(2));
            assert!(delay <= Duration::from_millis(2500));

            let delay = policy.retry_delay(2, None);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(625));
        }
    }

    #[test]
    fn test_escalate_starts_at_floor_and_caps_at_ceiling() {
        let backoff = SharedBackoff::new(Duration::from_secs(1), Duration::from_secs(5));
        assert_eq!(backoff.current(), Duration::ZERO);
        assert_eq!(backoff.pre_request_delay(), Duration::ZERO);

        assert_eq!(backoff.escalate(), Duration::from_secs(1));
        assert_eq!(backoff.escalate(), Duration::from_secs(2));
        assert_eq!(backoff.escalate(), Duration::from_secs(4));
        assert_eq!(backoff.escalate(), Duration::from_secs(5));
        assert_eq!(backoff.escalate(), Duration::from_secs(5));

        let delay = backoff.pre_request_delay();
        assert!(delay >= Duration::from_secs(5) && delay <= Duration::from_secs(10));

        backoff.reset();
        assert_eq!(backoff.current(), Duration::ZERO);
    }

    #[test]
    fn test_parse_retry_after() {
        let now = DateTime::parse_from_rfc2822("Wed, 21 Oct 2026 07:28:00 GMT")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(parse_retry_after("2", now), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_after(" 120 ", now), Some(Duration::from_secs(120)));
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2026 07:28:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2026 07:27:00 GMT", now),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("soon", now), None);
    }
}
