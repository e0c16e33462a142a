//! Exponential retry schedule.

use std::time::Duration;

use rand::Rng;

/// Delay schedule for consecutive transient failures. The base delay
/// for attempt `n` is `base * 2^(n-1)`, capped; the applied delay gets
/// a +-50% jitter so retries from many installs spread out.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    pub fn from_millis(base_ms: u64, cap_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(cap_ms))
    }

    /// Deterministic delay for a 1-based attempt number, before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(31);
        self.base
            .saturating_mul(2u32.saturating_pow(doublings))
            .min(self.cap)
    }

    /// Jittered delay actually scheduled for an attempt.
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let millis = base.as_millis() as u64;
        if millis == 0 {
            return base;
        }
        let spread = millis / 2;
        let jittered = rand::thread_rng().gen_range(millis - spread..=millis + spread);
        Duration::from_millis(jittered).min(self.cap)
    }
}
