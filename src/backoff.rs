use async_trait::async_trait;
use std::time::Duration;

use crate::config::RetryConfig;

/// Suspends the current task; swapped out in tests so no real time passes
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Exponential backoff with a fixed attempt budget
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    max_attempts: u32,
    base_ms: u64,
    max_ms: u64,
    jitter_percent: u64,
}

impl BackoffPolicy {
    pub const fn new(max_attempts: u32, base_ms: u64, max_ms: u64) -> Self {
        Self {
            max_attempts,
            base_ms,
            max_ms,
            jitter_percent: 0,
        }
    }

    pub fn with_jitter(mut self, jitter_percent: u64) -> Self {
        self.jitter_percent = jitter_percent;
        self
    }

    /// Number of consecutive failures tolerated before giving up
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether `failures` consecutive failures exhaust the budget
    pub fn exhausted(&self, failures: u32) -> bool {
        failures >= self.max_attempts
    }

    /// Delay before retry number `attempt` (0-based): base doubled per attempt, capped
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_ms
            .saturating_mul(2u64.saturating_pow(attempt.min(20)));
        let capped = exponential.min(self.max_ms);
        let jitter = if self.jitter_percent > 0 {
            fastrand::u64(0..=capped.saturating_mul(self.jitter_percent) / 100)
        } else {
            0
        };
        Duration::from_millis(capped.saturating_add(jitter))
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay_ms, config.max_delay_ms)
            .with_jitter(config.jitter_percent)
    }
}
