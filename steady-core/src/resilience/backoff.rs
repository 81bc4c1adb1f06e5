//! Randomized exponential backoff for the fast retry tier

use crate::config::FastRetryConfig;
use crate::http::TransportError;
use rand::Rng;
use std::time::Duration;

/// Delay calculator for retries inside one fast-retry window
///
/// The delay before retry `n` (0-based) is drawn from
/// `[c * (1 - jitter_factor), c]` with `c = initial * base^n`, then capped at
/// `max_delay`. With `base * (1 - jitter_factor) >= 1` (enforced by config
/// validation) a later retry never waits less than an earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    /// Delay ceiling before the first retry
    pub initial_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Growth factor per retry
    pub exponential_base: f64,

    /// Fraction of the delay removed at random
    pub jitter_factor: f64,

    /// Use Retry-After hints from rate limit errors
    pub respect_retry_after: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from(&FastRetryConfig::default())
    }
}

impl From<&FastRetryConfig> for Backoff {
    fn from(config: &FastRetryConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            exponential_base: config.exponential_base,
            jitter_factor: config.jitter_factor,
            respect_retry_after: config.respect_retry_after,
        }
    }
}

impl Backoff {
    /// Backoff without randomness
    pub fn deterministic(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            exponential_base: 2.0,
            jitter_factor: 0.0,
            respect_retry_after: false,
        }
    }

    /// Calculate the delay before the given retry
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let max_ms = self.max_delay.as_millis() as f64;
        let exponential =
            self.initial_delay.as_millis() as f64 * self.exponential_base.powi(retry as i32);

        let jittered = if self.jitter_factor > 0.0 {
            let mut rng = rand::thread_rng();
            let cut: f64 = rng.gen_range(0.0..=self.jitter_factor);
            exponential * (1.0 - cut)
        } else {
            exponential
        };

        // Jitter is applied before the cap so delays stay non-decreasing at the cap
        let capped = jittered.min(max_ms).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Delay before the given retry, stretched to a server hint when allowed
    ///
    /// A hint never shortens the computed delay and never exceeds `max_delay`.
    pub fn delay_for(&self, retry: u32, error: Option<&TransportError>) -> Duration {
        let computed = self.calculate_delay(retry);
        if !self.respect_retry_after {
            return computed;
        }

        match error.and_then(TransportError::retry_after) {
            Some(retry_after) => retry_after.max(computed).min(self.max_delay),
            None => computed,
        }
    }
}
