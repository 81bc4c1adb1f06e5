//! Retry state machine
//!
//! An ask moves through `FastRetry -> SleepRetry -> Done`. With the default
//! policy `SleepRetry` never ends except by success; `Abandoned` is only
//! reachable when a maximum total duration is configured.

use super::backoff::Backoff;
use crate::config::ResilienceConfig;
use crate::http::TransportError;
use std::time::Duration;
use tokio::time::Instant;

/// Phase of one ask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPhase {
    /// Bounded exponential backoff (initial)
    FastRetry,
    /// Unbounded periodic retry after the fast tier gave up
    SleepRetry,
    /// An attempt succeeded
    Done,
    /// The configured total duration ran out
    Abandoned,
}

impl RetryPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RetryPhase::Done | RetryPhase::Abandoned)
    }
}

/// Outcome of the attempt that was just made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed,
}

/// What the controller does next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Hand the result to the caller
    Return,
    /// Wait, then retry inside the current window
    Backoff(Duration),
    /// Fast tier exhausted: announce sleep mode, wait, open a new window
    EnterSleep(Duration),
    /// A sleep-mode window failed: wait, open a new window
    SleepAgain(Duration),
    /// Stop retrying
    Abandon,
}

/// Retry limits for both tiers
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay calculator between attempts of a window
    pub backoff: Backoff,

    /// Attempts per window
    pub max_attempts: u32,

    /// Wall-clock budget per window
    pub max_elapsed: Duration,

    /// Fixed wait before each sleep-mode window
    pub sleep_delay: Duration,

    /// Sleep-mode windows use the full fast-retry budget; otherwise one attempt
    pub nested_fast_retry: bool,

    /// Total duration after which the ask is abandoned; `None` retries forever
    pub max_total: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ResilienceConfig::default())
    }
}

impl From<&ResilienceConfig> for RetryPolicy {
    fn from(config: &ResilienceConfig) -> Self {
        Self {
            backoff: Backoff::from(&config.fast),
            max_attempts: config.fast.max_attempts.max(1),
            max_elapsed: config.fast.max_elapsed(),
            sleep_delay: config.sleep.delay(),
            nested_fast_retry: config.sleep.nested_fast_retry,
            max_total: config.sleep.max_total(),
        }
    }
}

impl RetryPolicy {
    /// Attempt cap for a window opened in the given phase
    pub fn window_attempts(&self, phase: RetryPhase) -> u32 {
        match phase {
            RetryPhase::SleepRetry if !self.nested_fast_retry => 1,
            _ => self.max_attempts,
        }
    }
}

/// Bookkeeping for one ask; created fresh for every call
#[derive(Debug, Clone)]
pub struct RetryState {
    /// Transport calls made so far
    pub attempts: u32,

    /// Transport calls made in the current window
    pub window_attempts: u32,

    /// Sleep cycles entered so far
    pub sleep_cycles: u32,

    /// Error of the most recent failed attempt
    pub last_error: Option<TransportError>,

    /// Longest backoff taken in the current window
    pub window_backoff: Duration,

    started_at: Instant,
    window_started_at: Instant,
}

impl RetryState {
    pub fn new(now: Instant) -> Self {
        Self {
            attempts: 0,
            window_attempts: 0,
            sleep_cycles: 0,
            last_error: None,
            window_backoff: Duration::ZERO,
            started_at: now,
            window_started_at: now,
        }
    }

    /// Record a transport call and its error, if any
    pub fn record_attempt(&mut self, error: Option<TransportError>) {
        self.attempts += 1;
        self.window_attempts += 1;
        if error.is_some() {
            self.last_error = error;
        }
    }

    /// Record a backoff taken inside the current window
    pub fn record_backoff(&mut self, delay: Duration) {
        self.window_backoff = self.window_backoff.max(delay);
    }

    /// Start a new window after a sleep
    pub fn begin_window(&mut self, now: Instant) {
        self.sleep_cycles += 1;
        self.window_attempts = 0;
        self.window_backoff = Duration::ZERO;
        self.window_started_at = now;
    }

    /// Time since the first attempt
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// Time since the current window opened
    pub fn window_elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.window_started_at)
    }
}

/// Decide the next phase and action after an attempt
///
/// Pure: reads the policy and state, never sleeps or performs I/O.
pub fn transition(
    policy: &RetryPolicy,
    phase: RetryPhase,
    state: &RetryState,
    now: Instant,
    outcome: AttemptOutcome,
) -> (RetryPhase, Action) {
    match (phase, outcome) {
        (RetryPhase::Done, _) => (RetryPhase::Done, Action::Return),
        (RetryPhase::Abandoned, _) => (RetryPhase::Abandoned, Action::Abandon),
        (_, AttemptOutcome::Succeeded) => (RetryPhase::Done, Action::Return),
        (RetryPhase::FastRetry | RetryPhase::SleepRetry, AttemptOutcome::Failed) => {
            let window_elapsed = state.window_elapsed(now);
            let exhausted = state.window_attempts >= policy.window_attempts(phase)
                || window_elapsed >= policy.max_elapsed;

            if !exhausted {
                // Never shorter than an earlier backoff of this window, never past its budget
                let delay = policy
                    .backoff
                    .delay_for(state.window_attempts.saturating_sub(1), state.last_error.as_ref())
                    .max(state.window_backoff)
                    .min(policy.max_elapsed - window_elapsed);
                return (phase, Action::Backoff(delay));
            }

            if let Some(max_total) = policy.max_total {
                if state.elapsed(now) + policy.sleep_delay > max_total {
                    return (RetryPhase::Abandoned, Action::Abandon);
                }
            }

            match phase {
                RetryPhase::FastRetry => (RetryPhase::SleepRetry, Action::EnterSleep(policy.sleep_delay)),
                _ => (RetryPhase::SleepRetry, Action::SleepAgain(policy.sleep_delay)),
            }
        }
    }
}
