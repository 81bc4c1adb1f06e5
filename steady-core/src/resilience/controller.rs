//! Resilience controller driving the retry state machine

use super::state::{transition, Action, AttemptOutcome, RetryPhase, RetryPolicy, RetryState};
use crate::http::{Transport, TransportError};
use crate::logging::{LogLevel, LogSink};
use crate::protocol::ChatRequest;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Error returned by an ask
///
/// Only produced when a maximum total duration is configured; with the
/// default policy an ask retries until it succeeds.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AskError {
    #[error("Gave up after {attempts} attempts over {elapsed:?}: {last_error}")]
    Abandoned {
        attempts: u32,
        elapsed: Duration,
        last_error: TransportError,
    },
}

/// Wraps a transport with the two-tier retry policy
pub struct ResilienceController<T> {
    transport: T,
    policy: RetryPolicy,
    sink: Arc<dyn LogSink>,
}

impl<T: Transport> ResilienceController<T> {
    pub fn new(transport: T, policy: RetryPolicy, sink: Arc<dyn LogSink>) -> Self {
        Self {
            transport,
            policy,
            sink,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send the request until an attempt succeeds
    pub async fn execute(&self, request: &ChatRequest) -> Result<String, AskError> {
        let mut state = RetryState::new(Instant::now());
        let mut phase = RetryPhase::FastRetry;

        loop {
            let result = self.transport.send(request).await;
            let outcome = match result {
                Ok(_) => AttemptOutcome::Succeeded,
                Err(_) => AttemptOutcome::Failed,
            };
            state.record_attempt(result.as_ref().err().cloned());

            let (next, action) = transition(&self.policy, phase, &state, Instant::now(), outcome);
            phase = next;

            match (result, action) {
                (Ok(text), _) => {
                    if state.attempts > 1 {
                        info!(
                            "Request succeeded after {} attempts ({} sleep cycles)",
                            state.attempts, state.sleep_cycles
                        );
                    }
                    return Ok(text);
                }
                (Err(error), Action::Backoff(delay)) => {
                    debug!(
                        "Attempt {} failed ({}), retrying in {:?}",
                        state.attempts, error, delay
                    );
                    state.record_backoff(delay);
                    sleep(delay).await;
                }
                (Err(error), Action::EnterSleep(delay)) => {
                    self.sink.log(
                        &format!(
                            "exceeded retries, entering sleep mode after {} attempts: {}",
                            state.window_attempts, error
                        ),
                        LogLevel::Error,
                    );
                    self.sleep_cycle(&mut state, delay).await;
                }
                (Err(error), Action::SleepAgain(delay)) => {
                    self.sink.log(
                        &format!("request failed in sleep mode: {}", error),
                        LogLevel::Error,
                    );
                    self.sleep_cycle(&mut state, delay).await;
                }
                // A failed attempt in a terminal phase ends the ask like an abandonment
                (Err(error), Action::Abandon | Action::Return) => {
                    return Err(self.give_up(&state, error));
                }
            }
        }
    }

    fn give_up(&self, state: &RetryState, error: TransportError) -> AskError {
        let elapsed = state.elapsed(Instant::now());
        self.sink.log(
            &format!(
                "giving up after {} attempts over {:?}: {}",
                state.attempts, elapsed, error
            ),
            LogLevel::Error,
        );
        AskError::Abandoned {
            attempts: state.attempts,
            elapsed,
            last_error: error,
        }
    }

    async fn sleep_cycle(&self, state: &mut RetryState, delay: Duration) {
        self.sink.log(
            &format!("sleeping before retrying ({:?})", delay),
            LogLevel::Info,
        );
        sleep(delay).await;
        state.begin_window(Instant::now());
    }
}
