//! Two-tier retry policy for completion requests
//!
//! A fast tier retries with randomized exponential backoff for a bounded
//! number of attempts and wall-clock time. When it is exhausted the ask drops
//! into sleep mode: a fixed long wait followed by another attempt window,
//! repeated until an attempt succeeds.
//!
//! The decision logic lives in the pure [`transition`] function; the
//! [`ResilienceController`] only performs the actions it returns.

pub mod backoff;
pub mod controller;
pub mod state;

pub use backoff::Backoff;
pub use controller::{AskError, ResilienceController};
pub use state::{transition, Action, AttemptOutcome, RetryPhase, RetryPolicy, RetryState};
