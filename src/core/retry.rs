// src/core/retry.rs
//! Bounded retry with exponential backoff, expressed as an explicit state machine.
//!
//! ```text
//! Pending ──ok──────────────────────────▶ Succeeded
//!    │                                       ▲
//!    └─transient err─▶ Retrying(n) ──ok──────┘
//!                          │
//!                          └─err & (n+1 == max or permanent)─▶ Failed
//! ```
//!
//! Delays go through a [`Clock`] so tests can drive the loop without sleeping.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, d: Duration);
}

/// Real time, backed by tokio.
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, d: Duration) {
        tokio::time::sleep(d).await;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub factor: u32,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = self.factor.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(exp).min(self.max_delay)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryState {
    Pending,
    /// Number of retries already scheduled.
    Retrying(u32),
    Succeeded,
    Failed,
}

/// What the loop should do after an attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Done,
    Wait(Duration),
    GiveUp,
}

/// One attempt as seen by the operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based.
    pub number: u32,
    pub is_last: bool,
}

impl Attempt {
    /// Whether failing with `err` here ends the loop: either no attempts are
    /// left or the error is not worth retrying.
    pub fn ends_with<E: Transient>(self, err: &E) -> bool {
        self.is_last || !err.is_transient()
    }
}

impl RetryState {
    pub fn attempts_made(self) -> u32 {
        match self {
            RetryState::Pending => 0,
            RetryState::Retrying(n) => n,
            RetryState::Succeeded | RetryState::Failed => 0,
        }
    }

    /// Transition after an attempt finished. `outcome` is `None` on success,
    /// `Some(transient)` on failure.
    pub fn advance(self, policy: &RetryPolicy, outcome: Option<bool>) -> (RetryState, Step) {
        let made = self.attempts_made() + 1;
        match (self, outcome) {
            (RetryState::Succeeded | RetryState::Failed, _) => (self, Step::GiveUp),
            (_, None) => (RetryState::Succeeded, Step::Done),
            (_, Some(transient)) if !transient || made >= policy.max_attempts => {
                (RetryState::Failed, Step::GiveUp)
            }
            (_, Some(_)) => (RetryState::Retrying(made), Step::Wait(policy.delay_for(made))),
        }
    }
}

pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for crate::error::FetchError {
    fn is_transient(&self) -> bool {
        crate::error::FetchError::is_transient(self)
    }
}

pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
    pub state: RetryState,
}

/// Drive `op` until it succeeds, fails permanently, or runs out of attempts.
pub async fn run<T, E, F, Fut>(policy: &RetryPolicy, clock: &dyn Clock, mut op: F) -> RetryOutcome<T, E>
where
    E: Transient,
    F: FnMut(Attempt) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut state = RetryState::Pending;
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let attempt = Attempt { number: attempts, is_last: attempts >= policy.max_attempts };
        let result = op(attempt).await;
        let outcome = result.as_ref().err().map(Transient::is_transient);
        let (next, step) = state.advance(policy, outcome);
        state = next;
        match step {
            Step::Wait(d) => {
                if let Err(e) = &result {
                    tracing::debug!(attempt = attempts, delay_ms = d.as_millis() as u64, transient = e.is_transient(), "retrying");
                }
                clock.sleep(d).await;
            }
            Step::Done | Step::GiveUp => return RetryOutcome { result, attempts, state },
        }
    }
}
