// src/runner.rs
//! Fixed-interval run loop.
//!
//! A run that ends in `Err` is retried after the short critical delay; any
//! other outcome (published or rejected) waits the regular interval.
//!
//! Shutdown only interrupts the sleep between runs. A run already in flight
//! is allowed to finish so a publish is never cut between its bulk write and
//! the flag flip.

use std::future::Future;
use std::time::Duration;

use crate::config::options::ScheduleOptions;
use crate::error::Error;
use crate::scrape::{Pipeline, RunOutcome};

/// Delay before the next run given how this one ended.
pub fn next_delay(result: &Result<RunOutcome, Error>, schedule: &ScheduleOptions) -> Duration {
    match result {
        Ok(_) => schedule.interval,
        Err(_) => schedule.critical_retry,
    }
}

/// Run until `shutdown` resolves. Returns the number of runs started.
/// `shutdown` is polled during runs too, so the signal is not missed.
pub async fn watch<F>(pipeline: &Pipeline, schedule: &ScheduleOptions, shutdown: F) -> usize
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut runs = 0;
    loop {
        runs += 1;
        tracing::info!(run = runs, "starting run");
        let run = pipeline.run_once(None);
        tokio::pin!(run);
        let mut stopping = false;
        let result = loop {
            tokio::select! {
                r = &mut run => break r,
                _ = &mut shutdown, if !stopping => {
                    tracing::info!(run = runs, "shutdown requested; finishing current run");
                    stopping = true;
                }
            }
        };
        match &result {
            Ok(RunOutcome::Published(r)) => tracing::info!(generation = %r.generation, "published"),
            Ok(RunOutcome::Rejected(b)) => tracing::warn!(errors = b.errors.len(), "batch rejected"),
            Err(e) => tracing::error!(error = %e, "critical error"),
        }
        if stopping {
            break;
        }
        let delay = next_delay(&result, schedule);
        tracing::debug!(delay_secs = delay.as_secs(), "sleeping");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = &mut shutdown => break,
        }
    }
    tracing::info!(runs, "run loop stopped");
    runs
}
