// src/fetch/mod.rs
//! Page acquisition.
//!
//! [`PageFetcher`] is the capability the pipeline depends on. Two strategies
//! implement a single attempt ([`PageSource`]): plain HTTP + DOM parse, and a
//! headless browser (feature `browser`). [`Retrying`] wraps either one with the
//! bounded backoff loop from `core::retry`.

pub mod diagnostics;
pub mod static_http;

#[cfg(feature = "browser")]
pub mod browser;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::options::{FetchMode, FetchOptions, SourceOptions};
use crate::core::retry::{self, Attempt, Clock, RetryPolicy, TokioClock};
use crate::error::{ConfigError, FetchError};
use crate::model::RawTable;

pub use diagnostics::Diagnostics;

/// Which of the two source pages to load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    World,
    Countries,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Target::World => "world",
            Target::Countries => "countries",
        }
    }

    pub fn url(self, source: &SourceOptions) -> &str {
        match self {
            Target::World => &source.world_url,
            Target::Countries => &source.countries_url,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Load `target` and return its raw table. Never an empty success on failure.
    async fn fetch(&self, target: Target) -> Result<RawTable, FetchError>;
}

/// One attempt at loading a page. A source captures diagnostics when its
/// failure ends the loop (`Attempt::ends_with`).
#[async_trait]
pub trait PageSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn attempt(&self, target: Target, attempt: Attempt) -> Result<RawTable, FetchError>;
}

/// Retry wrapper turning a [`PageSource`] into a [`PageFetcher`].
pub struct Retrying<S> {
    source: S,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl<S: PageSource> Retrying<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self::with_clock(source, policy, Arc::new(TokioClock))
    }

    pub fn with_clock(source: S, policy: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { source, policy, clock }
    }
}

#[async_trait]
impl<S: PageSource> PageFetcher for Retrying<S> {
    async fn fetch(&self, target: Target) -> Result<RawTable, FetchError> {
        let outcome = retry::run(&self.policy, self.clock.as_ref(), |attempt| {
            tracing::debug!(source = self.source.name(), %target, attempt = attempt.number, "fetch attempt");
            self.source.attempt(target, attempt)
        })
        .await;

        match outcome.result {
            Ok(table) => {
                tracing::info!(%target, rows = table.len(), attempts = outcome.attempts, "fetched");
                Ok(table)
            }
            Err(last) => {
                tracing::error!(%target, attempts = outcome.attempts, error = %last, "fetch failed");
                Err(FetchError::Exhausted { target, attempts: outcome.attempts, last: Box::new(last) })
            }
        }
    }
}

/// Build the configured fetch strategy.
pub fn build(source: &SourceOptions, fetch: &FetchOptions) -> Result<Arc<dyn PageFetcher>, ConfigError> {
    let diagnostics = Diagnostics::new(fetch.diagnostics_dir.clone());
    match fetch.mode {
        FetchMode::Static => {
            let src = static_http::StaticSource::new(source.clone(), fetch, diagnostics)?;
            Ok(Arc::new(Retrying::new(src, fetch.retry.clone())))
        }
        #[cfg(feature = "browser")]
        FetchMode::Browser => {
            let src = browser::BrowserSource::new(source.clone(), fetch.clone(), diagnostics);
            Ok(Arc::new(Retrying::new(src, fetch.retry.clone())))
        }
        #[cfg(not(feature = "browser"))]
        FetchMode::Browser => Err(ConfigError::BrowserUnavailable),
    }
}
