// src/fetch/browser.rs
//! Headless Chromium strategy (feature `browser`).
//!
//! Every attempt launches its own browser, loads the page, waits until the
//! page's readiness predicate holds, and reads the table through an in-page
//! script. The [`Session`] guard owns the browser and its CDP handler task so
//! that nothing outlives the attempt, whichever way it ends. A dropped CDP
//! connection is a transient [`FetchError::Session`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, SetBlockedUrLsParams, SetUserAgentOverrideParams};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::config::options::{FetchOptions, SourceOptions};
use crate::core::retry::Attempt;
use crate::error::FetchError;
use crate::fetch::{Diagnostics, PageSource, Target};
use crate::model::RawTable;
use crate::specs::countries::{self, SortState};
use crate::specs::world;

/// Heavy resources the tables never need.
const BLOCKED_URLS: [&str; 12] = [
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg",
    "*.css", "*.woff", "*.woff2", "*.ttf", "*.mp4", "*.webm",
];

/// Launch flags for containers without a usable /dev/shm or GPU.
const CHROME_ARGS: [&str; 3] = ["--disable-dev-shm-usage", "--disable-gpu", "--disable-extensions"];

pub struct BrowserSource {
    source: SourceOptions,
    fetch: FetchOptions,
    diagnostics: Diagnostics,
}

impl BrowserSource {
    pub fn new(source: SourceOptions, fetch: FetchOptions, diagnostics: Diagnostics) -> Self {
        Self { source, fetch, diagnostics }
    }

    async fn load(&self, page: &Page, target: Target) -> Result<RawTable, FetchError> {
        let url = target.url(&self.source);
        match tokio::time::timeout(self.fetch.navigation_timeout, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(FetchError::Navigation { url: s!(url), reason: e.to_string() }),
            Err(_) => {
                return Err(FetchError::Navigation {
                    url: s!(url),
                    reason: format!("timed out after {:?}", self.fetch.navigation_timeout),
                });
            }
        }

        let ready = match target {
            Target::World => world::ready_script(),
            Target::Countries => countries::ready_script(self.fetch.min_table_rows),
        };
        self.wait_ready(page, target, &ready).await?;

        match target {
            Target::World => {
                let counters = eval(page, world::counters_script()).await?;
                Ok(RawTable::Counters(counters))
            }
            Target::Countries => {
                self.sort_descending(page).await?;
                let rows: Vec<Vec<String>> = eval(page, countries::ROWS_SCRIPT).await?;
                let table = RawTable::from_rows(rows);
                if !countries::is_population_descending(&table) {
                    tracing::warn!(rows = table.len(), "country rows are not in descending population order");
                }
                Ok(table)
            }
        }
    }

    /// Poll the readiness script until it holds or the ready timeout elapses.
    async fn wait_ready(&self, page: &Page, target: Target, script: &str) -> Result<(), FetchError> {
        let started = Instant::now();
        loop {
            let ready: bool = eval(page, script).await.unwrap_or(false);
            if ready {
                tracing::debug!(%target, waited_ms = started.elapsed().as_millis() as u64, "page ready");
                return Ok(());
            }
            if started.elapsed() >= self.fetch.ready_timeout {
                return Err(FetchError::NotReady {
                    target,
                    waited_ms: started.elapsed().as_millis(),
                    detail: s!("readiness predicate never held"),
                });
            }
            tokio::time::sleep(self.fetch.ready_poll).await;
        }
    }

    /// Click the population header until it reports descending order.
    /// The state is re-read after every click so an already sorted table is
    /// never toggled back.
    async fn sort_descending(&self, page: &Page) -> Result<(), FetchError> {
        let mut state = header_state(page).await?;
        let Some(mut remaining) = state.map(SortState::clicks_to_descending) else {
            tracing::warn!("population header not found; keeping source order");
            return Ok(());
        };
        while remaining > 0 {
            page.find_element(countries::POPULATION_HEADER)
                .await
                .map_err(browser_err)?
                .click()
                .await
                .map_err(browser_err)?;
            tokio::time::sleep(self.fetch.settle).await;
            state = header_state(page).await?;
            remaining = match state {
                Some(SortState::Descending) | None => 0,
                Some(_) => remaining - 1,
            };
        }
        tracing::debug!(?state, "population sort");
        Ok(())
    }
}

#[derive(Deserialize)]
struct HeaderAttrs {
    class: String,
    aria: Option<String>,
}

async fn header_state(page: &Page) -> Result<Option<SortState>, FetchError> {
    let attrs: Option<HeaderAttrs> = eval(page, countries::HEADER_SORT_SCRIPT).await?;
    Ok(attrs.map(|a| SortState::from_header(&a.class, a.aria.as_deref())))
}

async fn eval<T: serde::de::DeserializeOwned>(page: &Page, script: impl Into<String>) -> Result<T, FetchError> {
    page.evaluate(script.into())
        .await
        .map_err(browser_err)?
        .into_value()
        .map_err(|e| FetchError::Browser(format!("script result: {e}")))
}

/// Connection-level CDP failures are worth another attempt with a fresh browser.
fn browser_err(e: CdpError) -> FetchError {
    match e {
        CdpError::Ws(_)
        | CdpError::Io(_)
        | CdpError::NoResponse
        | CdpError::UnexpectedWsMessage(_)
        | CdpError::ChannelSendError(_)
        | CdpError::Timeout
        | CdpError::LaunchTimeout(_) => FetchError::Session(e.to_string()),
        other => FetchError::Browser(other.to_string()),
    }
}

#[async_trait]
impl PageSource for BrowserSource {
    fn name(&self) -> &'static str { "browser" }

    async fn attempt(&self, target: Target, attempt: Attempt) -> Result<RawTable, FetchError> {
        let session = Session::launch(&self.fetch).await?;
        let result = match session.page(&self.source).await {
            Ok(page) => {
                let loaded = self.load(&page, target).await;
                if let Err(e) = &loaded
                    && attempt.ends_with(e)
                {
                    match page.screenshot(ScreenshotParams::builder().full_page(true).build()).await {
                        Ok(png) => {
                            self.diagnostics.capture(target, "png", &png).await;
                        }
                        Err(e) => tracing::warn!(%target, error = %e, "screenshot failed"),
                    }
                }
                if let Err(e) = page.close().await {
                    tracing::debug!(error = %e, "page close failed");
                }
                loaded
            }
            Err(e) => Err(e),
        };
        session.close().await;
        result
    }
}

/// Owns one browser process and its event-loop task.
struct Session {
    browser: Option<Browser>,
    handler: JoinHandle<()>,
}

impl Session {
    async fn launch(fetch: &FetchOptions) -> Result<Self, FetchError> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1920, 1080)
            .request_timeout(fetch.navigation_timeout)
            .args(CHROME_ARGS)
            .build()
            .map_err(FetchError::Browser)?;
        let (browser, mut events) = Browser::launch(config).await.map_err(browser_err)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        Ok(Self { browser: Some(browser), handler })
    }

    async fn page(&self, source: &SourceOptions) -> Result<Page, FetchError> {
        let browser = self.browser.as_ref().ok_or_else(|| FetchError::Browser(s!("browser closed")))?;
        let page = browser.new_page("about:blank").await.map_err(browser_err)?;
        page.execute(SetUserAgentOverrideParams::new(source.user_agent.clone()))
            .await
            .map_err(browser_err)?;
        page.execute(EnableParams::default()).await.map_err(browser_err)?;
        let blocked = BLOCKED_URLS.iter().map(|p| s!(*p)).collect();
        page.execute(SetBlockedUrLsParams::new(blocked)).await.map_err(browser_err)?;
        Ok(page)
    }

    async fn close(mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                tracing::debug!(error = %e, "browser close failed");
            }
            let _ = tokio::time::timeout(Duration::from_secs(5), browser.wait()).await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Dropping the Browser kills the child process; the handler loop
        // would otherwise keep polling a dead connection.
        self.handler.abort();
    }
}
