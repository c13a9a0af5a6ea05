// src/fetch/static_http.rs
//! Static strategy: one HTTP GET, then parse the server-rendered HTML.
//!
//! There is nothing to wait for after the response arrives, so the readiness
//! predicate runs once per attempt; a miss is a transient `NotReady` and the
//! retry loop tries again.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::config::options::{FetchOptions, SourceOptions};
use crate::core::retry::Attempt;
use crate::error::{ConfigError, FetchError};
use crate::fetch::{Diagnostics, PageSource, Target};
use crate::model::RawTable;
use crate::specs;

pub struct StaticSource {
    client: Client,
    source: SourceOptions,
    min_table_rows: usize,
    diagnostics: Diagnostics,
}

impl StaticSource {
    pub fn new(source: SourceOptions, fetch: &FetchOptions, diagnostics: Diagnostics) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(source.user_agent.clone())
            .timeout(fetch.static_timeout)
            .build()
            .map_err(|e| ConfigError::Invalid { key: "USER_AGENT", value: e.to_string() })?;
        Ok(Self { client, source, min_table_rows: fetch.min_table_rows, diagnostics })
    }

    /// The country table is cached aggressively upstream; bust it per request.
    pub fn request_url(&self, target: Target, now_millis: i64) -> String {
        let base = target.url(&self.source);
        match target {
            Target::World => s!(base),
            Target::Countries => {
                let sep = if base.contains('?') { '&' } else { '?' };
                format!("{base}{sep}t={now_millis}")
            }
        }
    }

    /// Status and body; only transport failures are errors here.
    async fn get(&self, url: &str) -> Result<(StatusCode, String), FetchError> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                FetchError::Navigation { url: s!(url), reason: e.to_string() }
            } else {
                FetchError::from(e)
            }
        })?;
        let status = resp.status();
        Ok((status, resp.text().await?))
    }
}

#[async_trait]
impl PageSource for StaticSource {
    fn name(&self) -> &'static str { "static" }

    async fn attempt(&self, target: Target, attempt: Attempt) -> Result<RawTable, FetchError> {
        let url = self.request_url(target, chrono::Utc::now().timestamp_millis());
        let started = Instant::now();
        let (status, body) = self.get(&url).await?;

        let checked = if !status.is_success() {
            Err(FetchError::Status { url, status: status.as_u16() })
        } else {
            specs::parse_html(target, &body).and_then(|table| {
                specs::check_ready(target, &table, self.min_table_rows)
                    .map(|()| table)
                    .map_err(|detail| FetchError::NotReady {
                        target,
                        waited_ms: started.elapsed().as_millis(),
                        detail,
                    })
            })
        };

        if let Err(e) = &checked
            && attempt.ends_with(e)
            && !body.is_empty()
        {
            self.diagnostics.capture(target, "html", body.as_bytes()).await;
        }
        checked
    }
}
