// src/scrape.rs
//! One end-to-end run: fetch both pages concurrently, extract, validate, and
//! publish a new generation when the batch holds up.

use std::sync::Arc;
use std::time::Instant;

use crate::core::canon::AliasTable;
use crate::error::Result;
use crate::fetch::{PageFetcher, Target};
use crate::model::{ValidatedBatch, timestamp_now};
use crate::progress::Progress;
use crate::publish::{PublishReport, SnapshotPublisher};
use crate::specs::{self, Extraction};
use crate::store::{DocumentStore, IndexSchema};
use crate::validate::Validator;

/// Stages reported through [`Progress::begin`].
const STAGES: usize = 4;

#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Published(PublishReport),
    /// Validation failed; nothing was written.
    Rejected(ValidatedBatch),
}

pub struct Pipeline {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn DocumentStore>,
    aliases: AliasTable,
    validator: Validator,
    publisher: SnapshotPublisher,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn DocumentStore>,
        aliases: AliasTable,
        validator: Validator,
    ) -> Self {
        let publisher = SnapshotPublisher::new(store.clone());
        Self { fetcher, store, aliases, validator, publisher }
    }

    /// Create the index when missing. Safe to call every run.
    pub async fn bootstrap(&self) -> Result<bool> {
        Ok(self.store.ensure_index(&IndexSchema::snapshot()).await?)
    }

    /// Fetch and extract one page. A failed fetch is logged and yields an
    /// empty extraction; validation decides what that means for the batch.
    pub async fn acquire(&self, target: Target) -> Extraction {
        match self.fetcher.fetch(target).await {
            Ok(table) => {
                let out = specs::extract(&table, target, &self.aliases);
                tracing::info!(%target, records = out.records.len(), dropped = out.dropped, "extracted");
                out
            }
            Err(e) => {
                tracing::error!(%target, error = %e, "no data for this run");
                Extraction::default()
            }
        }
    }

    /// `Err` only for critical failures (index bootstrap, bulk request).
    pub async fn run_once(&self, mut progress: Option<&mut dyn Progress>) -> Result<RunOutcome> {
        let started = Instant::now();
        if let Some(p) = progress.as_deref_mut() {
            p.begin(STAGES);
        }

        self.bootstrap().await?;

        let (world, countries) = tokio::join!(self.acquire(Target::World), self.acquire(Target::Countries));
        if let Some(p) = progress.as_deref_mut() {
            p.page_done(Target::World, world.records.len());
            p.page_done(Target::Countries, countries.records.len());
        }

        let batch = self.validator.validate(world.records.into_iter().next(), countries.records);
        for w in &batch.warnings {
            tracing::warn!("validation: {w}");
        }
        if !batch.is_valid() {
            tracing::error!(errors = ?batch.errors, "validation failed, nothing published");
            if let Some(p) = progress.as_deref_mut() {
                p.log(&join!("validation failed: ", &batch.errors.join("; ")));
                p.finish();
            }
            return Ok(RunOutcome::Rejected(batch));
        }

        let ts = timestamp_now();
        let report = self.publisher.publish(&batch, &ts).await;
        if let Some(p) = progress.as_deref_mut() {
            match &report {
                Ok(r) => p.log(&format!("published {} documents as {}", r.accepted, r.generation)),
                Err(e) => p.log(&format!("publish failed: {e}")),
            }
            p.finish();
        }
        let report = report?;
        tracing::info!(
            generation = %report.generation,
            accepted = report.accepted,
            failed = report.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run complete"
        );
        Ok(RunOutcome::Published(report))
    }
}
