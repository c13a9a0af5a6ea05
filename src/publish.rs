// src/publish.rs
//! Snapshot publication: write a new generation, then retire the old one.
//!
//! The store offers no multi-document transaction, so the flip is two steps:
//!
//! 1. bulk-index the new generation with `is_current = true` (visible on return),
//! 2. set `is_current = false` on every current document of the same types
//!    whose `@timestamp` differs.
//!
//! Between the steps a reader may see two current documents per key. If step 2
//! fails the new generation is still complete and current; the stale flags are
//! cleared by the next successful publish, since step 2 matches every older
//! generation, not just the previous one.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::PublishError;
use crate::model::{Generation, RecordKind, SnapshotDocument, ValidatedBatch};
use crate::store::{DocumentStore, FieldMutation, Query};

/// Failure reasons kept in a report.
pub const MAX_FAILURE_SAMPLES: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlipOutcome {
    Completed { unmarked: u64 },
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishReport {
    pub generation: Generation,
    pub accepted: usize,
    pub failed: usize,
    pub failure_samples: Vec<String>,
    pub flip: FlipOutcome,
}

impl PublishReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && matches!(self.flip, FlipOutcome::Completed { .. })
    }
}

pub struct SnapshotPublisher {
    store: Arc<dyn DocumentStore>,
}

impl SnapshotPublisher {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn publish(&self, batch: &ValidatedBatch, timestamp: &str) -> Result<PublishReport, PublishError> {
        if !batch.is_valid() {
            return Err(PublishError::InvalidBatch(batch.errors.len()));
        }
        let generation = Generation(s!(timestamp));
        let docs: Vec<SnapshotDocument> =
            batch.records().map(|r| SnapshotDocument::new(r, &generation, true)).collect();
        let types: Vec<RecordKind> = docs.iter().map(|d| d.kind).collect::<BTreeSet<_>>().into_iter().collect();

        tracing::info!(%generation, docs = docs.len(), "writing generation");
        let outcomes = self.store.bulk_write(docs).await?;

        let mut accepted = 0;
        let mut failure_samples = Vec::new();
        for o in &outcomes {
            match &o.error {
                None => accepted += 1,
                Some(reason) if failure_samples.len() < MAX_FAILURE_SAMPLES => {
                    failure_samples.push(format!("{}: {reason}", o.id));
                }
                Some(_) => {}
            }
        }
        let failed = outcomes.len() - accepted;
        if failed > 0 {
            tracing::warn!(%generation, failed, samples = ?failure_samples, "documents rejected");
        }

        let flip = match self
            .store
            .update_by_query(&Query::stale_current(types, timestamp), &FieldMutation::SetCurrent(false))
            .await
        {
            Ok(unmarked) => {
                tracing::info!(%generation, unmarked, "previous generation retired");
                FlipOutcome::Completed { unmarked }
            }
            Err(e) => {
                tracing::error!(%generation, error = %e, "flag flip failed; older documents remain current");
                FlipOutcome::Failed(e.to_string())
            }
        };

        Ok(PublishReport { generation, accepted, failed, failure_samples, flip })
    }
}
