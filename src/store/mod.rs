// src/store/mod.rs
//! Document store seam.
//!
//! The publisher only needs three operations: make sure the index exists,
//! bulk-index a generation, and flip a boolean on every document matching a
//! filter. [`elastic::ElasticStore`] speaks the Elasticsearch REST API;
//! [`memory::MemoryStore`] gives the same semantics in-process.

pub mod elastic;
pub mod memory;
pub mod schema;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{RecordKind, SnapshotDocument};

pub use elastic::ElasticStore;
pub use memory::MemoryStore;
pub use schema::IndexSchema;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the index with `schema` if it does not exist. Returns whether it was created.
    async fn ensure_index(&self, schema: &IndexSchema) -> Result<bool, StoreError>;

    /// Index every document; once this returns, written documents are visible
    /// to queries. Per-document failures come back as outcomes, not as `Err`.
    async fn bulk_write(&self, docs: Vec<SnapshotDocument>) -> Result<Vec<BulkItemOutcome>, StoreError>;

    /// Apply `mutation` to every document matching `query`; returns the number updated.
    async fn update_by_query(&self, query: &Query, mutation: &FieldMutation) -> Result<u64, StoreError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkItemOutcome {
    pub id: String,
    pub error: Option<String>,
}

impl BulkItemOutcome {
    pub fn ok(id: impl Into<String>) -> Self {
        Self { id: id.into(), error: None }
    }

    pub fn failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { id: id.into(), error: Some(reason.into()) }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimestampFilter {
    Eq(String),
    NotEq(String),
}

/// Conjunction of filters; `None`/empty means "any".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    pub types: Vec<RecordKind>,
    pub is_current: Option<bool>,
    pub timestamp: Option<TimestampFilter>,
}

impl Query {
    /// Current documents of `types` that do not belong to generation `ts`.
    pub fn stale_current(types: Vec<RecordKind>, ts: &str) -> Self {
        Self { types, is_current: Some(true), timestamp: Some(TimestampFilter::NotEq(s!(ts))) }
    }

    pub fn current(kind: RecordKind) -> Self {
        Self { types: vec![kind], is_current: Some(true), timestamp: None }
    }

    pub fn generation(ts: &str) -> Self {
        Self { timestamp: Some(TimestampFilter::Eq(s!(ts))), ..Self::default() }
    }

    pub fn matches(&self, doc: &SnapshotDocument) -> bool {
        (self.types.is_empty() || self.types.contains(&doc.kind))
            && self.is_current.is_none_or(|c| c == doc.is_current)
            && match &self.timestamp {
                None => true,
                Some(TimestampFilter::Eq(ts)) => doc.timestamp == *ts,
                Some(TimestampFilter::NotEq(ts)) => doc.timestamp != *ts,
            }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldMutation {
    SetCurrent(bool),
}

impl FieldMutation {
    pub fn apply(self, doc: &mut SnapshotDocument) {
        match self {
            FieldMutation::SetCurrent(v) => doc.is_current = v,
        }
    }
}
