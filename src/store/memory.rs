// src/store/memory.rs
//! In-process store with the same visibility and update semantics as the
//! Elasticsearch store. Backs the tests and `--store memory` dry runs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::SnapshotDocument;

use super::{BulkItemOutcome, DocumentStore, FieldMutation, IndexSchema, Query};

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    created: bool,
    docs: BTreeMap<String, SnapshotDocument>,
    /// Ids containing any of these fragments are rejected by `bulk_write`.
    reject: BTreeSet<String>,
    fail_updates: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Documents matching `query`, ordered by id.
    pub fn search(&self, query: &Query) -> Vec<SnapshotDocument> {
        self.state().docs.values().filter(|d| query.matches(d)).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make `bulk_write` reject every document whose id contains `fragment`.
    pub fn reject_ids_containing(&self, fragment: &str) {
        self.state().reject.insert(s!(fragment));
    }

    /// Make `update_by_query` fail until switched off again.
    pub fn fail_updates(&self, on: bool) {
        self.state().fail_updates = on;
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_index(&self, _schema: &IndexSchema) -> Result<bool, StoreError> {
        let mut st = self.state();
        let created = !st.created;
        st.created = true;
        Ok(created)
    }

    async fn bulk_write(&self, docs: Vec<SnapshotDocument>) -> Result<Vec<BulkItemOutcome>, StoreError> {
        let mut st = self.state();
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            if let Some(frag) = st.reject.iter().find(|f| doc.id.contains(f.as_str())) {
                out.push(BulkItemOutcome::failed(doc.id, format!("rejected ({frag})")));
                continue;
            }
            out.push(BulkItemOutcome::ok(doc.id.clone()));
            st.docs.insert(doc.id.clone(), doc);
        }
        Ok(out)
    }

    async fn update_by_query(&self, query: &Query, mutation: &FieldMutation) -> Result<u64, StoreError> {
        let mut st = self.state();
        if st.fail_updates {
            return Err(StoreError::Response(s!("update_by_query unavailable")));
        }
        let mut n = 0;
        for doc in st.docs.values_mut().filter(|d| query.matches(d)) {
            mutation.apply(doc);
            n += 1;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CandidateRecord, Generation, RecordKind};

    fn docs(ts: &str, names: &[&str]) -> Vec<SnapshotDocument> {
        names
            .iter()
            .map(|n| {
                let rec = CandidateRecord::country(s!(*n), Some(1_000), None, None, None, None);
                SnapshotDocument::new(&rec, &Generation(s!(ts)), true)
            })
            .collect()
    }

    #[tokio::test]
    async fn ensure_index_is_idempotent() {
        let store = MemoryStore::new();
        assert!(store.ensure_index(&IndexSchema::snapshot()).await.unwrap());
        assert!(!store.ensure_index(&IndexSchema::snapshot()).await.unwrap());
    }

    #[tokio::test]
    async fn same_id_overwrites() {
        let store = MemoryStore::new();
        store.bulk_write(docs("T", &["Chad", "Chad"])).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn rejection_and_update() {
        let store = MemoryStore::new();
        store.reject_ids_containing("Mali");
        let out = store.bulk_write(docs("T1", &["Chad", "Mali"])).await.unwrap();
        assert!(out[0].is_ok());
        assert!(!out[1].is_ok());
        assert_eq!(store.len(), 1);

        let n = store
            .update_by_query(&Query::stale_current(vec![RecordKind::Country], "T2"), &FieldMutation::SetCurrent(false))
            .await
            .unwrap();
        assert_eq!(n, 1);
        assert!(store.search(&Query::current(RecordKind::Country)).is_empty());

        store.fail_updates(true);
        assert!(store.update_by_query(&Query::default(), &FieldMutation::SetCurrent(true)).await.is_err());
    }
}
