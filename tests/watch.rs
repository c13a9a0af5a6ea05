// tests/watch.rs
//! Run loop shutdown against a store whose flag flip is slow.
mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use pop_scrape::config::options::ScheduleOptions;
use pop_scrape::core::canon::AliasTable;
use pop_scrape::error::{FetchError, StoreError};
use pop_scrape::fetch::{PageFetcher, Target};
use pop_scrape::model::{RawTable, RecordKind, SnapshotDocument};
use pop_scrape::runner;
use pop_scrape::scrape::Pipeline;
use pop_scrape::store::{BulkItemOutcome, DocumentStore, FieldMutation, IndexSchema, MemoryStore, Query};
use pop_scrape::validate::Validator;

struct Pages;

#[async_trait]
impl PageFetcher for Pages {
    async fn fetch(&self, target: Target) -> Result<RawTable, FetchError> {
        Ok(match target {
            Target::World => common::world_table("8,045,311,447"),
            Target::Countries => common::country_table(234),
        })
    }
}

/// Signals after the second bulk write and takes a while to flip flags.
struct SlowFlip {
    inner: MemoryStore,
    writes: AtomicUsize,
    second_write: Notify,
}

#[async_trait]
impl DocumentStore for SlowFlip {
    async fn ensure_index(&self, schema: &IndexSchema) -> Result<bool, StoreError> {
        self.inner.ensure_index(schema).await
    }

    async fn bulk_write(&self, docs: Vec<SnapshotDocument>) -> Result<Vec<BulkItemOutcome>, StoreError> {
        let out = self.inner.bulk_write(docs).await?;
        if self.writes.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
            self.second_write.notify_one();
        }
        Ok(out)
    }

    async fn update_by_query(&self, query: &Query, mutation: &FieldMutation) -> Result<u64, StoreError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.inner.update_by_query(query, mutation).await
    }
}

#[tokio::test]
async fn shutdown_mid_publish_lets_the_flip_finish() {
    let store = Arc::new(SlowFlip { inner: MemoryStore::new(), writes: AtomicUsize::new(0), second_write: Notify::new() });
    let pipeline = Pipeline::new(Arc::new(Pages), store.clone(), AliasTable::default(), Validator::default());
    let schedule = ScheduleOptions { interval: Duration::from_millis(5), critical_retry: Duration::from_millis(5) };

    let runs = runner::watch(&pipeline, &schedule, store.second_write.notified()).await;
    assert_eq!(runs, 2);

    let current = store.inner.search(&Query::current(RecordKind::Country));
    let generations: BTreeSet<&str> = current.iter().map(|d| d.timestamp.as_str()).collect();
    assert_eq!(generations.len(), 1, "{generations:?}");
    assert_eq!(current.len(), 234);
    assert_eq!(store.inner.search(&Query::current(RecordKind::World)).len(), 1);
}
