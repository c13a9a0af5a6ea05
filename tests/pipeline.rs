// tests/pipeline.rs
mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use pop_scrape::core::canon::AliasTable;
use pop_scrape::error::FetchError;
use pop_scrape::fetch::{PageFetcher, Target};
use pop_scrape::model::{RawTable, RecordKind};
use pop_scrape::progress::RecordingProgress;
use pop_scrape::publish::FlipOutcome;
use pop_scrape::scrape::{Pipeline, RunOutcome};
use pop_scrape::store::{MemoryStore, Query};
use pop_scrape::validate::Validator;

/// Serves fixed tables; a missing target fails like an exhausted retry loop.
struct FixedFetcher {
    tables: Mutex<HashMap<Target, RawTable>>,
}

impl FixedFetcher {
    fn new(world: Option<RawTable>, countries: Option<RawTable>) -> Self {
        let mut tables = HashMap::new();
        if let Some(w) = world { tables.insert(Target::World, w); }
        if let Some(c) = countries { tables.insert(Target::Countries, c); }
        Self { tables: Mutex::new(tables) }
    }
}

#[async_trait]
impl PageFetcher for FixedFetcher {
    async fn fetch(&self, target: Target) -> Result<RawTable, FetchError> {
        self.tables.lock().unwrap().get(&target).cloned().ok_or_else(|| FetchError::Exhausted {
            target,
            attempts: 3,
            last: Box::new(FetchError::Transport("connection refused".into())),
        })
    }
}

fn pipeline(fetcher: FixedFetcher) -> (Arc<MemoryStore>, Pipeline) {
    let store = Arc::new(MemoryStore::new());
    let p = Pipeline::new(Arc::new(fetcher), store.clone(), AliasTable::default(), Validator::default());
    (store, p)
}

#[tokio::test]
async fn publishes_and_canonicalizes() {
    let fetcher = FixedFetcher::new(Some(common::world_table("8,045,311,447")), Some(common::country_table(234)));
    let (store, p) = pipeline(fetcher);
    let mut progress = RecordingProgress::default();

    let RunOutcome::Published(report) = p.run_once(Some(&mut progress)).await.unwrap() else {
        panic!("expected a published run");
    };
    assert_eq!(report.accepted, 235);
    assert_eq!(report.failed, 0);
    assert_eq!(report.flip, FlipOutcome::Completed { unmarked: 0 });
    assert!(progress.events.contains(&"countries: 234".to_string()));
    assert_eq!(progress.events.last().map(String::as_str), Some("finish"));

    let current = store.search(&Query::current(RecordKind::Country));
    assert_eq!(current.len(), 234);
    assert!(current.iter().any(|d| d.record.country.as_deref() == Some("USA")));
    assert!(!current.iter().any(|d| d.record.country.as_deref() == Some("United States")));

    let world = store.search(&Query::current(RecordKind::World));
    assert_eq!(world.len(), 1);
    assert_eq!(world[0].record.current_population, Some(8_045_311_447));
    assert_eq!(world[0].timestamp, report.generation.as_str());
}

#[tokio::test]
async fn latest_generation_is_current() {
    let fetcher = FixedFetcher::new(Some(common::world_table("8,045,311,447")), Some(common::country_table(234)));
    let (store, p) = pipeline(fetcher);

    let RunOutcome::Published(first) = p.run_once(None).await.unwrap() else { panic!() };
    // Generations are keyed by millisecond timestamps.
    tokio::time::sleep(Duration::from_millis(5)).await;
    let RunOutcome::Published(second) = p.run_once(None).await.unwrap() else { panic!() };

    assert_ne!(first.generation, second.generation);
    assert_eq!(second.flip, FlipOutcome::Completed { unmarked: 235 });

    let current = store.search(&Query { is_current: Some(true), ..Query::default() });
    assert_eq!(current.len(), 235);
    assert!(current.iter().all(|d| d.timestamp == second.generation.as_str()));

    let old = store.search(&Query::generation(first.generation.as_str()));
    assert_eq!(old.len(), 235);
    assert!(old.iter().all(|d| !d.is_current));
}

#[tokio::test]
async fn failed_country_fetch_rejects_batch() {
    let fetcher = FixedFetcher::new(Some(common::world_table("8,045,311,447")), None);
    let (store, p) = pipeline(fetcher);

    match p.run_once(None).await.unwrap() {
        RunOutcome::Rejected(batch) => {
            assert!(batch.errors.iter().any(|e| e.contains("countries")));
            assert!(batch.world.is_some());
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn implausible_world_population_rejects_batch() {
    let fetcher = FixedFetcher::new(Some(common::world_table("999,999")), Some(common::country_table(234)));
    let (store, p) = pipeline(fetcher);

    let RunOutcome::Rejected(batch) = p.run_once(None).await.unwrap() else { panic!() };
    assert!(batch.errors.iter().any(|e| e.contains("world population")));
    assert!(store.is_empty());
}
