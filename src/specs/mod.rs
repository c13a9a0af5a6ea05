//! # Page specs
//!
//! One module per source page. Each spec encodes *where the ground truth lives*
//! on its page and *how to turn it into typed records*:
//!
//! - selectors and in-page scripts used by both fetch strategies,
//! - readiness predicates (has the asynchronously loaded content arrived?),
//! - the column/counter contract and the extraction into `CandidateRecord`s.
//!
//! Specs never do IO. Fetchers decide how a page is loaded; the pipeline decides
//! what happens with the records.
//!
//! ```text
//! fetch::PageFetcher ─▶ RawTable ─▶ specs::extract ─▶ Extraction ─▶ validate
//! ```
pub mod countries;
pub mod world;

use crate::core::canon::AliasTable;
use crate::fetch::Target;
use crate::model::{CandidateRecord, RawTable};

/// Records produced from one page, plus how many rows/records were dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    pub records: Vec<CandidateRecord>,
    pub dropped: usize,
}

/// Apply the page contract for `target` to a fetched table.
///
/// A table of the wrong shape for the target yields an empty extraction with
/// everything counted as dropped.
pub fn extract(table: &RawTable, target: Target, aliases: &AliasTable) -> Extraction {
    match (target, table) {
        (Target::Countries, RawTable::Rows(rows)) => countries::extract(rows, aliases),
        (Target::World, RawTable::Counters(counters)) => match world::extract(counters) {
            Some(world) => Extraction { records: vec![world], dropped: 0 },
            None => Extraction { records: Vec::new(), dropped: 1 },
        },
        (_, other) => Extraction { records: Vec::new(), dropped: other.len().max(1) },
    }
}

/// Parse a static HTML document for `target`.
pub fn parse_html(target: Target, doc: &str) -> Result<RawTable, crate::error::FetchError> {
    match target {
        Target::World => world::parse_html(doc),
        Target::Countries => countries::parse_html(doc),
    }
}

/// Readiness predicate for `target`.
pub fn check_ready(target: Target, table: &RawTable, min_rows: usize) -> Result<(), String> {
    match target {
        Target::World => world::check_ready(table),
        Target::Countries => countries::check_ready(table, min_rows),
    }
}
