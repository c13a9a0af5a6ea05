// src/model.rs
//! Records as they flow through one run, and the documents they become.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    World,
    #[default]
    Country,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::World => "world",
            RecordKind::Country => "country",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text of one table cell, tagged with its column position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawCell {
    pub index: usize,
    pub text: String,
}

pub type RawRow = Vec<RawCell>;

/// What a fetch hands to the extractor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawTable {
    /// Country ranking table body rows in source order.
    Rows(Vec<RawRow>),
    /// World dashboard counters: counter name → concatenated digit groups.
    Counters(BTreeMap<String, String>),
}

impl RawTable {
    /// Build a row table from plain cell strings.
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = String>,
    {
        RawTable::Rows(
            rows.into_iter()
                .map(|cells| {
                    cells
                        .into_iter()
                        .enumerate()
                        .map(|(index, text)| RawCell { index, text })
                        .collect()
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            RawTable::Rows(rows) => rows.len(),
            RawTable::Counters(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One extracted, typed record. Built once by the extractor, read-only afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(skip)]
    pub kind: RecordKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub country: Option<String>,
    pub current_population: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub yearly_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub net_change: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub migrants: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub med_age: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub births_today: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deaths_today: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub population_growth: Option<i64>,
}

impl CandidateRecord {
    pub fn country(
        name: String,
        current_population: Option<i64>,
        yearly_change: Option<f64>,
        net_change: Option<i64>,
        migrants: Option<i64>,
        med_age: Option<f64>,
    ) -> Self {
        Self {
            kind: RecordKind::Country,
            country: Some(name),
            current_population,
            yearly_change,
            net_change,
            migrants,
            med_age,
            births_today: None,
            deaths_today: None,
            population_growth: None,
        }
    }

    pub fn world(current_population: i64, births_today: i64, deaths_today: i64, population_growth: i64) -> Self {
        Self {
            kind: RecordKind::World,
            country: None,
            current_population: Some(current_population),
            yearly_change: None,
            net_change: None,
            migrants: None,
            med_age: None,
            births_today: Some(births_today),
            deaths_today: Some(deaths_today),
            population_growth: Some(population_growth),
        }
    }

    /// Stable key across generations: the canonical country name, or "world".
    pub fn key(&self) -> &str {
        match self.kind {
            RecordKind::World => "world",
            RecordKind::Country => self.country.as_deref().unwrap_or(""),
        }
    }
}

/// Output of validation; consumed once by the publisher.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidatedBatch {
    pub world: Option<CandidateRecord>,
    pub countries: Vec<CandidateRecord>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidatedBatch {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// World first, then countries in source order.
    pub fn records(&self) -> impl Iterator<Item = &CandidateRecord> {
        self.world.iter().chain(self.countries.iter())
    }

    pub fn len(&self) -> usize {
        self.world.iter().count() + self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The run timestamp that identifies every document one publish wrote.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Generation(pub String);

impl Generation {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted unit: record fields plus versioning metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredDocument")]
pub struct SnapshotDocument {
    #[serde(skip)]
    pub id: String,
    #[serde(flatten)]
    pub record: CandidateRecord,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    #[serde(rename = "@timestamp")]
    pub timestamp: String,
    pub is_current: bool,
}

impl SnapshotDocument {
    pub fn new(record: &CandidateRecord, generation: &Generation, is_current: bool) -> Self {
        let ts = generation.as_str();
        let id = match record.kind {
            RecordKind::World => format!("world_{ts}"),
            RecordKind::Country => format!("country_{}_{ts}", record.key()),
        };
        Self {
            id,
            record: record.clone(),
            kind: record.kind,
            timestamp: s!(ts),
            is_current,
        }
    }
}

/// Wire shape of a stored document. The record's kind and the id are
/// rebuilt from `type` and `@timestamp`.
#[derive(Deserialize)]
struct StoredDocument {
    #[serde(flatten)]
    record: CandidateRecord,
    #[serde(rename = "type")]
    kind: RecordKind,
    #[serde(rename = "@timestamp")]
    timestamp: String,
    is_current: bool,
}

impl From<StoredDocument> for SnapshotDocument {
    fn from(stored: StoredDocument) -> Self {
        let mut record = stored.record;
        record.kind = stored.kind;
        SnapshotDocument::new(&record, &Generation(stored.timestamp), stored.is_current)
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-05-01T10:00:00.000Z`.
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
