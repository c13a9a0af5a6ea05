// src/specs/countries.rs
//! Scraping *spec* for the country ranking table (`/world-population/population-by-country/`).
//!
//! Ground truth: `<table id="example2">`, one `<tr>` per country in `<tbody>`.
//! Column contract (0-based):
//!
//! | idx | column            |
//! |-----|-------------------|
//! | 1   | Country           |
//! | 2   | Population        |
//! | 3   | Yearly change (%) |
//! | 4   | Net change        |
//! | 7   | Migrants (net)    |
//! | 9   | Median age        |
//!
//! A row needs at least 10 cells and non-blank text in every bound column.

use scraper::{ElementRef, Html, Selector};

use crate::core::canon::AliasTable;
use crate::core::normalize::{is_blank, parse_integer, parse_percent_or_decimal};
use crate::core::sanitize::normalize_ws;
use crate::error::FetchError;
use crate::model::{CandidateRecord, RawCell, RawRow, RawTable};

use super::Extraction;

pub const NAME: usize = 1;
pub const POPULATION: usize = 2;
pub const YEARLY_CHANGE: usize = 3;
pub const NET_CHANGE: usize = 4;
pub const MIGRANTS: usize = 7;
pub const MED_AGE: usize = 9;
pub const MIN_CELLS: usize = 10;
pub const REQUIRED: [usize; 6] = [NAME, POPULATION, YEARLY_CHANGE, NET_CHANGE, MIGRANTS, MED_AGE];

pub const TABLE_ROWS: &str = "#example2 tbody tr";
/// Used when the page drops the `example2` id.
pub const FALLBACK_ROWS: &str = "table tbody tr";
pub const POPULATION_HEADER: &str = "#example2 thead th:nth-child(3)";

/* ---------------- static HTML ---------------- */

/// Parse the server-rendered page into raw rows.
pub fn parse_html(doc: &str) -> Result<RawTable, FetchError> {
    let html = Html::parse_document(doc);
    let primary = selector(TABLE_ROWS)?;
    let td = selector("td")?;

    let mut rows = read_rows(&html, &primary, &td);
    if rows.is_empty() {
        tracing::warn!("#example2 missing, falling back to first wide table");
        rows = read_rows(&html, &selector(FALLBACK_ROWS)?, &td)
            .into_iter()
            .filter(|r| r.len() >= MIN_CELLS)
            .collect();
    }
    Ok(RawTable::Rows(rows))
}

fn read_rows(html: &Html, rows: &Selector, td: &Selector) -> Vec<RawRow> {
    html.select(rows)
        .map(|tr| {
            tr.select(td)
                .enumerate()
                .map(|(index, cell)| RawCell { index, text: cell_text(cell) })
                .collect()
        })
        .collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    normalize_ws(&cell.text().collect::<String>())
}

pub(crate) fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::Selector(format!("{css}: {e}")))
}

/* ---------------- readiness / sorting ---------------- */

/// The table counts as loaded once it has more than `min_rows` rows and the
/// first row's name cell has text.
pub fn check_ready(table: &RawTable, min_rows: usize) -> Result<(), String> {
    let RawTable::Rows(rows) = table else {
        return Err(s!("expected table rows"));
    };
    if rows.len() <= min_rows {
        return Err(format!("{} rows, need more than {min_rows}", rows.len()));
    }
    match rows.first().and_then(|r| cell(r, NAME)) {
        Some(name) if !name.trim().is_empty() => Ok(()),
        _ => Err(s!("first row has no country name yet")),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortState {
    Descending,
    Ascending,
    Unsorted,
}

impl SortState {
    /// Read the DataTables sort marker off the population header cell.
    pub fn from_header(class_attr: &str, aria_sort: Option<&str>) -> Self {
        match aria_sort.map(|a| a.trim().to_ascii_lowercase()) {
            Some(a) if a == "descending" => return SortState::Descending,
            Some(a) if a == "ascending" => return SortState::Ascending,
            _ => {}
        }
        let classes: Vec<String> = class_attr.split_whitespace().map(str::to_ascii_lowercase).collect();
        if classes.iter().any(|c| c == "sorting_desc" || c == "desc" || c == "dt-ordering-desc") {
            SortState::Descending
        } else if classes.iter().any(|c| c == "sorting_asc" || c == "asc" || c == "dt-ordering-asc") {
            SortState::Ascending
        } else {
            SortState::Unsorted
        }
    }

    /// Header clicks needed to reach descending order (DataTables cycles asc → desc).
    pub fn clicks_to_descending(self) -> usize {
        match self {
            SortState::Descending => 0,
            SortState::Ascending => 1,
            SortState::Unsorted => 2,
        }
    }
}

/// Whether the population column already reads in descending order.
pub fn is_population_descending(table: &RawTable) -> bool {
    let RawTable::Rows(rows) = table else { return false };
    let pops: Vec<i64> = rows
        .iter()
        .filter_map(|r| cell(r, POPULATION).and_then(parse_integer))
        .collect();
    pops.windows(2).all(|w| w[0] >= w[1])
}

/* ---------------- browser scripts ---------------- */

pub fn ready_script(min_rows: usize) -> String {
    format!(
        r#"(() => {{
  const rows = document.querySelectorAll("{TABLE_ROWS}");
  const first = rows.length ? rows[0].querySelector("td:nth-child(2)") : null;
  return rows.length > {min_rows} && !!first && first.textContent.trim() !== "";
}})()"#
    )
}

pub const HEADER_SORT_SCRIPT: &str = r##"(() => {
  const th = document.querySelector("#example2 thead th:nth-child(3)");
  return th ? { class: th.className || "", aria: th.getAttribute("aria-sort") } : null;
})()"##;

pub const ROWS_SCRIPT: &str = r##"(() =>
  Array.from(document.querySelectorAll("#example2 tbody tr")).map(tr =>
    Array.from(tr.querySelectorAll("td")).map(td => (td.textContent || "").trim())
  )
)()"##;

/* ---------------- extraction ---------------- */

fn cell(row: &[RawCell], index: usize) -> Option<&str> {
    row.get(index)
        .filter(|c| c.index == index)
        .or_else(|| row.iter().find(|c| c.index == index))
        .map(|c| c.text.as_str())
}

/// Structural check: enough cells and every bound column non-blank.
pub fn row_is_valid(row: &[RawCell]) -> bool {
    row.len() >= MIN_CELLS && REQUIRED.iter().all(|&i| cell(row, i).is_some_and(|t| !is_blank(t)))
}

/// Rows → country records, source order preserved.
pub fn extract(rows: &[RawRow], aliases: &AliasTable) -> Extraction {
    let mut out = Extraction::default();
    for row in rows {
        if !row_is_valid(row) {
            out.dropped += 1;
            continue;
        }
        let text = |i| cell(row, i).unwrap_or("");
        let name = aliases.canonicalize(text(NAME));
        let record = CandidateRecord::country(
            name,
            parse_integer(text(POPULATION)),
            parse_percent_or_decimal(text(YEARLY_CHANGE)),
            parse_integer(text(NET_CHANGE)),
            parse_integer(text(MIGRANTS)),
            parse_percent_or_decimal(text(MED_AGE)),
        );
        let keep = record.current_population.is_some_and(|p| p > 0)
            && record.country.as_deref().is_some_and(|n| !n.is_empty());
        if keep {
            out.records.push(record);
        } else {
            out.dropped += 1;
        }
    }
    out
}
