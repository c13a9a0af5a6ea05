// src/specs/world.rs
//! Scraping *spec* for the world dashboard (`/world-population/`).
//!
//! The live counters are `<span rel="...">` elements whose digits are split into
//! `.rts-nr-int` groups ("8", "045", "311", ...). The counter text is the
//! concatenation of those groups; the element text is used when no groups exist.

use std::collections::BTreeMap;

use scraper::Html;

use crate::core::normalize::parse_integer;
use crate::core::sanitize::normalize_ws;
use crate::error::FetchError;
use crate::model::{CandidateRecord, RawTable};

use super::countries::selector;

pub const CURRENT_POPULATION: &str = "current_population";
pub const BIRTHS_TODAY: &str = "births_today";
/// Sic: the site's own counter name.
pub const DEATHS_TODAY: &str = "dth1s_today";
pub const POPULATION_GROWTH: &str = "absolute_growth";

pub const COUNTERS: [&str; 4] = [CURRENT_POPULATION, BIRTHS_TODAY, DEATHS_TODAY, POPULATION_GROWTH];

pub fn parse_html(doc: &str) -> Result<RawTable, FetchError> {
    let html = Html::parse_document(doc);
    let groups = selector(".rts-nr-int")?;
    let mut counters = BTreeMap::new();

    for name in COUNTERS {
        let by_rel = selector(&format!("[rel='{name}']"))?;
        let Some(el) = html.select(&by_rel).next() else { continue };
        let joined: String = el
            .select(&groups)
            .map(|g| g.text().collect::<String>().trim().to_string())
            .collect();
        let text = if joined.is_empty() {
            normalize_ws(&el.text().collect::<String>())
        } else {
            joined
        };
        counters.insert(s!(name), text);
    }
    Ok(RawTable::Counters(counters))
}

/// The counters are populated by script; an empty population counter means
/// the page has not ticked yet.
pub fn check_ready(table: &RawTable) -> Result<(), String> {
    let RawTable::Counters(c) = table else {
        return Err(s!("expected counters"));
    };
    match c.get(CURRENT_POPULATION) {
        Some(v) if v.chars().any(|ch| ch.is_ascii_digit()) => Ok(()),
        _ => Err(s!("population counter empty")),
    }
}

pub fn ready_script() -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector("[rel='{CURRENT_POPULATION}']");
  return !!el && /[0-9]/.test(el.textContent || "");
}})()"#
    )
}

/// Returns `{ name: text }` for each counter, mirroring [`parse_html`].
pub fn counters_script() -> String {
    let names = COUNTERS.map(|n| format!("\"{n}\"")).join(", ");
    format!(
        r#"(() => {{
  const out = {{}};
  for (const rel of [{names}]) {{
    const el = document.querySelector(`[rel='${{rel}}']`);
    if (!el) continue;
    const groups = Array.from(el.querySelectorAll(".rts-nr-int")).map(e => e.textContent.trim()).join("");
    out[rel] = groups || (el.textContent || "").trim();
  }}
  return out;
}})()"#
    )
}

/// All four counters must parse; partial world data is discarded.
pub fn extract(counters: &BTreeMap<String, String>) -> Option<CandidateRecord> {
    let get = |name: &str| counters.get(name).and_then(|t| parse_integer(t));
    Some(CandidateRecord::world(
        get(CURRENT_POPULATION)?,
        get(BIRTHS_TODAY)?,
        get(DEATHS_TODAY)?,
        get(POPULATION_GROWTH)?,
    ))
}
