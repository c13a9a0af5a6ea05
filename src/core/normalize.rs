// src/core/normalize.rs
//! Locale-tolerant number parsing for scraped cell text.
//!
//! Both parsers fail soft: anything unparsable becomes `None`, never an error.
//! They return `None` exactly when the input carries no ASCII digit.

use std::sync::LazyLock;

use regex::Regex;

static INT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?[0-9]+").expect("static regex"));

static DEC_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?(?:[0-9]+\.?[0-9]*|\.[0-9]+)").expect("static regex"));

/// `"1,234,567"` → `1234567`, `"-12 345"` → `-12345`, `"N/A"` → `None`.
///
/// Keeps digits and `-` only, collapses `--` into `-`, then reads the first
/// signed digit run. Magnitudes beyond `i64` saturate.
pub fn parse_integer(text: &str) -> Option<i64> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    let collapsed = kept.replace("--", "-");

    let token = INT_TOKEN.find(&collapsed)?.as_str();
    Some(token.parse::<i64>().unwrap_or_else(|_| {
        if token.starts_with('-') { i64::MIN } else { i64::MAX }
    }))
}

/// `"-0.12%"` → `-0.12`, `"1,5 %"` → `1.5`, `"N/A"` → `None`.
///
/// Decimal commas become dots; the result is rounded to 2 decimal places so
/// stored change/percentage values stay stable between runs.
pub fn parse_percent_or_decimal(text: &str) -> Option<f64> {
    let cleaned: String = text
        .replace('%', "")
        .replace(',', ".")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let token = DEC_TOKEN.find(&cleaned)?.as_str();
    let value: f64 = token.parse().ok()?;
    value.is_finite().then(|| round2(value))
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// True when the cell carries nothing usable (`""`, whitespace, `N/A`).
pub fn is_blank(text: &str) -> bool {
    let t = text.trim();
    t.is_empty() || t.eq_ignore_ascii_case("n/a")
}
