// src/core/canon.rs
//! Country name canonicalization.
//!
//! The alias table is fixed configuration: built once at start-up (defaults or
//! a TOML override) and handed to the extractor. Construction rejects tables
//! that would make `canonicalize` non-idempotent.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::config::consts::DEFAULT_ALIASES;
use crate::core::sanitize::{normalize_ws, strip_annotations};
use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasTable {
    map: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct AliasFile {
    aliases: BTreeMap<String, String>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let map = DEFAULT_ALIASES
            .iter()
            .map(|(raw, canon)| (s!(*raw), s!(*canon)))
            .collect();
        Self { map }
    }
}

impl AliasTable {
    pub fn new<I, K, V>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: BTreeMap<String, String> = entries
            .into_iter()
            .map(|(k, v)| (normalize_ws(&k.into()), v.into()))
            .collect();

        for (raw, canon) in &map {
            if canon.is_empty() || strip_annotations(canon) != *canon {
                return Err(ConfigError::Alias(format!(
                    "target {canon:?} for {raw:?} is not a clean name"
                )));
            }
            if let Some(next) = map.get(canon) {
                if next != canon {
                    return Err(ConfigError::Alias(format!(
                        "target {canon:?} for {raw:?} is itself aliased to {next:?}"
                    )));
                }
            }
        }
        Ok(Self { map })
    }

    /// Parse a `[aliases]` TOML table.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: AliasFile = toml::from_str(text)?;
        Self::new(file.aliases)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn len(&self) -> usize { self.map.len() }
    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    /// Source label → canonical name. Unknown labels are cleaned of bracketed
    /// annotations and whitespace noise and passed through.
    pub fn canonicalize(&self, raw: &str) -> String {
        let trimmed = normalize_ws(raw);
        if let Some(hit) = self.map.get(&trimmed) {
            return hit.clone();
        }
        let cleaned = strip_annotations(&trimmed);
        match self.map.get(&cleaned) {
            Some(hit) => hit.clone(),
            None => cleaned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_aliases_apply() {
        let t = AliasTable::default();
        assert_eq!(t.canonicalize("United States"), "USA");
        assert_eq!(t.canonicalize("Iran (Islamic Republic of)"), "Iran");
        assert_eq!(t.canonicalize(" Viet Nam "), "Vietnam");
        assert_eq!(t.canonicalize("Congo"), "DR Congo");
    }

    #[test]
    fn miss_strips_annotations() {
        let t = AliasTable::default();
        assert_eq!(t.canonicalize("Bolivia (Plurinational State of)"), "Bolivia");
        assert_eq!(t.canonicalize("Germany [1]"), "Germany");
        assert_eq!(t.canonicalize("Congo [note]"), "DR Congo");
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let t = AliasTable::default();
        let inputs = [
            "United States", "USA", "Congo", "Congo (Brazzaville)", "Czechia",
            "  South\u{a0}Korea ", "Iran (Islamic Republic of)", "(", "]x[",
            "", "Côte d'Ivoire", "Micronesia (Fed. States of) [a]",
        ];
        for raw in inputs {
            let once = t.canonicalize(raw);
            assert_eq!(t.canonicalize(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn rejects_chained_aliases() {
        let err = AliasTable::new([("A", "B"), ("B", "C")]);
        assert!(matches!(err, Err(ConfigError::Alias(_))));
    }

    #[test]
    fn rejects_unclean_targets() {
        assert!(AliasTable::new([("A", "B (x)")]).is_err());
        assert!(AliasTable::new([("A", "")]).is_err());
    }

    #[test]
    fn toml_override() {
        let t = AliasTable::from_toml_str(
            r#"
            [aliases]
            "Türkiye" = "Turkey"
            "Russian Federation" = "Russia"
            "#,
        )
        .unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.canonicalize("Türkiye"), "Turkey");
        assert_eq!(t.canonicalize("United States"), "United States");
    }
}
