// src/store/schema.rs
use serde_json::{Value, json};

/// Index settings and mappings sent on creation.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexSchema {
    pub body: Value,
}

impl IndexSchema {
    /// Strict mapping for snapshot documents: unknown fields are rejected.
    pub fn snapshot() -> Self {
        Self {
            body: json!({
                "mappings": {
                    "dynamic": "strict",
                    "properties": {
                        "country":            { "type": "keyword" },
                        "current_population": { "type": "long" },
                        "yearly_change":      { "type": "scaled_float", "scaling_factor": 100 },
                        "net_change":         { "type": "integer" },
                        "migrants":           { "type": "integer" },
                        "med_age":            { "type": "float" },
                        "births_today":       { "type": "long" },
                        "deaths_today":       { "type": "long" },
                        "population_growth":  { "type": "long" },
                        "@timestamp":         { "type": "date" },
                        "is_current":         { "type": "boolean" },
                        "type":               { "type": "keyword" }
                    }
                }
            }),
        }
    }

    pub fn fields(&self) -> Vec<&str> {
        self.body["mappings"]["properties"]
            .as_object()
            .map(|p| p.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}
