//! Case records.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One case record, keyed by case type column id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    /// Raw values keyed by case type column id.
    #[serde(default, deserialize_with = "deserialize_content")]
    pub content: HashMap<String, String>,
    /// Number of occurrences this record aggregates (absent means 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl Case {
    /// Create a case with no values.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: HashMap::new(),
            count: None,
        }
    }

    /// Set a raw value.
    pub fn with_value(mut self, case_type_col_id: impl Into<String>, raw: impl Into<String>) -> Self {
        self.content.insert(case_type_col_id.into(), raw.into());
        self
    }

    /// Set the aggregated count.
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Raw value for a column; empty and whitespace-only values count as absent.
    pub fn raw(&self, case_type_col_id: &str) -> Option<&str> {
        self.content
            .get(case_type_col_id)
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Contribution of this case to a count.
    pub fn weight(&self) -> u64 {
        self.count.unwrap_or(1)
    }
}

/// Accept strings, numbers and booleans as raw values; nulls are dropped.
fn deserialize_content<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: HashMap<String, Value> = HashMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            Value::Number(n) => Some((key, n.to_string())),
            Value::Bool(b) => Some((key, b.to_string())),
            other => Some((key, other.to_string())),
        })
        .collect())
}
