use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A typed key-value entry. The kind of a key is established by its
/// first write; the profile layer refuses mutations that would change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Counter(i64),
    Text(String),
    Bool(bool),
    StringSet(BTreeSet<String>),
}

impl AttributeValue {
    /// Stable kind tag stored alongside the value.
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Counter(_) => "counter",
            AttributeValue::Text(_) => "text",
            AttributeValue::Bool(_) => "bool",
            AttributeValue::StringSet(_) => "string_set",
        }
    }

    /// Serialize just the inner value for storage.
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            AttributeValue::Counter(n) => serde_json::to_string(n),
            AttributeValue::Text(s) => serde_json::to_string(s),
            AttributeValue::Bool(b) => serde_json::to_string(b),
            AttributeValue::StringSet(set) => serde_json::to_string(set),
        }
    }

    /// Reassemble a value from its stored kind tag and JSON body.
    /// Returns `None` for unknown kinds or bodies that do not parse,
    /// which the integrity scan treats as malformed rows.
    pub fn from_parts(kind: &str, json: &str) -> Option<Self> {
        match kind {
            "counter" => serde_json::from_str(json).ok().map(AttributeValue::Counter),
            "text" => serde_json::from_str(json).ok().map(AttributeValue::Text),
            "bool" => serde_json::from_str(json).ok().map(AttributeValue::Bool),
            "string_set" => serde_json::from_str(json)
                .ok()
                .map(AttributeValue::StringSet),
            _ => None,
        }
    }
}
