//! Registry ledger rows.
//!
//! The registry is the sole source of truth for existence, identity and
//! status. Loading lives in `tessera-ledger`; the kernel only needs the shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Entity,
    ChildEntity,
    Comparison,
}

impl EntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::ChildEntity => "child_entity",
            Self::Comparison => "comparison",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Missing,
    Published,
    Deprecated,
    Duplicate,
}

impl PageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Published => "published",
            Self::Deprecated => "deprecated",
            Self::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub page_status: PageStatus,
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Keys outside the core contract, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RegistryEntry {
    pub fn new(id: &str, entry_type: EntryType, page_status: PageStatus) -> Self {
        Self {
            id: id.to_string(),
            entry_type,
            page_status,
            parent_id: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: &str) -> Self {
        self.parent_id = Some(parent_id.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_round_trips_with_extra_keys() {
        let raw = json!({
            "id": "binance-futures",
            "type": "child_entity",
            "page_status": "published",
            "parent_id": "binance",
            "name": "Binance Futures"
        });
        let entry: RegistryEntry = serde_json::from_value(raw.clone()).expect("entry parses");
        assert_eq!(entry.entry_type, EntryType::ChildEntity);
        assert_eq!(entry.parent_id.as_deref(), Some("binance"));
        assert_eq!(entry.extra.get("name"), Some(&json!("Binance Futures")));
        assert_eq!(serde_json::to_value(&entry).expect("serialize"), raw);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let raw = json!({"id": "x", "type": "entity", "page_status": "live", "parent_id": null});
        assert!(serde_json::from_value::<RegistryEntry>(raw).is_err());
    }
}
