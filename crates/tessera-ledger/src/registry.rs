//! Registry ledger loading.

use crate::error::LoadError;
use crate::substrate::read_substrate;
use std::collections::BTreeMap;
use std::path::Path;
use tessera_kernel::RegistryEntry;
use tracing::debug;

/// The ledger in file order, with an id index. When an id repeats, the
/// first entry wins the index; the graph check reports the duplicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
    index: BTreeMap<String, usize>,
}

impl Registry {
    pub fn from_entries(entries: Vec<RegistryEntry>) -> Self {
        let mut index = BTreeMap::new();
        for (pos, entry) in entries.iter().enumerate() {
            index.entry(entry.id.clone()).or_insert(pos);
        }
        Self { entries, index }
    }

    /// Parse a registry document. The whole array must be well typed.
    pub fn parse(path: &Path, text: &str) -> Result<Self, LoadError> {
        let entries: Vec<RegistryEntry> =
            serde_json::from_str(text).map_err(|source| LoadError::Registry {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self::from_entries(entries))
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = read_substrate(path)?;
        let registry = Self::parse(path, &text)?;
        debug!(path = %path.display(), entries = registry.len(), "registry loaded");
        Ok(registry)
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&RegistryEntry> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TempDirGuard;
    use tessera_kernel::{EntryType, PageStatus};

    #[test]
    fn loads_array_and_indexes_first_occurrence() {
        let tmp = TempDirGuard::new("registry");
        let path = tmp.write(
            "registry.json",
            r#"[
  {"id": "kraken", "type": "entity", "page_status": "published", "parent_id": null},
  {"id": "kraken", "type": "entity", "page_status": "missing", "parent_id": null},
  {"id": "kraken-pro", "type": "child_entity", "page_status": "missing", "parent_id": "kraken"}
]"#,
        );
        let registry = Registry::load(&path).expect("registry loads");
        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.get("kraken").map(|entry| entry.page_status),
            Some(PageStatus::Published)
        );
        assert_eq!(
            registry.get("kraken-pro").map(|entry| entry.entry_type),
            Some(EntryType::ChildEntity)
        );
    }

    #[test]
    fn one_malformed_entry_aborts_the_load() {
        let tmp = TempDirGuard::new("registry-bad");
        let path = tmp.write(
            "registry.json",
            r#"[{"id": "a", "type": "entity", "page_status": "published"}, {"id": 7}]"#,
        );
        assert!(matches!(Registry::load(&path), Err(LoadError::Registry { .. })));

        let object = tmp.write("object.json", r#"{"id": "a"}"#);
        assert!(matches!(Registry::load(&object), Err(LoadError::Registry { .. })));

        let missing = tmp.path().join("absent.json");
        assert!(matches!(Registry::load(&missing), Err(LoadError::Read { .. })));
    }
}
