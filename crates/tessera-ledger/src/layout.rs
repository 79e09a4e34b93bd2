//! Tree layout: where each artifact lives and how registry ids map to pages.
//!
//! Read from an optional `tessera.toml` at the tree root. Every key has a
//! default; unknown keys are rejected.
//!
//! Page paths are relative to `pages_dir` and use `/` separators:
//!
//! ```text
//! index.html                          root
//! {hub}/index.html                    hub
//! {hub}/{entity}/index.html           entity
//! {hub}/{entity}/{child}/index.html   child entity
//! {comparison_segment}/index.html     comparison index
//! {comparison_segment}/{id}/index.html comparison
//! ```

use crate::registry::Registry;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tessera_kernel::{EntryType, RegistryEntry};
use tracing::debug;

pub const CONFIG_FILE: &str = "tessera.toml";
const INDEX_FILE: &str = "index.html";

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid layout: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub pages_dir: String,
    pub registry_path: String,
    pub dataset_path: String,
    pub snapshot_dir: String,
    pub report_dir: String,
    pub hubs: Vec<String>,
    /// Entity id → hub; entities not listed use `default_hub`.
    pub hub_map: BTreeMap<String, String>,
    pub default_hub: Option<String>,
    pub comparison_segment: String,
    pub redirect_prefix: String,
    pub brand_tokens: Vec<String>,
    pub route_words: Vec<String>,
    /// Relative to `pages_dir`.
    pub robots_file: String,
    /// Relative to `pages_dir`.
    pub sitemap_static: String,
    /// Relative to the tree root.
    pub sitemap_entry_points: Vec<String>,
    /// Roots covered by snapshots, relative to the tree root.
    pub tracked_roots: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            pages_dir: "public".to_string(),
            registry_path: "public/dataset/registry.json".to_string(),
            dataset_path: "public/dataset/records.ndjson".to_string(),
            snapshot_dir: ".tessera/snapshots".to_string(),
            report_dir: ".tessera/reports".to_string(),
            hubs: vec!["exchanges".to_string()],
            hub_map: BTreeMap::new(),
            default_hub: Some("exchanges".to_string()),
            comparison_segment: "compare".to_string(),
            redirect_prefix: "/go/".to_string(),
            brand_tokens: Vec::new(),
            route_words: ["review", "reviews", "compare", "exchange", "exchanges"]
                .map(String::from)
                .to_vec(),
            robots_file: "robots.txt".to_string(),
            sitemap_static: "sitemap.xml".to_string(),
            sitemap_entry_points: ["src/app/sitemap.ts", "src/app/sitemap.js", "app/sitemap.ts"]
                .map(String::from)
                .to_vec(),
            tracked_roots: vec!["public".to_string()],
        }
    }
}

/// Structural class of a page, derived from its path alone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Root,
    Hub,
    Entity,
    Child,
    Comparison,
    Unknown,
}

impl PageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Hub => "hub",
            Self::Entity => "entity",
            Self::Child => "child",
            Self::Comparison => "comparison",
            Self::Unknown => "unknown",
        }
    }
}

fn slug_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9._-]*$").expect("slug regex must compile"))
}

pub fn is_slug(segment: &str) -> bool {
    slug_re().is_match(segment) && !segment.contains("..")
}

#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    config: LayoutConfig,
}

impl Layout {
    /// Load the layout for `root`. An explicit `config_path` must exist;
    /// otherwise `root/tessera.toml` is used when present.
    pub fn load(root: &Path, config_path: Option<&Path>) -> Result<Self, LayoutError> {
        let implicit = root.join(CONFIG_FILE);
        let path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None if implicit.is_file() => Some(implicit),
            None => None,
        };
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(&path).map_err(|source| LayoutError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                debug!(path = %path.display(), "layout config loaded");
                toml::from_str(&text).map_err(|source| LayoutError::Parse {
                    path: path.display().to_string(),
                    source,
                })?
            }
            None => LayoutConfig::default(),
        };
        Self::new(root, config)
    }

    pub fn new(root: &Path, config: LayoutConfig) -> Result<Self, LayoutError> {
        validate_config(&config)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    pub fn with_defaults(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            config: LayoutConfig::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.root.join(&self.config.pages_dir)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join(&self.config.registry_path)
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.root.join(&self.config.dataset_path)
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.root.join(&self.config.snapshot_dir)
    }

    pub fn report_dir(&self) -> PathBuf {
        self.root.join(&self.config.report_dir)
    }

    pub fn page_path(&self, rel: &str) -> PathBuf {
        self.pages_dir().join(rel)
    }

    /// Root-relative path of a page, as recorded in snapshots.
    pub fn tree_rel_page(&self, rel: &str) -> String {
        let prefix = self.config.pages_dir.trim_end_matches('/');
        if prefix.is_empty() || prefix == "." {
            rel.to_string()
        } else {
            format!("{prefix}/{rel}")
        }
    }

    pub fn is_hub(&self, segment: &str) -> bool {
        self.config.hubs.iter().any(|hub| hub == segment)
    }

    /// Hub for an entity id: the explicit mapping, else the default hub.
    pub fn hub_for(&self, entity_id: &str) -> Option<&str> {
        self.config
            .hub_map
            .get(entity_id)
            .or(self.config.default_hub.as_ref())
            .map(String::as_str)
    }

    /// Expected page of a registry entry, relative to `pages_dir`.
    ///
    /// Derived from type, parent and the hub mapping only. `None` means the
    /// id cannot be placed and callers must skip it.
    pub fn page_rel_path(&self, entry: &RegistryEntry, registry: &Registry) -> Option<String> {
        if !is_slug(&entry.id) {
            return None;
        }
        match entry.entry_type {
            EntryType::Entity => {
                let hub = self.hub_for(&entry.id)?;
                Some(format!("{hub}/{}/{INDEX_FILE}", entry.id))
            }
            EntryType::ChildEntity => {
                let parent = registry.get(entry.parent_id.as_deref()?)?;
                if parent.entry_type != EntryType::Entity || !is_slug(&parent.id) {
                    return None;
                }
                let hub = self.hub_for(&parent.id)?;
                Some(format!("{hub}/{}/{}/{INDEX_FILE}", parent.id, entry.id))
            }
            EntryType::Comparison => Some(format!(
                "{}/{}/{INDEX_FILE}",
                self.config.comparison_segment, entry.id
            )),
        }
    }

    /// Classify a page by depth and leading segment.
    pub fn classify(&self, rel: &str) -> PageKind {
        let dir = if rel == INDEX_FILE {
            ""
        } else {
            match rel.strip_suffix(INDEX_FILE).and_then(|d| d.strip_suffix('/')) {
                Some(dir) => dir,
                None => return PageKind::Unknown,
            }
        };
        let segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
        let comparison = self.config.comparison_segment.as_str();
        match segments.as_slice() {
            [] => PageKind::Root,
            [first] if self.is_hub(first) => PageKind::Hub,
            [first] if *first == comparison => PageKind::Comparison,
            [first, _] if self.is_hub(first) => PageKind::Entity,
            [first, _] if *first == comparison => PageKind::Comparison,
            [first, _, _] if self.is_hub(first) => PageKind::Child,
            _ => PageKind::Unknown,
        }
    }

    /// Entity segment of an entity or child page path.
    pub fn entity_of<'a>(&self, rel: &'a str) -> Option<&'a str> {
        let mut segments = rel.split('/');
        let hub = segments.next()?;
        if !self.is_hub(hub) {
            return None;
        }
        segments.next().filter(|segment| *segment != INDEX_FILE)
    }
}

fn validate_config(config: &LayoutConfig) -> Result<(), LayoutError> {
    if config.hubs.is_empty() {
        return Err(LayoutError::Invalid("at least one hub is required".to_string()));
    }
    for hub in &config.hubs {
        if !is_slug(hub) {
            return Err(LayoutError::Invalid(format!("hub `{hub}` is not a path slug")));
        }
    }
    let known = |hub: &str| config.hubs.iter().any(|h| h == hub);
    if let Some(default_hub) = &config.default_hub
        && !known(default_hub.as_str())
    {
        return Err(LayoutError::Invalid(format!(
            "default_hub `{default_hub}` is not listed in hubs"
        )));
    }
    for (id, hub) in &config.hub_map {
        if !known(hub.as_str()) {
            return Err(LayoutError::Invalid(format!(
                "hub_map entry `{id}` points at unknown hub `{hub}`"
            )));
        }
    }
    if !is_slug(&config.comparison_segment) || known(config.comparison_segment.as_str()) {
        return Err(LayoutError::Invalid(format!(
            "comparison_segment `{}` must be a slug distinct from every hub",
            config.comparison_segment
        )));
    }
    if !config.redirect_prefix.starts_with('/') {
        return Err(LayoutError::Invalid(format!(
            "redirect_prefix `{}` must start with `/`",
            config.redirect_prefix
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TempDirGuard;
    use tessera_kernel::PageStatus;

    #[test]
    fn defaults_apply_without_config_file() {
        let tmp = TempDirGuard::new("layout-default");
        let layout = Layout::load(tmp.path(), None).expect("defaults load");
        assert_eq!(layout.config(), &LayoutConfig::default());
        assert_eq!(
            layout.registry_path(),
            tmp.path().join("public/dataset/registry.json")
        );
    }

    #[test]
    fn config_file_overrides_and_rejects_unknown_keys() {
        let tmp = TempDirGuard::new("layout-config");
        tmp.write(
            CONFIG_FILE,
            "hubs = [\"exchanges\", \"wallets\"]\n[hub_map]\nledger = \"wallets\"\n",
        );
        let layout = Layout::load(tmp.path(), None).expect("config loads");
        assert_eq!(layout.hub_for("ledger"), Some("wallets"));
        assert_eq!(layout.hub_for("binance"), Some("exchanges"));

        let bad = tmp.write("bad.toml", "pages = \"site\"\n");
        let err = Layout::load(tmp.path(), Some(&bad)).expect_err("unknown key must fail");
        assert!(matches!(err, LayoutError::Parse { .. }));
    }

    #[test]
    fn invalid_hub_references_are_rejected() {
        let config = LayoutConfig {
            default_hub: Some("wallets".to_string()),
            ..LayoutConfig::default()
        };
        assert!(matches!(
            Layout::new(Path::new("."), config),
            Err(LayoutError::Invalid(_))
        ));
    }

    #[test]
    fn page_paths_follow_type_parent_and_hub() {
        let registry = Registry::from_entries(vec![
            RegistryEntry::new("binance", EntryType::Entity, PageStatus::Published),
            RegistryEntry::new("binance-futures", EntryType::ChildEntity, PageStatus::Published)
                .with_parent("binance"),
            RegistryEntry::new("orphan", EntryType::ChildEntity, PageStatus::Published)
                .with_parent("nobody"),
            RegistryEntry::new("binance-vs-okx", EntryType::Comparison, PageStatus::Missing),
            RegistryEntry::new("../etc", EntryType::Entity, PageStatus::Published),
        ]);
        let layout = Layout::with_defaults(Path::new("."));
        let path = |id: &str| {
            layout.page_rel_path(registry.get(id).expect("entry"), &registry)
        };
        assert_eq!(path("binance").as_deref(), Some("exchanges/binance/index.html"));
        assert_eq!(
            path("binance-futures").as_deref(),
            Some("exchanges/binance/binance-futures/index.html")
        );
        assert_eq!(path("orphan"), None);
        assert_eq!(path("binance-vs-okx").as_deref(), Some("compare/binance-vs-okx/index.html"));
        assert_eq!(path("../etc"), None);
    }

    #[test]
    fn classification_by_depth_and_segment() {
        let layout = Layout::with_defaults(Path::new("."));
        assert_eq!(layout.classify("index.html"), PageKind::Root);
        assert_eq!(layout.classify("exchanges/index.html"), PageKind::Hub);
        assert_eq!(layout.classify("exchanges/kraken/index.html"), PageKind::Entity);
        assert_eq!(layout.classify("exchanges/kraken/kraken-pro/index.html"), PageKind::Child);
        assert_eq!(layout.classify("compare/index.html"), PageKind::Comparison);
        assert_eq!(layout.classify("compare/a-vs-b/index.html"), PageKind::Comparison);
        assert_eq!(layout.classify("about/index.html"), PageKind::Unknown);
        assert_eq!(layout.classify("exchanges/kraken/notes.html"), PageKind::Unknown);
        assert_eq!(layout.entity_of("exchanges/kraken/kraken-pro/index.html"), Some("kraken"));
    }
}
