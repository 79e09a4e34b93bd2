//! The loaded tree: registry, dataset and pages, read once per run.

use crate::dataset::{Dataset, load_dataset};
use crate::error::LoadError;
use crate::layout::Layout;
use crate::pages::{EmbeddedBlock, Page, scan_pages};
use crate::registry::Registry;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    pub registry: Registry,
    pub dataset: Dataset,
    /// Sorted by `rel_path`.
    pub pages: Vec<Page>,
}

impl Corpus {
    /// Load every source. The first load error aborts; nothing is partially
    /// loaded.
    pub fn load(layout: &Layout) -> Result<Self, LoadError> {
        let registry = Registry::load(&layout.registry_path())?;
        let dataset = load_dataset(&layout.dataset_path())?;
        let pages = scan_pages(&layout.pages_dir())?;
        let corpus = Self::new(registry, dataset, pages);
        info!(
            entries = corpus.registry.len(),
            records = corpus.dataset.len(),
            pages = corpus.pages.len(),
            "corpus loaded"
        );
        Ok(corpus)
    }

    pub fn new(registry: Registry, dataset: Dataset, mut pages: Vec<Page>) -> Self {
        pages.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        Self {
            registry,
            dataset,
            pages,
        }
    }

    pub fn page(&self, rel_path: &str) -> Option<&Page> {
        self.pages
            .binary_search_by(|page| page.rel_path.as_str().cmp(rel_path))
            .ok()
            .map(|pos| &self.pages[pos])
    }

    pub fn has_page(&self, rel_path: &str) -> bool {
        self.page(rel_path).is_some()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &EmbeddedBlock> {
        self.pages.iter().flat_map(|page| page.blocks.iter())
    }

    /// `(subject, text)` pairs for the corpus validation pipeline. The
    /// subject is the page path plus the header line.
    pub fn block_inputs(&self) -> Vec<(String, String)> {
        self.blocks()
            .map(|block| (format!("{}:{}", block.page, block.line), block.text.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TempDirGuard;

    #[test]
    fn loads_all_sources_from_the_layout() {
        let tmp = TempDirGuard::new("corpus");
        tmp.write(
            "public/dataset/registry.json",
            r#"[{"id":"okx","type":"entity","page_status":"published","parent_id":null}]"#,
        );
        tmp.write(
            "public/dataset/records.ndjson",
            "{\"record_type\":\"registry\",\"id\":\"okx\",\"page_status\":\"published\"}\n",
        );
        tmp.write(
            "public/exchanges/okx/index.html",
            "<pre>\n[ENTITY/OKX]\nname=OKX\n[/ENTITY]\n</pre>\n",
        );
        let corpus = Corpus::load(&Layout::with_defaults(tmp.path())).expect("corpus loads");
        assert!(corpus.has_page("exchanges/okx/index.html"));
        assert_eq!(
            corpus.block_inputs(),
            vec![(
                "exchanges/okx/index.html:2".to_string(),
                "[ENTITY/OKX]\nname=OKX\n[/ENTITY]\n".to_string()
            )]
        );
    }

    #[test]
    fn missing_dataset_is_fatal() {
        let tmp = TempDirGuard::new("corpus-missing");
        tmp.write("public/dataset/registry.json", "[]");
        let err = Corpus::load(&Layout::with_defaults(tmp.path())).expect_err("must abort");
        assert!(matches!(err, LoadError::Read { .. }));
    }
}
