//! Registry ⇄ dataset ⇄ page cross-references.
//!
//! Expected page paths come from [`Layout::page_rel_path`] only. An id with
//! no resolvable path is listed in `skipped_ids` and never reported.

use crate::CheckStatus;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tessera_kernel::{PageStatus, PageType, block_presence_violation, hash_block_text};
use tessera_ledger::{Corpus, Layout, PageKind, RecordType};
use tracing::debug;

pub mod consistency_class {
    pub const REGISTRY_MISSING_PAGE: &str = "REGISTRY_MISSING_PAGE";
    pub const DATASET_MISSING_PAGE: &str = "DATASET_MISSING_PAGE";
    pub const CR_BLOCK_MISSING_DATASET: &str = "CR_BLOCK_MISSING_DATASET";
    pub const DATASET_CR_MISSING_BLOCK: &str = "DATASET_CR_MISSING_BLOCK";
    pub const ORPHAN_DATASET_RECORD: &str = "ORPHAN_DATASET_RECORD";
    pub const CR_HASH_DRIFT: &str = "CR_HASH_DRIFT";
    pub const STATUS_DRIFT: &str = "STATUS_DRIFT";
    pub const PAGE_MISSING_BLOCK: &str = "PAGE_MISSING_BLOCK";
    pub const PAGE_FORBIDDEN_BLOCK: &str = "PAGE_FORBIDDEN_BLOCK";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyViolation {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<RecordType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub status: CheckStatus,
    pub violation_count: usize,
    pub violations: Vec<ConsistencyViolation>,
    pub skipped_ids: Vec<String>,
}

fn expects_page(status: PageStatus) -> bool {
    matches!(status, PageStatus::Published | PageStatus::Deprecated)
}

fn violation(
    kind: &str,
    id: &str,
    record_type: Option<RecordType>,
    page: Option<&str>,
    detail: impl Into<String>,
) -> ConsistencyViolation {
    ConsistencyViolation {
        kind: kind.to_string(),
        id: id.to_string(),
        record_type,
        page: page.map(str::to_string),
        detail: detail.into(),
    }
}

pub fn check_consistency(corpus: &Corpus, layout: &Layout) -> ConsistencyReport {
    let registry = &corpus.registry;
    let mut violations = Vec::new();
    let mut skipped = BTreeSet::new();

    let mut expected_pages: BTreeMap<&str, Option<String>> = BTreeMap::new();
    for entry in registry.entries() {
        let path = layout.page_rel_path(entry, registry);
        if path.is_none() {
            skipped.insert(entry.id.clone());
        }
        expected_pages.entry(entry.id.as_str()).or_insert(path);
    }

    for entry in registry.entries() {
        if !expects_page(entry.page_status) {
            continue;
        }
        if let Some(Some(page)) = expected_pages.get(entry.id.as_str())
            && !corpus.has_page(page)
        {
            violations.push(violation(
                consistency_class::REGISTRY_MISSING_PAGE,
                &entry.id,
                None,
                Some(page.as_str()),
                format!("{} entry has no page at {page}", entry.page_status),
            ));
        }
    }

    let mut block_hashes: BTreeMap<&str, Vec<(Option<String>, &str)>> = BTreeMap::new();
    for block in corpus.blocks() {
        let hash = hash_block_text(&block.text).ok().map(|hash| hash.to_string());
        block_hashes
            .entry(block.id.as_str())
            .or_default()
            .push((hash, block.page.as_str()));
    }

    for record in corpus.dataset.records() {
        let Some(entry) = registry.get(&record.id) else {
            violations.push(violation(
                consistency_class::ORPHAN_DATASET_RECORD,
                &record.id,
                Some(record.record_type),
                None,
                "dataset record has no registry entry",
            ));
            continue;
        };

        if expects_page(entry.page_status)
            && let Some(Some(page)) = expected_pages.get(record.id.as_str())
            && !corpus.has_page(page)
        {
            violations.push(violation(
                consistency_class::DATASET_MISSING_PAGE,
                &record.id,
                Some(record.record_type),
                Some(page.as_str()),
                format!("dataset record expects a page at {page}"),
            ));
        }

        match record.record_type {
            RecordType::Cr => match block_hashes.get(record.id.as_str()) {
                None => violations.push(violation(
                    consistency_class::DATASET_CR_MISSING_BLOCK,
                    &record.id,
                    Some(RecordType::Cr),
                    record.str_field("page"),
                    "dataset cr record has no embedded block",
                )),
                Some(blocks) => {
                    let declared = record.canonical_hash();
                    let matched = blocks
                        .iter()
                        .any(|(hash, _)| hash.as_deref().is_some_and(|h| Some(h) == declared));
                    if !matched {
                        violations.push(violation(
                            consistency_class::CR_HASH_DRIFT,
                            &record.id,
                            Some(RecordType::Cr),
                            blocks.first().map(|(_, page)| *page),
                            format!(
                                "dataset canonical_hash {} matches no embedded block",
                                declared.unwrap_or("null")
                            ),
                        ));
                    }
                }
            },
            RecordType::Registry => {
                let recorded = record.page_status();
                if recorded != Some(entry.page_status.as_str()) {
                    violations.push(violation(
                        consistency_class::STATUS_DRIFT,
                        &record.id,
                        Some(RecordType::Registry),
                        None,
                        format!(
                            "dataset says page_status={} but the registry says {}",
                            recorded.unwrap_or("null"),
                            entry.page_status
                        ),
                    ));
                }
            }
        }
    }

    let cr_ids: BTreeSet<&str> = corpus
        .dataset
        .of_type(RecordType::Cr)
        .map(|record| record.id.as_str())
        .collect();
    for block in corpus.blocks() {
        if !cr_ids.contains(block.id.as_str()) {
            violations.push(violation(
                consistency_class::CR_BLOCK_MISSING_DATASET,
                &block.id,
                None,
                Some(block.page.as_str()),
                "embedded block has no dataset cr record",
            ));
        }
    }

    for page in &corpus.pages {
        let page_type = match layout.classify(&page.rel_path) {
            PageKind::Entity => PageType::Entity,
            PageKind::Child => PageType::ChildEntity,
            PageKind::Comparison => PageType::Comparison,
            PageKind::Root | PageKind::Hub | PageKind::Unknown => continue,
        };
        if let Some(finding) =
            block_presence_violation(page_type, !page.blocks.is_empty(), &page.rel_path)
        {
            let kind = if page.blocks.is_empty() {
                consistency_class::PAGE_MISSING_BLOCK
            } else {
                consistency_class::PAGE_FORBIDDEN_BLOCK
            };
            let id = page_id(&page.rel_path);
            violations.push(violation(kind, &id, None, Some(page.rel_path.as_str()), finding.message));
        }
    }

    debug!(violations = violations.len(), skipped = skipped.len(), "consistency checked");
    ConsistencyReport {
        status: CheckStatus::from_violation_count(violations.len()),
        violation_count: violations.len(),
        violations,
        skipped_ids: skipped.into_iter().collect(),
    }
}

/// Last directory segment of a page path.
fn page_id(rel_path: &str) -> String {
    rel_path
        .rsplit('/')
        .nth(1)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::page;
    use std::path::Path;
    use tessera_kernel::{EntryType, RegistryEntry, seal_block};
    use tessera_ledger::{Dataset, Registry, export_dataset};

    fn block(token: &str) -> String {
        let id = token.to_ascii_lowercase();
        seal_block(&format!(
            "[ENTITY/{token}]\nschema=1\nversion=1\ntype=entity\nurl=/exchanges/{id}/\nname={token}\n[/ENTITY]\n"
        ))
        .expect("seal")
    }

    fn kinds(report: &ConsistencyReport) -> Vec<(&str, &str)> {
        report
            .violations
            .iter()
            .map(|v| (v.kind.as_str(), v.id.as_str()))
            .collect()
    }

    #[test]
    fn published_entry_without_page_is_reported_once() {
        let registry = Registry::from_entries(vec![RegistryEntry::new(
            "x",
            EntryType::Entity,
            PageStatus::Published,
        )]);
        let corpus = Corpus::new(registry, Dataset::default(), Vec::new());
        let report = check_consistency(&corpus, &Layout::with_defaults(Path::new(".")));
        assert_eq!(kinds(&report), vec![(consistency_class::REGISTRY_MISSING_PAGE, "x")]);
        assert_eq!(report.status, CheckStatus::Fail);
    }

    #[test]
    fn exported_dataset_is_consistent_with_its_sources() {
        let registry = Registry::from_entries(vec![
            RegistryEntry::new("okx", EntryType::Entity, PageStatus::Published),
            RegistryEntry::new("later", EntryType::Entity, PageStatus::Missing),
        ]);
        let pages = vec![page("exchanges/okx/index.html", &block("OKX"))];
        let blocks: Vec<_> = pages.iter().flat_map(|p| p.blocks.iter()).collect();
        let dataset = Dataset::new(export_dataset(&registry, blocks));
        let corpus = Corpus::new(registry, dataset, pages);
        let report = check_consistency(&corpus, &Layout::with_defaults(Path::new(".")));
        assert_eq!(report.violations, Vec::new());
        assert_eq!(report.status, CheckStatus::Pass);
    }

    #[test]
    fn dataset_drift_and_orphans_are_typed() {
        let registry = Registry::from_entries(vec![
            RegistryEntry::new("okx", EntryType::Entity, PageStatus::Published),
            RegistryEntry::new("kraken", EntryType::Entity, PageStatus::Published),
        ]);
        let pages = vec![
            page("exchanges/okx/index.html", &block("OKX")),
            page("exchanges/kraken/index.html", "<p>no block</p>"),
        ];
        let lines = [
            r#"{"record_type":"cr","id":"okx","canonical_hash":"00"}"#,
            r#"{"record_type":"cr","id":"kraken","canonical_hash":"00"}"#,
            r#"{"record_type":"registry","id":"okx","page_status":"deprecated"}"#,
            r#"{"record_type":"registry","id":"ghost","page_status":"published"}"#,
        ];
        let records = tessera_ledger::read_dataset(lines.join("\n").as_bytes(), Path::new("d"))
            .expect("dataset parses");
        let corpus = Corpus::new(registry, Dataset::new(records), pages);
        let report = check_consistency(&corpus, &Layout::with_defaults(Path::new(".")));
        assert_eq!(
            kinds(&report),
            vec![
                (consistency_class::CR_HASH_DRIFT, "okx"),
                (consistency_class::DATASET_CR_MISSING_BLOCK, "kraken"),
                (consistency_class::STATUS_DRIFT, "okx"),
                (consistency_class::ORPHAN_DATASET_RECORD, "ghost"),
                (consistency_class::PAGE_MISSING_BLOCK, "kraken"),
            ]
        );
    }

    #[test]
    fn unresolvable_ids_are_skipped_not_reported() {
        let registry = Registry::from_entries(vec![
            RegistryEntry::new("lost-child", EntryType::ChildEntity, PageStatus::Published)
                .with_parent("nobody"),
        ]);
        let corpus = Corpus::new(registry, Dataset::default(), Vec::new());
        let report = check_consistency(&corpus, &Layout::with_defaults(Path::new(".")));
        assert!(report.violations.is_empty());
        assert_eq!(report.skipped_ids, vec!["lost-child"]);
    }

    #[test]
    fn comparison_pages_must_not_embed_blocks() {
        let corpus = Corpus::new(
            Registry::default(),
            Dataset::default(),
            vec![page("compare/a-vs-b/index.html", &block("AVSB"))],
        );
        let report = check_consistency(&corpus, &Layout::with_defaults(Path::new(".")));
        assert!(
            kinds(&report).contains(&(consistency_class::PAGE_FORBIDDEN_BLOCK, "a-vs-b"))
        );
    }
}
