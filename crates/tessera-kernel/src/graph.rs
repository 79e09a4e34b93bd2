//! Entity graph resolution over the registry ledger.
//!
//! The hierarchy is expressed by `parent_id` alone and must form a forest of
//! depth at most one: entities are roots, child entities hang off exactly one
//! entity.

use crate::finding::{Finding, collect_classes};
use crate::registry::{EntryType, RegistryEntry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub mod graph_class {
    pub const CHILD_MISSING_PARENT: &str = "graph.child_missing_parent";
    pub const PARENT_NOT_FOUND: &str = "graph.parent_not_found";
    pub const PARENT_NOT_ENTITY: &str = "graph.parent_not_entity";
    pub const UNEXPECTED_PARENT: &str = "graph.unexpected_parent";
    pub const DUPLICATE_ID: &str = "graph.duplicate_id";
    pub const ALTERNATE_HIERARCHY_FIELD: &str = "graph.alternate_hierarchy_field";
    pub const CYCLE: &str = "graph.cycle";
    pub const PUBLICATION_BLOCKED: &str = "graph.publication_blocked";
}

/// Registry keys that would describe a second hierarchy next to `parent_id`.
pub const ALTERNATE_HIERARCHY_FIELDS: &[&str] =
    &["parent", "parent_slug", "children", "ancestors", "hub_id"];

pub const RESULT_ACCEPTED: &str = "accepted";
pub const RESULT_REJECTED: &str = "rejected";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphReport {
    pub result: String,
    pub failure_classes: Vec<String>,
    pub violations: Vec<Finding>,
    /// Ids that may not be published until their violations are fixed.
    pub blocked_ids: Vec<String>,
    pub entry_count: usize,
}

impl GraphReport {
    pub fn accepted(&self) -> bool {
        self.result == RESULT_ACCEPTED
    }

    pub fn is_blocked(&self, id: &str) -> bool {
        self.blocked_ids.binary_search_by(|blocked| blocked.as_str().cmp(id)).is_ok()
    }
}

pub fn resolve_entity_graph(entries: &[RegistryEntry]) -> GraphReport {
    let mut violations = Vec::new();
    let mut blocked = BTreeSet::new();

    let mut index: BTreeMap<&str, &RegistryEntry> = BTreeMap::new();
    for entry in entries {
        if index.insert(entry.id.as_str(), entry).is_some() {
            violations.push(Finding::error(
                graph_class::DUPLICATE_ID,
                &entry.id,
                format!("registry id `{}` appears more than once", entry.id),
            ));
            blocked.insert(entry.id.clone());
        }
    }
    // First occurrence wins for relation building.
    let mut first: BTreeMap<&str, &RegistryEntry> = BTreeMap::new();
    for entry in entries {
        first.entry(entry.id.as_str()).or_insert(entry);
    }

    for entry in entries {
        for key in ALTERNATE_HIERARCHY_FIELDS {
            if entry.extra.contains_key(*key) {
                violations.push(Finding::error(
                    graph_class::ALTERNATE_HIERARCHY_FIELD,
                    &entry.id,
                    format!("`{key}` is not allowed; hierarchy is expressed by parent_id only"),
                ));
                blocked.insert(entry.id.clone());
            }
        }

        match (entry.entry_type, entry.parent_id.as_deref()) {
            (EntryType::ChildEntity, None) => {
                violations.push(Finding::error(
                    graph_class::CHILD_MISSING_PARENT,
                    &entry.id,
                    "child_entity has a null parent_id",
                ));
                blocked.insert(entry.id.clone());
            }
            (EntryType::ChildEntity, Some(parent)) => match first.get(parent) {
                None => {
                    violations.push(Finding::error(
                        graph_class::PARENT_NOT_FOUND,
                        &entry.id,
                        format!("parent_id `{parent}` does not exist in the registry"),
                    ));
                    blocked.insert(entry.id.clone());
                }
                Some(target) if target.entry_type != EntryType::Entity => {
                    violations.push(Finding::error(
                        graph_class::PARENT_NOT_ENTITY,
                        &entry.id,
                        format!(
                            "parent_id `{parent}` refers to a {}, not an entity",
                            target.entry_type
                        ),
                    ));
                    blocked.insert(entry.id.clone());
                }
                Some(_) => {}
            },
            (_, Some(parent)) => {
                violations.push(Finding::error(
                    graph_class::UNEXPECTED_PARENT,
                    &entry.id,
                    format!("{} must have a null parent_id, found `{parent}`", entry.entry_type),
                ));
                blocked.insert(entry.id.clone());
            }
            (_, None) => {}
        }
    }

    for cycle in find_cycles(&first) {
        let members = cycle.join(" -> ");
        violations.push(Finding::error(
            graph_class::CYCLE,
            &cycle[0],
            format!("parent_id chain forms a cycle: {members} -> {}", cycle[0]),
        ));
        blocked.extend(cycle);
    }

    let failure_classes = collect_classes(&violations);
    let result = if violations.is_empty() {
        RESULT_ACCEPTED
    } else {
        RESULT_REJECTED
    };
    GraphReport {
        result: result.to_string(),
        failure_classes,
        violations,
        blocked_ids: blocked.into_iter().collect(),
        entry_count: entries.len(),
    }
}

/// Iterative ancestor walk. Every node is settled once, so the whole pass is
/// linear in the number of entries; a single walk never exceeds that bound.
fn find_cycles(index: &BTreeMap<&str, &RegistryEntry>) -> Vec<Vec<String>> {
    let bound = index.len();
    let mut settled: BTreeSet<&str> = BTreeSet::new();
    let mut cycles = Vec::new();

    for &start in index.keys() {
        let mut path: Vec<&str> = Vec::new();
        let mut on_path: BTreeMap<&str, usize> = BTreeMap::new();
        let mut current = Some(start);

        while let Some(id) = current {
            if settled.contains(id) || path.len() > bound {
                break;
            }
            if let Some(&pos) = on_path.get(id) {
                let mut members: Vec<String> =
                    path[pos..].iter().map(|member| member.to_string()).collect();
                // Rotate so the smallest id leads; keeps output stable.
                if let Some(min_pos) = members
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1.cmp(b.1))
                    .map(|(idx, _)| idx)
                {
                    members.rotate_left(min_pos);
                }
                cycles.push(members);
                break;
            }
            on_path.insert(id, path.len());
            path.push(id);
            current = index
                .get(id)
                .and_then(|entry| entry.parent_id.as_deref())
                .filter(|parent| index.contains_key(parent));
        }
        settled.extend(path);
    }
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PageStatus;
    use serde_json::json;

    fn entity(id: &str) -> RegistryEntry {
        RegistryEntry::new(id, EntryType::Entity, PageStatus::Published)
    }

    fn child(id: &str, parent: Option<&str>) -> RegistryEntry {
        let entry = RegistryEntry::new(id, EntryType::ChildEntity, PageStatus::Published);
        match parent {
            Some(parent) => entry.with_parent(parent),
            None => entry,
        }
    }

    #[test]
    fn well_formed_forest_is_accepted() {
        let report = resolve_entity_graph(&[
            entity("binance"),
            child("binance-futures", Some("binance")),
            RegistryEntry::new("binance-vs-okx", EntryType::Comparison, PageStatus::Missing),
        ]);
        assert!(report.accepted());
        assert!(report.blocked_ids.is_empty());
        assert_eq!(report.entry_count, 3);
    }

    #[test]
    fn child_without_parent_is_blocked() {
        let report = resolve_entity_graph(&[child("orphan", None)]);
        assert!(!report.accepted());
        assert_eq!(report.failure_classes, vec![graph_class::CHILD_MISSING_PARENT]);
        assert!(report.is_blocked("orphan"));
    }

    #[test]
    fn parent_must_exist_and_be_an_entity() {
        let report = resolve_entity_graph(&[
            entity("okx"),
            child("okx-earn", Some("okx")),
            child("nested", Some("okx-earn")),
            child("lost", Some("nowhere")),
        ]);
        assert_eq!(
            report.failure_classes,
            vec![graph_class::PARENT_NOT_ENTITY, graph_class::PARENT_NOT_FOUND]
        );
        assert_eq!(report.blocked_ids, vec!["lost", "nested"]);
    }

    #[test]
    fn entity_with_parent_and_duplicates_are_rejected() {
        let report = resolve_entity_graph(&[
            entity("a"),
            entity("b").with_parent("a"),
            entity("a"),
        ]);
        assert_eq!(
            report.failure_classes,
            vec![graph_class::DUPLICATE_ID, graph_class::UNEXPECTED_PARENT]
        );
        assert_eq!(report.blocked_ids, vec!["a", "b"]);
    }

    #[test]
    fn alternate_hierarchy_keys_are_forbidden() {
        let mut entry = entity("kraken");
        entry.extra.insert("children".to_string(), json!(["kraken-pro"]));
        let report = resolve_entity_graph(&[entry]);
        assert_eq!(report.failure_classes, vec![graph_class::ALTERNATE_HIERARCHY_FIELD]);
    }

    #[test]
    fn cycles_are_reported_once_with_all_members_blocked() {
        let report = resolve_entity_graph(&[
            child("c", Some("a")),
            child("a", Some("b")),
            child("b", Some("c")),
            child("tail", Some("a")),
        ]);
        let cycles: Vec<&Finding> = report
            .violations
            .iter()
            .filter(|finding| finding.class == graph_class::CYCLE)
            .collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].subject, "a");
        for id in ["a", "b", "c"] {
            assert!(report.is_blocked(id), "{id} should be blocked");
        }
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let report = resolve_entity_graph(&[child("loop", Some("loop"))]);
        assert!(report.failure_classes.contains(&graph_class::CYCLE.to_string()));
    }
}
