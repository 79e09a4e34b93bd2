//! Property-based tests for the hash engine and the entity graph resolver.
//!
//! - Determinism: field order and insignificant whitespace never change the hash
//! - Sensitivity: changing any single value changes the hash
//! - Location independence: the hash depends on block text only
//! - Round trip: a sealed block always verifies against its own fields
//! - Termination: the graph resolver finishes on arbitrary parent assignments
//!   and flags every cycle

use proptest::prelude::*;
use std::collections::BTreeSet;
use tessera_kernel::{
    CANONICAL_HASH_FIELD, EntryType, PageStatus, RegistryEntry, Strictness, Verdict,
    canonicalize, compute_hash, hash_block_text, parse_block, resolve_entity_graph, seal_block,
    validate_block,
};

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,30}[A-Za-z0-9]")
        .expect("name regex")
}

fn token_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][A-Z0-9]{1,10}").expect("token regex")
}

#[derive(Debug, Clone)]
struct BlockFields {
    token: String,
    lines: Vec<(String, String)>,
}

impl BlockFields {
    fn render(&self, order: &[usize], pad: &str) -> String {
        let mut out = format!("[ENTITY/{}]\n", self.token);
        for &idx in order {
            let (name, value) = &self.lines[idx];
            out.push_str(&format!("{pad}{name}{pad}={pad}{value}{pad}\n"));
            if idx % 2 == 0 {
                out.push('\n');
            }
        }
        out.push_str("[/ENTITY]\n");
        out
    }

    fn natural_order(&self) -> Vec<usize> {
        (0..self.lines.len()).collect()
    }
}

fn block_strategy() -> impl Strategy<Value = BlockFields> {
    (
        token_strategy(),
        name_strategy(),
        1i64..500,
        1800i64..2100,
        prop::sample::select(vec!["spot", "derivatives", "hybrid", "otc"]),
    )
        .prop_map(|(token, name, version, founded, venue)| BlockFields {
            lines: vec![
                ("schema".to_string(), "1".to_string()),
                ("version".to_string(), version.to_string()),
                ("type".to_string(), "entity".to_string()),
                ("url".to_string(), format!("/exchanges/{}/", token.to_ascii_lowercase())),
                ("name".to_string(), name),
                ("founded".to_string(), founded.to_string()),
                ("venue_kind".to_string(), venue.to_string()),
            ],
            token,
        })
}

fn shuffled(len: usize) -> impl Strategy<Value = Vec<usize>> {
    Just((0..len).collect::<Vec<_>>()).prop_shuffle()
}

// =============================================================================
// HASH PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn hash_is_independent_of_order_and_whitespace(
        block in block_strategy(),
        order in shuffled(7),
        pad in prop::sample::select(vec!["", " ", "  ", "\t"]),
    ) {
        let plain = block.render(&block.natural_order(), "");
        let noisy = block.render(&order, pad);
        prop_assert_eq!(
            hash_block_text(&plain).expect("plain hashes"),
            hash_block_text(&noisy).expect("noisy hashes")
        );
    }

    #[test]
    fn changing_one_value_changes_the_hash(
        block in block_strategy(),
        which in 0usize..7,
    ) {
        let original = block.render(&block.natural_order(), "");
        let mut edited = block.clone();
        let value = &mut edited.lines[which].1;
        *value = match which {
            0 => "2".to_string(),
            2 => "child_entity".to_string(),
            6 => if value == "otc" { "spot".to_string() } else { "otc".to_string() },
            3 => format!("{value}x/"),
            4 => format!("{value} X"),
            _ => {
                let number: i64 = value.parse().expect("numeric field");
                (number + 1).to_string()
            }
        };
        let changed = edited.render(&edited.natural_order(), "");
        prop_assert_ne!(
            hash_block_text(&original).expect("original hashes"),
            hash_block_text(&changed).expect("edited hashes")
        );
    }

    #[test]
    fn sealed_blocks_verify_wherever_they_live(
        block in block_strategy(),
        first in "[a-z]{1,8}",
        second in "[a-z]{1,8}",
    ) {
        let sealed = seal_block(&block.render(&block.natural_order(), "")).expect("seals");
        let here = validate_block(&sealed, &format!("{first}/index.html"), None, Strictness::Strict);
        let there = validate_block(&sealed, &format!("{second}/deep/index.html"), None, Strictness::Strict);
        prop_assert_eq!(here.report.verdict, Verdict::Pass);
        prop_assert_eq!(&here.report.computed_hash, &there.report.computed_hash);

        let parsed = parse_block(&sealed).expect("sealed parses");
        let declared = parsed.field(CANONICAL_HASH_FIELD).expect("hash declared");
        let recomputed = compute_hash(&canonicalize(&parsed).expect("form")).expect("hash");
        prop_assert!(recomputed.matches(declared));
    }
}

// =============================================================================
// GRAPH TERMINATION
// =============================================================================

fn has_cycle(parents: &[Option<usize>]) -> bool {
    (0..parents.len()).any(|start| {
        let mut current = parents[start];
        for _ in 0..parents.len() {
            match current {
                Some(node) if node == start => return true,
                Some(node) => current = parents[node],
                None => return false,
            }
        }
        false
    })
}

proptest! {
    #[test]
    fn graph_resolver_terminates_and_flags_cycles(
        parents in prop::collection::vec(prop::option::of(0usize..40), 1..40),
    ) {
        let count = parents.len();
        let parents: Vec<Option<usize>> =
            parents.into_iter().map(|parent| parent.filter(|p| *p < count)).collect();
        let entries: Vec<RegistryEntry> = parents
            .iter()
            .enumerate()
            .map(|(idx, parent)| {
                let entry = RegistryEntry::new(
                    &format!("e{idx:02}"),
                    if parent.is_some() { EntryType::ChildEntity } else { EntryType::Entity },
                    PageStatus::Published,
                );
                match parent {
                    Some(parent) => entry.with_parent(&format!("e{parent:02}")),
                    None => entry,
                }
            })
            .collect();

        let report = resolve_entity_graph(&entries);
        prop_assert_eq!(report.entry_count, count);
        let classes: BTreeSet<&str> = report.failure_classes.iter().map(String::as_str).collect();
        prop_assert_eq!(classes.contains("graph.cycle"), has_cycle(&parents));
    }
}
