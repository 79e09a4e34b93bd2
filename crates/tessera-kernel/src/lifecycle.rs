//! Lifecycle rules: registry status machine, ledger append-only history,
//! block deprecation fields and supersedence chains.
//!
//! Blocks are immutable once hashed. A correction is a new block carrying
//! `supersedes_token`/`supersedes_hash` of the block it replaces, so the
//! versions of a record form a forward-only chain.

use crate::canonical::CanonicalForm;
use crate::finding::Finding;
use crate::hash::ContentHash;
use crate::registry::{PageStatus, RegistryEntry};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub mod lifecycle_class {
    pub const ILLEGAL_TRANSITION: &str = "lifecycle.illegal_transition";
    pub const ID_REMOVED: &str = "lifecycle.id_removed";
    pub const TYPE_CHANGED: &str = "lifecycle.type_changed";
    pub const PARENT_CHANGED: &str = "lifecycle.parent_changed";
    pub const MISSING_REPLACEMENT: &str = "lifecycle.missing_replacement";
    pub const REPLACEMENT_ON_ACTIVE: &str = "lifecycle.replacement_on_active";
    pub const SELF_REPLACEMENT: &str = "lifecycle.self_replacement";
    pub const SUPERSEDES_SELF: &str = "lifecycle.supersedes_self";
    pub const SUPERSEDES_UNKNOWN_TARGET: &str = "lifecycle.supersedes_unknown_target";
    pub const SUPERSEDES_HASH_MISMATCH: &str = "lifecycle.supersedes_hash_mismatch";
    pub const VERSION_NOT_MONOTONIC: &str = "lifecycle.version_not_monotonic";
    pub const FORKED_CHAIN: &str = "lifecycle.forked_chain";
    pub const CHAIN_CYCLE: &str = "lifecycle.chain_cycle";
    pub const STATUS_DRIFT: &str = "lifecycle.status_drift";
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("illegal status transition {from} -> {to}")]
    IllegalTransition { from: PageStatus, to: PageStatus },
}

impl PageStatus {
    /// `missing → published`, `missing → duplicate`, `published → deprecated`.
    pub fn can_transition_to(self, next: PageStatus) -> bool {
        matches!(
            (self, next),
            (PageStatus::Missing, PageStatus::Published)
                | (PageStatus::Missing, PageStatus::Duplicate)
                | (PageStatus::Published, PageStatus::Deprecated)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PageStatus::Deprecated | PageStatus::Duplicate)
    }
}

pub fn transition(from: PageStatus, to: PageStatus) -> Result<PageStatus, LifecycleError> {
    if from.can_transition_to(to) {
        Ok(to)
    } else {
        Err(LifecycleError::IllegalTransition { from, to })
    }
}

/// Compare two generations of the ledger. Ids may be appended but never
/// removed, and an existing id keeps its type and parent.
pub fn check_ledger_history(previous: &[RegistryEntry], current: &[RegistryEntry]) -> Vec<Finding> {
    let mut now: BTreeMap<&str, &RegistryEntry> = BTreeMap::new();
    for entry in current {
        now.entry(entry.id.as_str()).or_insert(entry);
    }

    let mut findings = Vec::new();
    let mut seen = BTreeSet::new();
    for before in previous {
        if !seen.insert(before.id.as_str()) {
            continue;
        }
        let Some(after) = now.get(before.id.as_str()) else {
            findings.push(Finding::error(
                lifecycle_class::ID_REMOVED,
                &before.id,
                "id was removed from the append-only ledger",
            ));
            continue;
        };
        if before.entry_type != after.entry_type {
            findings.push(Finding::error(
                lifecycle_class::TYPE_CHANGED,
                &before.id,
                format!("type changed {} -> {}", before.entry_type, after.entry_type),
            ));
        }
        if before.parent_id != after.parent_id {
            findings.push(Finding::error(
                lifecycle_class::PARENT_CHANGED,
                &before.id,
                format!(
                    "parent_id changed {} -> {}",
                    before.parent_id.as_deref().unwrap_or("null"),
                    after.parent_id.as_deref().unwrap_or("null")
                ),
            ));
        }
        if before.page_status != after.page_status
            && let Err(err) = transition(before.page_status, after.page_status)
        {
            findings.push(Finding::error(
                lifecycle_class::ILLEGAL_TRANSITION,
                &before.id,
                err.to_string(),
            ));
        }
    }
    debug!(
        previous = previous.len(),
        current = current.len(),
        findings = findings.len(),
        "ledger history checked"
    );
    findings
}

fn block_status(form: &CanonicalForm) -> Option<&str> {
    form.field("status").and_then(|value| value.as_str())
}

fn replacement_refs(form: &CanonicalForm) -> &[String] {
    form.field("replacement_refs")
        .map(|value| value.as_references())
        .unwrap_or(&[])
}

/// Deprecation rules on a single block. A deprecated block stays a full
/// record; only its replacement pointers are checked here.
pub fn check_block_lifecycle(form: &CanonicalForm, subject: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    let refs = replacement_refs(form);
    match block_status(form) {
        Some(status @ ("deprecated" | "duplicate")) if refs.is_empty() => {
            findings.push(Finding::error(
                lifecycle_class::MISSING_REPLACEMENT,
                subject,
                format!("status={status} requires non-empty replacement_refs"),
            ));
        }
        Some("deprecated" | "duplicate") => {}
        _ if !refs.is_empty() => {
            findings.push(Finding::warning(
                lifecycle_class::REPLACEMENT_ON_ACTIVE,
                subject,
                "replacement_refs declared on an active record",
            ));
        }
        _ => {}
    }
    if refs.iter().any(|reference| *reference == form.token) {
        findings.push(Finding::error(
            lifecycle_class::SELF_REPLACEMENT,
            subject,
            format!("replacement_refs names the record itself ({})", form.token),
        ));
    }
    findings
}

/// One hashed block as seen by the supersedence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockVersion {
    pub token: String,
    pub hash: ContentHash,
    pub version: Option<i64>,
    /// `(supersedes_token, supersedes_hash)` when the block replaces another.
    pub supersedes: Option<(String, String)>,
    /// Where the block was found; used as the finding subject.
    pub subject: String,
}

impl BlockVersion {
    pub fn from_form(form: &CanonicalForm, hash: ContentHash, subject: &str) -> Self {
        let text = |name: &str| {
            form.field(name)
                .and_then(|value| value.as_str())
                .map(str::to_string)
        };
        let supersedes = match (text("supersedes_token"), text("supersedes_hash")) {
            (Some(token), Some(hash)) => Some((token, hash)),
            _ => None,
        };
        Self {
            token: form.token.clone(),
            hash,
            version: form.field("version").and_then(|value| value.as_integer()),
            supersedes,
            subject: subject.to_string(),
        }
    }
}

/// Check the supersedence relation across every known block.
pub fn check_supersedence(versions: &[BlockVersion]) -> Vec<Finding> {
    let mut findings = Vec::new();
    let known_tokens: BTreeSet<&str> = versions.iter().map(|v| v.token.as_str()).collect();
    let mut by_key: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for (idx, version) in versions.iter().enumerate() {
        by_key
            .entry((version.token.as_str(), version.hash.as_str()))
            .or_insert(idx);
    }

    let mut edges: Vec<Option<usize>> = vec![None; versions.len()];
    let mut successors: BTreeMap<usize, Vec<usize>> = BTreeMap::new();

    for (idx, version) in versions.iter().enumerate() {
        let Some((target_token, target_hash)) = &version.supersedes else {
            continue;
        };
        if *target_token == version.token && version.hash.matches(target_hash) {
            findings.push(Finding::error(
                lifecycle_class::SUPERSEDES_SELF,
                &version.subject,
                format!("{} supersedes itself", version.token),
            ));
            continue;
        }
        if !known_tokens.contains(target_token.as_str()) {
            findings.push(Finding::warning(
                lifecycle_class::SUPERSEDES_UNKNOWN_TARGET,
                &version.subject,
                format!("superseded block {target_token} is not present in the corpus"),
            ));
            continue;
        }
        let Some(&target) = by_key.get(&(target_token.as_str(), target_hash.as_str())) else {
            findings.push(Finding::error(
                lifecycle_class::SUPERSEDES_HASH_MISMATCH,
                &version.subject,
                format!("no block {target_token} has canonical hash {target_hash}"),
            ));
            continue;
        };
        edges[idx] = Some(target);
        successors.entry(target).or_default().push(idx);

        if let (Some(new), Some(old)) = (version.version, versions[target].version)
            && new <= old
        {
            findings.push(Finding::error(
                lifecycle_class::VERSION_NOT_MONOTONIC,
                &version.subject,
                format!("version {new} does not exceed superseded version {old}"),
            ));
        }
    }

    for (target, heirs) in &successors {
        if heirs.len() > 1 {
            let subjects: Vec<&str> = heirs
                .iter()
                .map(|&heir| versions[heir].subject.as_str())
                .collect();
            findings.push(Finding::error(
                lifecycle_class::FORKED_CHAIN,
                &versions[*target].subject,
                format!(
                    "{} is superseded by {} blocks: {}",
                    versions[*target].token,
                    heirs.len(),
                    subjects.join(", ")
                ),
            ));
        }
    }

    let mut settled = vec![false; versions.len()];
    for start in 0..versions.len() {
        let mut path = Vec::new();
        let mut on_path = BTreeSet::new();
        let mut current = Some(start);
        while let Some(idx) = current {
            if settled[idx] {
                break;
            }
            if on_path.contains(&idx) {
                findings.push(Finding::error(
                    lifecycle_class::CHAIN_CYCLE,
                    &versions[idx].subject,
                    format!("supersedence chain through {} loops back", versions[idx].token),
                ));
                break;
            }
            on_path.insert(idx);
            path.push(idx);
            current = edges[idx];
        }
        for idx in path {
            settled[idx] = true;
        }
    }
    findings
}

/// Compare a registry entry's status with the `status` of its live block.
///
/// | registry | block |
/// |----------|-------|
/// | published | active (or absent) |
/// | deprecated | deprecated |
/// | duplicate | duplicate |
/// | missing | no live block allowed |
pub fn check_status_alignment(
    entry: &RegistryEntry,
    block_status: Option<&str>,
    subject: &str,
) -> Option<Finding> {
    let block = block_status.unwrap_or("active");
    let aligned = match entry.page_status {
        PageStatus::Published => block == "active",
        PageStatus::Deprecated => block == "deprecated",
        PageStatus::Duplicate => block == "duplicate",
        PageStatus::Missing => false,
    };
    if aligned {
        return None;
    }
    Some(Finding::error(
        lifecycle_class::STATUS_DRIFT,
        subject,
        format!(
            "registry says {} for `{}` but the block says status={block}",
            entry.page_status, entry.id
        ),
    ))
}
