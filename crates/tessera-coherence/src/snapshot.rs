//! Content-addressed manifests of the tracked tree.
//!
//! A snapshot file is written once and never replaced. Comparing against the
//! latest snapshot separates deletions (always fatal) from modifications,
//! which are tolerated only on paths generation is expected to rewrite.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tessera_kernel::{ContentHash, canonical_json_bytes};
use tessera_ledger::{
    Layout, LoadError, PageKind, read_substrate, rel_slash_path, walk_sorted, write_atomic,
};
use tracing::{debug, info};

pub mod snapshot_class {
    pub const FILE_DELETED: &str = "FILE_DELETED";
    pub const FILE_MODIFIED: &str = "FILE_MODIFIED";
}

const SNAPSHOT_ID_HEX: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("snapshot {id} already exists at {path} with different content")]
    Conflict { id: String, path: String },

    #[error("snapshot file {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },
}

impl SnapshotError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    /// `/`-separated, relative to the tree root.
    pub path: String,
    pub hash: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub snapshot_id: String,
    pub created_at: NaiveDate,
    /// Save order: one past the highest sequence already in the snapshot dir.
    #[serde(default)]
    pub sequence: u64,
    pub files: Vec<SnapshotFile>,
    pub total_files: usize,
    pub total_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Written(PathBuf),
    /// Identical content was already present.
    Unchanged(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    Pass,
    Fail,
    SkippedExpectedMutation,
    NoBaseline,
}

impl SnapshotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::SkippedExpectedMutation => "skipped_expected_mutation",
            Self::NoBaseline => "no_baseline",
        }
    }

    pub fn is_failure(self) -> bool {
        self == Self::Fail
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotViolation {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub baseline_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotComparison {
    pub status: SnapshotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_id: Option<String>,
    pub current_id: String,
    pub violation_count: usize,
    pub violations: Vec<SnapshotViolation>,
    /// Allowlisted paths whose content changed.
    pub expected_mutations: Vec<String>,
    /// Paths new since the baseline. Informational only.
    pub added: Vec<String>,
}

fn trimmed(path: &str) -> &str {
    path.trim_start_matches("./").trim_end_matches('/')
}

fn is_under(path: &str, dir: &str) -> bool {
    let dir = trimmed(dir);
    !dir.is_empty()
        && path
            .strip_prefix(dir)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Hash every file under the tracked roots, sorted by path. The snapshot
/// and report dirs are never tracked.
pub fn build_manifest(layout: &Layout) -> Result<Vec<SnapshotFile>, SnapshotError> {
    let config = layout.config();
    let root = layout.root();
    let mut files: BTreeMap<String, SnapshotFile> = BTreeMap::new();

    for tracked in &config.tracked_roots {
        let tracked = trimmed(tracked);
        let base = if tracked.is_empty() || tracked == "." {
            root.to_path_buf()
        } else {
            root.join(tracked)
        };
        let paths = if base.is_file() {
            vec![base]
        } else if base.is_dir() {
            walk_sorted(&base)?
        } else {
            debug!(root = %base.display(), "tracked root absent");
            continue;
        };

        for path in paths {
            let Some(rel) = rel_slash_path(root, &path) else {
                return Err(SnapshotError::Corrupt {
                    path: path.display().to_string(),
                    reason: "path is not valid UTF-8".to_string(),
                });
            };
            if is_under(&rel, &config.snapshot_dir) || is_under(&rel, &config.report_dir) {
                continue;
            }
            let bytes = fs::read(&path).map_err(|e| SnapshotError::io(&path, e))?;
            files.insert(
                rel.clone(),
                SnapshotFile {
                    path: rel,
                    hash: ContentHash::from_bytes(&bytes).to_string(),
                    size: bytes.len() as u64,
                },
            );
        }
    }
    Ok(files.into_values().collect())
}

fn manifest_digest(files: &[SnapshotFile]) -> Result<String, SnapshotError> {
    let bytes = canonical_json_bytes(&serde_json::to_value(files)?)?;
    let digest = format!("{:x}", Sha256::digest(&bytes));
    Ok(digest[..SNAPSHOT_ID_HEX].to_string())
}

pub fn create_snapshot(layout: &Layout, date: NaiveDate) -> Result<Snapshot, SnapshotError> {
    let files = build_manifest(layout)?;
    let snapshot_id = format!("snap-{date}-{}", manifest_digest(&files)?);
    let sequence = load_saved(layout)?
        .iter()
        .map(|saved| saved.sequence)
        .max()
        .unwrap_or(0)
        + 1;
    Ok(Snapshot {
        snapshot_id,
        created_at: date,
        sequence,
        total_files: files.len(),
        total_size: files.iter().map(|file| file.size).sum(),
        files,
    })
}

fn render(snapshot: &Snapshot) -> Result<String, SnapshotError> {
    let mut rendered = serde_json::to_string_pretty(snapshot)?;
    rendered.push('\n');
    Ok(rendered)
}

pub fn snapshot_path(layout: &Layout, snapshot_id: &str) -> PathBuf {
    layout.snapshot_dir().join(format!("{snapshot_id}.json"))
}

/// Write `snapshot` unless a file with its id exists. An existing file with
/// the same manifest is a no-op and keeps its original sequence; anything
/// else is a [`SnapshotError::Conflict`].
pub fn save_snapshot(layout: &Layout, snapshot: &Snapshot) -> Result<SaveOutcome, SnapshotError> {
    let path = snapshot_path(layout, &snapshot.snapshot_id);
    let rendered = render(snapshot)?;
    if path.exists() {
        let mut existing = parse_snapshot(&path)?;
        existing.sequence = snapshot.sequence;
        if existing == *snapshot {
            debug!(id = %snapshot.snapshot_id, "snapshot already saved");
            return Ok(SaveOutcome::Unchanged(path));
        }
        return Err(SnapshotError::Conflict {
            id: snapshot.snapshot_id.clone(),
            path: path.display().to_string(),
        });
    }
    write_atomic(&path, rendered.as_bytes()).map_err(|e| SnapshotError::io(&path, e))?;
    info!(id = %snapshot.snapshot_id, files = snapshot.total_files, "snapshot written");
    Ok(SaveOutcome::Written(path))
}

fn parse_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let text = read_substrate(path)?;
    serde_json::from_str(&text).map_err(|e| SnapshotError::Corrupt {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn load_saved(layout: &Layout) -> Result<Vec<Snapshot>, SnapshotError> {
    let dir = layout.snapshot_dir();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    walk_sorted(&dir)?
        .iter()
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .map(|path| parse_snapshot(path))
        .collect()
}

fn recency(snapshot: &Snapshot) -> (u64, NaiveDate, &str) {
    (snapshot.sequence, snapshot.created_at, &snapshot.snapshot_id)
}

/// Most recent saved snapshot by `(sequence, created_at, snapshot_id)`.
pub fn load_latest(layout: &Layout) -> Result<Option<Snapshot>, SnapshotError> {
    Ok(load_saved(layout)?
        .into_iter()
        .max_by(|a, b| recency(a).cmp(&recency(b))))
}

/// Paths generation rewrites: the registry, the dataset and entity root
/// pages. Child pages never qualify.
fn is_expected_mutation(layout: &Layout, path: &str) -> bool {
    let config = layout.config();
    if path == trimmed(&config.registry_path) || path == trimmed(&config.dataset_path) {
        return true;
    }
    let pages_dir = trimmed(&config.pages_dir);
    let page = if pages_dir.is_empty() || pages_dir == "." {
        Some(path)
    } else {
        path.strip_prefix(pages_dir).and_then(|rest| rest.strip_prefix('/'))
    };
    page.is_some_and(|page| layout.classify(page) == PageKind::Entity)
}

pub fn compare_snapshot(
    baseline: &Snapshot,
    current: &Snapshot,
    layout: &Layout,
) -> SnapshotComparison {
    let live: BTreeMap<&str, &SnapshotFile> = current
        .files
        .iter()
        .map(|file| (file.path.as_str(), file))
        .collect();
    let mut violations = Vec::new();
    let mut expected_mutations = Vec::new();

    for file in &baseline.files {
        match live.get(file.path.as_str()) {
            None => violations.push(SnapshotViolation {
                kind: snapshot_class::FILE_DELETED.to_string(),
                path: file.path.clone(),
                baseline_hash: file.hash.clone(),
                current_hash: None,
            }),
            Some(now) if now.hash != file.hash => {
                if is_expected_mutation(layout, &file.path) {
                    expected_mutations.push(file.path.clone());
                } else {
                    violations.push(SnapshotViolation {
                        kind: snapshot_class::FILE_MODIFIED.to_string(),
                        path: file.path.clone(),
                        baseline_hash: file.hash.clone(),
                        current_hash: Some(now.hash.clone()),
                    });
                }
            }
            Some(_) => {}
        }
    }

    let known: BTreeMap<&str, ()> = baseline
        .files
        .iter()
        .map(|file| (file.path.as_str(), ()))
        .collect();
    let added = current
        .files
        .iter()
        .filter(|file| !known.contains_key(file.path.as_str()))
        .map(|file| file.path.clone())
        .collect();

    let status = if !violations.is_empty() {
        SnapshotStatus::Fail
    } else if !expected_mutations.is_empty() {
        SnapshotStatus::SkippedExpectedMutation
    } else {
        SnapshotStatus::Pass
    };
    SnapshotComparison {
        status,
        baseline_id: Some(baseline.snapshot_id.clone()),
        current_id: current.snapshot_id.clone(),
        violation_count: violations.len(),
        violations,
        expected_mutations,
        added,
    }
}

/// Compare the live tree against the latest saved snapshot. Nothing is
/// written.
pub fn compare_to_latest(
    layout: &Layout,
    date: NaiveDate,
) -> Result<SnapshotComparison, SnapshotError> {
    let current = create_snapshot(layout, date)?;
    let Some(baseline) = load_latest(layout)? else {
        return Ok(SnapshotComparison {
            status: SnapshotStatus::NoBaseline,
            baseline_id: None,
            current_id: current.snapshot_id,
            violation_count: 0,
            violations: Vec::new(),
            expected_mutations: Vec::new(),
            added: Vec::new(),
        });
    };
    let comparison = compare_snapshot(&baseline, &current, layout);
    debug!(
        baseline = %baseline.snapshot_id,
        status = ?comparison.status,
        violations = comparison.violation_count,
        "snapshot compared"
    );
    Ok(comparison)
}
