//! Aggregate report over every coherence check.
//!
//! The id is derived from the serialized body and the timestamp is a bare
//! date, so an unchanged tree reproduces the same bytes and the same id.

use crate::CheckStatus;
use crate::consistency::{ConsistencyReport, check_consistency};
use crate::metadata::{MetadataReport, check_metadata};
use crate::snapshot::{SnapshotComparison, SnapshotError, SnapshotStatus, compare_to_latest};
use crate::topology::{TopologyReport, check_topology};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use tessera_kernel::canonical_json_bytes;
use tessera_ledger::{Corpus, Layout, LoadError, read_substrate, write_atomic};
use tracing::{info, warn};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub consistency_violations: usize,
    pub topology_violations: usize,
    pub metadata_violations: usize,
    pub snapshot_violations: usize,
    pub total_violations: usize,
    pub snapshot_status: SnapshotStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBody {
    pub scope: String,
    pub status: CheckStatus,
    pub engine_version: String,
    pub checked_at: NaiveDate,
    pub summary: ReportSummary,
    pub consistency: ConsistencyReport,
    pub topology: TopologyReport,
    pub metadata: MetadataReport,
    pub snapshot: SnapshotComparison,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub report_id: String,
    #[serde(flatten)]
    pub body: ReportBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportSave {
    Written(PathBuf),
    Unchanged(PathBuf),
    /// Same id, different bytes; kept beside the original.
    Divergent(PathBuf),
}

impl ReportSave {
    pub fn path(&self) -> &Path {
        match self {
            Self::Written(path) | Self::Unchanged(path) | Self::Divergent(path) => path,
        }
    }
}

/// `rpt-` plus the SHA-256 of the body's canonical JSON.
pub fn compute_report_id(body: &ReportBody) -> Result<String, ReportError> {
    let bytes = canonical_json_bytes(&serde_json::to_value(body)?)?;
    Ok(format!("rpt-{:x}", Sha256::digest(&bytes)))
}

pub fn build_report(
    corpus: &Corpus,
    layout: &Layout,
    checked_at: NaiveDate,
    scope: &str,
) -> Result<Report, ReportError> {
    let consistency = check_consistency(corpus, layout);
    let topology = check_topology(corpus, layout);
    let metadata = check_metadata(corpus, layout);
    let snapshot = compare_to_latest(layout, checked_at)?;

    let summary = ReportSummary {
        consistency_violations: consistency.violation_count,
        topology_violations: topology.violation_count,
        metadata_violations: metadata.violation_count,
        snapshot_violations: snapshot.violation_count,
        total_violations: consistency.violation_count
            + topology.violation_count
            + metadata.violation_count
            + snapshot.violation_count,
        snapshot_status: snapshot.status,
    };
    let status = if summary.total_violations == 0 && !snapshot.status.is_failure() {
        CheckStatus::Pass
    } else {
        CheckStatus::Fail
    };
    let body = ReportBody {
        scope: scope.to_string(),
        status,
        engine_version: ENGINE_VERSION.to_string(),
        checked_at,
        summary,
        consistency,
        topology,
        metadata,
        snapshot,
    };
    let report_id = compute_report_id(&body)?;
    info!(id = %report_id, total = body.summary.total_violations, "report built");
    Ok(Report { report_id, body })
}

fn render(report: &Report) -> Result<String, ReportError> {
    let mut rendered = serde_json::to_string_pretty(report)?;
    rendered.push('\n');
    Ok(rendered)
}

fn write(path: &Path, rendered: &str) -> Result<(), ReportError> {
    write_atomic(path, rendered.as_bytes()).map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Append-only save. An existing report is never overwritten: identical
/// bytes are a no-op, different bytes go to the next free
/// `<id>.divergent-<n>.json`.
pub fn save_report(layout: &Layout, report: &Report) -> Result<ReportSave, ReportError> {
    let dir = layout.report_dir();
    let rendered = render(report)?;
    let path = dir.join(format!("{}.json", report.report_id));
    if !path.exists() {
        write(&path, &rendered)?;
        info!(path = %path.display(), "report written");
        return Ok(ReportSave::Written(path));
    }
    if read_substrate(&path)? == rendered {
        return Ok(ReportSave::Unchanged(path));
    }

    let mut n = 1;
    loop {
        let divergent = dir.join(format!("{}.divergent-{n}.json", report.report_id));
        if !divergent.exists() {
            write(&divergent, &rendered)?;
            warn!(
                id = %report.report_id,
                path = %divergent.display(),
                "report content diverged under an existing id"
            );
            return Ok(ReportSave::Divergent(divergent));
        }
        if read_substrate(&divergent)? == rendered {
            return Ok(ReportSave::Divergent(divergent));
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TempDirGuard;
    use tessera_ledger::{Dataset, Registry};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date")
    }

    fn empty_report(tmp: &TempDirGuard) -> (Layout, Report) {
        let layout = Layout::with_defaults(tmp.path());
        let corpus = Corpus::new(Registry::default(), Dataset::default(), Vec::new());
        let report = build_report(&corpus, &layout, date(), "full").expect("report");
        (layout, report)
    }

    #[test]
    fn id_covers_the_body() {
        let tmp = TempDirGuard::new("report-id");
        let (_, report) = empty_report(&tmp);
        assert_eq!(report.report_id, compute_report_id(&report.body).expect("id"));
        assert_eq!(report.report_id.len(), "rpt-".len() + 64);

        let mut later = report.body.clone();
        later.checked_at = NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date");
        assert_ne!(compute_report_id(&later).expect("id"), report.report_id);
    }

    #[test]
    fn missing_crawl_files_fail_the_report() {
        let tmp = TempDirGuard::new("report-status");
        let (_, report) = empty_report(&tmp);
        assert_eq!(report.body.status, CheckStatus::Fail);
        assert_eq!(report.body.summary.metadata_violations, 2);
        assert_eq!(report.body.summary.snapshot_status, SnapshotStatus::NoBaseline);
        assert_eq!(report.body.engine_version, ENGINE_VERSION);
    }

    #[test]
    fn divergent_content_is_kept_beside_the_original() {
        let tmp = TempDirGuard::new("report-save");
        let (layout, report) = empty_report(&tmp);
        let first = save_report(&layout, &report).expect("save");
        assert!(matches!(first, ReportSave::Written(_)));
        assert!(matches!(save_report(&layout, &report), Ok(ReportSave::Unchanged(_))));

        let mut tampered = report.clone();
        tampered.body.scope = "partial".to_string();
        let divergent = save_report(&layout, &tampered).expect("save");
        assert_eq!(
            divergent,
            ReportSave::Divergent(
                layout
                    .report_dir()
                    .join(format!("{}.divergent-1.json", report.report_id))
            )
        );
        let original = read_substrate(first.path()).expect("read");
        assert!(original.contains("\"scope\": \"full\""));
    }
}
