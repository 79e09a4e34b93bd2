//! Cross-representation checks over a loaded [`Corpus`](tessera_ledger::Corpus).
//!
//! Every check here is observational: it never halts the scan and never
//! mutates the tree. Only snapshots and reports are written, and both are
//! append-only.

pub mod consistency;
pub mod metadata;
pub mod report;
pub mod snapshot;
pub mod topology;

pub use consistency::{ConsistencyReport, ConsistencyViolation, check_consistency};
pub use metadata::{MetadataReport, MetadataViolation, canonical_value, check_metadata};
pub use report::{
    ENGINE_VERSION, Report, ReportBody, ReportError, ReportSave, ReportSummary, build_report,
    compute_report_id, save_report,
};
pub use snapshot::{
    SaveOutcome, Snapshot, SnapshotComparison, SnapshotError, SnapshotFile, SnapshotStatus,
    SnapshotViolation, build_manifest, compare_snapshot, compare_to_latest, create_snapshot,
    load_latest, save_snapshot, snapshot_path,
};
pub use topology::{
    TopologyReport, TopologyViolation, check_topology, extract_links, resolve_href,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
}

impl CheckStatus {
    pub fn from_violation_count(count: usize) -> Self {
        if count == 0 { Self::Pass } else { Self::Fail }
    }

    pub fn is_pass(self) -> bool {
        self == Self::Pass
    }
}
