//! Fixed-order validation pipeline.
//!
//! grammar → schema → content policy → hash check → block lifecycle.
//!
//! A grammar failure ends the block's run; everything after it accumulates,
//! so callers see the complete defect list in one pass. The corpus pass adds
//! the registry graph, supersedence chains and ledger/block alignment.

use crate::canonical::{CanonicalForm, canonicalize};
use crate::finding::{Finding, collect_classes, partition};
use crate::grammar::{ParsedBlock, parse_block};
use crate::graph::{GraphReport, graph_class, resolve_entity_graph};
use crate::hash::{CANONICAL_HASH_FIELD, ContentHash, compute_hash};
use crate::lifecycle::{
    BlockVersion, check_block_lifecycle, check_status_alignment, check_supersedence,
};
use crate::policy::PolicyScanner;
use crate::registry::{EntryType, RegistryEntry};
use crate::schema::{PageType, validate_schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub mod pipeline_class {
    pub const CANONICALIZATION_FAILED: &str = "hash.canonicalization_failed";
    pub const PROVISIONAL: &str = "hash.provisional";
    pub const MISMATCH: &str = "hash.mismatch";
    pub const UNREGISTERED_BLOCK: &str = "corpus.unregistered_block";
    pub const PARENT_DRIFT: &str = "corpus.parent_drift";
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Collect everything; never fails. Used while drafting.
    Permissive,
    /// Fails on any error-grade finding.
    #[default]
    Full,
    /// Fails on any finding at all, warnings included.
    Strict,
}

impl Strictness {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::Full => "full",
            Self::Strict => "strict",
        }
    }

    pub fn verdict(self, findings: &[Finding]) -> Verdict {
        match self {
            Self::Permissive => Verdict::Draft,
            Self::Full if findings.iter().any(Finding::is_error) => Verdict::Fail,
            Self::Strict if !findings.is_empty() => Verdict::Fail,
            Self::Full | Self::Strict => Verdict::Pass,
        }
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" | "draft" => Ok(Self::Permissive),
            "full" | "full-check" | "full_check" => Ok(Self::Full),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "unknown strictness `{other}` (expected permissive, full or strict)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Draft,
    Pass,
    Fail,
}

impl Verdict {
    pub fn is_failure(self) -> bool {
        self == Self::Fail
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockReport {
    pub subject: String,
    pub token: Option<String>,
    pub page_type: Option<PageType>,
    pub computed_hash: Option<String>,
    pub declared_hash: Option<String>,
    /// No `canonical_hash` declared yet.
    pub provisional: bool,
    pub mode: Strictness,
    pub verdict: Verdict,
    pub failure_classes: Vec<String>,
    pub warning_classes: Vec<String>,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

impl BlockReport {
    fn new(subject: &str, mode: Strictness) -> Self {
        Self {
            subject: subject.to_string(),
            token: None,
            page_type: None,
            computed_hash: None,
            declared_hash: None,
            provisional: false,
            mode,
            verdict: Verdict::Pass,
            failure_classes: Vec::new(),
            warning_classes: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add findings and recompute the verdict under the report's mode.
    pub fn absorb(&mut self, findings: Vec<Finding>) {
        let (errors, warnings) = partition(findings);
        self.errors.extend(errors);
        self.warnings.extend(warnings);
        self.failure_classes = collect_classes(&self.errors);
        self.warning_classes = collect_classes(&self.warnings);
        self.verdict = self.mode.verdict(&self.findings());
    }

    pub fn findings(&self) -> Vec<Finding> {
        self.errors.iter().chain(&self.warnings).cloned().collect()
    }
}

/// A block after the pipeline, with the intermediate artifacts that later
/// corpus checks reuse.
#[derive(Debug, Clone)]
pub struct ValidatedBlock {
    pub parsed: Option<ParsedBlock>,
    pub form: Option<CanonicalForm>,
    pub hash: Option<ContentHash>,
    pub report: BlockReport,
}

fn derive_page_type(block: &ParsedBlock) -> PageType {
    block
        .field("type")
        .and_then(|declared| declared.parse::<PageType>().ok())
        .filter(|page_type| page_type.requires_block())
        .unwrap_or(PageType::Entity)
}

/// Run one block through the pipeline.
///
/// `expected` is the page type the block was found on. When absent, the
/// block's own `type` field decides, falling back to `entity`.
pub fn validate_block(
    text: &str,
    subject: &str,
    expected: Option<PageType>,
    mode: Strictness,
) -> ValidatedBlock {
    let mut report = BlockReport::new(subject, mode);

    let parsed = match parse_block(text) {
        Ok(parsed) => parsed,
        Err(err) => {
            let mut finding = Finding::error(err.class(), subject, err.to_string());
            if let Some(line) = err.line() {
                finding = finding.at_line(line);
            }
            debug!(subject, class = err.class(), "grammar failure short-circuits block");
            report.page_type = expected;
            report.absorb(vec![finding]);
            return ValidatedBlock {
                parsed: None,
                form: None,
                hash: None,
                report,
            };
        }
    };

    let page_type = expected.unwrap_or_else(|| derive_page_type(&parsed));
    report.token = Some(parsed.token.clone());
    report.page_type = Some(page_type);

    let mut findings = validate_schema(&parsed, page_type);
    findings.extend(
        PolicyScanner::standard()
            .scan_block(text)
            .iter()
            .map(|violation| violation.to_finding(subject)),
    );

    let declared = parsed.field(CANONICAL_HASH_FIELD).map(str::to_string);
    report.declared_hash = declared.clone();
    report.provisional = declared.is_none();

    let (form, hash) = match canonicalize(&parsed).and_then(|form| {
        let hash = compute_hash(&form)?;
        Ok((form, hash))
    }) {
        Ok((form, hash)) => (Some(form), Some(hash)),
        Err(err) => {
            findings.push(Finding::error(
                pipeline_class::CANONICALIZATION_FAILED,
                subject,
                err.to_string(),
            ));
            (None, None)
        }
    };

    if let Some(hash) = &hash {
        report.computed_hash = Some(hash.to_string());
        match declared.as_deref() {
            None => findings.push(Finding::warning(
                pipeline_class::PROVISIONAL,
                subject,
                "block has no canonical_hash yet",
            )),
            Some(declared) if !hash.matches(declared) => findings.push(Finding::error(
                pipeline_class::MISMATCH,
                subject,
                format!("declared canonical_hash {declared} but the block hashes to {hash}"),
            )),
            Some(_) => {}
        }
    }

    if let Some(form) = &form {
        findings.extend(check_block_lifecycle(form, subject));
    }

    report.absorb(findings);
    ValidatedBlock {
        parsed: Some(parsed),
        form,
        hash,
        report,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorpusValidation {
    pub mode: Strictness,
    pub verdict: Verdict,
    pub failure_classes: Vec<String>,
    pub graph: GraphReport,
    pub blocks: Vec<BlockReport>,
    /// Findings that span several blocks (supersedence).
    pub chain_findings: Vec<Finding>,
    pub error_count: usize,
    pub warning_count: usize,
}

fn expected_page_type(entry_type: EntryType) -> PageType {
    match entry_type {
        EntryType::Entity => PageType::Entity,
        EntryType::ChildEntity => PageType::ChildEntity,
        EntryType::Comparison => PageType::Comparison,
    }
}

/// Validate every block against the registry.
///
/// `blocks` pairs a subject (usually the page path) with the raw block text.
pub fn validate_corpus(
    entries: &[RegistryEntry],
    blocks: &[(String, String)],
    mode: Strictness,
) -> CorpusValidation {
    let graph = resolve_entity_graph(entries);
    let mut registry: BTreeMap<&str, &RegistryEntry> = BTreeMap::new();
    for entry in entries {
        registry.entry(entry.id.as_str()).or_insert(entry);
    }

    let mut reports = Vec::with_capacity(blocks.len());
    let mut versions = Vec::new();
    for (subject, text) in blocks {
        let id = parse_block(text).ok().map(|block| block.id());
        let entry = id.as_deref().and_then(|id| registry.get(id).copied());
        let expected = entry.map(|entry| expected_page_type(entry.entry_type));
        let mut validated = validate_block(text, subject, expected, mode);

        let mut extra = Vec::new();
        match (entry, id.as_deref()) {
            (None, Some(id)) => extra.push(Finding::error(
                pipeline_class::UNREGISTERED_BLOCK,
                subject.as_str(),
                format!("block `{id}` has no registry entry"),
            )),
            (Some(entry), _) => {
                extra.extend(registry_findings(entry, &validated, &graph, subject));
            }
            (None, None) => {}
        }
        validated.report.absorb(extra);

        if let (Some(form), Some(hash)) = (&validated.form, &validated.hash) {
            versions.push(BlockVersion::from_form(form, hash.clone(), subject));
        }
        reports.push(validated.report);
    }

    let chain_findings = check_supersedence(&versions);

    let mut all: Vec<Finding> = graph.violations.clone();
    for report in &reports {
        all.extend(report.findings());
    }
    all.extend(chain_findings.iter().cloned());

    let error_count = all.iter().filter(|finding| finding.is_error()).count();
    let warning_count = all.len() - error_count;
    debug!(
        blocks = reports.len(),
        errors = error_count,
        warnings = warning_count,
        "corpus validated"
    );

    CorpusValidation {
        mode,
        verdict: mode.verdict(&all),
        failure_classes: collect_classes(
            &all.iter().filter(|f| f.is_error()).cloned().collect::<Vec<_>>(),
        ),
        graph,
        blocks: reports,
        chain_findings,
        error_count,
        warning_count,
    }
}

fn registry_findings(
    entry: &RegistryEntry,
    validated: &ValidatedBlock,
    graph: &GraphReport,
    subject: &str,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    if graph.is_blocked(&entry.id) {
        findings.push(Finding::error(
            graph_class::PUBLICATION_BLOCKED,
            subject,
            format!("`{}` has unresolved entity-graph violations", entry.id),
        ));
    }
    let Some(form) = &validated.form else {
        return findings;
    };

    if entry.entry_type == EntryType::ChildEntity {
        let declared = form
            .field("parent")
            .and_then(|value| value.as_str())
            .map(str::to_ascii_lowercase);
        if let (Some(declared), Some(ledger)) = (declared, entry.parent_id.as_deref())
            && declared != ledger
        {
            findings.push(Finding::error(
                pipeline_class::PARENT_DRIFT,
                subject,
                format!("block parent `{declared}` disagrees with registry parent_id `{ledger}`"),
            ));
        }
    }

    let status = form.field("status").and_then(|value| value.as_str());
    findings.extend(check_status_alignment(entry, status, subject));
    findings
}
