//! Structured findings shared by every kernel check.
//!
//! Checks never throw on recoverable conditions; they return findings with a
//! stable `class` string so callers can aggregate `failure_classes`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Severity of a finding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One violation discovered by a check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub class: String,
    pub severity: Severity,
    /// Token, registry id or path the finding is about.
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl Finding {
    pub fn error(class: &str, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.to_string(),
            severity: Severity::Error,
            subject: subject.into(),
            line: None,
            message: message.into(),
        }
    }

    pub fn warning(class: &str, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.to_string(),
            severity: Severity::Warning,
            subject: subject.into(),
            line: None,
            message: message.into(),
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Sorted, de-duplicated class names of `findings`.
pub fn collect_classes(findings: &[Finding]) -> Vec<String> {
    findings
        .iter()
        .map(|finding| finding.class.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Split findings into (errors, warnings), preserving order.
pub fn partition(findings: Vec<Finding>) -> (Vec<Finding>, Vec<Finding>) {
    findings.into_iter().partition(Finding::is_error)
}
