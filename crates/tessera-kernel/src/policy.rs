//! Content policy: forbidden lexical patterns.
//!
//! Rules are data. Adding a policy means adding a row to [`POLICY_RULES`],
//! not a new code path. The scanner only detects; it never rewrites.

use crate::finding::{Finding, Severity};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy)]
pub struct PolicyRule {
    pub id: &'static str,
    pub pattern: &'static str,
    pub severity: Severity,
    pub description: &'static str,
}

pub const POLICY_RULES: &[PolicyRule] = &[
    PolicyRule {
        id: "emoji_glyph",
        pattern: r"[\x{1F000}-\x{1FAFF}\x{2600}-\x{27BF}\x{2B00}-\x{2BFF}\x{FE0F}\x{2122}\x{00AE}\x{00A9}]",
        severity: Severity::Error,
        description: "emoji or decorative symbol glyph",
    },
    PolicyRule {
        id: "superlative_claim",
        pattern: r"(?i)(?:\b(?:best|greatest|leading|unbeatable|unmatched|top-rated|world-class|number\s+one)\b|#1\b|\bno\.\s?1\b)",
        severity: Severity::Error,
        description: "superlative or ranking claim",
    },
    PolicyRule {
        id: "call_to_action",
        pattern: r"(?i)\b(?:sign\s+up|join\s+now|register\s+now|buy\s+now|click\s+here|download\s+now|get\s+started|trade\s+now|subscribe\s+now|act\s+now|claim\s+your)\b",
        severity: Severity::Error,
        description: "imperative call to action",
    },
    PolicyRule {
        id: "second_person_instruction",
        pattern: r"(?i)\b(?:you\s+should|you\s+must|you\s+need\s+to|ignore\s+(?:all\s+|any\s+)?previous|as\s+an\s+ai)\b",
        severity: Severity::Warning,
        description: "second-person or prompt-like instruction",
    },
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyViolation {
    pub rule: String,
    pub severity: Severity,
    /// 1-based line and character column of the match.
    pub line: usize,
    pub column: usize,
    pub excerpt: String,
}

impl PolicyViolation {
    pub fn class(&self) -> String {
        format!("policy.{}", self.rule)
    }

    pub fn to_finding(&self, subject: &str) -> Finding {
        let message = format!(
            "forbidden pattern {:?} at column {}",
            self.excerpt, self.column
        );
        let finding = match self.severity {
            Severity::Error => Finding::error(&self.class(), subject, message),
            Severity::Warning => Finding::warning(&self.class(), subject, message),
        };
        finding.at_line(self.line)
    }
}

pub struct PolicyScanner {
    rules: Vec<(&'static PolicyRule, Regex)>,
}

impl PolicyScanner {
    pub fn new(rules: &'static [PolicyRule]) -> Result<Self, regex::Error> {
        let compiled = rules
            .iter()
            .map(|rule| Regex::new(rule.pattern).map(|re| (rule, re)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules: compiled })
    }

    /// Scanner over the built-in rule table.
    pub fn standard() -> &'static PolicyScanner {
        static SCANNER: OnceLock<PolicyScanner> = OnceLock::new();
        SCANNER.get_or_init(|| PolicyScanner::new(POLICY_RULES).expect("policy rules must compile"))
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|(rule, _)| rule.id)
    }

    /// Scan every line of `text`.
    pub fn scan(&self, text: &str) -> Vec<PolicyViolation> {
        self.scan_lines(text, |_| true)
    }

    /// Scan a block, skipping its `[...]` delimiter lines so tokens are not
    /// mistaken for prose.
    pub fn scan_block(&self, text: &str) -> Vec<PolicyViolation> {
        self.scan_lines(text, |line| !line.trim_start().starts_with('['))
    }

    fn scan_lines(&self, text: &str, include: impl Fn(&str) -> bool) -> Vec<PolicyViolation> {
        let mut out = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if !include(line) {
                continue;
            }
            for (rule, re) in &self.rules {
                for found in re.find_iter(line) {
                    out.push(PolicyViolation {
                        rule: rule.id.to_string(),
                        severity: rule.severity,
                        line: idx + 1,
                        column: line[..found.start()].chars().count() + 1,
                        excerpt: found.as_str().to_string(),
                    });
                }
            }
        }
        out
    }
}
