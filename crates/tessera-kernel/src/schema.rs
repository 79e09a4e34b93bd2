//! Per-page-type field contracts.
//!
//! `entity` and `child_entity` pages must embed a block; every other page
//! type must not. That split is an ontology rule, not a default.

use crate::field::{FieldKind, FieldValue, field_spec};
use crate::finding::Finding;
use crate::grammar::ParsedBlock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub const SUPPORTED_SCHEMA: i64 = 1;

pub mod schema_class {
    pub const MISSING_REQUIRED: &str = "schema.missing_required";
    pub const FORBIDDEN_FIELD: &str = "schema.forbidden_field";
    pub const UNKNOWN_FIELD: &str = "schema.unknown_field";
    pub const WRONG_TYPE: &str = "schema.wrong_type";
    pub const ENUM_OUT_OF_RANGE: &str = "schema.enum_out_of_range";
    pub const TYPE_MISMATCH: &str = "schema.type_mismatch";
    pub const UNSUPPORTED_SCHEMA_VERSION: &str = "schema.unsupported_schema_version";
    pub const VERSION_OUT_OF_RANGE: &str = "schema.version_out_of_range";
    pub const URL_NOT_RELATIVE: &str = "schema.url_not_relative";
    pub const SUPERSEDES_INCOMPLETE: &str = "schema.supersedes_incomplete";
    pub const BLOCK_REQUIRED: &str = "schema.block_required";
    pub const BLOCK_FORBIDDEN: &str = "schema.block_forbidden";
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Entity,
    ChildEntity,
    Comparison,
    Education,
    Interface,
    Metrics,
}

impl PageType {
    pub const ALL: [PageType; 6] = [
        Self::Entity,
        Self::ChildEntity,
        Self::Comparison,
        Self::Education,
        Self::Interface,
        Self::Metrics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::ChildEntity => "child_entity",
            Self::Comparison => "comparison",
            Self::Education => "education",
            Self::Interface => "interface",
            Self::Metrics => "metrics",
        }
    }

    pub fn requires_block(self) -> bool {
        matches!(self, Self::Entity | Self::ChildEntity)
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|page_type| page_type.as_str() == normalized)
            .ok_or_else(|| format!("unknown page type `{s}`"))
    }
}

/// Required and forbidden fields for a block-carrying page type. Every other
/// catalog field is optional.
#[derive(Debug, Clone, Copy)]
pub struct FieldProfile {
    pub required: &'static [&'static str],
    pub forbidden: &'static [&'static str],
}

const ENTITY_PROFILE: FieldProfile = FieldProfile {
    required: &["schema", "version", "type", "url", "name"],
    forbidden: &["parent"],
};

const CHILD_ENTITY_PROFILE: FieldProfile = FieldProfile {
    required: &["schema", "version", "type", "url", "name", "parent"],
    forbidden: &[],
};

pub fn profile_for(page_type: PageType) -> Option<&'static FieldProfile> {
    match page_type {
        PageType::Entity => Some(&ENTITY_PROFILE),
        PageType::ChildEntity => Some(&CHILD_ENTITY_PROFILE),
        PageType::Comparison | PageType::Education | PageType::Interface | PageType::Metrics => {
            None
        }
    }
}

/// Enforce block presence/absence for a page of `page_type`.
pub fn block_presence_violation(
    page_type: PageType,
    has_block: bool,
    subject: &str,
) -> Option<Finding> {
    match (page_type.requires_block(), has_block) {
        (true, false) => Some(Finding::error(
            schema_class::BLOCK_REQUIRED,
            subject,
            format!("{page_type} pages must embed a block"),
        )),
        (false, true) => Some(Finding::error(
            schema_class::BLOCK_FORBIDDEN,
            subject,
            format!("{page_type} pages must not embed a block"),
        )),
        _ => None,
    }
}

/// Check a parsed block against the contract of `page_type`.
pub fn validate_schema(block: &ParsedBlock, page_type: PageType) -> Vec<Finding> {
    let subject = block.token.as_str();
    let mut findings = Vec::new();

    let Some(profile) = profile_for(page_type) else {
        if let Some(finding) = block_presence_violation(page_type, true, subject) {
            findings.push(finding);
        }
        return findings;
    };

    let declared: BTreeSet<&str> = block.fields.iter().map(|f| f.name.as_str()).collect();
    for required in profile.required {
        if !declared.contains(required) {
            findings.push(Finding::error(
                schema_class::MISSING_REQUIRED,
                subject,
                format!("{page_type} block is missing required field `{required}`"),
            ));
        }
    }

    for line in &block.fields {
        let name = line.name.as_str();
        if profile.forbidden.contains(&name) {
            findings.push(
                Finding::error(
                    schema_class::FORBIDDEN_FIELD,
                    subject,
                    format!("field `{name}` is forbidden for {page_type} blocks"),
                )
                .at_line(line.line),
            );
            continue;
        }
        let Some(spec) = field_spec(name) else {
            findings.push(
                Finding::error(
                    schema_class::UNKNOWN_FIELD,
                    subject,
                    format!("field `{name}` is not part of the block schema"),
                )
                .at_line(line.line),
            );
            continue;
        };
        let value = match FieldValue::parse(spec, &line.value) {
            Ok(value) => value,
            Err(err) => {
                findings.push(
                    Finding::error(
                        schema_class::WRONG_TYPE,
                        subject,
                        format!("field `{name}` expects {}, found {:?}", err.expected, err.found),
                    )
                    .at_line(line.line),
                );
                continue;
            }
        };
        if value.is_null() {
            if !spec.nullable {
                findings.push(
                    Finding::error(
                        schema_class::WRONG_TYPE,
                        subject,
                        format!("field `{name}` is not nullable"),
                    )
                    .at_line(line.line),
                );
            }
            continue;
        }
        if let (FieldKind::Enum(allowed), FieldValue::Enum(found)) = (spec.kind, &value)
            && !allowed.contains(&found.as_str())
        {
            findings.push(
                Finding::error(
                    schema_class::ENUM_OUT_OF_RANGE,
                    subject,
                    format!("field `{name}` must be one of {allowed:?}, found {found:?}"),
                )
                .at_line(line.line),
            );
            continue;
        }
        check_field_contract(name, &value, page_type, subject, line.line, &mut findings);
    }

    let has_token = declared.contains("supersedes_token");
    let has_hash = declared.contains("supersedes_hash");
    if has_token != has_hash {
        findings.push(Finding::error(
            schema_class::SUPERSEDES_INCOMPLETE,
            subject,
            "supersedes_token and supersedes_hash must be declared together",
        ));
    }

    findings
}

fn check_field_contract(
    name: &str,
    value: &FieldValue,
    page_type: PageType,
    subject: &str,
    line: usize,
    findings: &mut Vec<Finding>,
) {
    match (name, value) {
        ("type", FieldValue::Enum(declared)) if declared != page_type.as_str() => {
            findings.push(
                Finding::error(
                    schema_class::TYPE_MISMATCH,
                    subject,
                    format!("block declares type={declared} but the page is {page_type}"),
                )
                .at_line(line),
            );
        }
        ("schema", FieldValue::Integer(schema)) if *schema != SUPPORTED_SCHEMA => {
            findings.push(
                Finding::error(
                    schema_class::UNSUPPORTED_SCHEMA_VERSION,
                    subject,
                    format!("schema={schema} is not supported (expected {SUPPORTED_SCHEMA})"),
                )
                .at_line(line),
            );
        }
        ("version", FieldValue::Integer(version)) if *version < 1 => {
            findings.push(
                Finding::error(
                    schema_class::VERSION_OUT_OF_RANGE,
                    subject,
                    format!("version must be >= 1, found {version}"),
                )
                .at_line(line),
            );
        }
        ("url", FieldValue::Text(url)) if !url.starts_with('/') || url.starts_with("//") => {
            findings.push(
                Finding::error(
                    schema_class::URL_NOT_RELATIVE,
                    subject,
                    format!("url must be a site-relative path, found {url:?}"),
                )
                .at_line(line),
            );
        }
        _ => {}
    }
}
