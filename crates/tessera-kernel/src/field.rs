//! Field catalog and typed field values.
//!
//! Every recognized block field has exactly one primitive kind. Raw text is
//! typed through the catalog before it reaches the canonicalizer, so an
//! unrecognized shape surfaces as an explicit error instead of a guess.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const STATUS_VALUES: &[&str] = &["active", "deprecated", "duplicate"];
pub const BLOCK_TYPE_VALUES: &[&str] = &["entity", "child_entity"];
pub const VENUE_KIND_VALUES: &[&str] = &["spot", "derivatives", "hybrid", "otc"];

/// Primitive kind of a catalog field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Enum(&'static [&'static str]),
    Reference,
    ReferenceList,
    Hash,
}

impl FieldKind {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Enum(_) => "enum value",
            Self::Reference => "reference token",
            Self::ReferenceList => "comma-separated reference tokens",
            Self::Hash => "lowercase hex digest",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

const fn spec(name: &'static str, kind: FieldKind, nullable: bool) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        nullable,
    }
}

pub const FIELD_CATALOG: &[FieldSpec] = &[
    spec("schema", FieldKind::Integer, false),
    spec("version", FieldKind::Integer, false),
    spec("type", FieldKind::Enum(BLOCK_TYPE_VALUES), false),
    spec("url", FieldKind::Text, false),
    spec("name", FieldKind::Text, false),
    spec("canonical_hash", FieldKind::Hash, false),
    spec("parent", FieldKind::Reference, false),
    spec("jurisdiction", FieldKind::Text, true),
    spec("founded", FieldKind::Integer, true),
    spec("venue_kind", FieldKind::Enum(VENUE_KIND_VALUES), true),
    spec("status", FieldKind::Enum(STATUS_VALUES), false),
    spec("replacement_refs", FieldKind::ReferenceList, true),
    spec("supersedes_token", FieldKind::Reference, false),
    spec("supersedes_hash", FieldKind::Hash, false),
];

pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    FIELD_CATALOG.iter().find(|spec| spec.name == name)
}

/// A typed field value. Matching over this enum is exhaustive everywhere it
/// is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Enum(String),
    Reference(String),
    ReferenceList(Vec<String>),
    Hash(String),
    Null,
}

/// Why a raw value could not be typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError {
    pub expected: &'static str,
    pub found: String,
}

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z0-9][A-Z0-9_.-]*$").expect("reference regex must compile"))
}

fn enum_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_]*$").expect("enum regex must compile"))
}

fn hex_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-f]+$").expect("hex regex must compile"))
}

fn is_null_literal(raw: &str) -> bool {
    raw.is_empty() || raw.eq_ignore_ascii_case("null")
}

fn parse_reference(raw: &str, kind: FieldKind) -> Result<String, ValueError> {
    let upper = raw.trim().to_ascii_uppercase();
    if reference_re().is_match(&upper) {
        Ok(upper)
    } else {
        Err(ValueError {
            expected: kind.describe(),
            found: raw.to_string(),
        })
    }
}

impl FieldValue {
    /// Type `raw` according to `spec`.
    ///
    /// Normalization rules: text is trimmed, integers render in plain decimal,
    /// enums and hashes are lowercased, references are uppercased, reference
    /// lists are sorted and de-duplicated. `null` or an empty value is `Null`.
    pub fn parse(spec: &FieldSpec, raw: &str) -> Result<Self, ValueError> {
        let trimmed = raw.trim();
        if is_null_literal(trimmed) {
            return Ok(Self::Null);
        }
        let invalid = || ValueError {
            expected: spec.kind.describe(),
            found: trimmed.to_string(),
        };
        match spec.kind {
            FieldKind::Text => Ok(Self::Text(trimmed.to_string())),
            FieldKind::Integer => trimmed
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(|_| invalid()),
            FieldKind::Enum(_) => {
                let lower = trimmed.to_ascii_lowercase();
                if enum_re().is_match(&lower) {
                    Ok(Self::Enum(lower))
                } else {
                    Err(invalid())
                }
            }
            FieldKind::Reference => parse_reference(trimmed, spec.kind).map(Self::Reference),
            FieldKind::ReferenceList => {
                let mut refs = trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| parse_reference(item, spec.kind))
                    .collect::<Result<Vec<_>, _>>()?;
                refs.sort();
                refs.dedup();
                Ok(Self::ReferenceList(refs))
            }
            FieldKind::Hash => {
                let lower = trimmed.to_ascii_lowercase();
                if hex_re().is_match(&lower) {
                    Ok(Self::Hash(lower))
                } else {
                    Err(invalid())
                }
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value)
            | Self::Enum(value)
            | Self::Reference(value)
            | Self::Hash(value) => Some(value),
            Self::Integer(_) | Self::ReferenceList(_) | Self::Null => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_references(&self) -> &[String] {
        match self {
            Self::ReferenceList(refs) => refs,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(name: &str) -> &'static FieldSpec {
        field_spec(name).expect("field should be in catalog")
    }

    #[test]
    fn integers_normalize_leading_zeros_and_sign() {
        let spec = catalog("version");
        assert_eq!(FieldValue::parse(spec, "007"), Ok(FieldValue::Integer(7)));
        assert_eq!(FieldValue::parse(spec, " +7 "), Ok(FieldValue::Integer(7)));
        assert!(FieldValue::parse(spec, "seven").is_err());
    }

    #[test]
    fn reference_lists_sort_and_dedupe() {
        let spec = catalog("replacement_refs");
        assert_eq!(
            FieldValue::parse(spec, "okx, binance ,OKX"),
            Ok(FieldValue::ReferenceList(vec![
                "BINANCE".to_string(),
                "OKX".to_string()
            ]))
        );
    }

    #[test]
    fn null_literals_type_as_null() {
        assert_eq!(
            FieldValue::parse(catalog("founded"), "NULL"),
            Ok(FieldValue::Null)
        );
        assert_eq!(FieldValue::parse(catalog("name"), "  "), Ok(FieldValue::Null));
    }

    #[test]
    fn hash_accepts_hex_only() {
        let spec = catalog("canonical_hash");
        assert_eq!(
            FieldValue::parse(spec, "DEADBEEF"),
            Ok(FieldValue::Hash("deadbeef".to_string()))
        );
        assert!(FieldValue::parse(spec, "not-hex").is_err());
    }
}
