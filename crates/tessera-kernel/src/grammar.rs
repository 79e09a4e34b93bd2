//! Block grammar.
//!
//! ```text
//! [KIND/TOKEN]          header: KIND = [A-Z][A-Z_]*, TOKEN = [A-Z0-9][A-Z0-9_.-]*
//! name=value            one field per line, name = [a-z][a-z0-9_]*
//! [/KIND]               closing delimiter, must repeat KIND
//! ```
//!
//! Blank lines are ignored. Anything else (prose, nested headers, repeated
//! fields, text after the closing line) is a structural error naming the first
//! offending line.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub mod grammar_class {
    pub const EMPTY: &str = "grammar.empty";
    pub const MISSING_OPENING: &str = "grammar.missing_opening";
    pub const MALFORMED_HEADER: &str = "grammar.malformed_header";
    pub const NESTED_BLOCK: &str = "grammar.nested_block";
    pub const DUPLICATE_FIELD: &str = "grammar.duplicate_field";
    pub const UNPARSABLE_LINE: &str = "grammar.unparsable_line";
    pub const MISMATCHED_CLOSING: &str = "grammar.mismatched_closing";
    pub const MISSING_CLOSING: &str = "grammar.missing_closing";
    pub const TRAILING_CONTENT: &str = "grammar.trailing_content";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLine {
    pub name: String,
    pub value: String,
    /// 1-based line number within the block text.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlock {
    pub kind: String,
    pub token: String,
    pub fields: Vec<FieldLine>,
    pub header_line: usize,
    pub closing_line: usize,
}

impl ParsedBlock {
    /// Raw value of `name`, if declared.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }

    /// Case-normalized identifier matching registry ids.
    pub fn id(&self) -> String {
        self.token.to_ascii_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("block text is empty")]
    Empty,

    #[error("line {line}: expected opening delimiter `[KIND/TOKEN]`, found {found:?}")]
    MissingOpening { line: usize, found: String },

    #[error("line {line}: malformed block header {found:?}")]
    MalformedHeader { line: usize, found: String },

    #[error("line {line}: nested block header {found:?} inside an open block")]
    NestedBlock { line: usize, found: String },

    #[error("line {line}: duplicate field `{name}` (first declared on line {first_line})")]
    DuplicateField {
        line: usize,
        name: String,
        first_line: usize,
    },

    #[error("line {line}: unparsable line {found:?}")]
    UnparsableLine { line: usize, found: String },

    #[error("line {line}: closing delimiter `[/{found}]` does not match `[/{expected}]`")]
    MismatchedClosing {
        line: usize,
        expected: String,
        found: String,
    },

    #[error("missing closing delimiter `[/{kind}]`")]
    MissingClosing { kind: String },

    #[error("line {line}: content after closing delimiter")]
    TrailingContent { line: usize },
}

impl GrammarError {
    pub fn class(&self) -> &'static str {
        match self {
            Self::Empty => grammar_class::EMPTY,
            Self::MissingOpening { .. } => grammar_class::MISSING_OPENING,
            Self::MalformedHeader { .. } => grammar_class::MALFORMED_HEADER,
            Self::NestedBlock { .. } => grammar_class::NESTED_BLOCK,
            Self::DuplicateField { .. } => grammar_class::DUPLICATE_FIELD,
            Self::UnparsableLine { .. } => grammar_class::UNPARSABLE_LINE,
            Self::MismatchedClosing { .. } => grammar_class::MISMATCHED_CLOSING,
            Self::MissingClosing { .. } => grammar_class::MISSING_CLOSING,
            Self::TrailingContent { .. } => grammar_class::TRAILING_CONTENT,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Empty | Self::MissingClosing { .. } => None,
            Self::MissingOpening { line, .. }
            | Self::MalformedHeader { line, .. }
            | Self::NestedBlock { line, .. }
            | Self::DuplicateField { line, .. }
            | Self::UnparsableLine { line, .. }
            | Self::MismatchedClosing { line, .. }
            | Self::TrailingContent { line } => Some(*line),
        }
    }
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[([A-Z][A-Z_]*)/([A-Z0-9][A-Z0-9_.-]*)\]$")
            .expect("header regex must compile")
    })
}

fn closing_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[/([A-Za-z_]+)\]$").expect("closing regex must compile"))
}

fn field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([a-z][a-z0-9_]*)\s*=(.*)$").expect("field regex must compile")
    })
}

/// Parse raw block text, failing on the first structural error.
pub fn parse_block(text: &str) -> Result<ParsedBlock, GrammarError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let Some((header_line, header)) = lines.next() else {
        return Err(GrammarError::Empty);
    };
    let Some(caps) = header_re().captures(header) else {
        if header.starts_with('[') {
            return Err(GrammarError::MalformedHeader {
                line: header_line,
                found: header.to_string(),
            });
        }
        return Err(GrammarError::MissingOpening {
            line: header_line,
            found: header.to_string(),
        });
    };
    let kind = caps[1].to_string();
    let token = caps[2].to_string();

    let mut fields: Vec<FieldLine> = Vec::new();
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    let mut closing_line = None;

    for (line_no, line) in lines.by_ref() {
        if let Some(close) = closing_re().captures(line) {
            if close[1] != kind {
                return Err(GrammarError::MismatchedClosing {
                    line: line_no,
                    expected: kind,
                    found: close[1].to_string(),
                });
            }
            closing_line = Some(line_no);
            break;
        }
        if line.starts_with('[') {
            if header_re().is_match(line) {
                return Err(GrammarError::NestedBlock {
                    line: line_no,
                    found: line.to_string(),
                });
            }
            return Err(GrammarError::UnparsableLine {
                line: line_no,
                found: line.to_string(),
            });
        }
        let Some(field) = field_re().captures(line) else {
            return Err(GrammarError::UnparsableLine {
                line: line_no,
                found: line.to_string(),
            });
        };
        let name = field[1].to_string();
        if let Some(first_line) = seen.get(&name) {
            return Err(GrammarError::DuplicateField {
                line: line_no,
                name,
                first_line: *first_line,
            });
        }
        seen.insert(name.clone(), line_no);
        fields.push(FieldLine {
            name,
            value: field[2].trim().to_string(),
            line: line_no,
        });
    }

    let Some(closing_line) = closing_line else {
        return Err(GrammarError::MissingClosing { kind });
    };
    if let Some((line, _)) = lines.next() {
        return Err(GrammarError::TrailingContent { line });
    }

    Ok(ParsedBlock {
        kind,
        token,
        fields,
        header_line,
        closing_line,
    })
}
