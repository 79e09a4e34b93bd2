//! Error types for kernel operations that cannot degrade into findings.

use crate::grammar::GrammarError;

/// Canonicalization refuses to guess: an unknown field or an untypeable value
/// is an error, never a silent coercion.
#[derive(Debug, thiserror::Error)]
pub enum CanonicalError {
    /// The field name has no entry in the field catalog.
    #[error("unrecognized field `{name}` (line {line}): no type is registered for it")]
    UnrecognizedField { name: String, line: usize },

    /// The raw value cannot be represented as the field's catalog kind.
    #[error("field `{name}` (line {line}): expected {expected}, found {found:?}")]
    InvalidValue {
        name: String,
        line: usize,
        expected: &'static str,
        found: String,
    },

    /// Canonical JSON encoding failed.
    #[error("canonical encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors from sealing a provisional block with its canonical hash.
#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Canonical(#[from] CanonicalError),

    /// Blocks are immutable once hashed; a correction needs a new block.
    #[error("block {token} already carries canonical_hash; write a superseding block instead")]
    AlreadySealed { token: String },
}
