//! Content hashing over canonical forms.

use crate::canonical::{CanonicalForm, canonicalize};
use crate::error::{CanonicalError, SealError};
use crate::grammar::parse_block;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub const CANONICAL_HASH_FIELD: &str = "canonical_hash";

/// Lowercase hex SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{hash:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a declared value, ignoring case and surrounding space.
    pub fn matches(&self, declared: &str) -> bool {
        self.0.eq_ignore_ascii_case(declared.trim())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn compute_hash(form: &CanonicalForm) -> Result<ContentHash, CanonicalError> {
    Ok(ContentHash::from_bytes(&form.to_bytes()?))
}

/// Parse, canonicalize and hash raw block text.
pub fn hash_block_text(text: &str) -> Result<ContentHash, SealError> {
    let block = parse_block(text)?;
    let form = canonicalize(&block)?;
    Ok(compute_hash(&form)?)
}

/// Insert `canonical_hash=<hash>` before the closing delimiter of a
/// provisional block.
pub fn seal_block(text: &str) -> Result<String, SealError> {
    let block = parse_block(text)?;
    if block.field(CANONICAL_HASH_FIELD).is_some() {
        return Err(SealError::AlreadySealed { token: block.token });
    }
    let hash = compute_hash(&canonicalize(&block)?)?;

    let mut out = String::with_capacity(text.len() + 80);
    for (idx, line) in text.lines().enumerate() {
        if idx + 1 == block.closing_line {
            out.push_str(CANONICAL_HASH_FIELD);
            out.push('=');
            out.push_str(hash.as_str());
            out.push('\n');
        }
        out.push_str(line);
        out.push('\n');
    }
    if !text.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROVISIONAL: &str = "[ENTITY/OKX]\nschema=1\nversion=1\ntype=entity\nurl=/exchanges/okx/\nname=OKX\n[/ENTITY]\n";

    #[test]
    fn hash_ignores_field_order_and_whitespace() {
        let reordered = "[ENTITY/OKX]\n  name = OKX\nurl=/exchanges/okx/\n\ntype=ENTITY\nversion=01\nschema=1\n[/ENTITY]";
        assert_eq!(
            hash_block_text(PROVISIONAL).expect("hash"),
            hash_block_text(reordered).expect("hash")
        );
    }

    #[test]
    fn hash_changes_when_a_value_changes() {
        let edited = PROVISIONAL.replace("name=OKX", "name=OKX Global");
        assert_ne!(
            hash_block_text(PROVISIONAL).expect("hash"),
            hash_block_text(&edited).expect("hash")
        );
    }

    #[test]
    fn seal_round_trips_through_hash_check() {
        let sealed = seal_block(PROVISIONAL).expect("seal");
        let block = parse_block(&sealed).expect("parse sealed");
        let declared = block.field(CANONICAL_HASH_FIELD).expect("hash field present");
        let recomputed = compute_hash(&canonicalize(&block).expect("form")).expect("hash");
        assert!(recomputed.matches(declared));
        assert!(sealed.ends_with("[/ENTITY]\n"));
    }

    #[test]
    fn seal_refuses_already_sealed_blocks() {
        let sealed = seal_block(PROVISIONAL).expect("seal");
        let err = seal_block(&sealed).expect_err("second seal must fail");
        assert!(matches!(err, SealError::AlreadySealed { ref token } if token == "OKX"));
    }
}
