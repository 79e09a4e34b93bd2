//! Canonical form of a block.
//!
//! The canonical form is invariant to field order, insignificant whitespace
//! and numeric/letter-case formatting, and sensitive to any semantic change.
//! Its byte encoding is sorted-key JSON with no whitespace:
//!
//! ```text
//! {"fields":{"<name>":{"type":"<kind>","value":<v>},...},"kind":"ENTITY","token":"BINANCE"}
//! ```
//!
//! `canonical_hash` never participates, and neither does the page the block
//! was found on.

use crate::error::CanonicalError;
use crate::field::{FieldValue, field_spec};
use crate::grammar::ParsedBlock;
use crate::hash::CANONICAL_HASH_FIELD;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalForm {
    pub kind: String,
    pub token: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl CanonicalForm {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn to_value(&self) -> Result<Value, CanonicalError> {
        let mut fields = Map::new();
        for (name, value) in &self.fields {
            fields.insert(name.clone(), serde_json::to_value(value)?);
        }
        let mut root = Map::new();
        root.insert("fields".to_string(), Value::Object(fields));
        root.insert("kind".to_string(), Value::String(self.kind.clone()));
        root.insert("token".to_string(), Value::String(self.token.clone()));
        Ok(Value::Object(root))
    }

    /// The exact byte sequence the hash engine consumes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CanonicalError> {
        Ok(canonical_json_bytes(&self.to_value()?)?)
    }
}

/// Build the canonical form of a parsed block, excluding `canonical_hash`.
pub fn canonicalize(block: &ParsedBlock) -> Result<CanonicalForm, CanonicalError> {
    let mut fields = BTreeMap::new();
    for line in &block.fields {
        if line.name == CANONICAL_HASH_FIELD {
            continue;
        }
        let Some(spec) = field_spec(&line.name) else {
            return Err(CanonicalError::UnrecognizedField {
                name: line.name.clone(),
                line: line.line,
            });
        };
        let value =
            FieldValue::parse(spec, &line.value).map_err(|err| CanonicalError::InvalidValue {
                name: line.name.clone(),
                line: line.line,
                expected: err.expected,
                found: err.found,
            })?;
        fields.insert(line.name.clone(), value);
    }
    Ok(CanonicalForm {
        kind: block.kind.to_ascii_uppercase(),
        token: block.token.to_ascii_uppercase(),
        fields,
    })
}

/// RFC 8785-style canonical JSON: sorted object keys, no insignificant
/// whitespace, integers in plain decimal.
///
/// Key order is enforced here rather than relying on `serde_json::Map`
/// iteration order, which changes under the `preserve_order` feature.
pub fn canonical_json_bytes(value: &Value) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<(), serde_json::Error> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(_) => serde_json::to_writer(&mut *out, value)?,
        Value::Array(items) => {
            out.push(b'[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (idx, key) in keys.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_canonical(&map[*key], out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}
