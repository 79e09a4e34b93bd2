//! NDJSON transport dataset: one JSON record per line.
//!
//! The dataset is a projection of the registry and the embedded blocks.
//! Export order is `(record_type, id, page)`, so identical inputs render to
//! identical bytes.

use crate::error::LoadError;
use crate::pages::EmbeddedBlock;
use crate::registry::Registry;
use crate::substrate::{read_substrate, write_atomic};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::{self, BufRead};
use std::path::Path;
use tessera_kernel::{FieldValue, canonicalize, compute_hash, parse_block};
use tracing::{debug, warn};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// Canonical record projected from an embedded block.
    Cr,
    /// Ledger row projected from the registry.
    Registry,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cr => "cr",
            Self::Registry => "registry",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub record_type: RecordType,
    pub id: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl DatasetRecord {
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn canonical_hash(&self) -> Option<&str> {
        self.str_field("canonical_hash")
    }

    pub fn page_status(&self) -> Option<&str> {
        self.str_field("page_status")
    }

    fn sort_key(&self) -> (RecordType, &str, &str) {
        (self.record_type, &self.id, self.str_field("page").unwrap_or(""))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<DatasetRecord>,
}

impl Dataset {
    pub fn new(records: Vec<DatasetRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[DatasetRecord] {
        &self.records
    }

    pub fn of_type(&self, record_type: RecordType) -> impl Iterator<Item = &DatasetRecord> {
        self.records
            .iter()
            .filter(move |record| record.record_type == record_type)
    }

    pub fn find(&self, record_type: RecordType, id: &str) -> Option<&DatasetRecord> {
        self.of_type(record_type).find(|record| record.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read records from an NDJSON reader. Blank lines are skipped; the first
/// unparsable line aborts with its 1-based line number.
pub fn read_dataset(reader: impl BufRead, path: &Path) -> Result<Vec<DatasetRecord>, LoadError> {
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line_error = |message: String| LoadError::DatasetLine {
            path: path.display().to_string(),
            line: line_no + 1,
            message,
        };
        let line = line.map_err(|e| line_error(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: DatasetRecord =
            serde_json::from_str(trimmed).map_err(|e| line_error(e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

pub fn load_dataset(path: &Path) -> Result<Dataset, LoadError> {
    let text = read_substrate(path)?;
    let records = read_dataset(text.as_bytes(), path)?;
    debug!(path = %path.display(), records = records.len(), "dataset loaded");
    Ok(Dataset::new(records))
}

fn plain_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text)
        | FieldValue::Enum(text)
        | FieldValue::Reference(text)
        | FieldValue::Hash(text) => Value::String(text.clone()),
        FieldValue::Integer(number) => Value::from(*number),
        FieldValue::ReferenceList(refs) => {
            Value::Array(refs.iter().cloned().map(Value::String).collect())
        }
        FieldValue::Null => Value::Null,
    }
}

fn cr_record(block: &EmbeddedBlock) -> Option<DatasetRecord> {
    let parsed = match parse_block(&block.text) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(page = %block.page, id = %block.id, error = %err, "block skipped in export");
            return None;
        }
    };
    let form = match canonicalize(&parsed) {
        Ok(form) => form,
        Err(err) => {
            warn!(page = %block.page, id = %block.id, error = %err, "block skipped in export");
            return None;
        }
    };
    let hash = match compute_hash(&form) {
        Ok(hash) => hash,
        Err(err) => {
            warn!(page = %block.page, id = %block.id, error = %err, "block skipped in export");
            return None;
        }
    };

    let values: Map<String, Value> = form
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), plain_value(value)))
        .collect();
    let mut fields = BTreeMap::new();
    fields.insert("canonical_hash".to_string(), Value::String(hash.to_string()));
    fields.insert("fields".to_string(), Value::Object(values));
    fields.insert("kind".to_string(), Value::String(form.kind.clone()));
    fields.insert("page".to_string(), Value::String(block.page.clone()));
    fields.insert("token".to_string(), Value::String(form.token.clone()));
    Some(DatasetRecord {
        record_type: RecordType::Cr,
        id: parsed.id(),
        fields,
    })
}

fn registry_record(entry: &tessera_kernel::RegistryEntry) -> Option<DatasetRecord> {
    let Value::Object(mut object) = serde_json::to_value(entry).ok()? else {
        return None;
    };
    object.remove("id");
    Some(DatasetRecord {
        record_type: RecordType::Registry,
        id: entry.id.clone(),
        fields: object.into_iter().collect(),
    })
}

/// Project the registry and the registered embedded blocks into dataset
/// records, in export order.
pub fn export_dataset<'a>(
    registry: &Registry,
    blocks: impl IntoIterator<Item = &'a EmbeddedBlock>,
) -> Vec<DatasetRecord> {
    let mut records: Vec<DatasetRecord> = registry
        .entries()
        .iter()
        .filter_map(registry_record)
        .collect();
    for block in blocks {
        if !registry.contains(&block.id) {
            warn!(page = %block.page, id = %block.id, "unregistered block skipped in export");
            continue;
        }
        records.extend(cr_record(block));
    }
    records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    records
}

pub fn render_dataset(records: &[DatasetRecord]) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

pub fn write_dataset(path: &Path, records: &[DatasetRecord]) -> io::Result<()> {
    let rendered = render_dataset(records).map_err(io::Error::other)?;
    write_atomic(path, rendered.as_bytes())
}
