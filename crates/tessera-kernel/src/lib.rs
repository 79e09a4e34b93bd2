//! # Tessera Kernel
//!
//! Canonical representation and validation of entity-record blocks.
//!
//! A block is the metadata record embedded in a rendered page:
//!
//! ```text
//! [ENTITY/BINANCE]
//! schema=1
//! version=2
//! type=entity
//! url=/exchanges/binance/
//! name=Binance
//! canonical_hash=<sha256 of the canonical form>
//! [/ENTITY]
//! ```
//!
//! ## Architecture
//!
//! ```text
//! grammar        ← raw text → ParsedBlock (strict, line oriented)
//!     │
//! field          ← catalog of recognized fields and their primitive kinds
//!     │
//! canonical      ← ParsedBlock → CanonicalForm (order/format independent)
//!     │
//! hash           ← CanonicalForm → ContentHash (sha256 over canonical bytes)
//!     │
//! schema/policy  ← per-type field contracts, forbidden lexical patterns
//!     │
//! graph/lifecycle← registry hierarchy, status machine, supersedence chains
//!     │
//! pipeline       ← fixed-order composition with strictness modes
//! ```
//!
//! The kernel never touches the filesystem. Loaders live in `tessera-ledger`.

pub mod canonical;
pub mod error;
pub mod field;
pub mod finding;
pub mod grammar;
pub mod graph;
pub mod hash;
pub mod lifecycle;
pub mod pipeline;
pub mod policy;
pub mod registry;
pub mod schema;

pub use canonical::{CanonicalForm, canonical_json_bytes, canonicalize};
pub use error::{CanonicalError, SealError};
pub use field::{FIELD_CATALOG, FieldKind, FieldSpec, FieldValue, field_spec};
pub use finding::{Finding, Severity, collect_classes};
pub use grammar::{FieldLine, GrammarError, ParsedBlock, parse_block};
pub use graph::{GraphReport, resolve_entity_graph};
pub use hash::{CANONICAL_HASH_FIELD, ContentHash, compute_hash, hash_block_text, seal_block};
pub use lifecycle::{
    BlockVersion, LifecycleError, check_block_lifecycle, check_ledger_history,
    check_status_alignment, check_supersedence, transition,
};
pub use pipeline::{
    BlockReport, CorpusValidation, Strictness, ValidatedBlock, Verdict, validate_block,
    validate_corpus,
};
pub use policy::{POLICY_RULES, PolicyRule, PolicyScanner, PolicyViolation};
pub use registry::{EntryType, PageStatus, RegistryEntry};
pub use schema::{PageType, block_presence_violation, validate_schema};
