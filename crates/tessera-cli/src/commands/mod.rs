pub mod consistency_check;
pub mod corpus_check;
pub mod dataset_export;
pub mod graph_check;
pub mod hash;
pub mod ledger_diff;
pub mod metadata_check;
pub mod report;
pub mod seal;
pub mod snapshot;
pub mod topology_check;
pub mod validate;
