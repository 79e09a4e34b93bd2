use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tessera",
    about = "Tessera: canonical hashing, validation and drift detection for entity-record corpora",
    version
)]
pub struct Cli {
    /// Tree root holding the pages, registry and dataset
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Layout config (defaults to <root>/tessera.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Date stamp for snapshots and reports, YYYY-MM-DD (defaults to today, UTC)
    #[arg(long, global = true)]
    pub date: Option<NaiveDate>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate block files or pages through the block pipeline
    Validate {
        /// Block text files or HTML pages
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Strictness: permissive, full or strict
        #[arg(long, default_value = "full")]
        mode: String,

        /// Page type the blocks are expected on (defaults to the block's own `type`)
        #[arg(long)]
        page_type: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the canonical hash of a block
    Hash {
        /// Block text file
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add canonical_hash to a provisional block
    Seal {
        /// Block text file
        file: PathBuf,

        /// Rewrite the file in place instead of printing the sealed block
        #[arg(long)]
        write: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the registry parent/child graph
    GraphCheck {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate every embedded block against the registry
    CorpusCheck {
        /// Strictness: permissive, full or strict
        #[arg(long, default_value = "full")]
        mode: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Cross-check registry, dataset and pages
    ConsistencyCheck {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check page link topology and reachability
    TopologyCheck {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check canonical-URL opacity and crawl-control files
    MetadataCheck {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create or compare tree snapshots
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },

    /// Check registry status transitions against a previous ledger
    LedgerDiff {
        /// Previous registry.json
        #[arg(long)]
        previous: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Regenerate the NDJSON dataset from the registry and pages
    DatasetExport {
        /// Output path (defaults to the layout's dataset path)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run every coherence check and build the aggregate report
    Report {
        /// Save the report under the report dir (append-only)
        #[arg(long)]
        save: bool,

        /// Scope label recorded in the report
        #[arg(long, default_value = "full")]
        scope: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SnapshotCommands {
    /// Hash the tracked tree and save a new snapshot
    Create {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare the tree against the latest snapshot
    Compare {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
