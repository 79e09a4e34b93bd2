//! Tessera CLI: the `tessera` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands, SnapshotCommands};
use support::Globals;

fn main() {
    let cli = Cli::parse();
    support::init_logging(cli.verbose);
    let globals = Globals::new(cli.root, cli.config, cli.date);

    match cli.command {
        Commands::Validate {
            files,
            mode,
            page_type,
            json,
        } => commands::validate::run(files, mode, page_type, json),

        Commands::Hash { file, json } => commands::hash::run(file, json),

        Commands::Seal { file, write, json } => commands::seal::run(file, write, json),

        Commands::GraphCheck { json } => commands::graph_check::run(&globals, json),

        Commands::CorpusCheck { mode, json } => commands::corpus_check::run(&globals, mode, json),

        Commands::ConsistencyCheck { json } => commands::consistency_check::run(&globals, json),

        Commands::TopologyCheck { json } => commands::topology_check::run(&globals, json),

        Commands::MetadataCheck { json } => commands::metadata_check::run(&globals, json),

        Commands::Snapshot { command } => match command {
            SnapshotCommands::Create { json } => commands::snapshot::run_create(&globals, json),
            SnapshotCommands::Compare { json } => commands::snapshot::run_compare(&globals, json),
        },

        Commands::LedgerDiff { previous, json } => {
            commands::ledger_diff::run(&globals, previous, json)
        }

        Commands::DatasetExport { out, json } => commands::dataset_export::run(&globals, out, json),

        Commands::Report { save, scope, json } => {
            commands::report::run(&globals, save, scope, json)
        }
    }
}
