use crate::support::{Globals, print_json_or_exit};
use serde_json::json;
use std::path::PathBuf;
use tessera_ledger::{RecordType, Registry, export_dataset, scan_pages, write_dataset};
use tracing::info;

/// The dataset is a projection, so it is regenerated from the registry and
/// the pages without reading the previous export.
pub fn run(globals: &Globals, out: Option<PathBuf>, json_output: bool) {
    let layout = globals.layout_or_exit();
    let registry = Registry::load(&layout.registry_path()).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });
    let pages = scan_pages(&layout.pages_dir()).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    let records = export_dataset(&registry, pages.iter().flat_map(|page| page.blocks.iter()));
    let path = out.unwrap_or_else(|| layout.dataset_path());
    write_dataset(&path, &records).unwrap_or_else(|e| {
        eprintln!("error: failed to write {}: {e}", path.display());
        std::process::exit(1);
    });
    let count = |record_type| {
        records
            .iter()
            .filter(|record| record.record_type == record_type)
            .count()
    };
    info!(path = %path.display(), records = records.len(), "dataset exported");

    if json_output {
        print_json_or_exit(&json!({
            "path": path.display().to_string(),
            "records": records.len(),
            "cr_records": count(RecordType::Cr),
            "registry_records": count(RecordType::Registry),
        }));
    } else {
        println!("tessera dataset-export");
        println!("  Path: {}", path.display());
        println!(
            "  Records: {} ({} cr, {} registry)",
            records.len(),
            count(RecordType::Cr),
            count(RecordType::Registry)
        );
    }
}
