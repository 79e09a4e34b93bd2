use crate::support::{Globals, exit_if_failed, print_json_or_exit};
use serde_json::json;
use tessera_coherence::{
    SaveOutcome, SnapshotComparison, compare_to_latest, create_snapshot, save_snapshot,
};

pub fn run_create(globals: &Globals, json_output: bool) {
    let layout = globals.layout_or_exit();
    let snapshot = create_snapshot(&layout, globals.date).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });
    let outcome = save_snapshot(&layout, &snapshot).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });
    let (state, path) = match &outcome {
        SaveOutcome::Written(path) => ("written", path),
        SaveOutcome::Unchanged(path) => ("unchanged", path),
    };

    if json_output {
        print_json_or_exit(&json!({
            "snapshot_id": snapshot.snapshot_id,
            "created_at": snapshot.created_at,
            "sequence": snapshot.sequence,
            "total_files": snapshot.total_files,
            "total_size": snapshot.total_size,
            "path": path.display().to_string(),
            "outcome": state,
        }));
    } else {
        println!("tessera snapshot create");
        println!("  Id: {}", snapshot.snapshot_id);
        println!("  Sequence: {}", snapshot.sequence);
        println!("  Files: {} ({} bytes)", snapshot.total_files, snapshot.total_size);
        println!("  Path: {} ({state})", path.display());
    }
}

pub fn run_compare(globals: &Globals, json_output: bool) {
    let layout = globals.layout_or_exit();
    let comparison = compare_to_latest(&layout, globals.date).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    if json_output {
        print_json_or_exit(&comparison);
    } else {
        print_human_summary(&comparison);
    }
    exit_if_failed(comparison.status.is_failure());
}

fn print_human_summary(comparison: &SnapshotComparison) {
    println!("tessera snapshot compare");
    println!(
        "  Baseline: {}",
        comparison.baseline_id.as_deref().unwrap_or("(none)")
    );
    println!("  Current: {}", comparison.current_id);
    println!("  Status: {}", comparison.status.as_str());
    for violation in &comparison.violations {
        println!("    - {} {}", violation.kind, violation.path);
    }
    for path in &comparison.expected_mutations {
        println!("    ~ {path} (expected)");
    }
    for path in &comparison.added {
        println!("    + {path}");
    }
}
