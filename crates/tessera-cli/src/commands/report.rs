use crate::support::{Globals, corpus_or_exit, exit_if_failed, print_json_or_exit};
use tessera_coherence::{Report, ReportSave, build_report, save_report};

pub fn run(globals: &Globals, save: bool, scope: String, json_output: bool) {
    let layout = globals.layout_or_exit();
    let corpus = corpus_or_exit(&layout);
    let report = build_report(&corpus, &layout, globals.date, &scope).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    let saved = save.then(|| {
        save_report(&layout, &report).unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        })
    });

    if json_output {
        print_json_or_exit(&report);
    } else {
        print_human_summary(&report, saved.as_ref());
    }
    exit_if_failed(!report.body.status.is_pass());
}

fn print_human_summary(report: &Report, saved: Option<&ReportSave>) {
    let summary = &report.body.summary;
    println!("tessera report");
    println!("  Id: {}", report.report_id);
    println!("  Checked: {}", report.body.checked_at);
    println!("  Consistency: {} violations", summary.consistency_violations);
    println!("  Topology: {} violations", summary.topology_violations);
    println!("  Metadata: {} violations", summary.metadata_violations);
    println!("  Snapshot: {} violations", summary.snapshot_violations);
    println!("  Total: {}", summary.total_violations);
    match saved {
        Some(ReportSave::Written(path)) => println!("  Saved: {}", path.display()),
        Some(ReportSave::Unchanged(path)) => println!("  Unchanged: {}", path.display()),
        Some(ReportSave::Divergent(path)) => println!("  Divergent: {}", path.display()),
        None => {}
    }
    println!(
        "  Status: {}",
        if report.body.status.is_pass() { "pass" } else { "fail" }
    );
}
