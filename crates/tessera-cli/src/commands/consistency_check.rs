use crate::support::{Globals, corpus_or_exit, exit_if_failed, print_json_or_exit};
use tessera_coherence::{ConsistencyReport, check_consistency};

pub fn run(globals: &Globals, json_output: bool) {
    let layout = globals.layout_or_exit();
    let corpus = corpus_or_exit(&layout);
    let report = check_consistency(&corpus, &layout);

    if json_output {
        print_json_or_exit(&report);
    } else {
        print_human_summary(&report);
    }
    exit_if_failed(!report.status.is_pass());
}

fn print_human_summary(report: &ConsistencyReport) {
    println!("tessera consistency-check");
    println!("  Violations: {}", report.violation_count);
    for violation in &report.violations {
        let page = violation.page.as_deref().unwrap_or("-");
        println!("    - {} {} ({page}): {}", violation.kind, violation.id, violation.detail);
    }
    if !report.skipped_ids.is_empty() {
        println!("  Skipped: {}", report.skipped_ids.join(", "));
    }
}
