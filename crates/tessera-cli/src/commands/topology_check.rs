use crate::support::{Globals, corpus_or_exit, exit_if_failed, print_json_or_exit};
use tessera_coherence::{TopologyReport, check_topology};

pub fn run(globals: &Globals, json_output: bool) {
    let layout = globals.layout_or_exit();
    let corpus = corpus_or_exit(&layout);
    let report = check_topology(&corpus, &layout);

    if json_output {
        print_json_or_exit(&report);
    } else {
        print_human_summary(&report);
    }
    exit_if_failed(!report.status.is_pass());
}

fn print_human_summary(report: &TopologyReport) {
    println!("tessera topology-check");
    println!(
        "  Pages: {}  Links: {}  Violations: {}",
        report.pages_checked, report.links_checked, report.violation_count
    );
    for violation in &report.violations {
        println!(
            "    - {} {} ({}) -> {} ({})",
            violation.kind,
            violation.source,
            violation.source_class.as_str(),
            violation.target,
            violation.target_class.as_str()
        );
    }
}
