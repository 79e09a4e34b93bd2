use crate::support::{Globals, corpus_or_exit, exit_if_failed, print_json_or_exit};
use tessera_coherence::{MetadataReport, check_metadata};

pub fn run(globals: &Globals, json_output: bool) {
    let layout = globals.layout_or_exit();
    let corpus = corpus_or_exit(&layout);
    let report = check_metadata(&corpus, &layout);

    if json_output {
        print_json_or_exit(&report);
    } else {
        print_human_summary(&report);
    }
    exit_if_failed(!report.status.is_pass());
}

fn print_human_summary(report: &MetadataReport) {
    println!("tessera metadata-check");
    println!("  Pages: {}", report.pages_checked);
    println!("  Robots: {}", if report.robots_present { "present" } else { "missing" });
    println!("  Sitemap: {}", if report.sitemap_present { "present" } else { "missing" });
    for violation in &report.violations {
        let page = violation.page.as_deref().unwrap_or("-");
        println!("    - {} ({page}): {}", violation.kind, violation.detail);
    }
}
