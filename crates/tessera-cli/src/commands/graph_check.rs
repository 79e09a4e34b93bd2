use crate::support::{Globals, exit_if_failed, print_json_or_exit};
use tessera_kernel::{GraphReport, resolve_entity_graph};
use tessera_ledger::Registry;

pub fn run(globals: &Globals, json_output: bool) {
    let layout = globals.layout_or_exit();
    let registry = Registry::load(&layout.registry_path()).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });
    let report = resolve_entity_graph(registry.entries());

    if json_output {
        print_json_or_exit(&report);
    } else {
        print_human_summary(&report);
    }
    exit_if_failed(!report.accepted());
}

fn print_human_summary(report: &GraphReport) {
    println!("tessera graph-check");
    println!("  Entries: {}", report.entry_count);
    println!("  Result: {}", report.result);
    for violation in &report.violations {
        println!("    - {} [{}]: {}", violation.subject, violation.class, violation.message);
    }
    if !report.blocked_ids.is_empty() {
        println!("  Blocked: {}", report.blocked_ids.join(", "));
    }
}
