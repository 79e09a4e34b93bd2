use crate::support::{Globals, exit_if_failed, print_json_or_exit};
use serde_json::json;
use std::path::PathBuf;
use tessera_kernel::{Finding, check_ledger_history, collect_classes};
use tessera_ledger::Registry;

pub fn run(globals: &Globals, previous: PathBuf, json_output: bool) {
    let layout = globals.layout_or_exit();
    let load = |path: &std::path::Path| {
        Registry::load(path).unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        })
    };
    let before = load(previous.as_path());
    let current_path = layout.registry_path();
    let after = load(current_path.as_path());

    let findings = check_ledger_history(before.entries(), after.entries());
    let errors: Vec<Finding> = findings.iter().filter(|f| f.is_error()).cloned().collect();
    let result = if errors.is_empty() { "accepted" } else { "rejected" };

    if json_output {
        print_json_or_exit(&json!({
            "previous": previous.display().to_string(),
            "current": current_path.display().to_string(),
            "result": result,
            "failure_classes": collect_classes(&errors),
            "findings": findings,
        }));
    } else {
        println!("tessera ledger-diff");
        println!("  Previous: {} entries", before.len());
        println!("  Current: {} entries", after.len());
        println!("  Result: {result}");
        for finding in &findings {
            println!("    - {} [{}]: {}", finding.subject, finding.class, finding.message);
        }
    }
    exit_if_failed(!errors.is_empty());
}
