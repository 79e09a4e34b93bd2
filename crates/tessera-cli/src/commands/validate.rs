use crate::support::{exit_if_failed, parse_mode_or_exit, print_json_or_exit, read_text_or_exit};
use std::path::PathBuf;
use tessera_kernel::{BlockReport, PageType, validate_block};
use tessera_ledger::extract_blocks;

pub fn run(files: Vec<PathBuf>, mode: String, page_type: Option<String>, json_output: bool) {
    let mode = parse_mode_or_exit(&mode);
    let expected = page_type.map(|raw| {
        raw.parse::<PageType>().unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        })
    });

    let mut reports = Vec::new();
    for file in &files {
        let text = read_text_or_exit(file);
        let name = file.display().to_string();
        let blocks = extract_blocks(&name, &text);
        if blocks.is_empty() {
            // Not a page: the whole file is the block, and the grammar decides.
            reports.push(validate_block(&text, &name, expected, mode).report);
            continue;
        }
        for block in blocks {
            let subject = format!("{name}:{}", block.line);
            reports.push(validate_block(&block.text, &subject, expected, mode).report);
        }
    }

    if json_output {
        print_json_or_exit(&reports);
    } else {
        for report in &reports {
            print_human_summary(report);
        }
    }
    exit_if_failed(reports.iter().any(|report| report.verdict.is_failure()));
}

fn print_human_summary(report: &BlockReport) {
    println!("{}: {}", report.subject, report.verdict.as_str());
    if let Some(token) = &report.token {
        println!("  Token: {token}");
    }
    if let Some(hash) = &report.computed_hash {
        let state = if report.provisional { " (provisional)" } else { "" };
        println!("  Hash: {hash}{state}");
    }
    for finding in report.errors.iter().chain(&report.warnings) {
        println!("  - [{}] {}: {}", finding.severity, finding.class, finding.message);
    }
}
