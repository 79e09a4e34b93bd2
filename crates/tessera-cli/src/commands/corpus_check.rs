use crate::support::{
    Globals, corpus_or_exit, exit_if_failed, parse_mode_or_exit, print_json_or_exit,
};
use tessera_kernel::{CorpusValidation, validate_corpus};

pub fn run(globals: &Globals, mode: String, json_output: bool) {
    let mode = parse_mode_or_exit(&mode);
    let layout = globals.layout_or_exit();
    let corpus = corpus_or_exit(&layout);
    let validation = validate_corpus(corpus.registry.entries(), &corpus.block_inputs(), mode);

    if json_output {
        print_json_or_exit(&validation);
    } else {
        print_human_summary(&validation);
    }
    exit_if_failed(validation.verdict.is_failure());
}

fn print_human_summary(validation: &CorpusValidation) {
    println!("tessera corpus-check");
    println!("  Mode: {}", validation.mode);
    println!("  Verdict: {}", validation.verdict.as_str());
    println!("  Graph: {}", validation.graph.result);
    println!(
        "  Blocks: {} ({} errors, {} warnings)",
        validation.blocks.len(),
        validation.error_count,
        validation.warning_count
    );
    for block in validation.blocks.iter().filter(|block| !block.failure_classes.is_empty()) {
        println!("    - {}: [{}]", block.subject, block.failure_classes.join(", "));
    }
    for finding in &validation.chain_findings {
        println!("    - {} [{}]: {}", finding.subject, finding.class, finding.message);
    }
    if !validation.failure_classes.is_empty() {
        println!("  Failure Classes: {}", validation.failure_classes.join(", "));
    }
}
