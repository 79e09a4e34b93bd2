use crate::support::{exit_if_failed, print_json_or_exit, read_text_or_exit};
use serde_json::json;
use std::path::PathBuf;
use tessera_kernel::{CANONICAL_HASH_FIELD, hash_block_text, parse_block};

pub fn run(file: PathBuf, json_output: bool) {
    let text = read_text_or_exit(&file);
    let hash = hash_block_text(&text).unwrap_or_else(|e| {
        eprintln!("error: {}: {e}", file.display());
        std::process::exit(1);
    });
    let declared = parse_block(&text)
        .ok()
        .and_then(|block| block.field(CANONICAL_HASH_FIELD).map(str::to_string));
    let matches = declared.as_deref().map(|value| hash.matches(value));

    if json_output {
        print_json_or_exit(&json!({
            "file": file.display().to_string(),
            "canonical_hash": hash,
            "declared_hash": declared,
            "matches": matches,
        }));
    } else {
        println!("{hash}");
        if matches == Some(false) {
            eprintln!("warning: declared canonical_hash does not match");
        }
    }
    exit_if_failed(matches == Some(false));
}
