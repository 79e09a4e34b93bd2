use crate::support::{print_json_or_exit, read_text_or_exit};
use serde_json::json;
use std::path::PathBuf;
use tessera_kernel::{hash_block_text, seal_block};
use tessera_ledger::write_atomic;
use tracing::info;

pub fn run(file: PathBuf, write: bool, json_output: bool) {
    let text = read_text_or_exit(&file);
    let sealed = seal_block(&text).unwrap_or_else(|e| {
        eprintln!("error: {}: {e}", file.display());
        std::process::exit(1);
    });
    let hash = hash_block_text(&sealed).unwrap_or_else(|e| {
        eprintln!("error: sealed block does not re-parse: {e}");
        std::process::exit(1);
    });

    if write {
        write_atomic(&file, sealed.as_bytes()).unwrap_or_else(|e| {
            eprintln!("error: failed to write {}: {e}", file.display());
            std::process::exit(1);
        });
        info!(file = %file.display(), hash = %hash, "block sealed");
    }

    if json_output {
        print_json_or_exit(&json!({
            "file": file.display().to_string(),
            "canonical_hash": hash,
            "written": write,
            "block": sealed,
        }));
    } else if write {
        println!("{hash}");
    } else {
        print!("{sealed}");
    }
}
