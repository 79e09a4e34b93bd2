use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tessera_kernel::Strictness;
use tessera_ledger::{Corpus, Layout, read_substrate};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Options shared by every tree-level command.
#[derive(Debug, Clone)]
pub struct Globals {
    pub root: PathBuf,
    pub config: Option<PathBuf>,
    pub date: NaiveDate,
}

impl Globals {
    pub fn new(root: PathBuf, config: Option<PathBuf>, date: Option<NaiveDate>) -> Self {
        Self {
            root,
            config,
            date: date.unwrap_or_else(|| Utc::now().date_naive()),
        }
    }

    pub fn layout_or_exit(&self) -> Layout {
        Layout::load(&self.root, self.config.as_deref()).unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        })
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

pub fn corpus_or_exit(layout: &Layout) -> Corpus {
    Corpus::load(layout).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    })
}

pub fn parse_mode_or_exit(mode: &str) -> Strictness {
    mode.parse().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    })
}

pub fn read_text_or_exit(path: &Path) -> String {
    read_substrate(path).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    })
}

pub fn print_json_or_exit<T: Serialize>(value: &T) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("error: failed to render JSON: {e}");
        std::process::exit(1);
    });
    println!("{rendered}");
}

pub fn exit_if_failed(failed: bool) {
    if failed {
        std::process::exit(1);
    }
}
