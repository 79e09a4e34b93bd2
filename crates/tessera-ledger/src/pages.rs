//! Page tree scanning and embedded block extraction.

use crate::error::LoadError;
use crate::substrate::read_substrate;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedBlock {
    /// Page path relative to the pages dir.
    pub page: String,
    pub kind: String,
    pub token: String,
    /// Lowercased token; matches registry ids.
    pub id: String,
    /// 1-based line of the header within the page.
    pub line: usize,
    /// Header through closing delimiter, one line per source line.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub rel_path: String,
    pub text: String,
    pub blocks: Vec<EmbeddedBlock>,
}

fn block_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[([A-Za-z][A-Za-z_]*)/([A-Za-z0-9][A-Za-z0-9_.-]*)\]$")
            .expect("block header regex must compile")
    })
}

/// Every regular file under `dir`. Each directory's entries are sorted by
/// name before recursing, so the order never depends on the filesystem.
pub fn walk_sorted(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut files = Vec::new();
    walk_into(dir, &mut files)?;
    Ok(files)
}

fn walk_into(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), LoadError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| LoadError::walk(dir, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| LoadError::walk(dir, e))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| LoadError::walk(&path, e))?;
        if file_type.is_dir() {
            walk_into(&path, files)?;
        } else if file_type.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

/// `/`-separated path of `path` relative to `base`.
pub fn rel_slash_path(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts = rel
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

/// Find `[KIND/TOKEN] ... [/KIND]` regions in page text.
///
/// Matching is case-insensitive; the block text is handed to the grammar
/// validator unchanged, so a malformed block is still reported. A header
/// with no closing delimiter takes the rest of the page.
pub fn extract_blocks(page: &str, text: &str) -> Vec<EmbeddedBlock> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut idx = 0;
    while idx < lines.len() {
        let Some(caps) = block_header_re().captures(lines[idx].trim()) else {
            idx += 1;
            continue;
        };
        let kind = caps[1].to_ascii_uppercase();
        let token = caps[2].to_string();
        let closing = format!("[/{kind}]");
        let end = lines[idx + 1..]
            .iter()
            .position(|line| line.trim().eq_ignore_ascii_case(&closing))
            .map(|offset| idx + 1 + offset)
            .unwrap_or(lines.len() - 1);

        let mut body = lines[idx..=end].join("\n");
        body.push('\n');
        blocks.push(EmbeddedBlock {
            page: page.to_string(),
            kind,
            id: token.to_ascii_lowercase(),
            token,
            line: idx + 1,
            text: body,
        });
        idx = end + 1;
    }
    blocks
}

/// Scan every `*.html` page under `pages_dir`.
pub fn scan_pages(pages_dir: &Path) -> Result<Vec<Page>, LoadError> {
    if !pages_dir.is_dir() {
        return Err(LoadError::walk(
            pages_dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "pages directory not found"),
        ));
    }
    let mut pages = Vec::new();
    for path in walk_sorted(pages_dir)? {
        if path.extension().and_then(|ext| ext.to_str()) != Some("html") {
            continue;
        }
        let Some(rel_path) = rel_slash_path(pages_dir, &path) else {
            return Err(LoadError::Corrupt {
                path: path.display().to_string(),
                reason: "page path is not valid UTF-8".to_string(),
            });
        };
        let text = read_substrate(&path)?;
        let blocks = extract_blocks(&rel_path, &text);
        pages.push(Page {
            rel_path,
            text,
            blocks,
        });
    }
    debug!(
        dir = %pages_dir.display(),
        pages = pages.len(),
        blocks = pages.iter().map(|page| page.blocks.len()).sum::<usize>(),
        "page tree scanned"
    );
    Ok(pages)
}
