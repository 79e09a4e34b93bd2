//! Canonical-URL opacity and crawl-control presence.

use crate::CheckStatus;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tessera_ledger::{Corpus, Layout};
use tracing::debug;

pub mod metadata_class {
    pub const CANONICAL_LITERAL_URL: &str = "CANONICAL_LITERAL_URL";
    pub const CANONICAL_TLD_FRAGMENT: &str = "CANONICAL_TLD_FRAGMENT";
    pub const CANONICAL_BRAND_TOKEN: &str = "CANONICAL_BRAND_TOKEN";
    pub const CANONICAL_ROUTE_WORD: &str = "CANONICAL_ROUTE_WORD";
    pub const ROBOTS_MISSING: &str = "ROBOTS_MISSING";
    pub const SITEMAP_MISSING: &str = "SITEMAP_MISSING";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataViolation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataReport {
    pub status: CheckStatus,
    pub violation_count: usize,
    pub violations: Vec<MetadataViolation>,
    pub pages_checked: usize,
    pub robots_present: bool,
    pub sitemap_present: bool,
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<(link|meta)\b([^>]*)>").expect("tag regex must compile"))
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)([a-z][a-z-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("attribute regex must compile")
    })
}

fn literal_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:[a-z][a-z0-9+.-]*://|//|www\.)")
            .expect("literal url regex must compile")
    })
}

fn tld_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\.(?:com|net|org|io|co|app|dev|exchange|xyz|info|biz|us|uk|eu)\b")
            .expect("tld regex must compile")
    })
}

fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    attr_re().captures_iter(attrs).find_map(|caps| {
        if !caps[1].eq_ignore_ascii_case(name) {
            return None;
        }
        caps.get(2).or_else(|| caps.get(3)).map(|value| value.as_str())
    })
}

/// Declared canonical value of a page: the first
/// `<link rel="canonical" href>` or `<meta name="canonical" content>`.
pub fn canonical_value(html: &str) -> Option<String> {
    tag_re().captures_iter(html).find_map(|caps| {
        let attrs = caps.get(2)?.as_str();
        let (key, value) = if caps[1].eq_ignore_ascii_case("link") {
            ("rel", "href")
        } else {
            ("name", "content")
        };
        let marker = attribute(attrs, key)?;
        if !marker.trim().eq_ignore_ascii_case("canonical") {
            return None;
        }
        attribute(attrs, value).map(|value| value.trim().to_string())
    })
}

/// `needle` occurs in `haystack` with no ASCII alphanumeric on either side.
fn contains_term(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let bytes = haystack.as_bytes();
    haystack.match_indices(needle).any(|(start, matched)| {
        let end = start + matched.len();
        let before = start.checked_sub(1).map(|idx| bytes[idx]);
        let after = bytes.get(end).copied();
        !before.is_some_and(|b| b.is_ascii_alphanumeric())
            && !after.is_some_and(|b| b.is_ascii_alphanumeric())
    })
}

fn first_term<'a>(value: &str, terms: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let lowered = value.to_ascii_lowercase();
    terms
        .into_iter()
        .find(|term| contains_term(&lowered, &term.to_ascii_lowercase()))
}

fn value_violations(value: &str, corpus: &Corpus, layout: &Layout) -> Vec<(&'static str, String)> {
    let config = layout.config();
    let mut found = Vec::new();
    if literal_url_re().is_match(value) {
        found.push((metadata_class::CANONICAL_LITERAL_URL, "literal URL".to_string()));
    }
    if let Some(tld) = tld_re().find(value) {
        found.push((
            metadata_class::CANONICAL_TLD_FRAGMENT,
            format!("TLD fragment `{}`", tld.as_str()),
        ));
    }
    let brands = config
        .brand_tokens
        .iter()
        .map(String::as_str)
        .chain(corpus.registry.entries().iter().map(|entry| entry.id.as_str()));
    if let Some(brand) = first_term(value, brands) {
        found.push((metadata_class::CANONICAL_BRAND_TOKEN, format!("brand token `{brand}`")));
    }
    let route_words = config
        .hubs
        .iter()
        .chain(std::iter::once(&config.comparison_segment))
        .chain(&config.route_words)
        .map(String::as_str);
    if let Some(word) = first_term(value, route_words) {
        found.push((metadata_class::CANONICAL_ROUTE_WORD, format!("route word `{word}`")));
    }
    found
}

pub fn check_metadata(corpus: &Corpus, layout: &Layout) -> MetadataReport {
    let config = layout.config();
    let mut violations = Vec::new();

    for page in &corpus.pages {
        let Some(value) = canonical_value(&page.text) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        for (kind, detail) in value_violations(&value, corpus, layout) {
            violations.push(MetadataViolation {
                kind: kind.to_string(),
                page: Some(page.rel_path.clone()),
                value: Some(value.clone()),
                detail,
            });
        }
    }

    let robots = layout.page_path(&config.robots_file);
    let robots_present = robots.is_file();
    if !robots_present {
        violations.push(MetadataViolation {
            kind: metadata_class::ROBOTS_MISSING.to_string(),
            page: None,
            value: None,
            detail: format!("no crawl-control file at {}", layout.tree_rel_page(&config.robots_file)),
        });
    }

    let sitemap_present = layout.page_path(&config.sitemap_static).is_file()
        || config
            .sitemap_entry_points
            .iter()
            .any(|entry| layout.root().join(entry).is_file());
    if !sitemap_present {
        violations.push(MetadataViolation {
            kind: metadata_class::SITEMAP_MISSING.to_string(),
            page: None,
            value: None,
            detail: "no static sitemap and no sitemap entry point".to_string(),
        });
    }

    debug!(
        pages = corpus.pages.len(),
        violations = violations.len(),
        robots_present,
        sitemap_present,
        "metadata checked"
    );
    MetadataReport {
        status: CheckStatus::from_violation_count(violations.len()),
        violation_count: violations.len(),
        violations,
        pages_checked: corpus.pages.len(),
        robots_present,
        sitemap_present,
    }
}
