//! Page link graph rules.
//!
//! Pages are classified by path alone (see [`Layout::classify`]). Links are
//! read from `href` attributes and resolved against the page tree; anything
//! that does not land on a classified page is ignored.

use crate::CheckStatus;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tessera_ledger::{Corpus, Layout, PageKind};
use tracing::debug;

pub mod topology_class {
    pub const ROOT_LINK_NOT_HUB: &str = "ROOT_LINK_NOT_HUB";
    pub const HUB_TO_HUB_LINK: &str = "HUB_TO_HUB_LINK";
    pub const HUB_TO_CHILD_LINK: &str = "HUB_TO_CHILD_LINK";
    pub const ENTITY_TO_ENTITY_LINK: &str = "ENTITY_TO_ENTITY_LINK";
    pub const ENTITY_TO_FOREIGN_CHILD: &str = "ENTITY_TO_FOREIGN_CHILD";
    pub const CHILD_CROSS_ENTITY_LINK: &str = "CHILD_CROSS_ENTITY_LINK";
    pub const ENTITY_UNREACHABLE: &str = "ENTITY_UNREACHABLE";
    pub const CHILD_UNREACHABLE: &str = "CHILD_UNREACHABLE";
    pub const BROKEN_INTERNAL_LINK: &str = "BROKEN_INTERNAL_LINK";
}

const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyViolation {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub source_class: PageKind,
    pub target: String,
    pub target_class: PageKind,
    /// Absent for reachability violations, which have no offending link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyReport {
    pub status: CheckStatus,
    pub violation_count: usize,
    pub violations: Vec<TopologyViolation>,
    pub pages_checked: usize,
    pub links_checked: usize,
}

fn href_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("href regex must compile")
    })
}

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").expect("scheme regex must compile")
    })
}

/// Every `href` attribute value in document order.
pub fn extract_links(html: &str) -> Vec<String> {
    href_re()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|value| value.as_str().trim().to_string())
        .collect()
}

/// Resolve `href` found on `source_rel` to a page path and its class.
///
/// External, protocol-relative, scheme-bearing (`mailto:`, `tel:`) and
/// fragment-only links are dropped, as are redirect-prefix links, asset
/// files, paths that climb above the pages dir and unclassified targets.
pub fn resolve_href(layout: &Layout, source_rel: &str, href: &str) -> Option<(String, PageKind)> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("//") {
        return None;
    }
    if scheme_re().is_match(href) {
        return None;
    }
    let path = href.split(['#', '?']).next().unwrap_or_default();
    if path.is_empty() {
        return None;
    }
    let redirect = layout.config().redirect_prefix.as_str();
    if !redirect.is_empty() && path.starts_with(redirect) {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    let relative = if let Some(absolute) = path.strip_prefix('/') {
        absolute
    } else {
        segments.extend(source_rel.split('/'));
        segments.pop();
        path
    };
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    let target = match segments.last() {
        Some(last) if last.contains('.') => {
            if !last.ends_with(".html") {
                return None;
            }
            segments.join("/")
        }
        Some(_) => format!("{}/{INDEX_FILE}", segments.join("/")),
        None => INDEX_FILE.to_string(),
    };
    match layout.classify(&target) {
        PageKind::Unknown => None,
        kind => Some((target, kind)),
    }
}

fn hub_index(rel: &str) -> Option<String> {
    rel.split('/').next().map(|hub| format!("{hub}/{INDEX_FILE}"))
}

fn entity_index(rel: &str) -> Option<String> {
    let mut segments = rel.split('/');
    let hub = segments.next()?;
    let entity = segments.next()?;
    Some(format!("{hub}/{entity}/{INDEX_FILE}"))
}

fn structural_rule(
    layout: &Layout,
    source: &str,
    source_class: PageKind,
    target: &str,
    target_class: PageKind,
) -> Option<&'static str> {
    let same_entity = || layout.entity_of(source) == layout.entity_of(target);
    match (source_class, target_class) {
        (PageKind::Root, PageKind::Hub) => None,
        (PageKind::Root, _) => Some(topology_class::ROOT_LINK_NOT_HUB),
        (PageKind::Hub, PageKind::Hub) => Some(topology_class::HUB_TO_HUB_LINK),
        (PageKind::Hub, PageKind::Child) => Some(topology_class::HUB_TO_CHILD_LINK),
        (PageKind::Entity, PageKind::Entity) => Some(topology_class::ENTITY_TO_ENTITY_LINK),
        (PageKind::Entity, PageKind::Child) if !same_entity() => {
            Some(topology_class::ENTITY_TO_FOREIGN_CHILD)
        }
        (PageKind::Child, PageKind::Entity | PageKind::Child) if !same_entity() => {
            Some(topology_class::CHILD_CROSS_ENTITY_LINK)
        }
        _ => None,
    }
}

pub fn check_topology(corpus: &Corpus, layout: &Layout) -> TopologyReport {
    let mut violations = Vec::new();
    let mut edges: BTreeSet<(&str, String)> = BTreeSet::new();
    let mut pages_checked = 0;
    let mut links_checked = 0;

    for page in &corpus.pages {
        let source = page.rel_path.as_str();
        let source_class = layout.classify(source);
        if source_class == PageKind::Unknown {
            continue;
        }
        pages_checked += 1;

        for href in extract_links(&page.text) {
            let Some((target, target_class)) = resolve_href(layout, source, &href) else {
                continue;
            };
            if target == source {
                continue;
            }
            links_checked += 1;

            let make = |kind: &str| TopologyViolation {
                kind: kind.to_string(),
                source: source.to_string(),
                source_class,
                target: target.clone(),
                target_class,
                href: Some(href.clone()),
            };
            if !corpus.has_page(&target) {
                violations.push(make(topology_class::BROKEN_INTERNAL_LINK));
                continue;
            }
            if let Some(kind) = structural_rule(layout, source, source_class, &target, target_class)
            {
                violations.push(make(kind));
            }
            edges.insert((source, target));
        }
    }

    for page in &corpus.pages {
        let target = page.rel_path.as_str();
        let (kind, parent, parent_class) = match layout.classify(target) {
            PageKind::Entity => (
                topology_class::ENTITY_UNREACHABLE,
                hub_index(target),
                PageKind::Hub,
            ),
            PageKind::Child => (
                topology_class::CHILD_UNREACHABLE,
                entity_index(target),
                PageKind::Entity,
            ),
            _ => continue,
        };
        let Some(parent) = parent else { continue };
        if !edges.contains(&(parent.as_str(), target.to_string())) {
            violations.push(TopologyViolation {
                kind: kind.to_string(),
                source: parent,
                source_class: parent_class,
                target: target.to_string(),
                target_class: layout.classify(target),
                href: None,
            });
        }
    }

    debug!(
        pages = pages_checked,
        links = links_checked,
        violations = violations.len(),
        "topology checked"
    );
    TopologyReport {
        status: CheckStatus::from_violation_count(violations.len()),
        violation_count: violations.len(),
        violations,
        pages_checked,
        links_checked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::page;
    use std::path::Path;
    use tessera_ledger::{Dataset, LayoutConfig, Registry};

    fn two_hub_layout() -> Layout {
        let config = LayoutConfig {
            hubs: vec!["exchanges".to_string(), "wallets".to_string()],
            ..LayoutConfig::default()
        };
        Layout::new(Path::new("."), config).expect("valid layout")
    }

    fn corpus(pages: &[(&str, &str)]) -> Corpus {
        Corpus::new(
            Registry::default(),
            Dataset::default(),
            pages.iter().map(|(rel, text)| page(rel, text)).collect(),
        )
    }

    fn kinds(report: &TopologyReport) -> Vec<(&str, &str)> {
        report
            .violations
            .iter()
            .map(|v| (v.kind.as_str(), v.target.as_str()))
            .collect()
    }

    #[test]
    fn extracts_both_quote_styles() {
        let html = r#"<a href="/a/">x</a><A HREF='b.html'>y</A><link href = "/c" />"#;
        assert_eq!(extract_links(html), vec!["/a/", "b.html", "/c"]);
    }

    #[test]
    fn resolves_relative_and_absolute_links() {
        let layout = Layout::with_defaults(Path::new("."));
        let from = "exchanges/okx/index.html";
        assert_eq!(
            resolve_href(&layout, from, "earn/"),
            Some(("exchanges/okx/earn/index.html".to_string(), PageKind::Child))
        );
        assert_eq!(
            resolve_href(&layout, from, "../bybit/#fees"),
            Some(("exchanges/bybit/index.html".to_string(), PageKind::Entity))
        );
        assert_eq!(
            resolve_href(&layout, from, "/"),
            Some(("index.html".to_string(), PageKind::Root))
        );
        assert_eq!(
            resolve_href(&layout, from, "/exchanges?page=2"),
            Some(("exchanges/index.html".to_string(), PageKind::Hub))
        );
    }

    #[test]
    fn excluded_links_never_resolve() {
        let layout = Layout::with_defaults(Path::new("."));
        let from = "exchanges/okx/index.html";
        for href in [
            "https://okx.com/",
            "//cdn.example/x.js",
            "mailto:team@example.org",
            "tel:+100",
            "#top",
            "/go/okx",
            "/assets/logo.png",
            "../../../../etc/",
            "/about/team/x/y/",
        ] {
            assert_eq!(resolve_href(&layout, from, href), None, "{href}");
        }
    }

    #[test]
    fn hub_linking_another_hub_is_reported() {
        let report = check_topology(
            &corpus(&[
                ("index.html", r#"<a href="/exchanges/">E</a><a href="/wallets/">W</a>"#),
                ("exchanges/index.html", r#"<a href="/wallets/">wallets</a>"#),
                ("wallets/index.html", ""),
            ]),
            &two_hub_layout(),
        );
        assert_eq!(
            kinds(&report),
            vec![(topology_class::HUB_TO_HUB_LINK, "wallets/index.html")]
        );
        let violation = &report.violations[0];
        assert_eq!(violation.source, "exchanges/index.html");
        assert_eq!(violation.source_class, PageKind::Hub);
        assert_eq!(violation.href.as_deref(), Some("/wallets/"));
        assert_eq!(report.status, CheckStatus::Fail);
    }

    #[test]
    fn well_formed_tree_passes() {
        let report = check_topology(
            &corpus(&[
                ("index.html", r#"<a href="/exchanges/">all</a>"#),
                ("exchanges/index.html", r#"<a href="okx/">OKX</a> <a href="/">home</a>"#),
                (
                    "exchanges/okx/index.html",
                    r#"<a href="earn/">earn</a><a href="/exchanges/">back</a><a href="/go/okx">go</a>"#,
                ),
                ("exchanges/okx/earn/index.html", r#"<a href="../">OKX</a>"#),
            ]),
            &Layout::with_defaults(Path::new(".")),
        );
        assert_eq!(report.violations, Vec::new());
        assert_eq!(report.pages_checked, 4);
        assert_eq!(report.links_checked, 6);
    }

    #[test]
    fn cross_entity_links_and_reachability_are_reported() {
        let report = check_topology(
            &corpus(&[
                ("exchanges/index.html", r#"<a href="okx/">OKX</a><a href="okx/earn/">earn</a>"#),
                (
                    "exchanges/okx/index.html",
                    r#"<a href="../kraken/">K</a><a href="../kraken/staking/">KS</a>"#,
                ),
                ("exchanges/okx/earn/index.html", r#"<a href="/exchanges/kraken/">K</a>"#),
                ("exchanges/kraken/index.html", r#"<a href="/compare/missing/">cmp</a>"#),
                ("exchanges/kraken/staking/index.html", ""),
            ]),
            &Layout::with_defaults(Path::new(".")),
        );
        assert_eq!(
            kinds(&report),
            vec![
                (topology_class::HUB_TO_CHILD_LINK, "exchanges/okx/earn/index.html"),
                (topology_class::BROKEN_INTERNAL_LINK, "compare/missing/index.html"),
                (topology_class::CHILD_CROSS_ENTITY_LINK, "exchanges/kraken/index.html"),
                (topology_class::ENTITY_TO_ENTITY_LINK, "exchanges/kraken/index.html"),
                (topology_class::ENTITY_TO_FOREIGN_CHILD, "exchanges/kraken/staking/index.html"),
                (topology_class::ENTITY_UNREACHABLE, "exchanges/kraken/index.html"),
                (topology_class::CHILD_UNREACHABLE, "exchanges/kraken/staking/index.html"),
                (topology_class::CHILD_UNREACHABLE, "exchanges/okx/earn/index.html"),
            ]
        );
    }
}
