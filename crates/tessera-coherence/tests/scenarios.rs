//! End-to-end checks over real trees on disk.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tessera_coherence::{
    CheckStatus, ReportSave, SnapshotStatus, build_report, check_consistency, check_topology,
    compare_to_latest, create_snapshot, save_report, save_snapshot,
};
use tessera_kernel::seal_block;
use tessera_ledger::{Corpus, Layout, Registry, export_dataset, write_dataset};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "tessera-scenario-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, rel: &str, contents: &str) {
        let path = self.path.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir should be created");
        }
        fs::write(&path, contents).expect("fixture file should be written");
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, day).expect("valid date")
}

/// A tree every check accepts: one published entity, reachable, sealed and
/// exported.
fn healthy_tree(prefix: &str) -> TempDirGuard {
    let tmp = TempDirGuard::new(prefix);
    let block = seal_block(
        "[ENTITY/OKX]\nschema=1\nversion=1\ntype=entity\nurl=/exchanges/okx/\nname=OKX\n[/ENTITY]\n",
    )
    .expect("block seals");
    tmp.write("public/index.html", "<a href=\"/exchanges/\">Exchanges</a>\n");
    tmp.write("public/exchanges/index.html", "<a href=\"okx/\">OKX</a>\n");
    tmp.write(
        "public/exchanges/okx/index.html",
        &format!("<html>\n<pre>\n{block}</pre>\n<a href=\"/exchanges/\">all</a>\n</html>\n"),
    );
    tmp.write("public/robots.txt", "User-agent: *\nAllow: /\n");
    tmp.write("public/sitemap.xml", "<urlset/>\n");
    tmp.write(
        "public/dataset/registry.json",
        r#"[{"id":"okx","type":"entity","page_status":"published","parent_id":null}]"#,
    );
    tmp.write("public/dataset/records.ndjson", "");

    let layout = Layout::with_defaults(tmp.path());
    let registry = Registry::load(&layout.registry_path()).expect("registry loads");
    let pages = tessera_ledger::scan_pages(&layout.pages_dir()).expect("pages scan");
    let records = export_dataset(&registry, pages.iter().flat_map(|page| page.blocks.iter()));
    write_dataset(&layout.dataset_path(), &records).expect("dataset written");
    tmp
}

#[test]
fn registered_entity_without_page_is_one_violation() {
    let tmp = TempDirGuard::new("scenario-a");
    tmp.write(
        "public/dataset/registry.json",
        r#"[{"id":"x","type":"entity","page_status":"published","parent_id":null}]"#,
    );
    tmp.write("public/dataset/records.ndjson", "");
    let layout = Layout::with_defaults(tmp.path());
    let corpus = Corpus::load(&layout).expect("corpus loads");

    let report = check_consistency(&corpus, &layout);
    assert_eq!(report.violation_count, 1);
    assert_eq!(report.violations[0].kind, "REGISTRY_MISSING_PAGE");
    assert_eq!(report.violations[0].id, "x");
    assert_eq!(
        report.violations[0].page.as_deref(),
        Some("exchanges/x/index.html")
    );
}

#[test]
fn hub_linking_hub_is_reported_from_config() {
    let tmp = TempDirGuard::new("scenario-d");
    tmp.write("tessera.toml", "hubs = [\"exchanges\", \"wallets\"]\n");
    tmp.write("public/dataset/registry.json", "[]");
    tmp.write("public/dataset/records.ndjson", "");
    tmp.write("public/exchanges/index.html", "<a href=\"/wallets/\">Wallets</a>\n");
    tmp.write("public/wallets/index.html", "<p>wallets</p>\n");
    let layout = Layout::load(tmp.path(), None).expect("layout loads");
    let corpus = Corpus::load(&layout).expect("corpus loads");

    let report = check_topology(&corpus, &layout);
    let kinds: Vec<&str> = report.violations.iter().map(|v| v.kind.as_str()).collect();
    assert_eq!(kinds, vec!["HUB_TO_HUB_LINK"]);
}

#[test]
fn registry_rewrite_after_snapshot_is_expected() {
    let tmp = healthy_tree("scenario-e");
    let layout = Layout::with_defaults(tmp.path());
    let baseline = create_snapshot(&layout, date(1)).expect("snapshot");
    save_snapshot(&layout, &baseline).expect("snapshot saved");

    tmp.write(
        "public/dataset/registry.json",
        r#"[{"id":"okx","type":"entity","page_status":"published","parent_id":null,"note":"x"}]"#,
    );
    let comparison = compare_to_latest(&layout, date(2)).expect("compare");
    assert_eq!(comparison.status, SnapshotStatus::SkippedExpectedMutation);
    assert!(comparison.violations.is_empty());
}

#[test]
fn unchanged_tree_reproduces_the_report() {
    let tmp = healthy_tree("report-repro");
    let layout = Layout::with_defaults(tmp.path());
    save_snapshot(&layout, &create_snapshot(&layout, date(1)).expect("snapshot"))
        .expect("snapshot saved");

    let corpus = Corpus::load(&layout).expect("corpus loads");
    let first = build_report(&corpus, &layout, date(2), "full").expect("report");
    assert_eq!(first.body.status, CheckStatus::Pass, "{first:#?}");
    assert_eq!(first.body.summary.snapshot_status, SnapshotStatus::Pass);
    let saved = save_report(&layout, &first).expect("report saved");
    assert!(matches!(saved, ReportSave::Written(_)));

    let reloaded = Corpus::load(&layout).expect("corpus reloads");
    let second = build_report(&reloaded, &layout, date(2), "full").expect("report");
    assert_eq!(second.report_id, first.report_id);
    assert_eq!(
        serde_json::to_string(&second).expect("render"),
        serde_json::to_string(&first).expect("render")
    );
    assert!(matches!(save_report(&layout, &second), Ok(ReportSave::Unchanged(_))));
}
