//! Source loaders for the four representations of an entity record.
//!
//! The registry ledger is the sole source of truth. The NDJSON dataset and
//! the blocks embedded in pages are projections of it. Everything here
//! reads the tree once into memory; [`Corpus`] is then passed by reference
//! through every check.

pub mod corpus;
pub mod dataset;
pub mod error;
pub mod layout;
pub mod pages;
pub mod registry;
pub mod substrate;

pub use corpus::Corpus;
pub use dataset::{
    Dataset, DatasetRecord, RecordType, export_dataset, load_dataset, read_dataset,
    render_dataset, write_dataset,
};
pub use error::LoadError;
pub use layout::{CONFIG_FILE, Layout, LayoutConfig, LayoutError, PageKind};
pub use pages::{EmbeddedBlock, Page, extract_blocks, rel_slash_path, scan_pages, walk_sorted};
pub use registry::Registry;
pub use substrate::{read_substrate, write_atomic};

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub struct TempDirGuard {
        path: PathBuf,
    }

    impl TempDirGuard {
        pub fn new(prefix: &str) -> Self {
            let unique = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock should be after unix epoch")
                .as_nanos();
            let path = std::env::temp_dir().join(format!(
                "tessera-ledger-{prefix}-{}-{unique}",
                std::process::id()
            ));
            fs::create_dir_all(&path).expect("temp dir should be created");
            Self { path }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
            let path = self.path.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("parent dir should be created");
            }
            fs::write(&path, contents).expect("fixture file should be written");
            path
        }
    }

    impl Drop for TempDirGuard {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}
