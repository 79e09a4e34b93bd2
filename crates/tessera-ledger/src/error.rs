use std::path::Path;

/// Unrecoverable input problems. Any of these aborts the run; there is no
/// partial load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("{path}: registry is not an array of well-typed entries: {source}")]
    Registry {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}:{line}: unparsable dataset line: {message}")]
    DatasetLine {
        path: String,
        line: usize,
        message: String,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    pub(crate) fn read(path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn walk(path: &Path, source: std::io::Error) -> Self {
        Self::Walk {
            path: path.display().to_string(),
            source,
        }
    }
}
