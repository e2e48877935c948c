//! Overlay errors

use std::path::PathBuf;

use weave_program::LoadError;

/// Errors raised while writing the overlay
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    /// Filesystem operation failed; nothing written so far is rolled back
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path lies outside the source root
    #[error("{path} is not under the source root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// The advice unit could not be parsed
    #[error("advice unit: {0}")]
    AdviceUnit(#[from] LoadError),
}

impl OverlayError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
