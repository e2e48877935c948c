//! Error types for a weave run
//!
//! Every fatal condition of any phase surfaces as one [`WeaveError`]; there
//! is no partial-success value. Non-fatal findings (bad patterns, pointcut
//! conflicts) are diagnostics on the outcome instead.

use std::path::PathBuf;

use weave_overlay::OverlayError;
use weave_pointcut::AspectError;
use weave_program::LoadError;
use weave_rewrite::RewriteError;

/// Terminal error of a weave run
#[derive(Debug, thiserror::Error)]
pub enum WeaveError {
    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Aspect specification cannot be read or is invalid
    #[error("aspect specification error: {0}")]
    Aspect(#[from] AspectError),

    /// Target package cannot be loaded
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// A matched reference could not be rewritten
    #[error("rewrite error: {0}")]
    Rewrite(#[from] RewriteError),

    /// Writing the overlay failed
    #[error("filesystem error: {0}")]
    FileSystem(#[from] OverlayError),
}

impl WeaveError {
    /// Raised before any phase touched the target
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Aspect(_))
    }
}

/// Configuration problems
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no target package given")]
    MissingTarget,

    #[error("no aspect specification file given")]
    MissingAspectFile,

    #[error("exactly one aspect specification file is supported, got {0}")]
    MultipleAspectFiles(usize),

    #[error("no overlay directory given")]
    MissingOverlay,

    #[error("overlay directory {0} is the source root")]
    OverlayIsSource(PathBuf),

    #[error("aspect unit suffix must end with .go, got {0:?}")]
    InvalidAspectSuffix(String),

    #[error("invalid configuration file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
