//! Error types for program loading

use std::path::PathBuf;

use crate::symbols::SourceLocation;

/// Errors raised while loading a target program
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Target package cannot be located under the source root
    #[error("target package '{target}' not found under {root}")]
    TargetNotFound { target: String, root: PathBuf },

    /// Target directory holds no loadable Go files
    #[error("package directory {0} contains no Go source files")]
    EmptyPackage(PathBuf),

    /// Source does not parse
    #[error("syntax error at {location}: {message}")]
    Syntax {
        location: SourceLocation,
        message: String,
    },

    /// Files of one directory declare different packages
    #[error("conflicting package names in {dir}: '{first}' and '{second}'")]
    MixedPackages {
        dir: PathBuf,
        first: String,
        second: String,
    },

    /// Tree-sitter could not be initialized
    #[error("failed to initialize parser: {0}")]
    ParserInit(String),

    /// IO error during load
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create syntax error at a location
    pub fn syntax(location: SourceLocation, message: impl Into<String>) -> Self {
        Self::Syntax {
            location,
            message: message.into(),
        }
    }
}
