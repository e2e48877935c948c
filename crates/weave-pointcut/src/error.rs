//! Error types for aspect specifications

use std::path::PathBuf;

use crate::spec::AspectFormat;

/// Errors raised while reading an aspect specification
#[derive(Debug, thiserror::Error)]
pub enum AspectError {
    /// Extension does not name a supported format
    #[error("unsupported aspect specification format: {0} (expected .yaml, .yml, .json or .toml)")]
    UnknownFormat(PathBuf),

    /// Text does not decode
    #[error("invalid {format} aspect specification{}: {message}", path_suffix(.path))]
    Decode {
        path: Option<PathBuf>,
        format: AspectFormat,
        message: String,
    },

    /// No advice bindings
    #[error("aspect specification declares no aspects")]
    NoAspects,

    /// Advice or package name is not a Go identifier
    #[error("aspect #{index}: '{advice}' is not a valid Go identifier")]
    InvalidAdviceName { index: usize, advice: String },

    /// IO error during read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AspectError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}
