//! Weave configuration
//!
//! A [`WeaveConfig`] is built from defaults, optionally overlaid with a TOML
//! file, then with command-line flags. [`WeaveConfig::validate`] runs before
//! any phase.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use weave_rewrite::{NamingScheme, DEFAULT_RUNTIME_ALIAS, DEFAULT_RUNTIME_IMPORT};

pub use weave_program::DEFAULT_ASPECT_SUFFIX;

use crate::error::ConfigError;

/// Environment variable naming the source root when none is configured
pub const SOURCE_ROOT_ENV: &str = "WEAVE_SOURCE_ROOT";

/// Settings of one weave run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeaveConfig {
    /// Root of the original tree (module root or GOPATH `src`)
    pub source_root: PathBuf,
    /// Where the woven tree is written
    pub overlay_root: Option<PathBuf>,
    /// Target package: import path or directory relative to the root
    pub target: Option<String>,
    /// Aspect specification files; exactly one is supported
    pub aspect_files: Vec<PathBuf>,
    /// Synthetic identifier scheme
    pub naming: NamingScheme,
    /// Advice-context runtime import path
    pub runtime_import: String,
    /// Local name of the runtime import
    pub runtime_alias: String,
    /// Advice package name, overriding the specification's
    pub advice_package: Option<String>,
    /// Local name of the advice import, defaulting to the package name
    pub advice_alias: Option<String>,
    /// File-name suffix marking aspect units
    pub aspect_suffix: String,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            source_root: source_root_from(std::env::var_os(SOURCE_ROOT_ENV)),
            overlay_root: None,
            target: None,
            aspect_files: Vec::new(),
            naming: NamingScheme::default(),
            runtime_import: DEFAULT_RUNTIME_IMPORT.to_string(),
            runtime_alias: DEFAULT_RUNTIME_ALIAS.to_string(),
            advice_package: None,
            advice_alias: None,
            aspect_suffix: DEFAULT_ASPECT_SUFFIX.to_string(),
        }
    }
}

fn source_root_from(var: Option<OsString>) -> PathBuf {
    match var {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from("."),
    }
}

impl WeaveConfig {
    /// Load a TOML configuration file; unset keys keep their defaults
    ///
    /// # Errors
    /// [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    #[must_use]
    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = root.into();
        self
    }

    #[must_use]
    pub fn with_overlay_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.overlay_root = Some(root.into());
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Builder: append an aspect specification file
    #[must_use]
    pub fn with_aspect_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.aspect_files.push(path.into());
        self
    }

    #[must_use]
    pub fn with_naming(mut self, naming: NamingScheme) -> Self {
        self.naming = naming;
        self
    }

    #[must_use]
    pub fn with_runtime(mut self, import: impl Into<String>, alias: impl Into<String>) -> Self {
        self.runtime_import = import.into();
        self.runtime_alias = alias.into();
        self
    }

    #[must_use]
    pub fn with_advice_package(mut self, name: impl Into<String>) -> Self {
        self.advice_package = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_advice_alias(mut self, alias: impl Into<String>) -> Self {
        self.advice_alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn with_aspect_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.aspect_suffix = suffix.into();
        self
    }

    /// Check that a run can start
    ///
    /// # Errors
    /// The first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.target.as_deref(), Some(t) if !t.is_empty()) {
            return Err(ConfigError::MissingTarget);
        }
        match self.aspect_files.len() {
            0 => return Err(ConfigError::MissingAspectFile),
            1 => {}
            n => return Err(ConfigError::MultipleAspectFiles(n)),
        }
        let Some(overlay) = &self.overlay_root else {
            return Err(ConfigError::MissingOverlay);
        };
        if overlay == &self.source_root {
            return Err(ConfigError::OverlayIsSource(overlay.clone()));
        }
        if !self.aspect_suffix.ends_with(".go") || self.aspect_suffix == ".go" {
            return Err(ConfigError::InvalidAspectSuffix(self.aspect_suffix.clone()));
        }
        Ok(())
    }
}
