//! Source root to overlay root mapping

use std::path::{Path, PathBuf};

use crate::error::OverlayError;

/// Pair of roots: the original tree and its overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayLayout {
    source_root: PathBuf,
    overlay_root: PathBuf,
}

impl OverlayLayout {
    /// Create a layout
    #[must_use]
    pub fn new(source_root: impl Into<PathBuf>, overlay_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            overlay_root: overlay_root.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    #[inline]
    #[must_use]
    pub fn overlay_root(&self) -> &Path {
        &self.overlay_root
    }

    /// Path of `original` relative to the source root
    ///
    /// # Errors
    /// [`OverlayError::OutsideRoot`] when `original` is not under the root.
    pub fn relative(&self, original: &Path) -> Result<PathBuf, OverlayError> {
        original
            .strip_prefix(&self.source_root)
            .map(Path::to_path_buf)
            .map_err(|_| OverlayError::OutsideRoot {
                path: original.to_path_buf(),
                root: self.source_root.clone(),
            })
    }

    /// Overlay counterpart of an original path
    ///
    /// # Errors
    /// [`OverlayError::OutsideRoot`] when `original` is not under the root.
    pub fn overlay_path(&self, original: &Path) -> Result<PathBuf, OverlayError> {
        Ok(self.overlay_root.join(self.relative(original)?))
    }

    /// Overlay path of a root-relative path
    #[must_use]
    pub fn overlay_of_relative(&self, relative: &Path) -> PathBuf {
        self.overlay_root.join(relative)
    }

    /// Original path of a root-relative path
    #[must_use]
    pub fn source_of_relative(&self, relative: &Path) -> PathBuf {
        self.source_root.join(relative)
    }
}
