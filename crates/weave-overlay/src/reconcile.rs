//! Pass-through reconciliation
//!
//! Walks the original tree and makes every entry the weaver did not rewrite
//! visible in the overlay as a symlink to the original. For each entry
//! exactly one [`Action`] is chosen:
//!
//! - **Recur** into a directory that contains a rewritten path;
//! - **Skip** aspect units, rewritten paths and anything that already
//!   exists in the overlay;
//! - **Symlink** everything else, creating the overlay directory lazily.
//!
//! The choice depends only on the entry, the written set and whether the
//! overlay path exists, which makes a second run with the same inputs a
//! no-op. Errors abort immediately; nothing is rolled back.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::OverlayError;
use crate::layout::OverlayLayout;
use crate::materialize::ensure_real_dir;

/// Why an entry was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AspectUnit,
    Rewritten,
    Exists,
    /// The entry is the overlay root itself (overlay nested in the source)
    OverlayRoot,
}

/// Decision for one entry of the original tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "reason", rename_all = "snake_case")]
pub enum Action {
    Recur,
    Skip(SkipReason),
    Symlink,
}

/// What a reconciliation did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Symlinks created (overlay paths)
    pub linked: Vec<PathBuf>,
    /// Directories recursed into (root-relative)
    pub recursed: Vec<PathBuf>,
    /// Entries skipped (root-relative) with the reason
    pub skipped: Vec<(PathBuf, SkipReason)>,
}

impl ReconcileReport {
    /// Nothing was created
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.linked.is_empty()
    }
}

/// Action for the root-relative `entry`.
///
/// `written` holds root-relative rewritten paths; prefixes are compared by
/// path component.
#[must_use]
pub fn decide(
    entry: &Path,
    is_dir: bool,
    aspect_suffix: &str,
    written: &BTreeSet<PathBuf>,
    overlay_exists: bool,
) -> Action {
    if is_dir && written.iter().any(|w| w != entry && w.starts_with(entry)) {
        return Action::Recur;
    }
    let is_aspect = !is_dir
        && entry
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(aspect_suffix));
    if is_aspect {
        Action::Skip(SkipReason::AspectUnit)
    } else if written.contains(entry) {
        Action::Skip(SkipReason::Rewritten)
    } else if overlay_exists {
        Action::Skip(SkipReason::Exists)
    } else {
        Action::Symlink
    }
}

/// Mirror every non-rewritten entry of the source root into the overlay.
///
/// # Errors
/// [`OverlayError::Io`] on the first filesystem failure.
pub fn reconcile(
    layout: &OverlayLayout,
    written: &BTreeSet<PathBuf>,
    aspect_suffix: &str,
) -> Result<ReconcileReport, OverlayError> {
    let mut report = ReconcileReport::default();
    reconcile_dir(layout, Path::new(""), written, aspect_suffix, &mut report)?;
    info!(
        linked = report.linked.len(),
        recursed = report.recursed.len(),
        skipped = report.skipped.len(),
        "reconciliation complete"
    );
    Ok(report)
}

fn reconcile_dir(
    layout: &OverlayLayout,
    relative_dir: &Path,
    written: &BTreeSet<PathBuf>,
    aspect_suffix: &str,
    report: &mut ReconcileReport,
) -> Result<(), OverlayError> {
    let source_dir = layout.source_of_relative(relative_dir);
    let mut entries = fs::read_dir(&source_dir)
        .map_err(|e| OverlayError::io_error(&source_dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| OverlayError::io_error(&source_dir, e))?;
    entries.sort();

    let overlay_dir = layout.overlay_of_relative(relative_dir);
    let mut overlay_dir_ready = false;

    for original in entries {
        let Some(name) = original.file_name() else {
            continue;
        };
        let relative = relative_dir.join(name);
        let overlay_path = layout.overlay_of_relative(&relative);
        // Dangling links in the original tree are mirrored as plain entries.
        let meta = fs::metadata(&original)
            .or_else(|_| fs::symlink_metadata(&original))
            .map_err(|e| OverlayError::io_error(&original, e))?;
        let overlay_exists = match fs::symlink_metadata(&overlay_path) {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(OverlayError::io_error(&overlay_path, e)),
        };

        let action = if original == layout.overlay_root() {
            Action::Skip(SkipReason::OverlayRoot)
        } else {
            decide(&relative, meta.is_dir(), aspect_suffix, written, overlay_exists)
        };
        debug!(
            path = %relative.display(),
            action = ?action,
            "reconcile decision"
        );

        match action {
            Action::Recur => {
                ensure_real_dir(layout.overlay_root(), &overlay_path)?;
                report.recursed.push(relative.clone());
                reconcile_dir(layout, &relative, written, aspect_suffix, report)?;
            }
            Action::Skip(reason) => report.skipped.push((relative, reason)),
            Action::Symlink => {
                if !overlay_dir_ready {
                    ensure_real_dir(layout.overlay_root(), &overlay_dir)?;
                    overlay_dir_ready = true;
                }
                symlink(&original, &overlay_path)?;
                report.linked.push(overlay_path);
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> Result<(), OverlayError> {
    std::os::unix::fs::symlink(original, link).map_err(|e| OverlayError::io_error(link, e))
}

#[cfg(windows)]
fn symlink(original: &Path, link: &Path) -> Result<(), OverlayError> {
    let result = if original.is_dir() {
        std::os::windows::fs::symlink_dir(original, link)
    } else {
        std::os::windows::fs::symlink_file(original, link)
    };
    result.map_err(|e| OverlayError::io_error(link, e))
}
