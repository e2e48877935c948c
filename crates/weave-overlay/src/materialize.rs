//! Writing rewritten units into the overlay
//!
//! Each destination is opened, fully written and closed before the next.
//! A directory on the way that is still a symlink from an earlier
//! reconciliation is replaced by a real directory first, so nothing is
//! ever written through a link into the original tree.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use weave_rewrite::RewrittenUnit;

use crate::error::OverlayError;
use crate::layout::OverlayLayout;

/// Provenance header of every rewritten unit
pub const GENERATED_HEADER: &str = "// Code generated by aspectgo weave. DO NOT EDIT.\n\n";

/// Final text of a rewritten unit: header, rewritten declarations, then
/// each Proxy and Generator in generation order
#[must_use]
pub fn render_unit(unit: &RewrittenUnit) -> String {
    let extra: usize = unit
        .proxies
        .iter()
        .map(|p| p.proxy.len() + p.generator.len() + 4)
        .sum();
    let mut out = String::with_capacity(GENERATED_HEADER.len() + unit.body.len() + extra);
    out.push_str(GENERATED_HEADER);
    out.push_str(&unit.body);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    for pair in &unit.proxies {
        out.push('\n');
        out.push_str(&pair.proxy);
        out.push_str("\n\n");
        out.push_str(&pair.generator);
        out.push('\n');
    }
    out
}

/// Overlay writer tracking what it wrote in this run
#[derive(Debug)]
pub struct Materializer {
    layout: OverlayLayout,
    written: BTreeSet<PathBuf>,
}

impl Materializer {
    /// Writer for `layout`
    #[must_use]
    pub fn new(layout: OverlayLayout) -> Self {
        Self {
            layout,
            written: BTreeSet::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> &OverlayLayout {
        &self.layout
    }

    /// Root-relative paths written so far
    #[inline]
    #[must_use]
    pub fn written(&self) -> &BTreeSet<PathBuf> {
        &self.written
    }

    /// Overlay paths written so far
    #[must_use]
    pub fn written_overlay_paths(&self) -> Vec<PathBuf> {
        self.written
            .iter()
            .map(|rel| self.layout.overlay_of_relative(rel))
            .collect()
    }

    /// Write a rewritten unit at the overlay counterpart of its original
    /// path. Returns the overlay path, or `None` when the destination was
    /// already written in this run.
    ///
    /// # Errors
    /// [`OverlayError`] on any filesystem failure.
    pub fn materialize(&mut self, unit: &RewrittenUnit) -> Result<Option<PathBuf>, OverlayError> {
        let relative = self.layout.relative(&unit.original_path)?;
        self.write_file(&relative, &render_unit(unit))
    }

    /// Write `contents` at the overlay path of the root-relative `relative`.
    ///
    /// # Errors
    /// [`OverlayError`] on any filesystem failure.
    pub fn write_file(
        &mut self,
        relative: &Path,
        contents: &str,
    ) -> Result<Option<PathBuf>, OverlayError> {
        let destination = self.layout.overlay_of_relative(relative);
        if self.written.contains(relative) {
            warn!(
                path = %destination.display(),
                "destination already written in this run, skipping"
            );
            return Ok(None);
        }
        if let Some(parent) = destination.parent() {
            ensure_real_dir(self.layout.overlay_root(), parent)?;
        }
        match fs::symlink_metadata(&destination) {
            Ok(meta) if meta.file_type().is_symlink() => {
                debug!(path = %destination.display(), "replacing overlay symlink");
                fs::remove_file(&destination)
                    .map_err(|e| OverlayError::io_error(&destination, e))?;
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(OverlayError::io_error(&destination, e)),
        }
        fs::write(&destination, contents).map_err(|e| OverlayError::io_error(&destination, e))?;
        info!(path = %destination.display(), bytes = contents.len(), "wrote overlay file");
        self.written.insert(relative.to_path_buf());
        Ok(Some(destination))
    }
}

/// Make `dir` (under `overlay_root`) a real directory, creating missing
/// components and replacing symlinked ones.
pub(crate) fn ensure_real_dir(overlay_root: &Path, dir: &Path) -> Result<(), OverlayError> {
    fs::create_dir_all(overlay_root).map_err(|e| OverlayError::io_error(overlay_root, e))?;
    let Ok(relative) = dir.strip_prefix(overlay_root) else {
        return fs::create_dir_all(dir).map_err(|e| OverlayError::io_error(dir, e));
    };
    let mut current = overlay_root.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                debug!(path = %current.display(), "replacing symlinked overlay directory");
                fs::remove_file(&current).map_err(|e| OverlayError::io_error(&current, e))?;
                fs::create_dir(&current).map_err(|e| OverlayError::io_error(&current, e))?;
            }
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(OverlayError::io_error(
                    &current,
                    std::io::Error::new(ErrorKind::AlreadyExists, "not a directory"),
                ));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir(&current).map_err(|e| OverlayError::io_error(&current, e))?;
            }
            Err(e) => return Err(OverlayError::io_error(&current, e)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_program::UnitId;
    use weave_rewrite::{ProxyPair, SyntheticNames};
    use weave_test_utils::GoWorkspace;

    fn rewritten(ws: &GoWorkspace, relative: &str) -> RewrittenUnit {
        RewrittenUnit {
            unit: UnitId(0),
            original_path: ws.root().join(relative),
            relative_path: PathBuf::from(relative),
            body: "package main\n\nfunc main() {}\n".to_string(),
            proxies: vec![ProxyPair {
                names: SyntheticNames {
                    proxy: "_ag_proxy_0".into(),
                    generator: "_ag_pgen_ag_proxy_0".into(),
                },
                proxy: "func _ag_proxy_0() {}".into(),
                generator: "func _ag_pgen_ag_proxy_0() func() {}".into(),
            }],
        }
    }

    #[test]
    fn render_layout() {
        let ws = GoWorkspace::new();
        let text = render_unit(&rewritten(&ws, "main.go"));
        assert_eq!(
            text,
            "// Code generated by aspectgo weave. DO NOT EDIT.\n\n\
             package main\n\nfunc main() {}\n\
             \nfunc _ag_proxy_0() {}\n\nfunc _ag_pgen_ag_proxy_0() func() {}\n"
        );
    }

    #[test]
    fn writes_under_overlay_and_skips_second_write() {
        let ws = GoWorkspace::new();
        let layout = OverlayLayout::new(ws.root(), ws.overlay());
        let mut materializer = Materializer::new(layout);

        let unit = rewritten(&ws, "cmd/main.go");
        let written = materializer.materialize(&unit).unwrap();
        assert_eq!(written, Some(ws.overlay().join("cmd/main.go")));
        assert!(ws.read_overlay("cmd/main.go").starts_with(GENERATED_HEADER));

        assert_eq!(materializer.materialize(&unit).unwrap(), None);
        assert_eq!(materializer.written().len(), 1);
        assert!(!ws.root().join("cmd/main.go").exists());
    }

    #[cfg(unix)]
    #[test]
    fn never_writes_through_a_symlinked_directory() {
        let ws = GoWorkspace::new();
        ws.write("pkg/main.go", "package pkg\n");
        fs::create_dir_all(ws.overlay()).unwrap();
        std::os::unix::fs::symlink(ws.root().join("pkg"), ws.overlay().join("pkg")).unwrap();

        let layout = OverlayLayout::new(ws.root(), ws.overlay());
        let mut materializer = Materializer::new(layout);
        materializer.materialize(&rewritten(&ws, "pkg/main.go")).unwrap();

        assert_eq!(ws.read("pkg/main.go"), "package pkg\n");
        let meta = fs::symlink_metadata(ws.overlay().join("pkg")).unwrap();
        assert!(meta.is_dir());
        assert!(ws.read_overlay("pkg/main.go").starts_with(GENERATED_HEADER));
    }

    #[cfg(unix)]
    #[test]
    fn replaces_symlinked_destination_file() {
        let ws = GoWorkspace::new();
        ws.write("main.go", "package main\n");
        fs::create_dir_all(ws.overlay()).unwrap();
        std::os::unix::fs::symlink(ws.root().join("main.go"), ws.overlay().join("main.go"))
            .unwrap();

        let mut materializer = Materializer::new(OverlayLayout::new(ws.root(), ws.overlay()));
        materializer.materialize(&rewritten(&ws, "main.go")).unwrap();

        assert_eq!(ws.read("main.go"), "package main\n");
        assert!(!fs::symlink_metadata(ws.overlay().join("main.go"))
            .unwrap()
            .file_type()
            .is_symlink());
    }
}
