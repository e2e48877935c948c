//! Loaded target program

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::symbols::{SymbolTable, UnitId};
use crate::unit::CompilationUnit;

/// How import paths map to directories under the source root.
///
/// With a module path (from `go.mod`) the source root is the module root;
/// without one the source root behaves like `$GOPATH/src`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    root: PathBuf,
    module_path: Option<String>,
}

impl PackageLayout {
    /// Layout rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, module_path: Option<String>) -> Self {
        Self {
            root: root.into(),
            module_path,
        }
    }

    /// Source root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Module path, if the tree is a module
    #[inline]
    #[must_use]
    pub fn module_path(&self) -> Option<&str> {
        self.module_path.as_deref()
    }

    /// Directory of `import_path`, relative to the root.
    ///
    /// `None` when the import path lies outside the module.
    #[must_use]
    pub fn relative_dir(&self, import_path: &str) -> Option<PathBuf> {
        match &self.module_path {
            Some(module) if import_path == module => Some(PathBuf::new()),
            Some(module) => import_path
                .strip_prefix(module.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .map(PathBuf::from),
            None => Some(PathBuf::from(import_path)),
        }
    }

    /// Absolute directory of `import_path` if it lies inside the tree
    #[must_use]
    pub fn dir_of(&self, import_path: &str) -> Option<PathBuf> {
        let dir = self.root.join(self.relative_dir(import_path)?);
        dir.is_dir().then_some(dir)
    }

    /// Import path of a directory relative to the root
    #[must_use]
    pub fn import_path_of(&self, relative_dir: &Path) -> String {
        let rel = relative_dir
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .filter(|c| c != ".")
            .collect::<Vec<_>>()
            .join("/");
        match (&self.module_path, rel.is_empty()) {
            (Some(module), true) => module.clone(),
            (Some(module), false) => format!("{module}/{rel}"),
            (None, true) => ".".to_string(),
            (None, false) => rel,
        }
    }

    /// Import path of a top-level package named `name` (e.g. the advice
    /// package): `module/name` in module mode, `name` otherwise.
    #[must_use]
    pub fn import_path_for(&self, name: &str) -> String {
        match &self.module_path {
            Some(module) => format!("{module}/{name}"),
            None => name.to_string(),
        }
    }
}

/// Immutable input to the weaver: units of the target package plus the
/// symbol table resolving their references.
#[derive(Debug, Clone)]
pub struct TargetProgram {
    /// Import-path layout of the source tree
    pub layout: PackageLayout,
    /// Import path of the target package
    pub package_path: String,
    /// Units in path order
    pub units: Vec<CompilationUnit>,
    /// Declarations and resolved uses
    pub symbols: SymbolTable,
    /// Package names of every in-tree package the loader indexed
    pub package_names: IndexMap<String, String>,
}

impl TargetProgram {
    /// Unit by id
    #[inline]
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&CompilationUnit> {
        self.units.get(id.0)
    }

    /// Source root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Known package name for an import path
    #[must_use]
    pub fn package_name(&self, import_path: &str) -> Option<&str> {
        self.package_names.get(import_path).map(String::as_str)
    }

    /// Units that are not aspect-specification units
    pub fn woven_units(&self) -> impl Iterator<Item = &CompilationUnit> {
        self.units.iter().filter(|u| !u.aspect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_layout_maps_import_paths() {
        let layout = PackageLayout::new("/src", Some("example.com/app".into()));
        assert_eq!(layout.relative_dir("example.com/app"), Some(PathBuf::new()));
        assert_eq!(
            layout.relative_dir("example.com/app/worker"),
            Some(PathBuf::from("worker"))
        );
        assert_eq!(layout.relative_dir("example.com/application"), None);
        assert_eq!(layout.relative_dir("fmt"), None);
        assert_eq!(layout.import_path_of(Path::new("worker")), "example.com/app/worker");
        assert_eq!(layout.import_path_of(Path::new("")), "example.com/app");
        assert_eq!(layout.import_path_for("agaspect"), "example.com/app/agaspect");
    }

    #[test]
    fn gopath_layout_uses_directories() {
        let layout = PackageLayout::new("/go/src", None);
        assert_eq!(layout.relative_dir("app/worker"), Some(PathBuf::from("app/worker")));
        assert_eq!(layout.import_path_of(Path::new("app/worker")), "app/worker");
        assert_eq!(layout.import_path_for("agaspect"), "agaspect");
    }
}
