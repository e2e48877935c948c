//! Lazy loading of in-tree packages

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::index::{PackageIndex, TypeContext};
use crate::error::LoadError;
use crate::program::PackageLayout;
use crate::unit::{file_imports, file_package_name, parse_go, ImportSpec};

/// Loads and caches [`PackageIndex`]es for packages inside the source tree.
///
/// Packages outside the tree (standard library, external modules) resolve to
/// `None` and their members stay unresolved.
#[derive(Debug)]
pub(crate) struct Loader {
    layout: PackageLayout,
    indexes: HashMap<String, Option<Rc<PackageIndex>>>,
}

impl Loader {
    pub(crate) fn new(layout: PackageLayout) -> Self {
        Self {
            layout,
            indexes: HashMap::new(),
        }
    }

    pub(crate) fn layout(&self) -> &PackageLayout {
        &self.layout
    }

    /// Index of an in-tree package, loading it on first request.
    ///
    /// # Errors
    /// Propagates I/O and syntax errors of the package's files.
    pub(crate) fn package(&mut self, import_path: &str) -> Result<Option<Rc<PackageIndex>>, LoadError> {
        if let Some(cached) = self.indexes.get(import_path) {
            return Ok(cached.clone());
        }
        // Placeholder guards against import cycles in malformed trees
        self.indexes.insert(import_path.to_string(), None);

        let Some(dir) = self.layout.dir_of(import_path) else {
            trace!(package = import_path, "package outside source tree");
            return Ok(None);
        };
        let files = go_files(&dir)?;
        if files.is_empty() {
            return Ok(None);
        }
        let index = Rc::new(self.build_index(import_path, &files)?);
        debug!(
            package = import_path,
            funcs = index.funcs.len(),
            types = index.types.len(),
            "indexed package"
        );
        self.indexes.insert(import_path.to_string(), Some(index.clone()));
        Ok(Some(index))
    }

    /// Store an index built elsewhere (the target package)
    pub(crate) fn insert(&mut self, index: Rc<PackageIndex>) {
        self.indexes.insert(index.path.clone(), Some(index));
    }

    /// Local-name → import-path bindings of a file's imports.
    ///
    /// Dot and blank imports bind no name; dot imports are returned
    /// separately.
    ///
    /// # Errors
    /// Propagates load errors of imported in-tree packages.
    pub(crate) fn bindings(
        &mut self,
        imports: &[ImportSpec],
    ) -> Result<(HashMap<String, String>, Vec<String>), LoadError> {
        let mut aliases = HashMap::new();
        let mut dot_imports = Vec::new();
        for spec in imports {
            if spec.is_blank() {
                continue;
            }
            if spec.is_dot() {
                dot_imports.push(spec.path.clone());
                continue;
            }
            let name = match &spec.name {
                Some(_) => None,
                None => self.package(&spec.path)?.map(|index| index.name.clone()),
            };
            aliases.insert(spec.local_name(name.as_deref()), spec.path.clone());
        }
        Ok((aliases, dot_imports))
    }

    /// Package names of every in-tree package loaded so far
    pub(crate) fn package_names(&self) -> IndexMap<String, String> {
        let mut names: IndexMap<String, String> = self
            .indexes
            .iter()
            .filter_map(|(path, index)| index.as_ref().map(|i| (path.clone(), i.name.clone())))
            .collect();
        names.sort_keys();
        names
    }

    fn build_index(&mut self, import_path: &str, files: &[PathBuf]) -> Result<PackageIndex, LoadError> {
        let mut parsed = Vec::with_capacity(files.len());
        for path in files {
            let source =
                fs::read_to_string(path).map_err(|e| LoadError::io_error(path, e))?;
            let tree = parse_go(&source, path)?;
            parsed.push((path.clone(), source, tree));
        }

        let mut package_name = None;
        let mut contexts = Vec::with_capacity(parsed.len());
        for (path, source, tree) in &parsed {
            let root = tree.root_node();
            let imports = file_imports(root, source);
            if package_name.is_none() {
                package_name = file_package_name(root, source);
            }
            let (aliases, _) = self.bindings(&imports)?;
            trace!(path = %path.display(), imports = imports.len(), "scanned file");
            contexts.push(TypeContext::new(import_path, aliases));
        }

        let mut index = PackageIndex::new(import_path, package_name.unwrap_or_default());
        for ((_, source, tree), ctx) in parsed.iter().zip(&contexts) {
            index.add_declarations(tree.root_node(), source, ctx);
        }
        for ((_, source, tree), ctx) in parsed.iter().zip(&contexts) {
            index.add_values(tree.root_node(), source, ctx);
        }
        Ok(index)
    }
}

/// Loadable `.go` files of a directory (tests excluded), sorted by path.
///
/// # Errors
/// Returns [`LoadError::Io`] when the directory cannot be read.
pub(crate) fn go_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = fs::read_dir(dir).map_err(|e| LoadError::io_error(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LoadError::io_error(dir, e))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".go") || name.ends_with("_test.go") || name.starts_with('.') {
            continue;
        }
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
