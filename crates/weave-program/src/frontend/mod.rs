//! Program front ends
//!
//! A [`FrontEnd`] turns a source root plus a target package into a
//! [`TargetProgram`]. [`GoFrontEnd`] is the tree-sitter based implementation.

mod index;
mod loader;
mod resolve;

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};

use crate::error::LoadError;
use crate::program::{PackageLayout, TargetProgram};
use crate::symbols::{SymbolTable, UnitId};
use crate::unit::CompilationUnit;

use index::{PackageIndex, TypeContext};
use loader::{go_files, Loader};
use resolve::Resolver;

/// Default suffix of aspect-specification units
pub const DEFAULT_ASPECT_SUFFIX: &str = "_aspect.go";

/// Source of compilation units and resolved references
pub trait FrontEnd {
    /// Load the package `target` found under `source_root`
    ///
    /// # Errors
    /// Returns [`LoadError`] when the target cannot be located, read,
    /// parsed, or resolved.
    fn load(&self, source_root: &Path, target: &str) -> Result<TargetProgram, LoadError>;
}

/// Tree-sitter Go front end
#[derive(Debug, Clone)]
pub struct GoFrontEnd {
    aspect_suffix: String,
}

impl Default for GoFrontEnd {
    fn default() -> Self {
        Self {
            aspect_suffix: DEFAULT_ASPECT_SUFFIX.to_string(),
        }
    }
}

impl GoFrontEnd {
    /// Front end with the default aspect suffix
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: file-name suffix marking aspect units
    #[must_use]
    pub fn with_aspect_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.aspect_suffix = suffix.into();
        self
    }

    /// Configured aspect suffix
    #[inline]
    #[must_use]
    pub fn aspect_suffix(&self) -> &str {
        &self.aspect_suffix
    }

    fn parse_units(
        &self,
        layout: &PackageLayout,
        package_path: &str,
        dir: &Path,
    ) -> Result<Vec<(CompilationUnit, tree_sitter::Tree)>, LoadError> {
        let files = go_files(dir)?;
        if files.is_empty() {
            return Err(LoadError::EmptyPackage(dir.to_path_buf()));
        }
        let mut units: Vec<(CompilationUnit, tree_sitter::Tree)> = Vec::with_capacity(files.len());
        for (i, path) in files.into_iter().enumerate() {
            let source = fs::read_to_string(&path).map_err(|e| LoadError::io_error(&path, e))?;
            let relative = path
                .strip_prefix(layout.root())
                .map_or_else(|_| path.clone(), Path::to_path_buf);
            let aspect = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(&self.aspect_suffix));
            let (unit, tree) =
                CompilationUnit::parse(UnitId(i), path, relative, package_path, source, aspect)?;
            if let Some((first, _)) = units.first() {
                if first.package_name != unit.package_name {
                    return Err(LoadError::MixedPackages {
                        dir: dir.to_path_buf(),
                        first: first.package_name.clone(),
                        second: unit.package_name,
                    });
                }
            }
            debug!(path = %unit.relative_path.display(), aspect, "parsed unit");
            units.push((unit, tree));
        }
        Ok(units)
    }
}

impl FrontEnd for GoFrontEnd {
    fn load(&self, source_root: &Path, target: &str) -> Result<TargetProgram, LoadError> {
        let root = fs::canonicalize(source_root).map_err(|e| LoadError::io_error(source_root, e))?;
        let layout = PackageLayout::new(root, read_module_path(source_root)?);
        let (dir, package_path) = resolve_target(&layout, target)?;
        info!(target, package = %package_path, dir = %dir.display(), "loading target package");

        let parsed = self.parse_units(&layout, &package_path, &dir)?;
        let mut loader = Loader::new(layout.clone());

        let package_name = parsed
            .first()
            .map(|(unit, _)| unit.package_name.clone())
            .unwrap_or_default();
        let mut index = PackageIndex::new(package_path.as_str(), package_name);
        let mut contexts = Vec::with_capacity(parsed.len());
        for (unit, _) in &parsed {
            let (aliases, dots) = loader.bindings(&unit.imports)?;
            contexts.push((TypeContext::new(package_path.as_str(), aliases), dots));
        }
        for ((unit, tree), (ctx, _)) in parsed.iter().zip(&contexts) {
            index.add_declarations(tree.root_node(), &unit.source, ctx);
        }
        for ((unit, tree), (ctx, _)) in parsed.iter().zip(&contexts) {
            index.add_values(tree.root_node(), &unit.source, ctx);
        }
        let index = Rc::new(index);
        loader.insert(Rc::clone(&index));

        let mut symbols = SymbolTable::new();
        for ((unit, tree), (ctx, dots)) in parsed.iter().zip(contexts) {
            let mut resolver = Resolver::new(
                &mut loader,
                Rc::clone(&index),
                unit,
                ctx,
                dots,
                &mut symbols,
            );
            resolver.resolve(tree.root_node())?;
        }

        let units: Vec<CompilationUnit> = parsed.into_iter().map(|(unit, _)| unit).collect();
        info!(
            package = %package_path,
            units = units.len(),
            uses = symbols.use_count(),
            "target loaded"
        );
        Ok(TargetProgram {
            package_names: loader.package_names(),
            layout,
            package_path,
            units,
            symbols,
        })
    }
}

/// Module path declared by `go.mod` at the source root, if any
///
/// # Errors
/// Returns [`LoadError::Io`] if `go.mod` exists but cannot be read.
pub fn read_module_path(source_root: &Path) -> Result<Option<String>, LoadError> {
    let go_mod = source_root.join("go.mod");
    if !go_mod.is_file() {
        return Ok(None);
    }
    let contents = fs::read_to_string(&go_mod).map_err(|e| LoadError::io_error(&go_mod, e))?;
    Ok(contents.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.split("//").next().unwrap_or(rest).trim().trim_matches('"');
        (!path.is_empty()).then(|| path.to_string())
    }))
}

/// Directory and import path of the target, given either as an import path
/// or as a directory relative to the source root.
fn resolve_target(layout: &PackageLayout, target: &str) -> Result<(PathBuf, String), LoadError> {
    let target = target.trim_end_matches('/');
    if let Some(dir) = layout.dir_of(target) {
        return Ok((dir, target.to_string()));
    }
    let relative = Path::new(target);
    let dir: PathBuf = layout.root().join(relative).components().collect();
    if relative.is_relative() && dir.is_dir() {
        return Ok((dir, layout.import_path_of(relative)));
    }
    Err(LoadError::TargetNotFound {
        target: target.to_string(),
        root: layout.root().to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{Binding, RefShape};
    use pretty_assertions::assert_eq;
    use weave_test_utils::GoWorkspace;

    fn resolved_names(program: &TargetProgram) -> Vec<String> {
        program
            .symbols
            .uses()
            .iter()
            .filter_map(|u| match u.binding {
                Binding::Function(id) => program.symbols.declaration(id).map(|d| d.full_name()),
                Binding::Other => None,
            })
            .collect()
    }

    #[test]
    fn loads_sample_app() {
        let ws = GoWorkspace::sample_app();
        let program = GoFrontEnd::new().load(ws.root(), "example.com/app").unwrap();

        assert_eq!(program.package_path, "example.com/app");
        assert_eq!(program.layout.module_path(), Some("example.com/app"));
        let names: Vec<String> = program
            .units
            .iter()
            .map(|u| u.relative_path.display().to_string())
            .collect();
        assert_eq!(names, vec!["main.go", "main_aspect.go"]);
        assert!(program.units[1].aspect);
        assert!(!program.units[0].aspect);
        assert_eq!(program.package_name("example.com/app/worker"), Some("worker"));
    }

    #[test]
    fn resolves_functions_methods_and_qualified_refs() {
        let ws = GoWorkspace::sample_app();
        let program = GoFrontEnd::new().load(ws.root(), "example.com/app").unwrap();
        let names = resolved_names(&program);

        for expected in [
            "example.com/app.sayHello",
            "example.com/app.divide",
            "example.com/app.sum",
            "(*example.com/app/worker.W).Do",
            "example.com/app/worker.New",
        ] {
            assert!(names.contains(&expected.to_string()), "missing {expected} in {names:?}");
        }
        // fmt lives outside the tree
        assert!(!names.iter().any(|n| n.starts_with("fmt.")));
    }

    #[test]
    fn receiver_reference_records_operand() {
        let ws = GoWorkspace::sample_app();
        let program = GoFrontEnd::new().load(ws.root(), ".").unwrap();
        let main = &program.units[0];

        let selector = program
            .symbols
            .uses()
            .iter()
            .find(|u| main.text(u.site.span.clone()) == "o.Do")
            .expect("o.Do resolved");
        match &selector.site.shape {
            RefShape::Selector {
                operand,
                name,
                operand_type,
            } => {
                assert_eq!(main.text(operand.clone()), "o");
                assert_eq!(name, "Do");
                assert_eq!(operand_type.as_str(), "*example.com/app/worker.W");
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn nested_receiver_expression_is_resolved_inner_first() {
        let ws = GoWorkspace::sample_app();
        let program = GoFrontEnd::new().load(ws.root(), "example.com/app").unwrap();
        let main = &program.units[0];
        let texts: Vec<&str> = program
            .symbols
            .uses()
            .iter()
            .map(|u| main.text(u.site.span.clone()))
            .collect();

        let inner = texts.iter().position(|t| *t == "worker.New").unwrap();
        let outer = texts.iter().position(|t| *t == "worker.New(3).Do").unwrap();
        assert!(inner < outer);
    }

    #[test]
    fn locals_shadow_package_functions() {
        let ws = GoWorkspace::module("example.com/shadow");
        ws.write(
            "main.go",
            r#"package main

func helper() int { return 1 }

func main() {
	helper := func() int { return 2 }
	_ = helper()
}

func other(helper int) int { return helper }
"#,
        );
        let program = GoFrontEnd::new().load(ws.root(), "example.com/shadow").unwrap();
        assert!(resolved_names(&program).is_empty());
    }

    #[test]
    fn method_expression_is_unsupported_shape() {
        let ws = GoWorkspace::module("example.com/mexpr");
        ws.write(
            "main.go",
            r#"package main

type T struct{}

func (T) Get() int { return 1 }

func main() {
	g := T.Get
	_ = g(T{})
}
"#,
        );
        let program = GoFrontEnd::new().load(ws.root(), "example.com/mexpr").unwrap();
        let uses = program.symbols.uses();
        assert_eq!(uses.len(), 1);
        assert!(matches!(uses[0].site.shape, RefShape::Unsupported { .. }));
    }

    #[test]
    fn multi_result_calls_type_their_variables() {
        let ws = GoWorkspace::module("example.com/multi");
        ws.write(
            "main.go",
            r#"package main

type Conn struct{}

func (c *Conn) Close() error { return nil }

func dial(addr string) (*Conn, error) { return &Conn{}, nil }

func main() {
	c, err := dial("x")
	if err != nil {
		return
	}
	defer c.Close()
}
"#,
        );
        let program = GoFrontEnd::new().load(ws.root(), "example.com/multi").unwrap();
        let names = resolved_names(&program);
        assert!(names.contains(&"(*example.com/multi.Conn).Close".to_string()));
        assert!(names.contains(&"example.com/multi.dial".to_string()));
    }

    #[test]
    fn gopath_layout_without_go_mod() {
        let ws = GoWorkspace::new();
        ws.write("app/main.go", "package main\n\nimport \"lib\"\n\nfunc main() { lib.Run() }\n");
        ws.write("lib/lib.go", "package lib\n\nfunc Run() {}\n");
        let program = GoFrontEnd::new().load(ws.root(), "app").unwrap();

        assert_eq!(program.package_path, "app");
        assert_eq!(resolved_names(&program), vec!["lib.Run".to_string()]);
    }

    #[test]
    fn load_errors() {
        let ws = GoWorkspace::module("example.com/errs");
        ws.write("empty/README.md", "nothing here");
        ws.write("broken/main.go", "package main\n\nfunc main() {\n");

        let front = GoFrontEnd::new();
        assert!(matches!(
            front.load(ws.root(), "example.com/errs/missing"),
            Err(LoadError::TargetNotFound { .. })
        ));
        assert!(matches!(
            front.load(ws.root(), "example.com/errs/empty"),
            Err(LoadError::EmptyPackage(_))
        ));
        assert!(matches!(
            front.load(ws.root(), "example.com/errs/broken"),
            Err(LoadError::Syntax { .. })
        ));
    }

    #[test]
    fn module_path_parsing() {
        let ws = GoWorkspace::new();
        assert_eq!(read_module_path(ws.root()).unwrap(), None);
        ws.write("go.mod", "// comment\nmodule \"example.com/quoted\" // trailing\n");
        assert_eq!(
            read_module_path(ws.root()).unwrap(),
            Some("example.com/quoted".to_string())
        );
    }
}
