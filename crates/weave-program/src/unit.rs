//! Compilation units
//!
//! A [`CompilationUnit`] is one Go source file of the target package: its
//! text, package clause, and import list. The syntax tree is not stored;
//! downstream stages work from byte spans recorded at load time.

use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser, Tree};

use crate::error::LoadError;
use crate::symbols::{SourceLocation, UnitId};

/// One `import` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSpec {
    /// Explicit name (`alias`, `.` or `_`) if written
    pub name: Option<String>,
    /// Import path without quotes
    pub path: String,
}

impl ImportSpec {
    /// Plain import of `path`
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            name: None,
            path: path.into(),
        }
    }

    /// Aliased import of `path`
    #[must_use]
    pub fn aliased(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            path: path.into(),
        }
    }

    /// `import . "path"`
    #[inline]
    #[must_use]
    pub fn is_dot(&self) -> bool {
        self.name.as_deref() == Some(".")
    }

    /// `import _ "path"`
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.name.as_deref() == Some("_")
    }

    /// Name the file uses to refer to the package.
    ///
    /// When no alias is written, `package_name` (if known) wins over a
    /// guess from the import path.
    #[must_use]
    pub fn local_name(&self, package_name: Option<&str>) -> String {
        match (&self.name, package_name) {
            (Some(name), _) => name.clone(),
            (None, Some(name)) => name.to_string(),
            (None, None) => guess_package_name(&self.path),
        }
    }
}

/// Best-effort package name for an import path whose sources are unavailable.
#[must_use]
pub fn guess_package_name(import_path: &str) -> String {
    let mut segments = import_path.rsplit('/');
    let mut last = segments.next().unwrap_or(import_path);
    if is_major_version(last) {
        if let Some(prev) = segments.next() {
            last = prev;
        }
    }
    let last = last.strip_prefix("go-").unwrap_or(last);
    let last = match last.rsplit_once(".v") {
        Some((head, tail)) if tail.chars().all(|c| c.is_ascii_digit()) => head,
        _ => last,
    };
    last.replace(['-', '.'], "_")
}

fn is_major_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}

/// One source file of the target program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    /// Position in the program's unit list
    pub id: UnitId,
    /// Absolute path
    pub path: PathBuf,
    /// Path relative to the source root
    pub relative_path: PathBuf,
    /// Name in the package clause
    pub package_name: String,
    /// Import path of the package
    pub package_path: String,
    /// Original text
    pub source: String,
    /// Imports in source order
    pub imports: Vec<ImportSpec>,
    /// Span of the `package x` clause
    pub package_clause: Range<usize>,
    /// File is an aspect-specification unit
    pub aspect: bool,
}

impl CompilationUnit {
    /// Parse `source` and build the unit, returning the syntax tree alongside.
    ///
    /// # Errors
    /// Returns [`LoadError::Syntax`] when the file does not parse or has no
    /// package clause.
    pub fn parse(
        id: UnitId,
        path: PathBuf,
        relative_path: PathBuf,
        package_path: impl Into<String>,
        source: String,
        aspect: bool,
    ) -> Result<(Self, Tree), LoadError> {
        let tree = parse_go(&source, &path)?;
        let root = tree.root_node();

        let package_clause = (0..root.named_child_count())
            .filter_map(|i| root.named_child(i))
            .find(|n| n.kind() == "package_clause")
            .map_or(0..0, |n| n.byte_range());
        let package_name = file_package_name(root, &source);
        let imports = file_imports(root, &source);

        let Some(package_name) = package_name else {
            return Err(LoadError::syntax(
                SourceLocation {
                    file: path,
                    line: 1,
                    column: 1,
                },
                "missing package clause",
            ));
        };

        let unit = Self {
            id,
            path,
            relative_path,
            package_name,
            package_path: package_path.into(),
            source,
            imports,
            package_clause,
            aspect,
        };
        Ok((unit, tree))
    }

    /// Text covered by `span`
    #[inline]
    #[must_use]
    pub fn text(&self, span: Range<usize>) -> &str {
        self.source.get(span).unwrap_or("")
    }

    /// Import of `path`, if the unit has a usable one
    #[must_use]
    pub fn import_of(&self, path: &str) -> Option<&ImportSpec> {
        self.imports
            .iter()
            .find(|spec| spec.path == path && !spec.is_blank())
    }

    /// Position of a byte offset
    #[must_use]
    pub fn location(&self, offset: usize) -> SourceLocation {
        let prefix = self.source.get(..offset).unwrap_or(&self.source);
        let line = prefix.matches('\n').count() + 1;
        let column = prefix.rfind('\n').map_or(prefix.len(), |nl| prefix.len() - nl - 1) + 1;
        SourceLocation {
            file: self.path.clone(),
            line,
            column,
        }
    }
}

/// Parse Go source with tree-sitter.
///
/// # Errors
/// Returns [`LoadError::Syntax`] pointing at the first error node.
pub fn parse_go(source: &str, path: &Path) -> Result<Tree, LoadError> {
    let language: tree_sitter::Language = tree_sitter_go::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| LoadError::ParserInit(e.to_string()))?;

    let tree = parser.parse(source, None).ok_or_else(|| {
        LoadError::syntax(
            SourceLocation {
                file: path.to_path_buf(),
                line: 1,
                column: 1,
            },
            "parser produced no tree",
        )
    })?;

    let root = tree.root_node();
    if root.has_error() {
        let bad = first_error(root).unwrap_or(root);
        let pos = bad.start_position();
        let message = if bad.is_missing() {
            format!("missing {}", bad.kind())
        } else {
            format!("unexpected '{}'", truncate(node_text(bad, source), 32))
        };
        return Err(LoadError::syntax(
            SourceLocation {
                file: path.to_path_buf(),
                line: pos.row + 1,
                column: pos.column + 1,
            },
            message,
        ));
    }
    Ok(tree)
}

/// Source text of a node
#[inline]
#[must_use]
pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    for i in 0..node.child_count() {
        if let Some(found) = node.child(i).and_then(first_error) {
            return Some(found);
        }
    }
    None
}

fn first_named_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    (0..node.named_child_count())
        .filter_map(|i| node.named_child(i))
        .find(|child| child.kind() == kind)
}

/// Name in a file's package clause
pub(crate) fn file_package_name(root: Node<'_>, source: &str) -> Option<String> {
    let clause = first_named_of_kind(root, "package_clause")?;
    first_named_of_kind(clause, "package_identifier").map(|n| node_text(n, source).to_string())
}

/// Imports of a file in source order
pub(crate) fn file_imports(root: Node<'_>, source: &str) -> Vec<ImportSpec> {
    let mut imports = Vec::new();
    for i in 0..root.named_child_count() {
        if let Some(child) = root.named_child(i).filter(|c| c.kind() == "import_declaration") {
            collect_imports(child, source, &mut imports);
        }
    }
    imports
}

fn collect_imports(node: Node<'_>, source: &str, out: &mut Vec<ImportSpec>) {
    for i in 0..node.named_child_count() {
        let Some(child) = node.named_child(i) else {
            continue;
        };
        match child.kind() {
            "import_spec" => {
                let Some(path) = child.child_by_field_name("path") else {
                    continue;
                };
                let path = node_text(path, source).trim_matches(|c| c == '"' || c == '`');
                let name = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source).to_string());
                out.push(ImportSpec {
                    name,
                    path: path.to_string(),
                });
            }
            "import_spec_list" => collect_imports(child, source, out),
            _ => {}
        }
    }
}
