//! Rendering canonical types inside one compilation unit
//!
//! Canonical types qualify every named type by its full import path. Inside
//! a unit those become: a bare name for the unit's own package and for
//! dot-imports, the local import name for imported packages, and a fresh
//! `_ag_`-prefixed alias for packages the unit does not import yet.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use weave_program::{guess_package_name, CompilationUnit, GoType};

/// A package path followed by `.Name`; the path ends at the last dot.
static QUALIFIED_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9_][\w./~-]*\.[A-Za-z_]\w*").expect("qualified type pattern must compile")
});

/// Type renderer bound to one unit; collects the imports it had to add
#[derive(Debug)]
pub struct TypeRenderer<'a> {
    unit: &'a CompilationUnit,
    package_names: &'a IndexMap<String, String>,
    extra: IndexMap<String, String>,
}

impl<'a> TypeRenderer<'a> {
    /// Renderer for `unit`, using known in-tree package names
    #[must_use]
    pub fn new(unit: &'a CompilationUnit, package_names: &'a IndexMap<String, String>) -> Self {
        Self {
            unit,
            package_names,
            extra: IndexMap::new(),
        }
    }

    /// Go text of `ty` as written inside the unit
    pub fn render(&mut self, ty: &GoType) -> String {
        let text = ty.as_str();
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for m in QUALIFIED_TYPE.find_iter(text) {
            out.push_str(&text[cursor..m.start()]);
            let token = m.as_str();
            match token.rsplit_once('.') {
                Some((path, name)) => {
                    if let Some(qualifier) = self.qualifier(path) {
                        out.push_str(&qualifier);
                        out.push('.');
                    }
                    out.push_str(name);
                }
                None => out.push_str(token),
            }
            cursor = m.end();
        }
        out.push_str(&text[cursor..]);
        out
    }

    /// Imports added while rendering, as `(alias, path)`
    pub fn extra_imports(&self) -> impl Iterator<Item = (&str, &str)> {
        self.extra
            .iter()
            .map(|(path, alias)| (alias.as_str(), path.as_str()))
    }

    fn qualifier(&mut self, path: &str) -> Option<String> {
        if path == self.unit.package_path {
            return None;
        }
        if let Some(import) = self.unit.import_of(path) {
            if import.is_dot() {
                return None;
            }
            return Some(import.local_name(self.package_names.get(path).map(String::as_str)));
        }
        // A qualifier the front end could not map to a path is kept as written.
        if self.is_local_import_name(path) {
            return Some(path.to_string());
        }
        if let Some(alias) = self.extra.get(path) {
            return Some(alias.clone());
        }
        let alias = self.fresh_alias(path);
        self.extra.insert(path.to_string(), alias.clone());
        Some(alias)
    }

    fn is_local_import_name(&self, name: &str) -> bool {
        self.unit.imports.iter().any(|import| {
            !import.is_blank()
                && import.local_name(self.package_names.get(&import.path).map(String::as_str))
                    == name
        })
    }

    fn fresh_alias(&self, path: &str) -> String {
        let base = format!("_ag_{}", guess_package_name(path));
        let taken = |candidate: &str| {
            self.is_local_import_name(candidate) || self.extra.values().any(|a| a == candidate)
        };
        if !taken(&base) {
            return base;
        }
        (1..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or(base)
    }
}
