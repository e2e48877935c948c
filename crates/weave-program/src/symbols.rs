//! Reference sites and the symbol table
//!
//! Every identifier-use the front end resolves is recorded as a [`Use`]:
//! a [`ReferenceSite`] (unit + byte span + syntactic shape) and the
//! [`Binding`] it resolved to. Reference sites are keyed by original node
//! identity, never by text, so two textually identical uses stay distinct.

use std::fmt::{self, Display, Formatter};
use std::ops::Range;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{DeclId, Declaration, GoType};

/// Index of a compilation unit inside a [`crate::TargetProgram`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub usize);

/// Human readable position (1-based line and column)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// File path
    pub file: PathBuf,
    /// Line, 1-based
    pub line: usize,
    /// Byte column, 1-based
    pub column: usize,
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Syntactic shape of a reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefShape {
    /// Bare identifier naming a function of the unit's own package
    Ident {
        /// Identifier text
        name: String,
    },
    /// `pkg.F` through an import of the unit
    Qualified {
        /// Local import name used at the site
        qualifier: String,
        /// Function name
        name: String,
    },
    /// `x.M` where `x` is a receiver expression
    Selector {
        /// Byte span of the receiver expression
        operand: Range<usize>,
        /// Method name
        name: String,
        /// Static type of the receiver expression
        operand_type: GoType,
    },
    /// Any other shape (method expressions, etc.)
    Unsupported {
        /// Short description of the syntax found
        kind: String,
    },
}

/// A single reference occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSite {
    /// Unit the reference lives in
    pub unit: UnitId,
    /// Byte span of the whole reference expression
    pub span: Range<usize>,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
    /// Syntactic shape
    pub shape: RefShape,
}

/// Identity of a reference site: unit plus byte span
pub type SiteKey = (UnitId, usize, usize);

impl ReferenceSite {
    /// Node identity of this site
    #[inline]
    #[must_use]
    pub fn key(&self) -> SiteKey {
        (self.unit, self.span.start, self.span.end)
    }
}

/// What a reference resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Binding {
    /// A function or method declaration
    Function(DeclId),
    /// A package-level variable, constant or other non-function object
    Other,
}

/// A resolved identifier-use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Use {
    /// Where the reference appears
    pub site: ReferenceSite,
    /// What it resolved to
    pub binding: Binding,
}

/// Declarations and resolved uses of a loaded program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    declarations: Vec<Declaration>,
    by_name: IndexMap<String, DeclId>,
    uses: Vec<Use>,
}

impl SymbolTable {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration, returning the existing id when the same
    /// fully qualified name was already registered.
    pub fn add_declaration(&mut self, decl: Declaration) -> DeclId {
        let full_name = decl.full_name();
        if let Some(id) = self.by_name.get(&full_name) {
            return *id;
        }
        let id = DeclId(self.declarations.len());
        self.declarations.push(decl);
        self.by_name.insert(full_name, id);
        id
    }

    /// Look up a declaration
    #[inline]
    #[must_use]
    pub fn declaration(&self, id: DeclId) -> Option<&Declaration> {
        self.declarations.get(id.0)
    }

    /// Look up a declaration by fully qualified name
    #[must_use]
    pub fn find(&self, full_name: &str) -> Option<DeclId> {
        self.by_name.get(full_name).copied()
    }

    /// All declarations with their ids
    pub fn declarations(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.declarations.iter().enumerate().map(|(i, d)| (DeclId(i), d))
    }

    /// Record a resolved use
    pub fn record_use(&mut self, site: ReferenceSite, binding: Binding) {
        self.uses.push(Use { site, binding });
    }

    /// Resolved uses, in unit order then source order
    #[inline]
    #[must_use]
    pub fn uses(&self) -> &[Use] {
        &self.uses
    }

    /// Number of recorded uses
    #[inline]
    #[must_use]
    pub fn use_count(&self) -> usize {
        self.uses.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_declaration_dedupes_by_full_name() {
        let mut table = SymbolTable::new();
        let a = table.add_declaration(Declaration::function("app", "run"));
        let b = table.add_declaration(Declaration::function("app", "run"));
        let c = table.add_declaration(Declaration::function("app", "stop"));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.find("app.stop"), Some(c));
        assert_eq!(table.declarations().count(), 2);
    }

    #[test]
    fn location_display() {
        let loc = SourceLocation {
            file: PathBuf::from("app/main.go"),
            line: 3,
            column: 7,
        };
        assert_eq!(loc.to_string(), "app/main.go:3:7");
    }
}
