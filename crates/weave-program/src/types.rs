//! Resolved declaration shapes
//!
//! Types are carried as canonical strings in which every named type is
//! qualified by its full package path (`*example.com/app/worker.W`,
//! `map[string]example.com/app.T`). Rendering them relative to a particular
//! compilation unit is the rewriter's job.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Types every Go package can name without a qualifier
pub const PREDECLARED_TYPES: &[&str] = &[
    "any",
    "bool",
    "byte",
    "comparable",
    "complex64",
    "complex128",
    "error",
    "float32",
    "float64",
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "rune",
    "string",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
];

/// Canonical, fully qualified Go type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoType(String);

impl GoType {
    /// Wrap a canonical type string
    #[inline]
    #[must_use]
    pub fn new(canonical: impl Into<String>) -> Self {
        Self(canonical.into())
    }

    /// Named type `name` declared in package `package_path`
    #[must_use]
    pub fn named(package_path: &str, name: &str) -> Self {
        Self(format!("{package_path}.{name}"))
    }

    /// Canonical text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for `*T`
    #[inline]
    #[must_use]
    pub fn is_pointer(&self) -> bool {
        self.0.starts_with('*')
    }

    /// `T` for `*T`, `None` otherwise
    #[must_use]
    pub fn pointee(&self) -> Option<GoType> {
        self.0.strip_prefix('*').map(GoType::new)
    }

    /// `*T` for `T`
    #[must_use]
    pub fn pointer_to(&self) -> GoType {
        GoType(format!("*{}", self.0))
    }

    /// Element type of a slice `[]T`
    #[must_use]
    pub fn slice_elem(&self) -> Option<GoType> {
        self.0.strip_prefix("[]").map(GoType::new)
    }

    /// `[]T` for `T`
    #[must_use]
    pub fn slice_of(&self) -> GoType {
        GoType(format!("[]{}", self.0))
    }

    /// Split a (possibly pointer-to) named type into `(package_path, name)`.
    ///
    /// Returns `None` for predeclared types and composite types such as
    /// slices, maps, channels or function types.
    #[must_use]
    pub fn named_parts(&self) -> Option<(&str, &str)> {
        let base = self.0.strip_prefix('*').unwrap_or(&self.0);
        if base.contains(|c: char| "[]{}()* ".contains(c)) {
            return None;
        }
        let (path, name) = base.rsplit_once('.')?;
        if path.is_empty() || name.is_empty() {
            return None;
        }
        Some((path, name))
    }
}

impl Display for GoType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GoType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One parameter or result slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Declared name, if any (`_` is kept as written)
    pub name: Option<String>,
    /// Static type; for the variadic slot this is the element type
    pub ty: GoType,
}

impl Param {
    /// Create a parameter slot
    #[must_use]
    pub fn new(name: Option<String>, ty: GoType) -> Self {
        Self { name, ty }
    }

    /// Unnamed slot of the given type
    #[must_use]
    pub fn unnamed(ty: impl Into<GoType>) -> Self {
        Self { name: None, ty: ty.into() }
    }
}

/// Identifier of a declaration inside a [`crate::SymbolTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub usize);

/// A resolved function or method declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// Import path of the declaring package
    pub package_path: String,
    /// Function or method name
    pub name: String,
    /// Static receiver type for methods
    pub receiver: Option<GoType>,
    /// Ordered parameters
    pub params: Vec<Param>,
    /// Ordered results
    pub results: Vec<Param>,
    /// Last parameter is `...T`
    pub variadic: bool,
}

impl Declaration {
    /// Free function
    #[must_use]
    pub fn function(package_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package_path: package_path.into(),
            name: name.into(),
            receiver: None,
            params: Vec::new(),
            results: Vec::new(),
            variadic: false,
        }
    }

    /// Method on `receiver`
    #[must_use]
    pub fn method(
        package_path: impl Into<String>,
        receiver: impl Into<GoType>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            receiver: Some(receiver.into()),
            ..Self::function(package_path, name)
        }
    }

    /// Builder: set parameters
    #[must_use]
    pub fn with_params(mut self, params: Vec<Param>) -> Self {
        self.params = params;
        self
    }

    /// Builder: set results
    #[must_use]
    pub fn with_results(mut self, results: Vec<Param>) -> Self {
        self.results = results;
        self
    }

    /// Builder: mark last parameter variadic
    #[must_use]
    pub fn with_variadic(mut self, variadic: bool) -> Self {
        self.variadic = variadic;
        self
    }

    /// Has a receiver
    #[inline]
    #[must_use]
    pub fn is_method(&self) -> bool {
        self.receiver.is_some()
    }

    /// Fully qualified signature name matched by pointcuts.
    ///
    /// `example.com/app.sayHello` for functions and
    /// `(*example.com/app/worker.W).Do` for methods.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.receiver {
            Some(recv) => format!("({recv}).{}", self.name),
            None => format!("{}.{}", self.package_path, self.name),
        }
    }
}
