//! Weave Program Model
//!
//! The immutable input of the weaver: compilation units of a Go target
//! package and a symbol table resolving each identifier-use to its
//! declaration.
//!
//! # Core Concepts
//!
//! - [`TargetProgram`]: units + [`SymbolTable`] + import-path layout
//! - [`Declaration`]: resolved function/method shape with its fully
//!   qualified name ([`Declaration::full_name`])
//! - [`ReferenceSite`]: one reference, identified by unit and byte span
//! - [`FrontEnd`]: seam between the weaver and the source language front
//!   end; [`GoFrontEnd`] implements it with tree-sitter
//! - [`ContentHash`]: Blake3 hash used for content-addressed naming
//!
//! # Example
//!
//! ```rust,ignore
//! use weave_program::{FrontEnd, GoFrontEnd};
//!
//! let program = GoFrontEnd::new().load(root, "example.com/app")?;
//! for u in program.symbols.uses() {
//!     println!("{:?}", u.site.shape);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod frontend;
mod hash;
mod program;
mod symbols;
mod types;
mod unit;

pub use error::LoadError;
pub use frontend::{read_module_path, FrontEnd, GoFrontEnd, DEFAULT_ASPECT_SUFFIX};
pub use hash::{ContentHash, HashError};
pub use program::{PackageLayout, TargetProgram};
pub use symbols::{
    Binding, RefShape, ReferenceSite, SiteKey, SourceLocation, SymbolTable, UnitId, Use,
};
pub use types::{DeclId, Declaration, GoType, Param, PREDECLARED_TYPES};
pub use unit::{guess_package_name, parse_go, CompilationUnit, ImportSpec};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
