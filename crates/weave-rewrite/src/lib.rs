//! Weave Rewrite
//!
//! Turns matched join points into rewritten Go source.
//!
//! # Core Concepts
//!
//! - [`WeaveSession`]: owns the synthetic-name counter and the proxy pairs
//!   generated for the unit being rewritten
//! - [`ProxyPair`]: a Proxy routing one call through its advice, plus the
//!   Generator that captures the receiver at the reference site
//! - [`rewrite_unit`]: replaces every matched reference of a unit by an
//!   immediately-invoked Generator call and injects the support imports
//!
//! The original source is never modified; rewriting builds new text from
//! edits keyed by reference span.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod codegen;
mod error;
mod options;
mod render;
mod rewriter;
mod session;

pub use codegen::{generate, Callee, ProxyPair};
pub use error::RewriteError;
pub use options::{CodegenOptions, DEFAULT_RUNTIME_ALIAS, DEFAULT_RUNTIME_IMPORT};
pub use render::TypeRenderer;
pub use rewriter::{rewrite_unit, RewrittenUnit};
pub use session::{NamingScheme, SyntheticNames, WeaveSession};
