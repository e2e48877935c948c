//! Weave Pointcuts
//!
//! Aspect specification decoding and pointcut matching.
//!
//! # Core Concepts
//!
//! - [`AspectSpec`]: ordered (advice, pointcut) bindings decoded from YAML,
//!   JSON or TOML
//! - [`Pointcut`]: a regular expression matched against the whole fully
//!   qualified signature of a declaration
//! - [`Matcher::match_all`]: produces a [`MatchSet`] of [`JoinPoint`]s plus
//!   non-fatal [`Diagnostic`]s

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod diagnostics;
mod error;
mod matcher;
mod pointcut;
mod spec;

pub use diagnostics::Diagnostic;
pub use error::AspectError;
pub use matcher::{match_all, JoinPoint, MatchSet, Matcher};
pub use pointcut::{compile_pointcuts, Pointcut};
pub use spec::{AdviceBinding, AspectFormat, AspectSpec, DEFAULT_ADVICE_PACKAGE};
