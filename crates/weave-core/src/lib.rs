//! Weave Core
//!
//! Weaves advice into Go sources. A run loads the target package, matches
//! every function and method reference against the pointcuts of an aspect
//! specification, rewrites each matched reference to go through a generated
//! Proxy, and materializes the result into an overlay tree that mirrors the
//! source root without ever modifying it.
//!
//! # Example
//!
//! ```rust,ignore
//! use weave_core::{WeaveConfig, Weaver};
//!
//! let config = WeaveConfig::default()
//!     .with_source_root("/src/app")
//!     .with_target("example.com/app")
//!     .with_aspect_file("trace.yaml")
//!     .with_overlay_root("/tmp/woven");
//! let outcome = Weaver::new(config).run()?;
//! println!("wrote {} files", outcome.written.len());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod weaver;

pub use config::{WeaveConfig, DEFAULT_ASPECT_SUFFIX, SOURCE_ROOT_ENV};
pub use error::{ConfigError, WeaveError};
pub use weaver::{WeaveOutcome, Weaver};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
