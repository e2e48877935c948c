//! Weave Overlay
//!
//! Everything the weaver writes goes to an overlay root that mirrors the
//! source root: rewritten units as real files, everything else as symlinks
//! back to the original tree. The original tree is only ever read.
//!
//! # Core Concepts
//!
//! - [`OverlayLayout`]: maps a path under the source root to its overlay
//!   counterpart
//! - [`Materializer`]: writes rewritten units (header, body, proxy pairs)
//!   and records the written set
//! - [`reconcile`]: fills the rest of the overlay with symlinks; running it
//!   again with the same inputs changes nothing

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod advice;
mod error;
mod layout;
mod materialize;
mod reconcile;

pub use advice::relocate_advice_unit;
pub use error::OverlayError;
pub use layout::OverlayLayout;
pub use materialize::{render_unit, Materializer, GENERATED_HEADER};
pub use reconcile::{decide, reconcile, Action, ReconcileReport, SkipReason};
