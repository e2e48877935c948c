//! Rewrite errors

use thiserror::Error;
use weave_program::SourceLocation;

/// Fatal rewriting failures
#[derive(Debug, Error)]
pub enum RewriteError {
    /// A matched reference has a shape the rewriter cannot replace, or one
    /// that disagrees with its declaration
    #[error("{location}: unexpected reference shape: {detail}")]
    UnexpectedReferenceShape {
        location: SourceLocation,
        detail: String,
    },

    /// A synthetic name was issued twice in one session
    #[error("{location}: synthetic name {name} already issued in this weave")]
    DuplicateSyntheticName {
        name: String,
        location: SourceLocation,
    },

    /// A join point refers to a declaration missing from the symbol table
    #[error("{location}: join point refers to unknown declaration #{decl}")]
    UnknownDeclaration {
        location: SourceLocation,
        decl: usize,
    },
}

impl RewriteError {
    /// Create an unexpected-shape error
    pub fn unexpected_shape(location: SourceLocation, detail: impl Into<String>) -> Self {
        Self::UnexpectedReferenceShape {
            location,
            detail: detail.into(),
        }
    }

    /// Location of the offending reference
    #[must_use]
    pub fn location(&self) -> &SourceLocation {
        match self {
            Self::UnexpectedReferenceShape { location, .. }
            | Self::DuplicateSyntheticName { location, .. }
            | Self::UnknownDeclaration { location, .. } => location,
        }
    }
}
