//! Non-fatal match diagnostics
//!
//! Bad patterns, overlapping pointcuts and duplicated patterns never stop a
//! weave; they are logged when detected and carried in the match result so
//! callers can report them.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use weave_program::SourceLocation;

/// A recorded, non-fatal matching problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Pattern failed to compile; the pointcut matches nothing
    InvalidPattern {
        advice: String,
        pattern: String,
        message: String,
    },
    /// A reference matched more than one pointcut; the later one governs it
    PointcutConflict {
        location: SourceLocation,
        full_name: String,
        overridden: String,
        winner: String,
    },
    /// Two advice types share one pattern string
    DuplicatePattern {
        pattern: String,
        first: String,
        second: String,
    },
}

impl Diagnostic {
    /// Short machine-readable kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPattern { .. } => "invalid_pattern",
            Self::PointcutConflict { .. } => "pointcut_conflict",
            Self::DuplicatePattern { .. } => "duplicate_pattern",
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPattern {
                advice,
                pattern,
                message,
            } => write!(
                f,
                "pointcut of {advice} is not a valid regular expression ({pattern}): {message}"
            ),
            Self::PointcutConflict {
                location,
                full_name,
                overridden,
                winner,
            } => write!(
                f,
                "{location}: {full_name} matched by both {overridden} and {winner}; {winner} wins"
            ),
            Self::DuplicatePattern {
                pattern,
                first,
                second,
            } => write!(f, "{first} and {second} share the pointcut {pattern}"),
        }
    }
}
