//! Weave session state
//!
//! One session lives for one weave run. It issues the Proxy/Generator
//! identifiers (unique across every unit of the run) and buffers the proxy
//! pairs produced for the unit currently being rewritten.

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;
use weave_program::{ContentHash, SourceLocation};

use crate::codegen::ProxyPair;
use crate::error::RewriteError;

const PROXY_PREFIX: &str = "_ag_proxy_";
const GENERATOR_PREFIX: &str = "_ag_pgen";

/// How synthetic identifiers are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingScheme {
    /// `_ag_proxy_N` from the session counter
    #[default]
    Sequential,
    /// `_ag_proxy_<hash>` from the content hash of the reference site
    Content,
}

impl FromStr for NamingScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(Self::Sequential),
            "content" => Ok(Self::Content),
            other => Err(format!(
                "unknown naming scheme {other:?} (expected sequential or content)"
            )),
        }
    }
}

impl Display for NamingScheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sequential => "sequential",
            Self::Content => "content",
        })
    }
}

/// Identifiers of one Proxy/Generator pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntheticNames {
    pub proxy: String,
    pub generator: String,
}

impl SyntheticNames {
    fn from_proxy(proxy: String) -> Self {
        Self {
            generator: format!("{GENERATOR_PREFIX}{proxy}"),
            proxy,
        }
    }
}

/// Per-run rewriting state
#[derive(Debug, Default)]
pub struct WeaveSession {
    scheme: NamingScheme,
    counter: usize,
    issued: HashSet<String>,
    addendum: Vec<ProxyPair>,
}

impl WeaveSession {
    /// Fresh session using `scheme`
    #[must_use]
    pub fn new(scheme: NamingScheme) -> Self {
        Self {
            scheme,
            ..Self::default()
        }
    }

    /// Naming scheme in use
    #[inline]
    #[must_use]
    pub fn scheme(&self) -> NamingScheme {
        self.scheme
    }

    /// Number of pairs named so far
    #[inline]
    #[must_use]
    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    /// Issue the names for the reference at `span` of the unit at
    /// `relative_path`, bound to `full_name`.
    ///
    /// # Errors
    ///
    /// [`RewriteError::DuplicateSyntheticName`] if the name was already
    /// issued in this session.
    pub fn next_names(
        &mut self,
        relative_path: &Path,
        span: &Range<usize>,
        full_name: &str,
        location: &SourceLocation,
    ) -> Result<SyntheticNames, RewriteError> {
        let proxy = match self.scheme {
            NamingScheme::Sequential => {
                let n = self.counter;
                self.counter += 1;
                format!("{PROXY_PREFIX}{n}")
            }
            NamingScheme::Content => {
                let hash = ContentHash::of_site(relative_path, span, full_name);
                format!("{PROXY_PREFIX}{}", hash.short())
            }
        };
        if !self.issued.insert(proxy.clone()) {
            return Err(RewriteError::DuplicateSyntheticName {
                name: proxy,
                location: location.clone(),
            });
        }
        trace!(proxy = %proxy, full_name, "issued synthetic names");
        Ok(SyntheticNames::from_proxy(proxy))
    }

    /// Buffer a generated pair for the current unit
    pub fn push_addendum(&mut self, pair: ProxyPair) {
        self.addendum.push(pair);
    }

    /// Drain the pairs buffered for the current unit
    pub fn take_addendum(&mut self) -> Vec<ProxyPair> {
        std::mem::take(&mut self.addendum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn here() -> SourceLocation {
        SourceLocation {
            file: PathBuf::from("main.go"),
            line: 1,
            column: 1,
        }
    }

    #[test]
    fn sequential_names_count_up() {
        let mut session = WeaveSession::new(NamingScheme::Sequential);
        let a = session
            .next_names(Path::new("main.go"), &(10..14), "example.com/app.f", &here())
            .unwrap();
        let b = session
            .next_names(Path::new("main.go"), &(10..14), "example.com/app.f", &here())
            .unwrap();
        assert_eq!(a.proxy, "_ag_proxy_0");
        assert_eq!(a.generator, "_ag_pgen_ag_proxy_0");
        assert_eq!(b.proxy, "_ag_proxy_1");
        assert_eq!(session.issued_count(), 2);
    }

    #[test]
    fn content_names_are_stable_across_sessions() {
        let name = |span: Range<usize>| {
            WeaveSession::new(NamingScheme::Content)
                .next_names(Path::new("a/b.go"), &span, "example.com/app.f", &here())
                .unwrap()
        };
        assert_eq!(name(3..7), name(3..7));
        assert_ne!(name(3..7).proxy, name(4..8).proxy);
        assert!(name(3..7).proxy.starts_with("_ag_proxy_"));
    }

    #[test]
    fn content_name_collision_is_fatal() {
        let mut session = WeaveSession::new(NamingScheme::Content);
        session
            .next_names(Path::new("main.go"), &(1..2), "p.f", &here())
            .unwrap();
        let err = session
            .next_names(Path::new("main.go"), &(1..2), "p.f", &here())
            .unwrap_err();
        assert!(matches!(err, RewriteError::DuplicateSyntheticName { .. }));
    }

    #[test]
    fn scheme_parses_from_text() {
        assert_eq!("content".parse::<NamingScheme>(), Ok(NamingScheme::Content));
        assert_eq!(NamingScheme::default().to_string(), "sequential");
        assert!("random".parse::<NamingScheme>().is_err());
    }
}
