//! Compiled pointcuts

use regex::Regex;
use tracing::warn;

use crate::diagnostics::Diagnostic;
use crate::spec::AspectSpec;

/// A pointcut pattern compiled for whole-string matching
#[derive(Debug, Clone)]
pub struct Pointcut {
    index: usize,
    advice: String,
    pattern: String,
    regex: Option<Regex>,
}

impl Pointcut {
    /// Compile `pattern` for the advice at position `index`.
    ///
    /// A pattern that does not compile yields a pointcut that matches
    /// nothing, plus an [`Diagnostic::InvalidPattern`].
    #[must_use]
    pub fn compile(
        index: usize,
        advice: impl Into<String>,
        pattern: impl Into<String>,
    ) -> (Self, Option<Diagnostic>) {
        let advice = advice.into();
        let pattern = pattern.into();
        // Validate the bare pattern first: anchoring an unbalanced pattern
        // could compile into something with a different meaning.
        let compiled = Regex::new(&pattern).and_then(|_| Regex::new(&format!("^(?:{pattern})$")));
        let (regex, diagnostic) = match compiled {
            Ok(regex) => (Some(regex), None),
            Err(e) => {
                warn!(advice = %advice, pointcut = %pattern, error = %e, "invalid pointcut pattern");
                let diagnostic = Diagnostic::InvalidPattern {
                    advice: advice.clone(),
                    pattern: pattern.clone(),
                    message: e.to_string(),
                };
                (None, Some(diagnostic))
            }
        };
        (
            Self {
                index,
                advice,
                pattern,
                regex,
            },
            diagnostic,
        )
    }

    /// Position in the specification
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Advice type name
    #[inline]
    #[must_use]
    pub fn advice(&self) -> &str {
        &self.advice
    }

    /// Pattern as written
    #[inline]
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Pattern compiled successfully
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    /// Whole-string match against a fully qualified signature
    #[must_use]
    pub fn is_match(&self, full_name: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(full_name))
    }
}

/// Compile every binding of `spec` in declaration order.
///
/// Also reports advice types that share a pattern string.
#[must_use]
pub fn compile_pointcuts(spec: &AspectSpec) -> (Vec<Pointcut>, Vec<Diagnostic>) {
    let mut pointcuts = Vec::with_capacity(spec.aspects.len());
    let mut diagnostics = Vec::new();
    for (index, binding) in spec.aspects.iter().enumerate() {
        if let Some(first) = spec.aspects[..index]
            .iter()
            .find(|earlier| earlier.pointcut == binding.pointcut)
        {
            warn!(
                pointcut = %binding.pointcut,
                first = %first.advice,
                second = %binding.advice,
                "duplicate pointcut pattern"
            );
            diagnostics.push(Diagnostic::DuplicatePattern {
                pattern: binding.pointcut.clone(),
                first: first.advice.clone(),
                second: binding.advice.clone(),
            });
        }
        let (pointcut, diagnostic) = Pointcut::compile(index, &binding.advice, &binding.pointcut);
        diagnostics.extend(diagnostic);
        pointcuts.push(pointcut);
    }
    (pointcuts, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_is_whole_string() {
        let (pc, diag) = Pointcut::compile(0, "A", r"example\.com/app\.say");
        assert!(diag.is_none());
        assert!(pc.is_match("example.com/app.say"));
        assert!(!pc.is_match("example.com/app.sayHello"));
        assert!(!pc.is_match("x/example.com/app.say"));
    }

    #[test]
    fn alternation_is_anchored_as_a_whole() {
        let (pc, _) = Pointcut::compile(0, "A", "a|b");
        assert!(pc.is_match("a"));
        assert!(pc.is_match("b"));
        assert!(!pc.is_match("ab"));
        assert!(!pc.is_match("xb"));
    }

    #[test]
    fn invalid_pattern_matches_nothing() {
        let (pc, diag) = Pointcut::compile(3, "Broken", "a)|(b");
        assert!(!pc.is_valid());
        assert!(!pc.is_match("a"));
        assert!(matches!(diag, Some(Diagnostic::InvalidPattern { .. })));
        assert_eq!(pc.index(), 3);
    }

    #[test]
    fn duplicate_patterns_are_reported() {
        let spec = AspectSpec::default()
            .with_aspect("First", ".*")
            .with_aspect("Second", ".*");
        let (pointcuts, diagnostics) = compile_pointcuts(&spec);
        assert_eq!(pointcuts.len(), 2);
        assert_eq!(
            diagnostics,
            vec![Diagnostic::DuplicatePattern {
                pattern: ".*".into(),
                first: "First".into(),
                second: "Second".into(),
            }]
        );
    }
}
