//! Pointcut matching
//!
//! Selects join points: every identifier-use of a non-aspect unit whose
//! bound declaration is a function or method with a fully qualified name
//! matched (whole-string) by some pointcut.
//!
//! # Core Concepts
//!
//! - Pointcuts are evaluated in declaration order. When several match one
//!   reference, the last one governs it and a
//!   [`Diagnostic::PointcutConflict`] is recorded.
//! - Join points are keyed by reference-site identity (unit + byte span).
//! - Zero join points is a valid outcome.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use tracing::{debug, info, warn};
use weave_program::{Binding, DeclId, ReferenceSite, SiteKey, TargetProgram, UnitId};

use crate::diagnostics::Diagnostic;
use crate::pointcut::{compile_pointcuts, Pointcut};
use crate::spec::AspectSpec;

/// One matched reference and the pointcut governing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPoint {
    /// The reference
    pub site: ReferenceSite,
    /// Declaration it resolves to
    pub decl: DeclId,
    /// Index of the governing pointcut
    pub pointcut: usize,
    /// Advice type of the governing pointcut
    pub advice: String,
}

/// Result of matching a program against a set of pointcuts
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
    join_points: IndexMap<SiteKey, JoinPoint>,
    diagnostics: Vec<Diagnostic>,
}

impl MatchSet {
    /// No join point matched
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.join_points.is_empty()
    }

    /// Number of join points
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.join_points.len()
    }

    /// Join points in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &JoinPoint> {
        self.join_points.values()
    }

    /// Join point at a site
    #[must_use]
    pub fn get(&self, key: &SiteKey) -> Option<&JoinPoint> {
        self.join_points.get(key)
    }

    /// Join points of one unit ordered by position, outer references
    /// before the references nested inside them
    #[must_use]
    pub fn for_unit(&self, unit: UnitId) -> Vec<&JoinPoint> {
        let mut points: Vec<&JoinPoint> = self
            .join_points
            .values()
            .filter(|jp| jp.site.unit == unit)
            .collect();
        points.sort_by_key(|jp| (jp.site.span.start, std::cmp::Reverse(jp.site.span.end)));
        points
    }

    /// Units holding at least one join point
    #[must_use]
    pub fn units(&self) -> BTreeSet<UnitId> {
        self.join_points.values().map(|jp| jp.site.unit).collect()
    }

    /// Diagnostics recorded while compiling and matching
    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Compiled pointcuts of an aspect specification
#[derive(Debug, Clone)]
pub struct Matcher {
    pointcuts: Vec<Pointcut>,
    diagnostics: Vec<Diagnostic>,
}

impl Matcher {
    /// Compile the bindings of `spec`
    #[must_use]
    pub fn from_spec(spec: &AspectSpec) -> Self {
        let (pointcuts, diagnostics) = compile_pointcuts(spec);
        Self {
            pointcuts,
            diagnostics,
        }
    }

    /// Use already compiled pointcuts
    #[must_use]
    pub fn new(pointcuts: Vec<Pointcut>) -> Self {
        Self {
            pointcuts,
            diagnostics: Vec::new(),
        }
    }

    /// Pointcuts in declaration order
    #[inline]
    #[must_use]
    pub fn pointcuts(&self) -> &[Pointcut] {
        &self.pointcuts
    }

    /// Match every reference of `program`.
    ///
    /// The result carries compile-time diagnostics followed by match-time
    /// ones.
    #[must_use]
    pub fn match_all(&self, program: &TargetProgram) -> MatchSet {
        let mut set = match_all(program, &self.pointcuts);
        let mut diagnostics = self.diagnostics.clone();
        diagnostics.append(&mut set.diagnostics);
        set.diagnostics = diagnostics;
        set
    }
}

/// Match every reference of `program` against `pointcuts`
#[must_use]
pub fn match_all(program: &TargetProgram, pointcuts: &[Pointcut]) -> MatchSet {
    let mut set = MatchSet::default();

    for u in program.symbols.uses() {
        let Some(unit) = program.unit(u.site.unit) else {
            continue;
        };
        if unit.aspect {
            continue;
        }
        let Binding::Function(decl_id) = u.binding else {
            continue;
        };
        let Some(decl) = program.symbols.declaration(decl_id) else {
            continue;
        };
        let full_name = decl.full_name();

        for pointcut in pointcuts.iter().filter(|pc| pc.is_match(&full_name)) {
            let key = u.site.key();
            if let Some(previous) = set.join_points.get(&key) {
                let location = unit.location(u.site.span.start);
                warn!(
                    path = %location.file.display(),
                    line = location.line,
                    column = location.column,
                    overridden = %previous.advice,
                    advice = %pointcut.advice(),
                    "pointcut conflict, later pointcut wins"
                );
                set.diagnostics.push(Diagnostic::PointcutConflict {
                    location,
                    full_name: full_name.clone(),
                    overridden: previous.advice.clone(),
                    winner: pointcut.advice().to_string(),
                });
            }
            debug!(
                path = %unit.relative_path.display(),
                line = u.site.line,
                column = u.site.column,
                full_name = %full_name,
                pointcut = %pointcut.pattern(),
                advice = %pointcut.advice(),
                "matched join point"
            );
            set.join_points.insert(
                key,
                JoinPoint {
                    site: u.site.clone(),
                    decl: decl_id,
                    pointcut: pointcut.index(),
                    advice: pointcut.advice().to_string(),
                },
            );
        }
    }

    info!(
        join_points = set.join_points.len(),
        units = set.units().len(),
        diagnostics = set.diagnostics.len(),
        "matching complete"
    );
    set
}
