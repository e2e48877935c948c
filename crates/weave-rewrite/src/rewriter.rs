//! Per-unit join-point rewriting
//!
//! Every matched reference is replaced by `(gen(recv))`: an immediately
//! invoked Generator call that evaluates the receiver at the reference site
//! and yields a function value of the original shape. Matched references
//! nested inside a receiver expression are rewritten first, so their
//! replacements appear inside the outer Generator's argument.
//!
//! # Core Concepts
//!
//! - Edits are keyed by reference span; the original text is only read.
//! - The first match in a unit injects the runtime, advice and any extra
//!   type imports right after the package clause.
//! - A unit without join points produces no output at all.

use std::ops::Range;
use std::path::PathBuf;

use tracing::{debug, info};
use weave_pointcut::JoinPoint;
use weave_program::{CompilationUnit, GoType, RefShape, TargetProgram, UnitId};

use crate::codegen::{generate, Callee, ProxyPair};
use crate::error::RewriteError;
use crate::options::CodegenOptions;
use crate::render::TypeRenderer;
use crate::session::WeaveSession;

/// Rewritten text of one unit plus the proxies it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenUnit {
    pub unit: UnitId,
    /// Absolute path of the original file
    pub original_path: PathBuf,
    /// Path relative to the source root
    pub relative_path: PathBuf,
    /// Rewritten declarations, imports included
    pub body: String,
    /// Proxy pairs in the order they were generated
    pub proxies: Vec<ProxyPair>,
}

/// Rewrite `unit` for `join_points`.
///
/// `join_points` must belong to `unit`; order does not matter. Returns
/// `Ok(None)` when there is nothing to rewrite.
///
/// # Errors
///
/// [`RewriteError`] when a reference cannot be replaced or a synthetic name
/// collides.
pub fn rewrite_unit(
    program: &TargetProgram,
    unit: &CompilationUnit,
    join_points: &[&JoinPoint],
    session: &mut WeaveSession,
    options: &CodegenOptions,
) -> Result<Option<RewrittenUnit>, RewriteError> {
    if join_points.is_empty() {
        return Ok(None);
    }
    let mut points = join_points.to_vec();
    points.sort_by_key(|jp| (jp.site.span.start, std::cmp::Reverse(jp.site.span.end)));

    let mut rewriter = UnitRewriter {
        program,
        unit,
        session,
        options,
        renderer: TypeRenderer::new(unit, &program.package_names),
    };
    let rewritten = rewriter.render_range(0..unit.source.len(), &points)?;
    let imports = rewriter.import_block();
    let proxies = rewriter.session.take_addendum();

    let insert_at = unit.package_clause.end;
    let mut body = String::with_capacity(rewritten.len() + imports.len());
    body.push_str(&rewritten[..insert_at]);
    body.push_str(&imports);
    body.push_str(&rewritten[insert_at..]);

    info!(
        path = %unit.relative_path.display(),
        join_points = points.len(),
        proxies = proxies.len(),
        "rewrote unit"
    );
    Ok(Some(RewrittenUnit {
        unit: unit.id,
        original_path: unit.path.clone(),
        relative_path: unit.relative_path.clone(),
        body,
        proxies,
    }))
}

struct UnitRewriter<'a, 's> {
    program: &'a TargetProgram,
    unit: &'a CompilationUnit,
    session: &'s mut WeaveSession,
    options: &'a CodegenOptions,
    renderer: TypeRenderer<'a>,
}

impl UnitRewriter<'_, '_> {
    /// Text of `range` with every outermost join point inside it replaced.
    /// `points` are sorted by start, outer before nested.
    fn render_range(
        &mut self,
        range: Range<usize>,
        points: &[&JoinPoint],
    ) -> Result<String, RewriteError> {
        let source = &self.unit.source;
        let mut out = String::with_capacity(range.len());
        let mut cursor = range.start;
        let mut i = 0;
        while i < points.len() {
            let outer = points[i];
            let span = outer.site.span.clone();
            let mut end = i + 1;
            while end < points.len() && points[end].site.span.start < span.end {
                end += 1;
            }
            out.push_str(&source[cursor..span.start]);
            let replacement = self.replace(outer, &points[i + 1..end])?;
            out.push_str(&replacement);
            cursor = span.end;
            i = end;
        }
        out.push_str(&source[cursor..range.end]);
        Ok(out)
    }

    fn replace(
        &mut self,
        jp: &JoinPoint,
        nested: &[&JoinPoint],
    ) -> Result<String, RewriteError> {
        let location = self.unit.location(jp.site.span.start);
        let program = self.program;
        let decl = program
            .symbols
            .declaration(jp.decl)
            .ok_or_else(|| RewriteError::UnknownDeclaration {
                location: location.clone(),
                decl: jp.decl.0,
            })?;
        let full_name = decl.full_name();

        let (callee, receiver_arg) = match (&jp.site.shape, &decl.receiver) {
            (RefShape::Ident { name }, None) => (
                Callee::Function {
                    qualifier: None,
                    name: name.clone(),
                },
                None,
            ),
            (RefShape::Qualified { qualifier, name }, None) => (
                Callee::Function {
                    qualifier: Some(qualifier.clone()),
                    name: name.clone(),
                },
                None,
            ),
            (
                RefShape::Selector {
                    operand,
                    name,
                    operand_type,
                },
                Some(receiver),
            ) => {
                let inner: Vec<&JoinPoint> = nested
                    .iter()
                    .copied()
                    .filter(|n| {
                        n.site.span.start >= operand.start && n.site.span.end <= operand.end
                    })
                    .collect();
                let operand_text = self.render_range(operand.clone(), &inner)?;
                (
                    Callee::Method { name: name.clone() },
                    Some(adapt_receiver(&operand_text, operand_type, receiver)),
                )
            }
            (RefShape::Unsupported { kind }, _) => {
                return Err(RewriteError::unexpected_shape(
                    location,
                    format!("{kind} referring to {full_name} cannot be woven"),
                ));
            }
            (RefShape::Selector { .. }, None) => {
                return Err(RewriteError::unexpected_shape(
                    location,
                    format!("function {full_name} referenced through a receiver expression"),
                ));
            }
            (_, Some(_)) => {
                return Err(RewriteError::unexpected_shape(
                    location,
                    format!("method {full_name} referenced without a receiver expression"),
                ));
            }
        };

        let names =
            self.session
                .next_names(&self.unit.relative_path, &jp.site.span, &full_name, &location)?;
        let pair = generate(
            decl,
            decl.receiver.as_ref(),
            &jp.advice,
            &callee,
            &names,
            &mut self.renderer,
            self.options,
        );
        debug!(
            path = %self.unit.relative_path.display(),
            line = jp.site.line,
            column = jp.site.column,
            full_name = %full_name,
            advice = %jp.advice,
            proxy = %names.proxy,
            "rewrote reference"
        );
        self.session.push_addendum(pair);
        Ok(format!(
            "({}({}))",
            names.generator,
            receiver_arg.unwrap_or_default()
        ))
    }

    /// Import declaration injected after the package clause
    fn import_block(&self) -> String {
        let mut specs = Vec::new();
        let mut push = |alias: &str, path: &str| {
            let present = self
                .unit
                .import_of(path)
                .is_some_and(|import| import.name.as_deref() == Some(alias));
            if !present {
                specs.push(format!("\t{alias} \"{path}\""));
            }
        };
        push(&self.options.runtime_alias, &self.options.runtime_import);
        push(&self.options.advice_alias, &self.options.advice_import);
        for (alias, path) in self.renderer.extra_imports() {
            push(alias, path);
        }
        if specs.is_empty() {
            return String::new();
        }
        format!("\n\nimport (\n{}\n)", specs.join("\n"))
    }
}

/// Receiver argument for the Generator, applying the implicit `&x` / `*x`
/// Go performs when a method value's operand differs in pointer-ness from
/// the declared receiver.
fn adapt_receiver(operand: &str, operand_type: &GoType, receiver: &GoType) -> String {
    let wrap = |text: &str| {
        if text.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
            text.to_string()
        } else {
            format!("({text})")
        }
    };
    match (receiver.is_pointer(), operand_type.is_pointer()) {
        (true, false) => format!("&{}", wrap(operand)),
        (false, true) => format!("*{}", wrap(operand)),
        _ => operand.to_string(),
    }
}
