//! Proxy and Generator declarations
//!
//! For a matched declaration `func (r R) M(a A, b ...B) (X, Y)` governed by
//! advice `Adv`, two Go declarations are generated:
//!
//! - the Proxy `func _ag_proxy_N(_ag_recv R, _ag_p0 A, _ag_p1 ...B) (X, Y)`
//!   boxes its arguments into an advice context, installs a proceed closure
//!   performing the original call, dispatches to `(&Adv{}).Advice(ctx)` and
//!   unboxes the returned values;
//! - the Generator `func _ag_pgen_ag_proxy_N(_ag_recv R) func(A, ...B) (X, Y)`
//!   captures the receiver and returns a closure of the original shape that
//!   forwards to the Proxy.
//!
//! Parameters are always renamed to `_ag_pN` so that declared parameter
//! names can never shadow the package qualifiers used in the body.

use std::fmt::Write as _;

use weave_program::{Declaration, GoType};

use crate::options::CodegenOptions;
use crate::render::TypeRenderer;
use crate::session::SyntheticNames;

const RECEIVER: &str = "_ag_recv";

/// How the Proxy reaches the original declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    /// Package-level function, optionally through an import qualifier
    Function {
        qualifier: Option<String>,
        name: String,
    },
    /// Method called on the captured receiver
    Method { name: String },
}

impl Callee {
    fn expression(&self) -> String {
        match self {
            Self::Function {
                qualifier: Some(q),
                name,
            } => format!("{q}.{name}"),
            Self::Function {
                qualifier: None,
                name,
            } => name.clone(),
            Self::Method { name } => format!("{RECEIVER}.{name}"),
        }
    }
}

/// Generated declarations for one join point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyPair {
    pub names: SyntheticNames,
    /// Proxy declaration source
    pub proxy: String,
    /// Generator declaration source
    pub generator: String,
}

/// Rendered parameter and result slots of a declaration
struct Shape {
    receiver: Option<String>,
    params: Vec<String>,
    variadic: bool,
    results: Vec<String>,
}

impl Shape {
    fn of(decl: &Declaration, receiver: Option<&GoType>, renderer: &mut TypeRenderer<'_>) -> Self {
        Self {
            receiver: receiver.map(|ty| renderer.render(ty)),
            params: decl.params.iter().map(|p| renderer.render(&p.ty)).collect(),
            variadic: decl.variadic && !decl.params.is_empty(),
            results: decl.results.iter().map(|r| renderer.render(&r.ty)).collect(),
        }
    }

    fn is_variadic_slot(&self, index: usize) -> bool {
        self.variadic && index + 1 == self.params.len()
    }

    /// `_ag_p0 A, _ag_p1 ...B`
    fn param_list(&self) -> String {
        self.params
            .iter()
            .enumerate()
            .map(|(i, ty)| {
                if self.is_variadic_slot(i) {
                    format!("_ag_p{i} ...{ty}")
                } else {
                    format!("_ag_p{i} {ty}")
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `A, ...B`
    fn param_types(&self) -> String {
        self.params
            .iter()
            .enumerate()
            .map(|(i, ty)| {
                if self.is_variadic_slot(i) {
                    format!("...{ty}")
                } else {
                    ty.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// ``, ` X` or ` (X, Y)`
    fn result_suffix(&self) -> String {
        match self.results.as_slice() {
            [] => String::new(),
            [single] => format!(" {single}"),
            many => format!(" ({})", many.join(", ")),
        }
    }

    /// Forwarded arguments, spreading the variadic slot
    fn forward(&self, prefix: &str) -> Vec<String> {
        (0..self.params.len())
            .map(|i| {
                if self.is_variadic_slot(i) {
                    format!("{prefix}{i}...")
                } else {
                    format!("{prefix}{i}")
                }
            })
            .collect()
    }

    /// Static type of argument slot `i` inside the Proxy body
    fn slot_type(&self, i: usize) -> String {
        if self.is_variadic_slot(i) {
            format!("[]{}", self.params[i])
        } else {
            self.params[i].clone()
        }
    }
}

/// Generate the Proxy and Generator for `decl`.
///
/// `receiver` is the Proxy's receiver parameter type (the declared receiver
/// for methods, `None` for functions).
#[must_use]
pub fn generate(
    decl: &Declaration,
    receiver: Option<&GoType>,
    advice: &str,
    callee: &Callee,
    names: &SyntheticNames,
    renderer: &mut TypeRenderer<'_>,
    options: &CodegenOptions,
) -> ProxyPair {
    let shape = Shape::of(decl, receiver, renderer);
    ProxyPair {
        names: names.clone(),
        proxy: proxy_declaration(&shape, advice, callee, names, options),
        generator: generator_declaration(&shape, names),
    }
}

fn proxy_declaration(
    shape: &Shape,
    advice: &str,
    callee: &Callee,
    names: &SyntheticNames,
    options: &CodegenOptions,
) -> String {
    let mut params = Vec::new();
    if let Some(recv) = &shape.receiver {
        params.push(format!("{RECEIVER} {recv}"));
    }
    if !shape.params.is_empty() {
        params.push(shape.param_list());
    }
    let boxed_args = (0..shape.params.len())
        .map(|i| format!("_ag_p{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let receiver_value = if shape.receiver.is_some() { RECEIVER } else { "nil" };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "func {}({}){} {{",
        names.proxy,
        params.join(", "),
        shape.result_suffix()
    );
    let _ = writeln!(out, "\t_ag_ctx := &{}.ContextImpl{{", options.runtime_alias);
    let _ = writeln!(out, "\t\tXArgs: []interface{{}}{{{boxed_args}}},");
    let _ = writeln!(out, "\t\tXReceiver: {receiver_value},");
    out.push_str("\t}\n");

    out.push_str("\t_ag_ctx.XProceed = func() []interface{} {\n");
    for i in 0..shape.params.len() {
        let _ = writeln!(
            out,
            "\t\t_ag_arg{i}, _ := _ag_ctx.XArgs[{i}].({})",
            shape.slot_type(i)
        );
    }
    let call = format!("{}({})", callee.expression(), shape.forward("_ag_arg").join(", "));
    if shape.results.is_empty() {
        let _ = writeln!(out, "\t\t{call}");
        out.push_str("\t\treturn []interface{}{}\n");
    } else {
        let results = (0..shape.results.len())
            .map(|i| format!("_ag_res{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "\t\t{results} := {call}");
        let _ = writeln!(out, "\t\treturn []interface{{}}{{{results}}}");
    }
    out.push_str("\t}\n");

    let dispatch = format!("(&{}.{advice}{{}}).Advice(_ag_ctx)", options.advice_alias);
    if shape.results.is_empty() {
        let _ = writeln!(out, "\t{dispatch}");
    } else {
        let _ = writeln!(out, "\t_ag_res := {dispatch}");
        for (i, ty) in shape.results.iter().enumerate() {
            let _ = writeln!(out, "\t_ag_res{i}, _ := _ag_res[{i}].({ty})");
        }
        let results = (0..shape.results.len())
            .map(|i| format!("_ag_res{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "\treturn {results}");
    }
    out.push('}');
    out
}

fn generator_declaration(shape: &Shape, names: &SyntheticNames) -> String {
    let (param, mut forward) = match &shape.receiver {
        Some(recv) => (format!("{RECEIVER} {recv}"), vec![RECEIVER.to_string()]),
        None => (String::new(), Vec::new()),
    };
    forward.extend(shape.forward("_ag_p"));
    let func_type = format!("func({}){}", shape.param_types(), shape.result_suffix());
    let call = format!("{}({})", names.proxy, forward.join(", "));
    let statement = if shape.results.is_empty() {
        call
    } else {
        format!("return {call}")
    };

    format!(
        "func {}({param}) {func_type} {{\n\treturn func({}){} {{\n\t\t{statement}\n\t}}\n}}",
        names.generator,
        shape.param_list(),
        shape.result_suffix(),
    )
}
