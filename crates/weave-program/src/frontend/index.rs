//! Package-level index
//!
//! Collects the functions, methods, named types, struct fields and package
//! variables of one Go package so the resolver can answer "what does this
//! name refer to" without a full type checker. All types are stored in
//! canonical (fully qualified) form.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tree_sitter::Node;

use crate::types::{Declaration, GoType, Param, PREDECLARED_TYPES};
use crate::unit::node_text;

/// Canonicalizes type syntax of one file into [`GoType`]s
#[derive(Debug, Clone)]
pub(crate) struct TypeContext {
    package_path: String,
    aliases: HashMap<String, String>,
}

impl TypeContext {
    /// Context for a file of `package_path` whose imports bind `aliases`
    /// (local name → import path).
    pub(crate) fn new(package_path: impl Into<String>, aliases: HashMap<String, String>) -> Self {
        Self {
            package_path: package_path.into(),
            aliases,
        }
    }

    pub(crate) fn package_path(&self) -> &str {
        &self.package_path
    }

    /// Import path bound to a local package name
    pub(crate) fn import_path(&self, local: &str) -> Option<&str> {
        self.aliases.get(local).map(String::as_str)
    }

    /// Canonical form of a type node
    pub(crate) fn canonical(&self, node: Node<'_>, source: &str) -> GoType {
        let mut out = String::new();
        self.write_type(node, source, &mut out);
        GoType::new(out)
    }

    /// Canonical form of a bare type name declared in this package (or
    /// predeclared)
    pub(crate) fn local_type(&self, name: &str) -> GoType {
        if PREDECLARED_TYPES.contains(&name) {
            GoType::new(name)
        } else {
            GoType::named(&self.package_path, name)
        }
    }

    fn write_type(&self, node: Node<'_>, source: &str, out: &mut String) {
        match node.kind() {
            "comment" => {}
            "qualified_type" => {
                let package = node
                    .child_by_field_name("package")
                    .map_or("", |n| node_text(n, source));
                let name = node
                    .child_by_field_name("name")
                    .map_or("", |n| node_text(n, source));
                match self.aliases.get(package) {
                    Some(path) => {
                        out.push_str(path);
                        out.push('.');
                        out.push_str(name);
                    }
                    None => out.push_str(node_text(node, source)),
                }
            }
            "type_identifier" => out.push_str(self.local_type(node_text(node, source)).as_str()),
            _ if node.child_count() == 0 => out.push_str(node_text(node, source)),
            _ => {
                let mut prev_end = None;
                for i in 0..node.child_count() {
                    let Some(child) = node.child(i) else {
                        continue;
                    };
                    if child.kind() == "comment" {
                        continue;
                    }
                    if prev_end.is_some_and(|end| child.start_byte() > end) {
                        out.push(' ');
                    }
                    self.write_type(child, source, out);
                    prev_end = Some(child.end_byte());
                }
            }
        }
    }

    /// Parameters, results and variadic flag of a signature
    pub(crate) fn signature(
        &self,
        parameters: Option<Node<'_>>,
        result: Option<Node<'_>>,
        source: &str,
    ) -> (Vec<Param>, Vec<Param>, bool) {
        let (params, variadic) = match parameters {
            Some(list) => self.parameter_list(list, source),
            None => (Vec::new(), false),
        };
        let results = match result {
            Some(node) if node.kind() == "parameter_list" => self.parameter_list(node, source).0,
            Some(node) => vec![Param::unnamed(self.canonical(node, source))],
            None => Vec::new(),
        };
        (params, results, variadic)
    }

    fn parameter_list(&self, list: Node<'_>, source: &str) -> (Vec<Param>, bool) {
        let mut params = Vec::new();
        let mut variadic = false;
        for i in 0..list.named_child_count() {
            let Some(decl) = list.named_child(i) else {
                continue;
            };
            let is_variadic = decl.kind() == "variadic_parameter_declaration";
            if decl.kind() != "parameter_declaration" && !is_variadic {
                continue;
            }
            let Some(ty) = decl.child_by_field_name("type") else {
                continue;
            };
            let ty = self.canonical(ty, source);
            let mut cursor = decl.walk();
            let names: Vec<String> = decl
                .children_by_field_name("name", &mut cursor)
                .map(|n| node_text(n, source).to_string())
                .collect();
            if names.is_empty() {
                params.push(Param::new(None, ty));
            } else {
                params.extend(names.into_iter().map(|n| Param::new(Some(n), ty.clone())));
            }
            variadic = is_variadic;
        }
        (params, variadic)
    }

    /// Static type of literal-like expressions: `T{..}`, `&T{..}`, `new(T)`
    pub(crate) fn literal_type(&self, expr: Node<'_>, source: &str) -> Option<GoType> {
        match expr.kind() {
            "composite_literal" => expr
                .child_by_field_name("type")
                .map(|t| self.canonical(t, source)),
            "parenthesized_expression" => expr
                .named_child(0)
                .and_then(|inner| self.literal_type(inner, source)),
            "unary_expression" => {
                let operator = expr.child_by_field_name("operator")?;
                let operand = expr.child_by_field_name("operand")?;
                if node_text(operator, source) == "&" && operand.kind() == "composite_literal" {
                    self.literal_type(operand, source).map(|t| t.pointer_to())
                } else {
                    None
                }
            }
            "call_expression" => {
                let function = expr.child_by_field_name("function")?;
                if function.kind() != "identifier" || node_text(function, source) != "new" {
                    return None;
                }
                let args = expr.child_by_field_name("arguments")?;
                let arg = args.named_child(0)?;
                self.type_from_expression(arg, source).map(|t| t.pointer_to())
            }
            _ => None,
        }
    }

    /// Interpret an expression node that spells a type (`T`, `pkg.T`, or a
    /// genuine type node).
    pub(crate) fn type_from_expression(&self, node: Node<'_>, source: &str) -> Option<GoType> {
        match node.kind() {
            "identifier" => Some(self.local_type(node_text(node, source))),
            "selector_expression" => {
                let operand = node.child_by_field_name("operand")?;
                let field = node.child_by_field_name("field")?;
                let path = self.import_path(node_text(operand, source))?;
                Some(GoType::named(path, node_text(field, source)))
            }
            kind if kind.ends_with("_type") || kind == "type_identifier" => {
                Some(self.canonical(node, source))
            }
            _ => None,
        }
    }
}

/// Everything one package declares at package level
#[derive(Debug, Clone, Default)]
pub(crate) struct PackageIndex {
    pub(crate) path: String,
    pub(crate) name: String,
    pub(crate) funcs: IndexMap<String, Declaration>,
    pub(crate) methods: HashMap<String, IndexMap<String, Declaration>>,
    pub(crate) types: HashSet<String>,
    pub(crate) fields: HashMap<String, HashMap<String, GoType>>,
    pub(crate) values: HashMap<String, Option<GoType>>,
}

impl PackageIndex {
    pub(crate) fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Method `method` of the named type `type_name`
    pub(crate) fn method(&self, type_name: &str, method: &str) -> Option<&Declaration> {
        self.methods.get(type_name).and_then(|m| m.get(method))
    }

    /// Field type of `type_name.field`
    pub(crate) fn field(&self, type_name: &str, field: &str) -> Option<&GoType> {
        self.fields.get(type_name).and_then(|f| f.get(field))
    }

    /// First pass over one file: functions, methods, types, fields.
    pub(crate) fn add_declarations(&mut self, root: Node<'_>, source: &str, ctx: &TypeContext) {
        for i in 0..root.named_child_count() {
            let Some(node) = root.named_child(i) else {
                continue;
            };
            match node.kind() {
                "function_declaration" => self.add_function(node, source, ctx),
                "method_declaration" => self.add_method(node, source, ctx),
                "type_declaration" => self.add_types(node, source, ctx),
                _ => {}
            }
        }
    }

    /// Second pass over one file: package-level variables and constants.
    /// Runs after every file's first pass so calls to package functions can
    /// type a variable.
    pub(crate) fn add_values(&mut self, root: Node<'_>, source: &str, ctx: &TypeContext) {
        for i in 0..root.named_child_count() {
            let Some(node) = root.named_child(i) else {
                continue;
            };
            if matches!(node.kind(), "var_declaration" | "const_declaration") {
                self.add_value_specs(node, source, ctx);
            }
        }
    }

    fn add_function(&mut self, node: Node<'_>, source: &str, ctx: &TypeContext) {
        if node.child_by_field_name("type_parameters").is_some() {
            return;
        }
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name, source);
        if name == "init" || name == "_" {
            return;
        }
        let (params, results, variadic) = ctx.signature(
            node.child_by_field_name("parameters"),
            node.child_by_field_name("result"),
            source,
        );
        let decl = Declaration::function(&self.path, name)
            .with_params(params)
            .with_results(results)
            .with_variadic(variadic);
        self.funcs.insert(name.to_string(), decl);
    }

    fn add_method(&mut self, node: Node<'_>, source: &str, ctx: &TypeContext) {
        let Some(receiver) = node
            .child_by_field_name("receiver")
            .and_then(|list| list.named_child(0))
            .and_then(|decl| decl.child_by_field_name("type"))
        else {
            return;
        };
        let Some(type_name) = receiver_base_name(receiver, source) else {
            return;
        };
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name, source);
        let (params, results, variadic) = ctx.signature(
            node.child_by_field_name("parameters"),
            node.child_by_field_name("result"),
            source,
        );
        let decl = Declaration::method(&self.path, ctx.canonical(receiver, source), name)
            .with_params(params)
            .with_results(results)
            .with_variadic(variadic);
        self.methods
            .entry(type_name.to_string())
            .or_default()
            .insert(name.to_string(), decl);
    }

    fn add_types(&mut self, node: Node<'_>, source: &str, ctx: &TypeContext) {
        for i in 0..node.named_child_count() {
            let Some(spec) = node.named_child(i) else {
                continue;
            };
            if !matches!(spec.kind(), "type_spec" | "type_alias") {
                continue;
            }
            let Some(name) = spec.child_by_field_name("name") else {
                continue;
            };
            let name = node_text(name, source).to_string();
            let generic = spec.child_by_field_name("type_parameters").is_some();
            self.types.insert(name.clone());
            if generic {
                continue;
            }
            let Some(underlying) = spec.child_by_field_name("type") else {
                continue;
            };
            match underlying.kind() {
                "struct_type" => self.add_fields(&name, underlying, source, ctx),
                "interface_type" => self.add_interface_methods(&name, underlying, source, ctx),
                _ => {}
            }
        }
    }

    fn add_fields(&mut self, type_name: &str, struct_type: Node<'_>, source: &str, ctx: &TypeContext) {
        let Some(list) = (0..struct_type.named_child_count())
            .filter_map(|i| struct_type.named_child(i))
            .find(|n| n.kind() == "field_declaration_list")
        else {
            return;
        };
        let fields = self.fields.entry(type_name.to_string()).or_default();
        for i in 0..list.named_child_count() {
            let Some(field) = list.named_child(i) else {
                continue;
            };
            if field.kind() != "field_declaration" {
                continue;
            }
            let Some(ty) = field.child_by_field_name("type") else {
                continue;
            };
            let canonical = ctx.canonical(ty, source);
            let mut cursor = field.walk();
            let names: Vec<&str> = field
                .children_by_field_name("name", &mut cursor)
                .map(|n| node_text(n, source))
                .collect();
            if names.is_empty() {
                // Embedded field: named after its type
                if let Some((_, base)) = canonical.named_parts() {
                    fields.insert(base.to_string(), canonical.clone());
                }
            }
            for name in names {
                fields.insert(name.to_string(), canonical.clone());
            }
        }
    }

    fn add_interface_methods(
        &mut self,
        type_name: &str,
        interface: Node<'_>,
        source: &str,
        ctx: &TypeContext,
    ) {
        let receiver = ctx.local_type(type_name);
        for i in 0..interface.named_child_count() {
            let Some(elem) = interface.named_child(i) else {
                continue;
            };
            if !matches!(elem.kind(), "method_elem" | "method_spec") {
                continue;
            }
            let Some(name) = elem.child_by_field_name("name") else {
                continue;
            };
            let name = node_text(name, source);
            let (params, results, variadic) = ctx.signature(
                elem.child_by_field_name("parameters"),
                elem.child_by_field_name("result"),
                source,
            );
            let decl = Declaration::method(&self.path, receiver.clone(), name)
                .with_params(params)
                .with_results(results)
                .with_variadic(variadic);
            self.methods
                .entry(type_name.to_string())
                .or_default()
                .insert(name.to_string(), decl);
        }
    }

    fn add_value_specs(&mut self, node: Node<'_>, source: &str, ctx: &TypeContext) {
        for i in 0..node.named_child_count() {
            let Some(spec) = node.named_child(i) else {
                continue;
            };
            match spec.kind() {
                "var_spec" | "const_spec" => {}
                "var_spec_list" | "const_spec_list" => {
                    self.add_value_specs(spec, source, ctx);
                    continue;
                }
                _ => continue,
            }
            let declared = spec
                .child_by_field_name("type")
                .map(|t| ctx.canonical(t, source));
            let values: Vec<Node<'_>> = spec
                .child_by_field_name("value")
                .map(|list| {
                    (0..list.named_child_count())
                        .filter_map(|j| list.named_child(j))
                        .collect()
                })
                .unwrap_or_default();
            let mut cursor = spec.walk();
            let names: Vec<&str> = spec
                .children_by_field_name("name", &mut cursor)
                .map(|n| node_text(n, source))
                .collect();
            for (k, name) in names.iter().enumerate() {
                if *name == "_" {
                    continue;
                }
                let ty = declared.clone().or_else(|| {
                    values
                        .get(k)
                        .and_then(|value| self.value_type(*value, source, ctx))
                });
                self.values.insert((*name).to_string(), ty);
            }
        }
    }

    fn value_type(&self, value: Node<'_>, source: &str, ctx: &TypeContext) -> Option<GoType> {
        if let Some(ty) = ctx.literal_type(value, source) {
            return Some(ty);
        }
        if value.kind() != "call_expression" {
            return None;
        }
        let function = value.child_by_field_name("function")?;
        if function.kind() != "identifier" {
            return None;
        }
        match self.funcs.get(node_text(function, source)) {
            Some(decl) if decl.results.len() == 1 => Some(decl.results[0].ty.clone()),
            _ => None,
        }
    }
}

/// `T` for receiver types `T` and `*T`; `None` for generic receivers.
fn receiver_base_name<'s>(receiver: Node<'_>, source: &'s str) -> Option<&'s str> {
    match receiver.kind() {
        "type_identifier" => Some(node_text(receiver, source)),
        "pointer_type" => receiver
            .named_child(0)
            .and_then(|inner| receiver_base_name(inner, source)),
        "parenthesized_type" => receiver
            .named_child(0)
            .and_then(|inner| receiver_base_name(inner, source)),
        _ => None,
    }
}
