//! Reference resolution
//!
//! Walks function bodies with a lexical scope stack and records every
//! identifier-use that names a package-level function, a method reachable
//! through a statically inferable receiver, or a function of an imported
//! in-tree package.
//!
//! # Core Concepts
//!
//! - Locals shadow package members; a local never produces a use.
//! - Receiver types are inferred from parameters, receivers, `var`
//!   declarations, literals, field selections and calls to resolved
//!   functions. Anything else is left unresolved rather than guessed.
//! - Uses are recorded inner-first: a receiver expression is walked before
//!   the selector that contains it.

use std::collections::HashMap;
use std::rc::Rc;

use tree_sitter::Node;

use super::index::{PackageIndex, TypeContext};
use super::loader::Loader;
use crate::error::LoadError;
use crate::symbols::{Binding, RefShape, ReferenceSite, SymbolTable};
use crate::types::{Declaration, GoType};
use crate::unit::{node_text, CompilationUnit};

type Scope = HashMap<String, Option<GoType>>;

/// Node kinds that open a lexical scope
const SCOPE_KINDS: &[&str] = &[
    "block",
    "if_statement",
    "for_statement",
    "expression_switch_statement",
    "type_switch_statement",
    "select_statement",
    "expression_case",
    "type_case",
    "default_case",
    "communication_case",
];

/// Resolves the references of one compilation unit
pub(crate) struct Resolver<'a> {
    loader: &'a mut Loader,
    package: Rc<PackageIndex>,
    unit: &'a CompilationUnit,
    ctx: TypeContext,
    dot_imports: Vec<String>,
    scopes: Vec<Scope>,
    symbols: &'a mut SymbolTable,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(
        loader: &'a mut Loader,
        package: Rc<PackageIndex>,
        unit: &'a CompilationUnit,
        ctx: TypeContext,
        dot_imports: Vec<String>,
        symbols: &'a mut SymbolTable,
    ) -> Self {
        Self {
            loader,
            package,
            unit,
            ctx,
            dot_imports,
            scopes: Vec::new(),
            symbols,
        }
    }

    /// Resolve every reference below `root`
    ///
    /// # Errors
    /// Propagates load errors of imported in-tree packages.
    pub(crate) fn resolve(&mut self, root: Node<'_>) -> Result<(), LoadError> {
        for i in 0..root.named_child_count() {
            let Some(node) = root.named_child(i) else {
                continue;
            };
            match node.kind() {
                "package_clause" | "import_declaration" | "type_declaration" | "comment" => {}
                "var_declaration" | "const_declaration" => self.walk_package_values(node)?,
                _ => self.walk(node)?,
            }
        }
        Ok(())
    }

    fn source(&self) -> &'a str {
        &self.unit.source
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        node_text(node, self.source())
    }

    // Package-level initializers may reference functions; the names they
    // declare live in the package index, not in a scope.
    fn walk_package_values(&mut self, node: Node<'_>) -> Result<(), LoadError> {
        for i in 0..node.named_child_count() {
            let Some(spec) = node.named_child(i) else {
                continue;
            };
            match spec.kind() {
                "var_spec" | "const_spec" => {
                    if let Some(value) = spec.child_by_field_name("value") {
                        self.walk(value)?;
                    }
                }
                "var_spec_list" | "const_spec_list" => self.walk_package_values(spec)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn walk(&mut self, node: Node<'_>) -> Result<(), LoadError> {
        let kind = node.kind();
        match kind {
            "comment" | "type_declaration" | "type_identifier" | "qualified_type"
            | "field_identifier" | "label_name" | "parameter_list" | "type_arguments" => Ok(()),
            _ if kind.ends_with("_type") => Ok(()),
            "function_declaration" | "method_declaration" | "func_literal" => self.walk_function(node),
            "identifier" => self.resolve_ident(node),
            "selector_expression" => self.resolve_selector(node),
            "composite_literal" => match node.child_by_field_name("body") {
                Some(body) => self.walk(body),
                None => Ok(()),
            },
            "keyed_element" => self.walk_keyed_element(node),
            "short_var_declaration" => self.walk_short_var(node),
            "var_spec" | "const_spec" => self.walk_local_spec(node),
            "range_clause" => self.walk_range(node),
            "receive_statement" => self.walk_receive(node),
            "type_switch_statement" => self.scoped(|this| this.walk_type_switch(node)),
            _ if SCOPE_KINDS.contains(&kind) => self.scoped(|this| this.walk_children(node)),
            _ => self.walk_children(node),
        }
    }

    fn walk_children(&mut self, node: Node<'_>) -> Result<(), LoadError> {
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i) {
                self.walk(child)?;
            }
        }
        Ok(())
    }

    fn scoped(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<(), LoadError>,
    ) -> Result<(), LoadError> {
        self.scopes.push(Scope::new());
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn bind(&mut self, name: &str, ty: Option<GoType>) {
        if name == "_" {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn local(&self, name: &str) -> Option<&Option<GoType>> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn walk_function(&mut self, node: Node<'_>) -> Result<(), LoadError> {
        self.scoped(|this| {
            for field in ["receiver", "parameters", "result"] {
                if let Some(list) = node.child_by_field_name(field) {
                    if list.kind() == "parameter_list" {
                        this.bind_parameters(list);
                    }
                }
            }
            match node.child_by_field_name("body") {
                Some(body) => this.walk(body),
                None => Ok(()),
            }
        })
    }

    fn bind_parameters(&mut self, list: Node<'_>) {
        for i in 0..list.named_child_count() {
            let Some(decl) = list.named_child(i) else {
                continue;
            };
            let variadic = decl.kind() == "variadic_parameter_declaration";
            let ty = decl
                .child_by_field_name("type")
                .map(|t| self.ctx.canonical(t, self.source()))
                .map(|t| if variadic { t.slice_of() } else { t });
            let mut cursor = decl.walk();
            let names: Vec<&str> = decl
                .children_by_field_name("name", &mut cursor)
                .map(|n| self.text(n))
                .collect();
            for name in names {
                self.bind(name, ty.clone());
            }
        }
    }

    fn walk_keyed_element(&mut self, node: Node<'_>) -> Result<(), LoadError> {
        for i in 0..node.named_child_count() {
            let Some(child) = node.named_child(i) else {
                continue;
            };
            // A bare identifier key names a struct field
            if i == 0 && is_bare_identifier(child) {
                continue;
            }
            self.walk(child)?;
        }
        Ok(())
    }

    fn walk_short_var(&mut self, node: Node<'_>) -> Result<(), LoadError> {
        let right = expression_list(node.child_by_field_name("right"));
        for expr in &right {
            self.walk(*expr)?;
        }
        let left = expression_list(node.child_by_field_name("left"));
        let types = self.assigned_types(left.len(), &right)?;
        for (name, ty) in left.iter().zip(types) {
            if name.kind() == "identifier" {
                let name = self.text(*name);
                self.bind(name, ty);
            }
        }
        Ok(())
    }

    fn walk_local_spec(&mut self, node: Node<'_>) -> Result<(), LoadError> {
        let values = expression_list(node.child_by_field_name("value"));
        for expr in &values {
            self.walk(*expr)?;
        }
        let mut cursor = node.walk();
        let names: Vec<Node<'_>> = node.children_by_field_name("name", &mut cursor).collect();
        let types = match node.child_by_field_name("type") {
            Some(ty) => vec![Some(self.ctx.canonical(ty, self.source())); names.len()],
            None => self.assigned_types(names.len(), &values)?,
        };
        for (name, ty) in names.iter().zip(types) {
            let name = self.text(*name);
            self.bind(name, ty);
        }
        Ok(())
    }

    fn walk_range(&mut self, node: Node<'_>) -> Result<(), LoadError> {
        let right = node.child_by_field_name("right");
        if let Some(right) = right {
            self.walk(right)?;
        }
        let left = expression_list(node.child_by_field_name("left"));
        if !has_token(node, ":=") {
            for expr in left {
                self.walk(expr)?;
            }
            return Ok(());
        }
        let elem = match right {
            Some(right) => self.infer(right)?.and_then(|t| t.slice_elem()),
            None => None,
        };
        for (i, name) in left.iter().enumerate() {
            let ty = if i == 1 { elem.clone() } else { None };
            let name = self.text(*name);
            self.bind(name, ty);
        }
        Ok(())
    }

    fn walk_receive(&mut self, node: Node<'_>) -> Result<(), LoadError> {
        if let Some(right) = node.child_by_field_name("right") {
            self.walk(right)?;
        }
        let left = expression_list(node.child_by_field_name("left"));
        if has_token(node, ":=") {
            for name in left {
                let name = self.text(name);
                self.bind(name, None);
            }
        } else {
            for expr in left {
                self.walk(expr)?;
            }
        }
        Ok(())
    }

    fn walk_type_switch(&mut self, node: Node<'_>) -> Result<(), LoadError> {
        if let Some(init) = node.child_by_field_name("initializer") {
            self.walk(init)?;
        }
        if let Some(value) = node.child_by_field_name("value") {
            self.walk(value)?;
        }
        for alias in expression_list(node.child_by_field_name("alias")) {
            let name = self.text(alias);
            self.bind(name, None);
        }
        for i in 0..node.named_child_count() {
            let Some(child) = node.named_child(i) else {
                continue;
            };
            if matches!(child.kind(), "type_case" | "default_case") {
                self.walk(child)?;
            }
        }
        Ok(())
    }

    fn assigned_types(
        &mut self,
        count: usize,
        values: &[Node<'_>],
    ) -> Result<Vec<Option<GoType>>, LoadError> {
        if values.len() == 1 && count > 1 && values[0].kind() == "call_expression" {
            let results = self.call_results(values[0])?;
            return Ok((0..count).map(|i| results.get(i).cloned()).collect());
        }
        let mut types = Vec::with_capacity(count);
        for i in 0..count {
            types.push(match values.get(i) {
                Some(value) => self.infer(*value)?,
                None => None,
            });
        }
        Ok(types)
    }

    fn site(&self, node: Node<'_>, shape: RefShape) -> ReferenceSite {
        let pos = node.start_position();
        ReferenceSite {
            unit: self.unit.id,
            span: node.byte_range(),
            line: pos.row + 1,
            column: pos.column + 1,
            shape,
        }
    }

    fn record_function(&mut self, node: Node<'_>, shape: RefShape, decl: &Declaration) {
        let id = self.symbols.add_declaration(decl.clone());
        let site = self.site(node, shape);
        tracing::trace!(
            path = %self.unit.relative_path.display(),
            line = site.line,
            column = site.column,
            callee = %decl.full_name(),
            "resolved reference"
        );
        self.symbols.record_use(site, Binding::Function(id));
    }

    fn resolve_ident(&mut self, node: Node<'_>) -> Result<(), LoadError> {
        let name = self.text(node);
        if name == "_" || self.local(name).is_some() {
            return Ok(());
        }
        let package = Rc::clone(&self.package);
        if let Some(decl) = package.funcs.get(name) {
            let shape = RefShape::Ident {
                name: name.to_string(),
            };
            self.record_function(node, shape, decl);
            return Ok(());
        }
        if package.values.contains_key(name) {
            let site = self.site(
                node,
                RefShape::Ident {
                    name: name.to_string(),
                },
            );
            self.symbols.record_use(site, Binding::Other);
            return Ok(());
        }
        if let Some(decl) = self.dot_imported_func(name)? {
            let shape = RefShape::Ident {
                name: name.to_string(),
            };
            self.record_function(node, shape, &decl);
        }
        Ok(())
    }

    fn dot_imported_func(&mut self, name: &str) -> Result<Option<Declaration>, LoadError> {
        for path in self.dot_imports.clone() {
            if let Some(index) = self.loader.package(&path)? {
                if let Some(decl) = index.funcs.get(name) {
                    return Ok(Some(decl.clone()));
                }
            }
        }
        Ok(None)
    }

    fn resolve_selector(&mut self, node: Node<'_>) -> Result<(), LoadError> {
        let (Some(operand), Some(field)) = (
            node.child_by_field_name("operand"),
            node.child_by_field_name("field"),
        ) else {
            return self.walk_children(node);
        };
        let name = self.text(field);

        let operand_type = if operand.kind() == "identifier" {
            let qualifier = self.text(operand);
            match self.local(qualifier).cloned() {
                Some(ty) => ty,
                None => {
                    if let Some(path) = self.ctx.import_path(qualifier).map(str::to_string) {
                        return self.resolve_qualified(node, qualifier, &path, name);
                    }
                    let package = Rc::clone(&self.package);
                    if package.types.contains(qualifier) {
                        if let Some(decl) = package.method(qualifier, name) {
                            let shape = RefShape::Unsupported {
                                kind: "method expression".to_string(),
                            };
                            self.record_function(node, shape, decl);
                        }
                        return Ok(());
                    }
                    self.resolve_ident(operand)?;
                    package.values.get(qualifier).cloned().flatten()
                }
            }
        } else {
            self.walk(operand)?;
            self.infer(operand)?
        };

        let Some(operand_type) = operand_type else {
            return Ok(());
        };
        if let Some(decl) = self.method_of(&operand_type, name)? {
            let shape = RefShape::Selector {
                operand: operand.byte_range(),
                name: name.to_string(),
                operand_type,
            };
            self.record_function(node, shape, &decl);
        }
        Ok(())
    }

    fn resolve_qualified(
        &mut self,
        node: Node<'_>,
        qualifier: &str,
        path: &str,
        name: &str,
    ) -> Result<(), LoadError> {
        let Some(index) = self.loader.package(path)? else {
            return Ok(());
        };
        if let Some(decl) = index.funcs.get(name) {
            let shape = RefShape::Qualified {
                qualifier: qualifier.to_string(),
                name: name.to_string(),
            };
            self.record_function(node, shape, decl);
        } else if index.values.contains_key(name) {
            let site = self.site(
                node,
                RefShape::Qualified {
                    qualifier: qualifier.to_string(),
                    name: name.to_string(),
                },
            );
            self.symbols.record_use(site, Binding::Other);
        }
        Ok(())
    }

    fn index_for(&mut self, package_path: &str) -> Result<Option<Rc<PackageIndex>>, LoadError> {
        if package_path == self.package.path {
            return Ok(Some(Rc::clone(&self.package)));
        }
        self.loader.package(package_path)
    }

    fn method_of(&mut self, ty: &GoType, method: &str) -> Result<Option<Declaration>, LoadError> {
        let Some((path, type_name)) = ty.named_parts() else {
            return Ok(None);
        };
        Ok(self
            .index_for(path)?
            .and_then(|index| index.method(type_name, method).cloned()))
    }

    /// Static type of an expression, when it can be inferred
    fn infer(&mut self, expr: Node<'_>) -> Result<Option<GoType>, LoadError> {
        if let Some(ty) = self.ctx.literal_type(expr, self.source()) {
            return Ok(Some(ty));
        }
        match expr.kind() {
            "identifier" => {
                let name = self.text(expr);
                if let Some(ty) = self.local(name) {
                    return Ok(ty.clone());
                }
                Ok(self.package.values.get(name).cloned().flatten())
            }
            "parenthesized_expression" => match expr.named_child(0) {
                Some(inner) => self.infer(inner),
                None => Ok(None),
            },
            "unary_expression" => {
                let (Some(operator), Some(operand)) = (
                    expr.child_by_field_name("operator"),
                    expr.child_by_field_name("operand"),
                ) else {
                    return Ok(None);
                };
                let inner = self.infer(operand)?;
                Ok(match self.text(operator) {
                    "&" => inner.map(|t| t.pointer_to()),
                    "*" => inner.and_then(|t| t.pointee()),
                    _ => None,
                })
            }
            "call_expression" => {
                let mut results = self.call_results(expr)?;
                Ok(if results.len() == 1 { results.pop() } else { None })
            }
            "selector_expression" => self.infer_selector(expr),
            "index_expression" => match expr.child_by_field_name("operand") {
                Some(operand) => Ok(self.infer(operand)?.and_then(|t| t.slice_elem())),
                None => Ok(None),
            },
            "type_assertion_expression" => Ok(expr
                .child_by_field_name("type")
                .map(|t| self.ctx.canonical(t, self.source()))),
            _ => Ok(None),
        }
    }

    fn infer_selector(&mut self, expr: Node<'_>) -> Result<Option<GoType>, LoadError> {
        let (Some(operand), Some(field)) = (
            expr.child_by_field_name("operand"),
            expr.child_by_field_name("field"),
        ) else {
            return Ok(None);
        };
        let name = self.text(field);
        if operand.kind() == "identifier" {
            let qualifier = self.text(operand);
            if self.local(qualifier).is_none() {
                if let Some(path) = self.ctx.import_path(qualifier).map(str::to_string) {
                    return Ok(self
                        .loader
                        .package(&path)?
                        .and_then(|index| index.values.get(name).cloned().flatten()));
                }
            }
        }
        let Some(base) = self.infer(operand)? else {
            return Ok(None);
        };
        let Some((path, type_name)) = base.named_parts() else {
            return Ok(None);
        };
        Ok(self
            .index_for(path)?
            .and_then(|index| index.field(type_name, name).cloned()))
    }

    /// Result types of a call expression (empty when unknown)
    fn call_results(&mut self, call: Node<'_>) -> Result<Vec<GoType>, LoadError> {
        if let Some(ty) = self.ctx.literal_type(call, self.source()) {
            return Ok(vec![ty]);
        }
        let Some(function) = call.child_by_field_name("function") else {
            return Ok(Vec::new());
        };
        let decl = match function.kind() {
            "identifier" => {
                let name = self.text(function);
                if self.local(name).is_some() {
                    return Ok(Vec::new());
                }
                let package = Rc::clone(&self.package);
                if package.types.contains(name) {
                    return Ok(vec![self.ctx.local_type(name)]);
                }
                match package.funcs.get(name) {
                    Some(decl) => Some(decl.clone()),
                    None => self.dot_imported_func(name)?,
                }
            }
            "selector_expression" => self.selector_callee(function)?,
            "parenthesized_expression" => {
                // Conversion `(*T)(x)` or `(T)(x)`
                return Ok(function
                    .named_child(0)
                    .and_then(|inner| self.ctx.type_from_expression(inner, self.source()))
                    .into_iter()
                    .collect());
            }
            _ => None,
        };
        Ok(decl
            .map(|d| d.results.into_iter().map(|r| r.ty).collect())
            .unwrap_or_default())
    }

    fn selector_callee(&mut self, function: Node<'_>) -> Result<Option<Declaration>, LoadError> {
        let (Some(operand), Some(field)) = (
            function.child_by_field_name("operand"),
            function.child_by_field_name("field"),
        ) else {
            return Ok(None);
        };
        let name = self.text(field);
        if operand.kind() == "identifier" {
            let qualifier = self.text(operand);
            if self.local(qualifier).is_none() {
                if let Some(path) = self.ctx.import_path(qualifier).map(str::to_string) {
                    return Ok(self
                        .loader
                        .package(&path)?
                        .and_then(|index| index.funcs.get(name).cloned()));
                }
            }
        }
        match self.infer(operand)? {
            Some(ty) => self.method_of(&ty, name),
            None => Ok(None),
        }
    }
}

fn expression_list(node: Option<Node<'_>>) -> Vec<Node<'_>> {
    match node {
        Some(list) if list.kind() == "expression_list" => (0..list.named_child_count())
            .filter_map(|i| list.named_child(i))
            .filter(|n| n.kind() != "comment")
            .collect(),
        Some(single) => vec![single],
        None => Vec::new(),
    }
}

fn has_token(node: Node<'_>, token: &str) -> bool {
    (0..node.child_count())
        .filter_map(|i| node.child(i))
        .any(|child| !child.is_named() && child.kind() == token)
}

fn is_bare_identifier(node: Node<'_>) -> bool {
    match node.kind() {
        "identifier" | "field_identifier" => true,
        "literal_element" => {
            node.named_child_count() == 1
                && node.named_child(0).is_some_and(|inner| inner.kind() == "identifier")
        }
        _ => false,
    }
}
