//! Static checking without evaluation.
//!
//! The checker walks statements in order, threading a `TypeEnvironment` the way the
//! evaluators thread their global scope. Operator typing is coarse: comparisons and
//! logical operators are `Boolean`, arithmetic takes the left operand's type. Calls go
//! through the same dispatch engine the runtime uses, with function types standing in
//! for method bodies. Findings are collected; `check` never fails.

pub mod env;
pub mod errors;

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::debug;

use crate::dispatch::{DispatchError, GenericFunction};
use crate::parser::ast::*;
use crate::span::{Span, Spanned};
use crate::types::{is_subtype, BuiltinTypes, TypeArena, TypeDef, TypeId, TypeKind, VariantDef};
pub use env::{create_default_type_environment, TypeEnvironment, VariantInfo};
pub use errors::{render_type_errors, CheckErrorKind, TypeError};

type TypeVars = HashMap<String, TypeId>;

/// A top-level statement together with its inferred type.
#[derive(Debug, Clone)]
pub struct TypedNode {
    pub node: Node,
    pub ty: TypeId,
}

#[derive(Debug)]
pub struct CheckResult {
    pub errors: Vec<TypeError>,
    pub typed_nodes: Vec<TypedNode>,
    /// Inferred type of every visited node, keyed by `Span::key`.
    pub types: HashMap<(usize, usize), TypeId>,
}

impl CheckResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn type_at(&self, span: Span) -> Option<TypeId> {
        self.types.get(&span.key()).copied()
    }
}

pub struct TypeChecker {
    env: TypeEnvironment,
    type_vars: TypeVars,
    errors: Vec<TypeError>,
    types: HashMap<(usize, usize), TypeId>,
}

impl TypeChecker {
    pub fn new(env: TypeEnvironment) -> Self {
        Self { env, type_vars: TypeVars::new(), errors: Vec::new(), types: HashMap::new() }
    }

    pub fn env(&self) -> &TypeEnvironment {
        &self.env
    }

    pub fn arena(&self) -> &Rc<TypeArena> {
        self.env.arena()
    }

    /// Check a program. Declarations stay in the environment for later calls.
    pub fn check(&mut self, nodes: &[Node]) -> CheckResult {
        let typed_nodes = nodes.iter().map(|node| TypedNode { node: node.clone(), ty: self.infer_node(node) }).collect();
        debug!(statements = nodes.len(), errors = self.errors.len(), "type check finished");
        CheckResult {
            errors: std::mem::take(&mut self.errors),
            typed_nodes,
            types: std::mem::take(&mut self.types),
        }
    }

    fn builtins(&self) -> BuiltinTypes {
        *self.env.arena().builtins()
    }

    fn display(&self, id: TypeId) -> String {
        self.env.arena().display(id)
    }

    fn report(&mut self, err: TypeError) {
        debug!(kind = ?err.kind, msg = %err.msg, "type error");
        self.errors.push(err);
    }

    fn error(&mut self, kind: CheckErrorKind, msg: impl Into<String>, span: Span) {
        self.report(TypeError::new(kind, msg, span));
    }

    /// Statically known: not `Any`, no type variables, no `Any` element.
    fn is_known(&self, id: TypeId) -> bool {
        let arena = self.env.arena();
        let any = arena.builtins().any;
        if id == any || arena.has_type_vars(id) {
            return false;
        }
        match &arena.get(id).kind {
            TypeKind::Parametric { args, .. } => args.iter().all(|a| self.is_known(*a)),
            _ => true,
        }
    }

    /// Types mentioning unbound variables are only known to be `Any`.
    fn concrete(&self, id: TypeId) -> TypeId {
        if self.env.arena().has_type_vars(id) { self.builtins().any } else { id }
    }

    fn compatible(&self, actual: TypeId, expected: TypeId) -> bool {
        !self.is_known(actual) || is_subtype(self.env.arena(), actual, expected)
    }

    /// Bottom-up type of `node`, recorded in the side table.
    pub fn infer_node(&mut self, node: &Node) -> TypeId {
        let ty = self.infer_expr(node);
        self.types.insert(node.span.key(), ty);
        ty
    }

    /// Infer `node` and report a mismatch unless it is a subtype of `expected`.
    pub fn check_node(&mut self, node: &Node, expected: TypeId, context: &str) -> TypeId {
        let actual = self.infer_node(node);
        if !self.compatible(actual, expected) {
            let err = TypeError::mismatch(self.display(expected), self.display(actual), context, node.span);
            self.report(err);
        }
        actual
    }

    fn infer_expr(&mut self, node: &Node) -> TypeId {
        let b = self.builtins();
        match &node.node {
            Expr::Literal { value } => match value {
                Literal::Int(_) => b.int,
                Literal::Float(_) => b.float,
                Literal::String(_) => b.string,
                Literal::Boolean(_) => b.boolean,
            },
            Expr::Identifier { name } => self.lookup_value(name, node.span),
            Expr::BinaryOp { op, left, right } => {
                let left = self.infer_node(left);
                self.infer_node(right);
                if op.is_comparison() || op.is_logical() { b.boolean } else { left }
            }
            Expr::UnaryOp { op, operand } => {
                let operand = self.infer_node(operand);
                match op {
                    UnaryOp::Not => b.boolean,
                    UnaryOp::Neg => operand,
                }
            }
            Expr::Assignment { target, value } => self.assignment(target, value),
            Expr::FieldAccess { object, field } => {
                let object = self.infer_node(object);
                self.field_type(object, field)
            }
            Expr::MethodCall { receiver: None, method, args } => self.call(&method.node, method.span, args, None),
            Expr::MethodCall { receiver: Some(receiver), method, args } => {
                let receiver = self.infer_node(receiver);
                self.method_call(receiver, method, args)
            }
            Expr::Block { params, body } => {
                self.env.push_scope();
                let params: Vec<TypeId> = params
                    .iter()
                    .map(|p| {
                        let ty = self.param_type(p);
                        self.env.define(p.name.node.clone(), ty);
                        ty
                    })
                    .collect();
                let ret = self.infer_statements(body);
                self.env.pop_scope();
                self.env.arena().function(params, ret)
            }
            Expr::MatchExpression { scrutinee, arms } => {
                let scrutinee = self.infer_node(scrutinee);
                let mut result: Option<TypeId> = None;
                for arm in arms {
                    self.env.push_scope();
                    self.bind_pattern(&arm.pattern, scrutinee);
                    let ty = self.infer_body(&arm.body);
                    self.env.pop_scope();
                    result = Some(match result {
                        Some(acc) => self.env.arena().join(acc, ty),
                        None => ty,
                    });
                }
                result.unwrap_or(b.nothing)
            }
            Expr::TypeInstance { name, fields } => self.instantiate(name, fields, node.span),
            Expr::TypeDeclaration { decl } => {
                self.declare_type(decl);
                b.type_
            }
            Expr::FunctionDeclaration { decl } => self.declare_function(decl),
            Expr::CapturePattern { .. } => {
                self.error(CheckErrorKind::InvalidPattern, "capture pattern outside of a pattern", node.span);
                b.any
            }
            // the body runs later, in whatever scope evaluates it
            Expr::QuotedForm { .. } => b.quoted,
            Expr::Array { elements } => {
                let tys: Vec<TypeId> = elements.iter().map(|e| self.infer_node(e)).collect();
                let element = match tys.split_first() {
                    Some((first, rest)) if rest.iter().all(|t| t == first) => *first,
                    _ => b.any,
                };
                self.env.arena().array_of(element)
            }
            Expr::Object { entries } => {
                for (_, value) in entries {
                    self.infer_node(value);
                }
                b.object
            }
            Expr::KeyValue { key, value } => {
                self.infer_node(key);
                self.infer_node(value);
                b.any
            }
        }
    }

    fn infer_statements(&mut self, body: &[Node]) -> TypeId {
        let mut last = self.builtins().nothing;
        for stmt in body {
            last = self.infer_node(stmt);
        }
        last
    }

    /// Function and arm bodies: a parameterless block runs inline rather than
    /// producing a closure.
    fn infer_body(&mut self, node: &Node) -> TypeId {
        match &node.node {
            Expr::Block { params, body } if params.is_empty() => {
                let ty = self.infer_statements(body);
                self.types.insert(node.span.key(), ty);
                ty
            }
            _ => self.infer_node(node),
        }
    }

    fn lookup_value(&mut self, name: &str, span: Span) -> TypeId {
        let b = self.builtins();
        if let Some(ty) = self.env.lookup(name) {
            return ty;
        }
        if self.env.lookup_type(name).is_some() {
            return b.type_;
        }
        if let Some(generic) = self.env.function(name) {
            return match generic.methods() {
                [only] => only.implementation,
                _ => b.function,
            };
        }
        self.error(CheckErrorKind::UndefinedVariable, format!("undefined variable '{name}'"), span);
        b.any
    }

    fn assignment(&mut self, target: &Node, value: &Node) -> TypeId {
        let ty = self.infer_node(value);
        match &target.node {
            Expr::Identifier { name } => {
                self.env.assign(name, ty);
                self.types.insert(target.span.key(), ty);
            }
            Expr::TypeInstance { .. } | Expr::CapturePattern { .. } => {
                self.bind_pattern(target, ty);
            }
            _ => self.error(CheckErrorKind::InvalidAssignment, "invalid assignment target", target.span),
        }
        ty
    }

    fn field_type(&mut self, object: TypeId, field: &Spanned<String>) -> TypeId {
        let b = self.builtins();
        let def = self.env.arena().get(object);
        let is_array = matches!(&def.kind, TypeKind::Parametric { base, .. } if *base == b.array) || object == b.array;
        if field.node == "length" && (is_array || object == b.string || object == b.object) {
            return b.int;
        }
        match &def.kind {
            TypeKind::Struct { fields, .. } => match fields.iter().find(|(n, _)| *n == field.node) {
                Some((_, ty)) => self.concrete(*ty),
                None => {
                    let msg = format!("type '{}' has no field '{}'", def.name, field.node);
                    self.error(CheckErrorKind::UnknownField, msg, field.span);
                    b.any
                }
            },
            TypeKind::Adt { variants, .. } => {
                let found: Vec<TypeId> = variants
                    .iter()
                    .filter_map(|v| v.fields.iter().find(|(n, _)| *n == field.node).map(|(_, t)| *t))
                    .collect();
                match found.split_first() {
                    None => {
                        let msg = format!("no variant of '{}' has a field '{}'", def.name, field.node);
                        self.error(CheckErrorKind::UnknownField, msg, field.span);
                        b.any
                    }
                    Some((first, rest)) if rest.iter().all(|t| t == first) => self.concrete(*first),
                    Some(_) => b.any,
                }
            }
            _ => b.any,
        }
    }

    /// A global call `name(args)`, or a method call routed to the global function
    /// `name` with the receiver type prepended.
    fn call(&mut self, name: &str, span: Span, args: &[Node], receiver: Option<TypeId>) -> TypeId {
        let b = self.builtins();
        if receiver.is_none() {
            if let Some(local) = self.env.lookup(name) {
                for arg in args {
                    self.infer_node(arg);
                }
                return self.call_result(local);
            }
        }
        let mut arg_types: Vec<TypeId> = receiver.into_iter().collect();
        arg_types.extend(args.iter().map(|a| self.infer_node(a)));

        let Some(generic) = self.env.function(name).cloned() else {
            if self.env.lookup_type(name).is_some() {
                self.error(CheckErrorKind::TypeMismatch, format!("type '{name}' is not callable"), span);
            } else {
                self.error(CheckErrorKind::UndefinedVariable, format!("undefined function '{name}'"), span);
            }
            return b.any;
        };
        self.resolve_call(&generic, &arg_types, args, span)
    }

    fn resolve_call(&mut self, generic: &GenericFunction<TypeId>, arg_types: &[TypeId], args: &[Node], span: Span) -> TypeId {
        let b = self.builtins();
        let arity: Vec<_> = generic.methods().iter().filter(|m| m.signature.len() == arg_types.len()).cloned().collect();
        if arity.is_empty() {
            let mut arities: Vec<usize> = generic.methods().iter().map(|m| m.signature.len()).collect();
            arities.sort_unstable();
            arities.dedup();
            let msg = match arities.as_slice() {
                [n] => format!("function '{}' expects {n} argument(s), got {}", generic.name(), arg_types.len()),
                _ => format!("no method of '{}' takes {} argument(s)", generic.name(), arg_types.len()),
            };
            self.error(CheckErrorKind::Arity, msg, span);
            return b.any;
        }

        // a single plain signature: report each incompatible argument on its own
        if let [only] = arity.as_slice() {
            if only.type_vars.is_empty() {
                // the receiver of a routed method call has no argument node
                let offset = arg_types.len() - args.len();
                for (i, (actual, expected)) in arg_types.iter().zip(&only.signature).enumerate() {
                    if !self.compatible(*actual, *expected) {
                        let at = i.checked_sub(offset).and_then(|i| args.get(i)).map_or(span, |a| a.span);
                        let context = format!("argument {} of '{}'", i + 1, generic.name());
                        let err = TypeError::mismatch(self.display(*expected), self.display(*actual), &context, at);
                        self.report(err);
                    }
                }
                return self.call_result(only.implementation);
            }
        }

        if !arg_types.iter().all(|t| self.is_known(*t)) {
            let rets: Vec<TypeId> = arity.iter().map(|m| self.call_result(m.implementation)).collect();
            return match rets.split_first() {
                Some((first, rest)) if rest.iter().all(|t| t == first) => self.concrete(*first),
                _ => b.any,
            };
        }

        let arena = Rc::clone(self.env.arena());
        match generic.resolve(&arena, arg_types) {
            Ok(resolution) => {
                let ret = self.call_result(resolution.method.implementation);
                self.concrete(arena.substitute(ret, &resolution.bindings))
            }
            Err(err @ DispatchError::Ambiguous { .. }) => {
                self.error(CheckErrorKind::AmbiguousCall, err.to_string(), span);
                b.any
            }
            Err(err) => {
                self.error(CheckErrorKind::NoMatchingMethod, err.to_string(), span);
                b.any
            }
        }
    }

    /// The return type of calling something of type `callee`.
    fn call_result(&self, callee: TypeId) -> TypeId {
        match &self.env.arena().get(callee).kind {
            TypeKind::Function { ret, .. } => *ret,
            _ => self.builtins().any,
        }
    }

    /// Element type of `Array[E]`, if `ty` is one.
    fn element_of(&self, ty: TypeId) -> Option<TypeId> {
        match &self.env.arena().get(ty).kind {
            TypeKind::Parametric { base, args } if *base == self.builtins().array => args.first().copied(),
            _ => None,
        }
    }

    fn method_call(&mut self, receiver: TypeId, method: &Spanned<String>, args: &[Node]) -> TypeId {
        let b = self.builtins();
        let name = method.node.as_str();
        if let Some(ty) = self.builtin_method(receiver, name, args) {
            return ty;
        }
        let own = self.env.arena().get(receiver).field(name);
        if let Some(field) = own {
            for arg in args {
                self.infer_node(arg);
            }
            return self.call_result(field);
        }
        if self.env.function(name).is_some() {
            return self.call(name, method.span, args, Some(receiver));
        }
        for arg in args {
            self.infer_node(arg);
        }
        b.any
    }

    /// Result types of the built-in methods, or `None` if `receiver` has no
    /// built-in method `name`.
    fn builtin_method(&mut self, receiver: TypeId, name: &str, args: &[Node]) -> Option<TypeId> {
        let b = self.builtins();
        let arena = Rc::clone(self.env.arena());
        let is_function = receiver == b.function || matches!(arena.get(receiver).kind, TypeKind::Function { .. });

        let ty = if let Some(element) = self.element_of(receiver).or((receiver == b.array).then_some(b.any)) {
            match name {
                "map" | "reduce" => {
                    let tys = self.infer_args(args);
                    let ret = tys.first().map(|f| self.concrete(self.call_result(*f))).unwrap_or(b.any);
                    if name == "map" { arena.array_of(ret) } else { ret }
                }
                // an array keeps its tag through `push`
                "filter" | "reverse" | "push" => {
                    self.infer_args(args);
                    receiver
                }
                // may be a type variable; a resolved call substitutes it
                "pop" | "at" => {
                    self.infer_args(args);
                    element
                }
                "join" | "format" => {
                    self.infer_args(args);
                    b.string
                }
                "contains" => {
                    self.infer_args(args);
                    b.boolean
                }
                "sum" => {
                    self.infer_args(args);
                    if element == b.int || element == b.float { element } else { b.number }
                }
                _ => return None,
            }
        } else if receiver == b.string {
            let ty = match name {
                "upper" | "lower" | "trim" | "format" | "at" => b.string,
                "split" => arena.array_of(b.string),
                "contains" => b.boolean,
                _ => return None,
            };
            self.infer_args(args);
            ty
        } else if receiver == b.object {
            let ty = match name {
                "keys" => arena.array_of(b.string),
                "values" => arena.array_of(b.any),
                "at" => b.any,
                "has" => b.boolean,
                "set" => b.object,
                _ => return None,
            };
            self.infer_args(args);
            ty
        } else if is_function && name == "call" {
            self.infer_args(args);
            self.call_result(receiver)
        } else {
            return None;
        };
        Some(ty)
    }

    fn infer_args(&mut self, args: &[Node]) -> Vec<TypeId> {
        args.iter().map(|a| self.infer_node(a)).collect()
    }

    fn instantiate(&mut self, name: &Spanned<String>, fields: &[(Spanned<String>, Node)], span: Span) -> TypeId {
        let b = self.builtins();
        if let Some(id) = self.env.lookup_type(&name.node) {
            let def = self.env.arena().get(id);
            if let TypeKind::Struct { fields: declared, .. } = &def.kind {
                self.check_fields(&def.name, declared, fields, span);
                return id;
            }
            self.error(
                CheckErrorKind::TypeMismatch,
                format!("type '{}' has no fields to instantiate", name.node),
                name.span,
            );
        } else if let Some(variant) = self.env.variant(&name.node).cloned() {
            self.check_fields(&name.node, &variant.fields, fields, span);
            return variant.adt;
        } else {
            self.error(CheckErrorKind::UndefinedType, format!("undefined type '{}'", name.node), name.span);
        }
        for (_, value) in fields {
            self.infer_node(value);
        }
        b.any
    }

    /// Literal fields against declared ones: no unknown or repeated fields, none
    /// missing, each value compatible with its declared type.
    fn check_fields(&mut self, owner: &str, declared: &[(String, TypeId)], given: &[(Spanned<String>, Node)], span: Span) {
        let mut seen = HashSet::new();
        for (field, value) in given {
            if !seen.insert(field.node.as_str()) {
                let msg = format!("field '{}' of {owner} is given twice", field.node);
                self.error(CheckErrorKind::DuplicateField, msg, field.span);
            }
            match declared.iter().find(|(n, _)| *n == field.node) {
                Some((_, ty)) => {
                    let expected = self.concrete(*ty);
                    self.check_node(value, expected, &format!("field '{}' of {owner}", field.node));
                }
                None => {
                    self.error(CheckErrorKind::UnknownField, format!("{owner} has no field '{}'", field.node), field.span);
                    self.infer_node(value);
                }
            }
        }
        for (name, _) in declared {
            if !seen.contains(name.as_str()) {
                self.error(CheckErrorKind::MissingField, format!("missing field '{name}' in {owner} literal"), span);
            }
        }
    }

    /// Bind the captures of `pattern` against a value of type `ty`; returns the type
    /// the pattern narrows the value to.
    fn bind_pattern(&mut self, pattern: &Node, ty: TypeId) -> TypeId {
        let b = self.builtins();
        let narrowed = match &pattern.node {
            Expr::CapturePattern { name, pattern: inner } => {
                let bound = match inner {
                    Some(inner) => self.bind_pattern(inner, ty),
                    None => ty,
                };
                if let Some(name) = name {
                    self.env.define(name.clone(), bound);
                }
                bound
            }
            Expr::Literal { .. } => self.infer_expr(pattern),
            Expr::Identifier { name } => match self.env.variant(name) {
                Some(variant) => variant.adt,
                None => {
                    self.error(CheckErrorKind::UnknownVariant, format!("unknown variant '{name}' in pattern"), pattern.span);
                    ty
                }
            },
            Expr::TypeInstance { name, fields } => {
                let declared = match self.env.variant(&name.node) {
                    Some(variant) => Some((variant.adt, variant.fields.clone())),
                    None => self.env.lookup_type(&name.node).and_then(|id| match &self.env.arena().get(id).kind {
                        TypeKind::Struct { fields, .. } => Some((id, fields.clone())),
                        _ => None,
                    }),
                };
                match declared {
                    Some((id, declared)) => {
                        for (field, sub) in fields {
                            let field_ty = match declared.iter().find(|(n, _)| *n == field.node) {
                                Some((_, t)) => self.concrete(*t),
                                None => {
                                    let msg = format!("'{}' has no field '{}'", name.node, field.node);
                                    self.error(CheckErrorKind::UnknownField, msg, field.span);
                                    b.any
                                }
                            };
                            self.bind_pattern(sub, field_ty);
                        }
                        id
                    }
                    None => {
                        let msg = format!("unknown variant or type '{}' in pattern", name.node);
                        self.error(CheckErrorKind::UnknownVariant, msg, name.span);
                        for (_, sub) in fields {
                            self.bind_pattern(sub, b.any);
                        }
                        ty
                    }
                }
            }
            _ => {
                self.error(CheckErrorKind::InvalidPattern, "invalid pattern", pattern.span);
                ty
            }
        };
        self.types.insert(pattern.span.key(), narrowed);
        narrowed
    }

    fn resolve_type(&mut self, ty: &Spanned<TypeExpr>) -> TypeId {
        let name = ty.node.name();
        let base = self.type_vars.get(name).copied().or_else(|| self.env.lookup_type(name));
        let Some(base) = base else {
            self.error(CheckErrorKind::UndefinedType, format!("undefined type '{name}'"), ty.span);
            return self.builtins().any;
        };
        match &ty.node {
            TypeExpr::Named(_) => base,
            TypeExpr::Applied { args, .. } => {
                let args = args.iter().map(|a| self.resolve_type(a)).collect();
                self.env.arena().parametric(base, args)
            }
        }
    }

    fn param_type(&mut self, param: &Param) -> TypeId {
        match &param.annotation {
            Some(annotation) => self.resolve_type(annotation),
            None => self.builtins().any,
        }
    }

    /// Bring `[T <: C, ...]` into scope, returning the previous variables and the new ids.
    fn enter_type_params(&mut self, params: &[TypeParam]) -> (TypeVars, Vec<TypeId>) {
        let saved = self.type_vars.clone();
        let mut ids = Vec::with_capacity(params.len());
        for param in params {
            let constraint = match &param.constraint {
                Some(c) => self.resolve_type(c),
                None => self.builtins().any,
            };
            let id = self.env.arena().type_var(&param.name.node, constraint);
            self.type_vars.insert(param.name.node.clone(), id);
            ids.push(id);
        }
        (saved, ids)
    }

    fn resolve_fields(&mut self, fields: &[FieldDecl]) -> Vec<(String, TypeId)> {
        fields.iter().map(|f| (f.name.node.clone(), self.resolve_type(&f.ty))).collect()
    }

    fn declare_type(&mut self, decl: &TypeDecl) -> TypeId {
        let arena = Rc::clone(self.env.arena());
        let name = decl.name.node.clone();
        let (saved, vars) = self.enter_type_params(&decl.type_params);
        let type_params: Vec<String> = decl.type_params.iter().map(|p| p.name.node.clone()).collect();
        let parent = match &decl.parent {
            Some(p) => self.resolve_type(p),
            None => arena.builtins().any,
        };
        let placeholder = |kind: TypeKind| TypeDef::new(name.as_str(), kind, Some(parent));

        let id = match &decl.body {
            TypeDeclBody::Abstract => arena.add(placeholder(TypeKind::Abstract)),
            TypeDeclBody::Concrete => arena.add(placeholder(TypeKind::Concrete)),
            TypeDeclBody::Struct { fields } => {
                let id = arena.add(placeholder(TypeKind::Struct { type_params: type_params.clone(), fields: vec![] }));
                self.env.define_type(name.as_str(), id);
                let fields = self.resolve_fields(fields);
                arena.redefine(id, placeholder(TypeKind::Struct { type_params, fields }));
                id
            }
            TypeDeclBody::Adt { variants } => {
                let id = arena.add(placeholder(TypeKind::Adt { type_params: type_params.clone(), variants: vec![] }));
                self.env.define_type(name.as_str(), id);
                let mut defs = Vec::with_capacity(variants.len());
                for variant in variants {
                    let fields = self.resolve_fields(&variant.fields);
                    let vname = variant.name.node.clone();
                    if fields.is_empty() {
                        self.env.define(vname.as_str(), id);
                    } else {
                        let signature: Vec<TypeId> = fields.iter().map(|(_, t)| *t).collect();
                        let constructor = arena.function(signature.clone(), id);
                        self.env.add_method(&vname, vars.clone(), signature, constructor);
                    }
                    self.env.define_variant(vname.as_str(), VariantInfo { adt: id, fields: fields.clone() });
                    defs.push(VariantDef { name: vname, fields });
                }
                arena.redefine(id, placeholder(TypeKind::Adt { type_params, variants: defs }));
                id
            }
        };
        self.type_vars = saved;
        self.env.define_type(name.as_str(), id);
        debug!(name = %name, id = id.index(), "checked type declaration");
        id
    }

    fn declare_function(&mut self, decl: &FunctionDecl) -> TypeId {
        let arena = Rc::clone(self.env.arena());
        let name = decl.name.node.as_str();
        let (saved, type_vars) = self.enter_type_params(&decl.type_params);
        let params: Vec<TypeId> = decl.params.iter().map(|p| self.param_type(p)).collect();

        // registered before the body is checked so the body may recurse
        let provisional = arena.function(params.clone(), arena.builtins().any);
        self.env.add_method(name, type_vars.clone(), params.clone(), provisional);

        self.env.push_scope();
        for (param, ty) in decl.params.iter().zip(&params) {
            self.env.define(param.name.node.clone(), *ty);
        }
        let ret = self.infer_body(&decl.body);
        self.env.pop_scope();
        self.type_vars = saved;

        let function_type = arena.function(params.clone(), ret);
        self.env.add_method(name, type_vars, params, function_type);
        debug!(function = %name, ty = %arena.display(function_type), "checked function declaration");
        function_type
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new(create_default_type_environment())
    }
}
