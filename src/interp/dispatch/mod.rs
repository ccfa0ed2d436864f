//! Evaluator where every value carries a type tag and every operator, built-in
//! function, built-in method and user function is a generic function resolved by
//! multiple dispatch over those tags.

mod builtins;
pub mod value;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, trace};

use builtins::Registry;
pub use value::{Env, Payload, RuntimeValue};
use value::{Closure, Constructor, Instance};

use super::pattern::try_match;
use super::{check_arity, stdout_sink, Evaluator, InterpreterOptions, OutputSink, RuntimeError};
use crate::dispatch::{DispatchError, DispatchObserver, GenericFunction, Resolution};
use crate::parser::ast::{
    BinOp, Expr, FieldDecl, FunctionDecl, Literal, Node, TypeDecl, TypeDeclBody, TypeExpr, TypeParam, UnaryOp,
};
use crate::span::Spanned;
use crate::types::{is_subtype, TypeArena, TypeDef, TypeId, TypeKind, VariantDef};

pub type NativeFn = fn(&DispatchInterpreter, &[RuntimeValue], &Rc<Env>) -> Result<RuntimeValue, RuntimeError>;

/// The implementation behind one method of a generic function.
pub enum Callable {
    Native(NativeFn),
    User(Rc<UserMethod>),
}

/// A method added by a `fn` declaration.
pub struct UserMethod {
    pub name: String,
    pub params: Vec<String>,
    pub body: Node,
    pub env: Rc<Env>,
}

pub struct DispatchInterpreter {
    arena: Rc<TypeArena>,
    globals: Rc<Env>,
    options: InterpreterOptions,
    out: OutputSink,
    observer: Option<Rc<dyn DispatchObserver>>,
    operators: Registry,
    /// Built-in and user functions share one table, so a declaration can extend `len` or `print`.
    functions: RefCell<Registry>,
    methods: Registry,
}

impl Default for DispatchInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

type TypeVars = HashMap<String, TypeId>;

impl DispatchInterpreter {
    pub fn new() -> Self {
        Self::with_options(InterpreterOptions::default())
    }

    pub fn with_options(options: InterpreterOptions) -> Self {
        Self::build(options, None)
    }

    /// Construct with `observer` attached to every generic function, built-in or declared.
    pub fn with_observer(options: InterpreterOptions, observer: Rc<dyn DispatchObserver>) -> Self {
        Self::build(options, Some(observer))
    }

    fn build(options: InterpreterOptions, observer: Option<Rc<dyn DispatchObserver>>) -> Self {
        let arena = Rc::new(TypeArena::new());
        let make = |name: &str| new_generic(name, options.dispatch_cache, observer.clone());
        let operators = builtins::operators(&arena, &make);
        let functions = builtins::functions(&arena, &make);
        let methods = builtins::methods(&arena, &make);

        let globals = Env::new_root();
        let b = *arena.builtins();
        let type_tag = b.type_;
        for id in [
            b.any, b.number, b.int, b.float, b.string, b.boolean, b.nothing, b.array, b.object, b.function, b.quoted,
            b.type_,
        ] {
            let name = arena.name(id);
            globals.define(name.as_str(), RuntimeValue::new(Payload::Type { id, name: name.clone() }, type_tag));
        }
        for name in functions.keys() {
            globals.define(name.as_str(), RuntimeValue::new(Payload::Generic(name.clone()), b.function));
        }

        Self {
            arena,
            globals,
            options,
            out: stdout_sink(),
            observer,
            operators,
            functions: RefCell::new(functions),
            methods,
        }
    }

    pub fn arena(&self) -> &Rc<TypeArena> {
        &self.arena
    }

    pub fn globals(&self) -> &Rc<Env> {
        &self.globals
    }

    fn new_generic(&self, name: &str) -> GenericFunction<Callable> {
        new_generic(name, self.options.dispatch_cache, self.observer.clone())
    }

    fn type_value(&self, id: TypeId) -> RuntimeValue {
        RuntimeValue::new(Payload::Type { id, name: self.arena.display(id) }, self.arena.builtins().type_)
    }

    pub fn eval(&self, node: &Node, env: &Rc<Env>) -> Result<RuntimeValue, RuntimeError> {
        self.eval_inner(node, env).map_err(|e| e.with_span(node.span))
    }

    fn eval_inner(&self, node: &Node, env: &Rc<Env>) -> Result<RuntimeValue, RuntimeError> {
        let arena = &*self.arena;
        match &node.node {
            Expr::Literal { value } => Ok(match value {
                Literal::Int(n) => RuntimeValue::int(arena, *n),
                Literal::Float(f) => RuntimeValue::float(arena, *f),
                Literal::String(s) => RuntimeValue::string(arena, s.as_str()),
                Literal::Boolean(b) => RuntimeValue::boolean(arena, *b),
            }),
            Expr::Identifier { name } => env.get(name).ok_or_else(|| RuntimeError::undefined_variable(name)),
            Expr::BinaryOp { op, left, right } => {
                let l = self.eval(left, env)?;
                if let Payload::Boolean(b) = l.payload {
                    if (*op == BinOp::And && !b) || (*op == BinOp::Or && b) {
                        return Ok(l);
                    }
                }
                let r = self.eval(right, env)?;
                self.invoke_operator(op.symbol(), vec![l, r], env)
            }
            Expr::UnaryOp { op, operand } => {
                let v = self.eval(operand, env)?;
                let sym = match op {
                    UnaryOp::Neg => "neg",
                    UnaryOp::Not => "!",
                };
                self.invoke_operator(sym, vec![v], env)
            }
            Expr::Assignment { target, value } => self.eval_assignment(target, value, env),
            Expr::FieldAccess { object, field } => {
                let receiver = self.eval(object, env)?;
                self.field_of(&receiver, &field.node)
            }
            Expr::MethodCall { receiver: None, method, args } => {
                let callee = env.get(&method.node).ok_or_else(|| RuntimeError::undefined_variable(&method.node))?;
                let args = self.eval_args(args, env)?;
                self.call_value(&callee, args, env)
            }
            Expr::MethodCall { receiver: Some(receiver), method, args } => {
                let receiver = self.eval(receiver, env)?;
                let args = self.eval_args(args, env)?;
                self.call_method(receiver, &method.node, args, env)
            }
            Expr::Block { params, body } => {
                let closure = Closure {
                    params: params.iter().map(|p| p.name.node.clone()).collect(),
                    body: body.clone(),
                    env: Rc::clone(env),
                };
                Ok(RuntimeValue::new(Payload::Closure(Rc::new(closure)), arena.builtins().function))
            }
            Expr::MatchExpression { scrutinee, arms } => {
                let value = self.eval(scrutinee, env)?;
                for arm in arms {
                    if let Some(bindings) = try_match(&arm.pattern, &value)? {
                        let scope = Env::child(env);
                        for (name, bound) in bindings {
                            scope.define(name, bound);
                        }
                        return self.run_body(&arm.body, &scope);
                    }
                }
                Err(RuntimeError::pattern_match(format!("no matching pattern for {}", value.repr())))
            }
            Expr::TypeInstance { name, fields } => self.instantiate(name, fields, env),
            Expr::TypeDeclaration { decl } => self.declare_type(decl, env),
            Expr::FunctionDeclaration { decl } => self.declare_function(decl, env),
            Expr::CapturePattern { .. } => {
                Err(RuntimeError::pattern_match("capture patterns are only valid inside a match arm or destructuring"))
            }
            Expr::QuotedForm { body } => {
                Ok(RuntimeValue::new(Payload::Quoted(Rc::new(body.as_ref().clone())), arena.builtins().quoted))
            }
            Expr::Array { elements } => Ok(RuntimeValue::array(arena, self.eval_args(elements, env)?)),
            Expr::Object { entries } => {
                let mut out: Vec<(String, RuntimeValue)> = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let value = self.eval(value, env)?;
                    match out.iter_mut().find(|(k, _)| *k == key.node) {
                        Some(slot) => slot.1 = value,
                        None => out.push((key.node.clone(), value)),
                    }
                }
                Ok(RuntimeValue::object(arena, out))
            }
            Expr::KeyValue { .. } => Err(RuntimeError::type_mismatch("key-value pair outside of an object literal")),
        }
    }

    fn eval_args(&self, args: &[Node], env: &Rc<Env>) -> Result<Vec<RuntimeValue>, RuntimeError> {
        args.iter().map(|a| self.eval(a, env)).collect()
    }

    fn eval_assignment(&self, target: &Node, value: &Node, env: &Rc<Env>) -> Result<RuntimeValue, RuntimeError> {
        let v = self.eval(value, env)?;
        match &target.node {
            Expr::Identifier { name } => env.assign(name, v.clone(), self.options.assignment),
            Expr::TypeInstance { .. } => {
                let bindings = try_match(target, &v)?.ok_or_else(|| {
                    RuntimeError::pattern_match(format!("destructuring failed: {} does not match the pattern", v.repr()))
                        .with_span(target.span)
                })?;
                for (name, bound) in bindings {
                    env.assign(&name, bound, self.options.assignment);
                }
            }
            _ => return Err(RuntimeError::type_mismatch("invalid assignment target").with_span(target.span)),
        }
        Ok(v)
    }

    fn run_body(&self, body: &Node, scope: &Rc<Env>) -> Result<RuntimeValue, RuntimeError> {
        match &body.node {
            Expr::Block { params, body: stmts } if params.is_empty() => self.run_statements(stmts, scope),
            _ => self.eval(body, scope),
        }
    }

    fn run_statements(&self, stmts: &[Node], scope: &Rc<Env>) -> Result<RuntimeValue, RuntimeError> {
        let mut last = RuntimeValue::nothing(&self.arena);
        for stmt in stmts {
            last = self.eval(stmt, scope)?;
        }
        Ok(last)
    }

    fn invoke_operator(&self, sym: &str, args: Vec<RuntimeValue>, env: &Rc<Env>) -> Result<RuntimeValue, RuntimeError> {
        let generic = self.operators.get(sym).ok_or_else(|| RuntimeError::method_not_found(sym, "operator"))?;
        let resolution = generic.dispatch(&self.arena, &args)?;
        self.run_method(&resolution, args, env)
    }

    fn invoke_function(&self, name: &str, args: Vec<RuntimeValue>, env: &Rc<Env>) -> Result<RuntimeValue, RuntimeError> {
        let resolution = {
            let functions = self.functions.borrow();
            let generic = functions.get(name).ok_or_else(|| RuntimeError::undefined_variable(name))?;
            generic.dispatch(&self.arena, &args).map_err(|e| arity_mismatch(generic, args.len()).unwrap_or(e.into()))?
        };
        self.run_method(&resolution, args, env)
    }

    fn run_method(
        &self,
        resolution: &Resolution<Callable>,
        args: Vec<RuntimeValue>,
        env: &Rc<Env>,
    ) -> Result<RuntimeValue, RuntimeError> {
        match &resolution.method.implementation {
            Callable::Native(func) => func(self, &args, env),
            Callable::User(method) => {
                trace!(function = %method.name, "invoking user method");
                let scope = Env::child(&method.env);
                for (name, ty) in &resolution.bindings {
                    scope.define(name.as_str(), self.type_value(*ty));
                }
                for (param, arg) in method.params.iter().zip(args) {
                    scope.define(param.as_str(), arg);
                }
                self.run_body(&method.body, &scope)
            }
        }
    }

    fn call_value(&self, callee: &RuntimeValue, args: Vec<RuntimeValue>, env: &Rc<Env>) -> Result<RuntimeValue, RuntimeError> {
        match &callee.payload {
            Payload::Closure(closure) => {
                check_arity("closure", closure.params.len(), args.len())?;
                let scope = Env::child(&closure.env);
                for (param, arg) in closure.params.iter().zip(args) {
                    scope.define(param.as_str(), arg);
                }
                self.run_statements(&closure.body, &scope)
            }
            Payload::Generic(name) => self.invoke_function(name, args, env),
            Payload::Constructor(ctor) => {
                check_arity(&format!("constructor '{}'", ctor.variant), ctor.fields.len(), args.len())?;
                let fields: Vec<(String, RuntimeValue)> =
                    ctor.fields.iter().map(|(name, _)| name.clone()).zip(args).collect();
                for ((name, value), (_, expected)) in fields.iter().zip(&ctor.fields) {
                    self.check_field(&ctor.variant, name, *expected, value)?;
                }
                let inst = Instance { type_name: ctor.type_name.clone(), variant: Some(ctor.variant.clone()), fields };
                Ok(RuntimeValue::new(Payload::Instance(Rc::new(inst)), ctor.type_id))
            }
            _ => Err(RuntimeError::type_mismatch(format!("{} is not callable", self.arena.display(callee.ty())))),
        }
    }

    fn call_method(
        &self,
        receiver: RuntimeValue,
        name: &str,
        args: Vec<RuntimeValue>,
        env: &Rc<Env>,
    ) -> Result<RuntimeValue, RuntimeError> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(receiver.clone());
        full.extend(args.iter().cloned());

        let mut deferred = None;
        if let Some(generic) = self.methods.get(name) {
            match generic.dispatch(&self.arena, &full) {
                Ok(resolution) => return self.run_method(&resolution, full, env),
                Err(err @ DispatchError::NoMethod { .. }) => deferred = Some(err),
                Err(err) => return Err(err.into()),
            }
        }
        if let Some(field) = own_field(&receiver, name).filter(RuntimeValue::is_callable) {
            return self.call_value(&field, args, env);
        }
        if let Some(global) = env.get(name).filter(RuntimeValue::is_callable) {
            return self.call_value(&global, full, env);
        }
        Err(match deferred {
            Some(err) => err.into(),
            None => RuntimeError::method_not_found(name, self.arena.display(receiver.ty())),
        })
    }

    fn field_of(&self, receiver: &RuntimeValue, field: &str) -> Result<RuntimeValue, RuntimeError> {
        if field == "length" {
            let n = match &receiver.payload {
                Payload::Array(data) => Some(data.items().len()),
                Payload::String(s) => Some(s.chars().count()),
                Payload::Object(entries) => Some(entries.borrow().len()),
                _ => None,
            };
            if let Some(n) = n {
                return Ok(RuntimeValue::int(&self.arena, n as i64));
            }
        }
        let type_name = self.arena.display(receiver.ty());
        match &receiver.payload {
            Payload::Instance(_) | Payload::Object(_) => own_field(receiver, field)
                .ok_or_else(|| RuntimeError::field_access(format!("no field '{field}' on {type_name}"))),
            _ => Err(RuntimeError::field_access(format!("cannot access field '{field}' on {type_name}"))),
        }
    }

    fn check_field(&self, owner: &str, field: &str, expected: TypeId, value: &RuntimeValue) -> Result<(), RuntimeError> {
        if is_subtype(&self.arena, value.ty(), expected) {
            return Ok(());
        }
        Err(RuntimeError::type_mismatch(format!(
            "field '{field}' of {owner} expects {}, got {}",
            self.arena.display(expected),
            self.arena.display(value.ty())
        )))
    }

    fn instantiate(
        &self,
        name: &Spanned<String>,
        fields: &[(Spanned<String>, Node)],
        env: &Rc<Env>,
    ) -> Result<RuntimeValue, RuntimeError> {
        let target = env.get(&name.node).map(|v| v.payload);
        let (type_id, type_name, variant, declared) = match target {
            Some(Payload::Type { id, name: type_name }) => match &self.arena.get(id).kind {
                TypeKind::Struct { fields, .. } => (id, type_name, None, fields.clone()),
                _ => {
                    return Err(RuntimeError::type_mismatch(format!(
                        "type '{type_name}' has no fields to instantiate"
                    )));
                }
            },
            Some(Payload::Constructor(ctor)) => {
                (ctor.type_id, ctor.type_name.clone(), Some(ctor.variant.clone()), ctor.fields.clone())
            }
            _ => return Err(RuntimeError::undefined_type(&name.node).with_span(name.span)),
        };
        let display = variant.as_deref().unwrap_or(&type_name).to_string();

        let mut given: Vec<(String, RuntimeValue)> = Vec::with_capacity(fields.len());
        for (field, expr) in fields {
            if !declared.iter().any(|(n, _)| *n == field.node) {
                return Err(RuntimeError::field_access(format!("unknown field '{}' for type {display}", field.node))
                    .with_span(field.span));
            }
            if given.iter().any(|(n, _)| *n == field.node) {
                return Err(RuntimeError::field_access(format!("duplicate field '{}'", field.node))
                    .with_span(field.span));
            }
            given.push((field.node.clone(), self.eval(expr, env)?));
        }

        let mut ordered = Vec::with_capacity(declared.len());
        for (decl, expected) in &declared {
            let idx = given.iter().position(|(n, _)| n == decl).ok_or_else(|| {
                RuntimeError::field_access(format!("missing field '{decl}' for type {display}"))
            })?;
            let (field, value) = given.swap_remove(idx);
            self.check_field(&display, &field, *expected, &value)?;
            ordered.push((field, value));
        }
        let inst = Instance { type_name, variant, fields: ordered };
        Ok(RuntimeValue::new(Payload::Instance(Rc::new(inst)), type_id))
    }

    fn lookup_type(&self, name: &str, vars: &TypeVars, env: &Rc<Env>) -> Option<TypeId> {
        if let Some(id) = vars.get(name) {
            return Some(*id);
        }
        match env.get(name)?.payload {
            Payload::Type { id, .. } => Some(id),
            _ => None,
        }
    }

    fn resolve_type(&self, ty: &Spanned<TypeExpr>, vars: &TypeVars, env: &Rc<Env>) -> Result<TypeId, RuntimeError> {
        let base = self
            .lookup_type(ty.node.name(), vars, env)
            .ok_or_else(|| RuntimeError::undefined_type(ty.node.name()).with_span(ty.span))?;
        match &ty.node {
            TypeExpr::Named(_) => Ok(base),
            TypeExpr::Applied { args, .. } => {
                let args = args.iter().map(|a| self.resolve_type(a, vars, env)).collect::<Result<Vec<_>, _>>()?;
                Ok(self.arena.parametric(base, args))
            }
        }
    }

    /// Type variables for a `[T <: C, ...]` list; constraints may mention earlier variables.
    fn type_params(
        &self,
        params: &[TypeParam],
        env: &Rc<Env>,
    ) -> Result<(TypeVars, Vec<TypeId>), RuntimeError> {
        let mut vars = TypeVars::new();
        let mut ids = Vec::with_capacity(params.len());
        for param in params {
            let constraint = match &param.constraint {
                Some(c) => self.resolve_type(c, &vars, env)?,
                None => self.arena.builtins().any,
            };
            let id = self.arena.type_var(&param.name.node, constraint);
            vars.insert(param.name.node.clone(), id);
            ids.push(id);
        }
        Ok((vars, ids))
    }

    fn resolve_fields(
        &self,
        fields: &[FieldDecl],
        vars: &TypeVars,
        env: &Rc<Env>,
    ) -> Result<Vec<(String, TypeId)>, RuntimeError> {
        fields.iter().map(|f| Ok((f.name.node.clone(), self.resolve_type(&f.ty, vars, env)?))).collect()
    }

    fn declare_type(&self, decl: &TypeDecl, env: &Rc<Env>) -> Result<RuntimeValue, RuntimeError> {
        let name = decl.name.node.clone();
        let (vars, _) = self.type_params(&decl.type_params, env)?;
        let type_params: Vec<String> = decl.type_params.iter().map(|p| p.name.node.clone()).collect();
        let parent = match &decl.parent {
            Some(p) => self.resolve_type(p, &vars, env)?,
            None => self.arena.builtins().any,
        };
        let placeholder = |kind: TypeKind| TypeDef::new(name.as_str(), kind, Some(parent));

        let id = match &decl.body {
            TypeDeclBody::Abstract => self.arena.add(placeholder(TypeKind::Abstract)),
            TypeDeclBody::Concrete => self.arena.add(placeholder(TypeKind::Concrete)),
            TypeDeclBody::Struct { fields } => {
                let id = self.arena.add(placeholder(TypeKind::Struct { type_params: type_params.clone(), fields: vec![] }));
                env.define(name.as_str(), self.type_value(id));
                let fields = self.resolve_fields(fields, &vars, env)?;
                self.arena.redefine(id, placeholder(TypeKind::Struct { type_params, fields }));
                id
            }
            TypeDeclBody::Adt { variants } => {
                let id = self.arena.add(placeholder(TypeKind::Adt { type_params: type_params.clone(), variants: vec![] }));
                env.define(name.as_str(), self.type_value(id));
                let mut defs = Vec::with_capacity(variants.len());
                for variant in variants {
                    let fields = self.resolve_fields(&variant.fields, &vars, env)?;
                    let vname = variant.name.node.clone();
                    let bound = if fields.is_empty() {
                        let inst = Instance { type_name: name.clone(), variant: Some(vname.clone()), fields: vec![] };
                        RuntimeValue::new(Payload::Instance(Rc::new(inst)), id)
                    } else {
                        let ctor = Constructor {
                            type_id: id,
                            type_name: name.clone(),
                            variant: vname.clone(),
                            fields: fields.clone(),
                        };
                        RuntimeValue::new(Payload::Constructor(Rc::new(ctor)), self.arena.builtins().function)
                    };
                    env.define(vname.as_str(), bound);
                    defs.push(VariantDef { name: vname, fields });
                }
                self.arena.redefine(id, placeholder(TypeKind::Adt { type_params, variants: defs }));
                id
            }
        };
        debug!(name = %name, id = id.index(), "declared type");
        let value = self.type_value(id);
        env.define(name, value.clone());
        Ok(value)
    }

    fn declare_function(&self, decl: &FunctionDecl, env: &Rc<Env>) -> Result<RuntimeValue, RuntimeError> {
        let name = decl.name.node.clone();
        let (vars, type_vars) = self.type_params(&decl.type_params, env)?;
        let any = self.arena.builtins().any;
        let signature = decl
            .params
            .iter()
            .map(|p| match &p.annotation {
                Some(annotation) => self.resolve_type(annotation, &vars, env),
                None => Ok(any),
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(function = %name, signature = ?self.arena.display_all(&signature), "adding method");

        let method = Callable::User(Rc::new(UserMethod {
            name: name.clone(),
            params: decl.params.iter().map(|p| p.name.node.clone()).collect(),
            body: decl.body.as_ref().clone(),
            env: Rc::clone(env),
        }));
        {
            let mut functions = self.functions.borrow_mut();
            let generic = functions.remove(&name).unwrap_or_else(|| self.new_generic(&name));
            functions.insert(name.clone(), generic.with_method(type_vars, signature, method));
        }
        let value = RuntimeValue::new(Payload::Generic(name.clone()), self.arena.builtins().function);
        env.define(name, value.clone());
        Ok(value)
    }
}

impl Evaluator for DispatchInterpreter {
    type Value = RuntimeValue;

    fn interpret(&mut self, nodes: &[Node]) -> Result<RuntimeValue, RuntimeError> {
        let mut last = RuntimeValue::nothing(&self.arena);
        for node in nodes {
            trace!(line = node.span.line, "evaluating statement");
            last = self.eval(node, &self.globals)?;
        }
        Ok(last)
    }

    fn set_output(&mut self, sink: OutputSink) {
        self.out = sink;
    }
}

fn new_generic(name: &str, cache: bool, observer: Option<Rc<dyn DispatchObserver>>) -> GenericFunction<Callable> {
    let generic = GenericFunction::new(name).with_cache(cache);
    match observer {
        Some(observer) => generic.with_observer(observer),
        None => generic,
    }
}

/// An arity error when no method of `generic` takes `got` arguments and all share one arity.
fn arity_mismatch(generic: &GenericFunction<Callable>, got: usize) -> Option<RuntimeError> {
    let mut arities = generic.methods().iter().map(|m| m.signature.len());
    let expected = arities.next()?;
    if expected == got || !arities.all(|n| n == expected) {
        return None;
    }
    check_arity(&format!("function '{}'", generic.name()), expected, got).err()
}

fn own_field(receiver: &RuntimeValue, name: &str) -> Option<RuntimeValue> {
    match &receiver.payload {
        Payload::Instance(inst) => inst.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone()),
        Payload::Object(entries) => entries.borrow().iter().find(|(k, _)| k == name).map(|(_, v)| v.clone()),
        _ => None,
    }
}
