//! Tree-walking evaluator over plain host values.
//!
//! Behaviour is decided by the shape of each value: there is no type tag and no
//! method table beyond the built-ins, so a function declaration simply rebinds its
//! name and parameter annotations are ignored.

mod builtins;
pub mod value;

use std::rc::Rc;

use tracing::{debug, trace};

pub use value::{Env, Value};
use value::{values_equal, Closure, Constructor, Function, Instance, TypeInfo};

use super::numeric::{arithmetic, compare, negate, ordering_matches, repeat, Num};
use super::pattern::try_match;
use super::{check_arity, stdout_sink, Evaluator, InterpreterOptions, OutputSink, RuntimeError};
use crate::parser::ast::{BinOp, Expr, FunctionDecl, Literal, Node, TypeDecl, TypeDeclBody, UnaryOp};
use crate::span::Spanned;

pub struct Interpreter {
    globals: Rc<Env>,
    options: InterpreterOptions,
    out: OutputSink,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_options(InterpreterOptions::default())
    }

    pub fn with_options(options: InterpreterOptions) -> Self {
        let globals = Env::new_root();
        builtins::install(&globals);
        Self { globals, options, out: stdout_sink() }
    }

    pub fn globals(&self) -> &Rc<Env> {
        &self.globals
    }

    /// Evaluate one node, attributing any error without a location to `node`.
    pub fn eval(&self, node: &Node, env: &Rc<Env>) -> Result<Value, RuntimeError> {
        self.eval_inner(node, env).map_err(|e| e.with_span(node.span))
    }

    fn eval_inner(&self, node: &Node, env: &Rc<Env>) -> Result<Value, RuntimeError> {
        match &node.node {
            Expr::Literal { value } => Ok(match value {
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(f) => Value::Float(*f),
                Literal::String(s) => Value::String(s.clone()),
                Literal::Boolean(b) => Value::Boolean(*b),
            }),
            Expr::Identifier { name } => env.get(name).ok_or_else(|| RuntimeError::undefined_variable(name)),
            Expr::BinaryOp { op, left, right } if op.is_logical() => self.eval_logical(*op, left, right, env),
            Expr::BinaryOp { op, left, right } => {
                let l = self.eval(left, env)?;
                let r = self.eval(right, env)?;
                binary(*op, &l, &r)
            }
            Expr::UnaryOp { op, operand } => {
                let v = self.eval(operand, env)?;
                match (op, &v) {
                    (UnaryOp::Neg, Value::Int(n)) => negate(Num::Int(*n)).map(Value::from_num),
                    (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
                    (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
                    (op, v) => Err(RuntimeError::type_mismatch(format!(
                        "unsupported operand type for unary '{}': {}",
                        op.symbol(),
                        v.type_name()
                    ))),
                }
            }
            Expr::Assignment { target, value } => self.eval_assignment(target, value, env),
            Expr::FieldAccess { object, field } => {
                let receiver = self.eval(object, env)?;
                field_of(&receiver, &field.node)
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
            Expr::Block { params, body } => Ok(Value::Closure(Rc::new(Closure {
                params: params.iter().map(|p| p.name.node.clone()).collect(),
                body: body.clone(),
                env: Rc::clone(env),
            }))),
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
            Expr::TypeDeclaration { decl } => Ok(self.declare_type(decl, env)),
            Expr::FunctionDeclaration { decl } => Ok(self.declare_function(decl, env)),
            Expr::CapturePattern { .. } => {
                Err(RuntimeError::pattern_match("capture patterns are only valid inside a match arm or destructuring"))
            }
            Expr::QuotedForm { body } => Ok(Value::Quoted(Rc::new(body.as_ref().clone()))),
            Expr::Array { elements } => Ok(Value::array(self.eval_args(elements, env)?)),
            Expr::Object { entries } => {
                let mut out: Vec<(String, Value)> = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let value = self.eval(value, env)?;
                    match out.iter_mut().find(|(k, _)| *k == key.node) {
                        Some(slot) => slot.1 = value,
                        None => out.push((key.node.clone(), value)),
                    }
                }
                Ok(Value::object(out))
            }
            Expr::KeyValue { .. } => Err(RuntimeError::type_mismatch("key-value pair outside of an object literal")),
        }
    }

    fn eval_args(&self, args: &[Node], env: &Rc<Env>) -> Result<Vec<Value>, RuntimeError> {
        args.iter().map(|a| self.eval(a, env)).collect()
    }

    fn eval_logical(&self, op: BinOp, left: &Node, right: &Node, env: &Rc<Env>) -> Result<Value, RuntimeError> {
        let operand = |v: Value| match v {
            Value::Boolean(b) => Ok(b),
            other => Err(RuntimeError::type_mismatch(format!(
                "'{}' expects Boolean operands, got {}",
                op.symbol(),
                other.type_name()
            ))),
        };
        let l = operand(self.eval(left, env)?)?;
        if (op == BinOp::And && !l) || (op == BinOp::Or && l) {
            return Ok(Value::Boolean(l));
        }
        Ok(Value::Boolean(operand(self.eval(right, env)?)?))
    }

    fn eval_assignment(&self, target: &Node, value: &Node, env: &Rc<Env>) -> Result<Value, RuntimeError> {
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

    /// Run a function or match-arm body: a parameterless block executes inline in
    /// `scope`, anything else is evaluated as an expression.
    fn run_body(&self, body: &Node, scope: &Rc<Env>) -> Result<Value, RuntimeError> {
        match &body.node {
            Expr::Block { params, body: stmts } if params.is_empty() => self.run_statements(stmts, scope),
            _ => self.eval(body, scope),
        }
    }

    fn run_statements(&self, stmts: &[Node], scope: &Rc<Env>) -> Result<Value, RuntimeError> {
        let mut last = Value::Nothing;
        for stmt in stmts {
            last = self.eval(stmt, scope)?;
        }
        Ok(last)
    }

    fn call_value(&self, callee: &Value, args: Vec<Value>, env: &Rc<Env>) -> Result<Value, RuntimeError> {
        match callee {
            Value::Closure(closure) => {
                check_arity("closure", closure.params.len(), args.len())?;
                let scope = Env::child(&closure.env);
                for (param, arg) in closure.params.iter().zip(args) {
                    scope.define(param.as_str(), arg);
                }
                self.run_statements(&closure.body, &scope)
            }
            Value::Function(func) => {
                check_arity(&format!("function '{}'", func.name), func.params.len(), args.len())?;
                let scope = Env::child(&func.env);
                for (param, arg) in func.params.iter().zip(args) {
                    scope.define(param.as_str(), arg);
                }
                self.run_body(&func.body, &scope)
            }
            Value::Builtin(builtin) => (builtin.func)(self, &args, env),
            Value::Constructor(ctor) => {
                check_arity(&format!("constructor '{}'", ctor.variant), ctor.fields.len(), args.len())?;
                Ok(Value::Instance(Rc::new(Instance {
                    type_name: ctor.type_name.clone(),
                    variant: Some(ctor.variant.clone()),
                    fields: ctor.fields.iter().cloned().zip(args).collect(),
                })))
            }
            other => Err(RuntimeError::type_mismatch(format!("{} is not callable", other.type_name()))),
        }
    }

    fn call_method(&self, receiver: Value, name: &str, args: Vec<Value>, env: &Rc<Env>) -> Result<Value, RuntimeError> {
        if let Some(result) = builtins::call_method(self, &receiver, name, &args, env) {
            return result;
        }
        if let Some(field) = own_field(&receiver, name).filter(Value::is_callable) {
            return self.call_value(&field, args, env);
        }
        if let Some(global) = env.get(name).filter(Value::is_callable) {
            let mut full = Vec::with_capacity(args.len() + 1);
            full.push(receiver);
            full.extend(args);
            return self.call_value(&global, full, env);
        }
        Err(RuntimeError::method_not_found(name, receiver.type_name()))
    }

    fn instantiate(
        &self,
        name: &Spanned<String>,
        fields: &[(Spanned<String>, Node)],
        env: &Rc<Env>,
    ) -> Result<Value, RuntimeError> {
        let (type_name, variant, declared) = match env.get(&name.node) {
            Some(Value::Type(info)) => match &info.fields {
                Some(declared) => (info.name.clone(), None, declared.clone()),
                None => {
                    return Err(RuntimeError::type_mismatch(format!("type '{}' has no fields to instantiate", info.name)));
                }
            },
            Some(Value::Constructor(ctor)) => (ctor.type_name.clone(), Some(ctor.variant.clone()), ctor.fields.clone()),
            _ => return Err(RuntimeError::undefined_type(&name.node).with_span(name.span)),
        };
        let display = variant.as_deref().unwrap_or(&type_name).to_string();

        let mut given: Vec<(String, Value)> = Vec::with_capacity(fields.len());
        for (field, expr) in fields {
            if !declared.contains(&field.node) {
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
        for decl in &declared {
            let idx = given.iter().position(|(n, _)| n == decl).ok_or_else(|| {
                RuntimeError::field_access(format!("missing field '{decl}' for type {display}"))
            })?;
            ordered.push(given.swap_remove(idx));
        }
        Ok(Value::Instance(Rc::new(Instance { type_name, variant, fields: ordered })))
    }

    fn declare_type(&self, decl: &TypeDecl, env: &Rc<Env>) -> Value {
        let name = decl.name.node.clone();
        let mut info = TypeInfo { name: name.clone(), fields: None, variants: Vec::new() };
        match &decl.body {
            TypeDeclBody::Abstract | TypeDeclBody::Concrete => {}
            TypeDeclBody::Struct { fields } => {
                info.fields = Some(fields.iter().map(|f| f.name.node.clone()).collect());
            }
            TypeDeclBody::Adt { variants } => {
                for variant in variants {
                    let vname = variant.name.node.clone();
                    let bound = if variant.fields.is_empty() {
                        Value::Instance(Rc::new(Instance {
                            type_name: name.clone(),
                            variant: Some(vname.clone()),
                            fields: Vec::new(),
                        }))
                    } else {
                        Value::Constructor(Rc::new(Constructor {
                            type_name: name.clone(),
                            variant: vname.clone(),
                            fields: variant.fields.iter().map(|f| f.name.node.clone()).collect(),
                        }))
                    };
                    env.define(vname.as_str(), bound);
                    info.variants.push(vname);
                }
            }
        }
        debug!(name = %name, "declared type");
        let value = Value::Type(Rc::new(info));
        env.define(name, value.clone());
        value
    }

    fn declare_function(&self, decl: &FunctionDecl, env: &Rc<Env>) -> Value {
        let func = Value::Function(Rc::new(Function {
            name: decl.name.node.clone(),
            params: decl.params.iter().map(|p| p.name.node.clone()).collect(),
            body: decl.body.as_ref().clone(),
            env: Rc::clone(env),
        }));
        env.define(decl.name.node.as_str(), func.clone());
        func
    }
}

impl Evaluator for Interpreter {
    type Value = Value;

    fn interpret(&mut self, nodes: &[Node]) -> Result<Value, RuntimeError> {
        let mut last = Value::Nothing;
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

fn binary(op: BinOp, l: &Value, r: &Value) -> Result<Value, RuntimeError> {
    match (op, l, r) {
        (BinOp::Eq, l, r) => Ok(Value::Boolean(values_equal(l, r))),
        (BinOp::Neq, l, r) => Ok(Value::Boolean(!values_equal(l, r))),
        (BinOp::Add, Value::String(_), _) | (BinOp::Add, _, Value::String(_)) => {
            Ok(Value::String(format!("{l}{r}")))
        }
        (BinOp::Add, Value::Array(a), Value::Array(b)) => {
            let mut joined = a.borrow().clone();
            joined.extend(b.borrow().iter().cloned());
            Ok(Value::array(joined))
        }
        (BinOp::Mul, Value::String(s), Value::Int(n)) | (BinOp::Mul, Value::Int(n), Value::String(s)) => {
            Ok(Value::String(repeat(s, *n)?))
        }
        (op, Value::String(a), Value::String(b)) if op.is_comparison() => {
            Ok(Value::Boolean(ordering_matches(op, Some(a.cmp(b)))))
        }
        (op, l, r) if op.is_comparison() => {
            let (a, b) = builtins::numeric_operands(op, l, r)?;
            Ok(Value::Boolean(compare(op, a, b)))
        }
        (op, l, r) => {
            let (a, b) = builtins::numeric_operands(op, l, r)?;
            arithmetic(op, a, b).map(Value::from_num)
        }
    }
}

/// A value stored directly on the receiver, used for field-held callables.
fn own_field(receiver: &Value, name: &str) -> Option<Value> {
    match receiver {
        Value::Instance(inst) => inst.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone()),
        Value::Object(entries) => entries.borrow().iter().find(|(k, _)| k == name).map(|(_, v)| v.clone()),
        _ => None,
    }
}

fn field_of(receiver: &Value, field: &str) -> Result<Value, RuntimeError> {
    if field == "length" {
        let n = match receiver {
            Value::Array(items) => Some(items.borrow().len()),
            Value::String(s) => Some(s.chars().count()),
            Value::Object(entries) => Some(entries.borrow().len()),
            _ => None,
        };
        if let Some(n) = n {
            return Ok(Value::Int(n as i64));
        }
    }
    match receiver {
        Value::Instance(_) | Value::Object(_) => own_field(receiver, field).ok_or_else(|| {
            RuntimeError::field_access(format!("no field '{field}' on {}", receiver.type_name()))
        }),
        other => Err(RuntimeError::field_access(format!(
            "cannot access field '{field}' on {}",
            other.type_name()
        ))),
    }
}
