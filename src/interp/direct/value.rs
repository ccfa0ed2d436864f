use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::Interpreter;
use crate::interp::cycle::{Visit, CYCLE_MARKER};
use crate::interp::env::Environment;
use crate::interp::format::{quote, render_array, render_instance, render_object};
use crate::interp::numeric::{format_float, Num};
use crate::interp::pattern::Matchable;
use crate::interp::RuntimeError;
use crate::parser::ast::{Literal, Node};
use crate::pretty::pretty_expr;

pub type Env = Environment<Value>;

pub type BuiltinFn = fn(&Interpreter, &[Value], &Rc<Env>) -> Result<Value, RuntimeError>;

/// A plain host value; the direct evaluator decides behaviour from its shape.
#[derive(Clone)]
pub enum Value {
    Nothing,
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    /// Shared and mutable in place (`push`, `pop`).
    Array(Rc<RefCell<Vec<Value>>>),
    /// Ordered entries, shared and mutable in place (`set`).
    Object(Rc<RefCell<Vec<(String, Value)>>>),
    Instance(Rc<Instance>),
    Closure(Rc<Closure>),
    Function(Rc<Function>),
    Builtin(Builtin),
    Constructor(Rc<Constructor>),
    Type(Rc<TypeInfo>),
    Quoted(Rc<Node>),
}

/// A struct instance (`variant == None`) or an ADT variant instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub type_name: String,
    pub variant: Option<String>,
    pub fields: Vec<(String, Value)>,
}

pub struct Closure {
    pub params: Vec<String>,
    pub body: Vec<Node>,
    pub env: Rc<Env>,
}

pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Node,
    pub env: Rc<Env>,
}

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

/// Builds the field-carrying variant `variant` of ADT `type_name`.
#[derive(Debug)]
pub struct Constructor {
    pub type_name: String,
    pub variant: String,
    pub fields: Vec<String>,
}

#[derive(Debug)]
pub struct TypeInfo {
    pub name: String,
    /// Declared field names for struct types.
    pub fields: Option<Vec<String>>,
    pub variants: Vec<String>,
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(entries: Vec<(String, Value)>) -> Self {
        Value::Object(Rc::new(RefCell::new(entries)))
    }

    pub fn as_num(&self) -> Option<Num> {
        match self {
            Value::Int(n) => Some(Num::Int(*n)),
            Value::Float(f) => Some(Num::Float(*f)),
            _ => None,
        }
    }

    pub fn from_num(n: Num) -> Self {
        match n {
            Num::Int(i) => Value::Int(i),
            Num::Float(f) => Value::Float(f),
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Closure(_) | Value::Function(_) | Value::Builtin(_) | Value::Constructor(_)
        )
    }

    /// Runtime type name as reported by `type(x)`.
    pub fn type_name(&self) -> String {
        match self {
            Value::Nothing => "Nothing".into(),
            Value::Int(_) => "Int".into(),
            Value::Float(_) => "Float".into(),
            Value::String(_) => "String".into(),
            Value::Boolean(_) => "Boolean".into(),
            Value::Array(items) => {
                let Some(_visit) = Visit::enter(items) else { return "Array[Any]".into() };
                let items = items.borrow();
                let first = items.first().map(|v| v.type_name());
                let element = match first {
                    Some(t) if items.iter().all(|v| v.type_name() == t) => t,
                    _ => "Any".to_string(),
                };
                format!("Array[{element}]")
            }
            Value::Object(_) => "Object".into(),
            Value::Instance(inst) => inst.type_name.clone(),
            Value::Closure(_) | Value::Function(_) | Value::Builtin(_) | Value::Constructor(_) => {
                "Function".into()
            }
            Value::Type(_) => "Type".into(),
            Value::Quoted(_) => "Quoted".into(),
        }
    }

    /// Display form used inside containers: strings are quoted.
    pub fn repr(&self) -> String {
        match self {
            Value::String(s) => quote(s),
            other => other.to_string(),
        }
    }
}

/// Structural equality; Int and Float compare by numeric value, callables by identity.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Nothing, Value::Nothing) => true,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            // a pair met again inside itself has shown no difference so far
            let Some(_visit) = Visit::enter_pair(x, y) else { return true };
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let Some(_visit) = Visit::enter_pair(x, y) else { return true };
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.iter().any(|(k2, v2)| k == k2 && values_equal(v, v2)))
        }
        (Value::Instance(x), Value::Instance(y)) => {
            x.type_name == y.type_name
                && x.variant == y.variant
                && x.fields.len() == y.fields.len()
                && x.fields.iter().zip(&y.fields).all(|((k, v), (k2, v2))| k == k2 && values_equal(v, v2))
        }
        (Value::Closure(x), Value::Closure(y)) => Rc::ptr_eq(x, y),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Builtin(x), Value::Builtin(y)) => x.name == y.name,
        (Value::Constructor(x), Value::Constructor(y)) => Rc::ptr_eq(x, y),
        (Value::Type(x), Value::Type(y)) => Rc::ptr_eq(x, y),
        (Value::Quoted(x), Value::Quoted(y)) => x.node == y.node,
        (a, b) => match (a.as_num(), b.as_num()) {
            (Some(x), Some(y)) => x.as_f64() == y.as_f64(),
            _ => false,
        },
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nothing => write!(f, "nothing"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::String(s) => write!(f, "{s}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Array(items) => {
                let Some(_visit) = Visit::enter(items) else { return write!(f, "{CYCLE_MARKER}") };
                let items: Vec<String> = items.borrow().iter().map(Value::repr).collect();
                write!(f, "{}", render_array(&items))
            }
            Value::Object(entries) => {
                let Some(_visit) = Visit::enter(entries) else { return write!(f, "{CYCLE_MARKER}") };
                let entries: Vec<(String, String)> =
                    entries.borrow().iter().map(|(k, v)| (k.clone(), v.repr())).collect();
                write!(f, "{}", render_object(&entries))
            }
            Value::Instance(inst) => {
                let fields: Vec<(String, String)> = inst.fields.iter().map(|(k, v)| (k.clone(), v.repr())).collect();
                let name = inst.variant.as_deref().unwrap_or(&inst.type_name);
                let unit = inst.variant.is_some() && fields.is_empty();
                write!(f, "{}", render_instance(name, &fields, unit))
            }
            Value::Closure(c) => write!(f, "<closure/{}>", c.params.len()),
            Value::Function(func) => write!(f, "<fn {}>", func.name),
            Value::Builtin(b) => write!(f, "<fn {}>", b.name),
            Value::Constructor(c) => write!(f, "<constructor {}>", c.variant),
            Value::Type(t) => write!(f, "{}", t.name),
            Value::Quoted(node) => write!(f, "#({})", pretty_expr(&node.node)),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr())
    }
}

impl Matchable for Value {
    fn equals_literal(&self, literal: &Literal) -> bool {
        match (self, literal) {
            (Value::Int(a), Literal::Int(b)) => a == b,
            (Value::Float(a), Literal::Float(b)) => a == b,
            (Value::String(a), Literal::String(b)) => a == b,
            (Value::Boolean(a), Literal::Boolean(b)) => a == b,
            _ => false,
        }
    }

    fn variant_name(&self) -> Option<&str> {
        match self {
            Value::Instance(inst) => inst.variant.as_deref(),
            _ => None,
        }
    }

    fn instance_fields(&self, name: &str) -> Option<Vec<(String, Self)>> {
        let Value::Instance(inst) = self else { return None };
        let matches = match &inst.variant {
            Some(variant) => variant == name,
            None => inst.type_name == name,
        };
        matches.then(|| inst.fields.clone())
    }
}
