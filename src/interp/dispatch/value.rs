use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::dispatch::Tagged;
use crate::interp::cycle::{Visit, CYCLE_MARKER};
use crate::interp::env::Environment;
use crate::interp::format::{quote, render_array, render_instance, render_object};
use crate::interp::numeric::{format_float, Num};
use crate::interp::pattern::Matchable;
use crate::parser::ast::{Literal, Node};
use crate::pretty::pretty_expr;
use crate::types::{TypeArena, TypeId};

pub type Env = Environment<RuntimeValue>;

/// A value paired with its runtime type tag. Every value the dispatch evaluator
/// produces is tagged; method resolution reads nothing else.
#[derive(Clone)]
pub struct RuntimeValue {
    pub payload: Payload,
    ty: TypeId,
}

#[derive(Clone)]
pub enum Payload {
    Nothing,
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Array(Rc<ArrayData>),
    Object(Rc<RefCell<Vec<(String, RuntimeValue)>>>),
    Instance(Rc<Instance>),
    Closure(Rc<Closure>),
    /// A named generic function; its methods live in the interpreter's registry.
    Generic(String),
    Constructor(Rc<Constructor>),
    Type { id: TypeId, name: String },
    Quoted(Rc<Node>),
}

/// Array storage shared between aliases. The tag is fixed when the array is built;
/// `push` and `pop` change the elements in place and leave it as it was.
pub struct ArrayData {
    items: RefCell<Vec<RuntimeValue>>,
    tag: TypeId,
}

impl ArrayData {
    pub fn items(&self) -> Ref<'_, Vec<RuntimeValue>> {
        self.items.borrow()
    }

    pub fn snapshot(&self) -> Vec<RuntimeValue> {
        self.items.borrow().clone()
    }

    /// Mutate the elements in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<RuntimeValue>) -> R) -> R {
        f(&mut *self.items.borrow_mut())
    }
}

#[derive(Clone)]
pub struct Instance {
    pub type_name: String,
    pub variant: Option<String>,
    pub fields: Vec<(String, RuntimeValue)>,
}

pub struct Closure {
    pub params: Vec<String>,
    pub body: Vec<Node>,
    pub env: Rc<Env>,
}

/// Builds a field-carrying ADT variant; field types are checked on construction.
pub struct Constructor {
    pub type_id: TypeId,
    pub type_name: String,
    pub variant: String,
    pub fields: Vec<(String, TypeId)>,
}

/// `Array[E]` where `E` is the tag shared by every element, else `Any`.
pub fn array_tag(arena: &TypeArena, items: &[RuntimeValue]) -> TypeId {
    let any = arena.builtins().any;
    let element = match items.split_first() {
        Some((first, rest)) if rest.iter().all(|v| v.ty() == first.ty()) => first.ty(),
        _ => any,
    };
    arena.array_of(element)
}

impl RuntimeValue {
    pub fn new(payload: Payload, ty: TypeId) -> Self {
        Self { payload, ty }
    }

    pub fn nothing(arena: &TypeArena) -> Self {
        Self::new(Payload::Nothing, arena.builtins().nothing)
    }

    pub fn int(arena: &TypeArena, n: i64) -> Self {
        Self::new(Payload::Int(n), arena.builtins().int)
    }

    pub fn float(arena: &TypeArena, f: f64) -> Self {
        Self::new(Payload::Float(f), arena.builtins().float)
    }

    pub fn string(arena: &TypeArena, s: impl Into<String>) -> Self {
        Self::new(Payload::String(s.into()), arena.builtins().string)
    }

    pub fn boolean(arena: &TypeArena, b: bool) -> Self {
        Self::new(Payload::Boolean(b), arena.builtins().boolean)
    }

    pub fn number(arena: &TypeArena, n: Num) -> Self {
        match n {
            Num::Int(i) => Self::int(arena, i),
            Num::Float(f) => Self::float(arena, f),
        }
    }

    pub fn array(arena: &TypeArena, items: Vec<RuntimeValue>) -> Self {
        let tag = array_tag(arena, &items);
        let data = ArrayData { items: RefCell::new(items), tag };
        Self::new(Payload::Array(Rc::new(data)), arena.builtins().array)
    }

    pub fn object(arena: &TypeArena, entries: Vec<(String, RuntimeValue)>) -> Self {
        Self::new(Payload::Object(Rc::new(RefCell::new(entries))), arena.builtins().object)
    }

    /// The runtime type tag. Arrays report the tag they were built with.
    pub fn ty(&self) -> TypeId {
        match &self.payload {
            Payload::Array(data) => data.tag,
            _ => self.ty,
        }
    }

    pub fn as_num(&self) -> Option<Num> {
        match self.payload {
            Payload::Int(n) => Some(Num::Int(n)),
            Payload::Float(f) => Some(Num::Float(f)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.payload {
            Payload::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self.payload,
            Payload::Closure(_) | Payload::Generic(_) | Payload::Constructor(_)
        )
    }

    pub fn repr(&self) -> String {
        match &self.payload {
            Payload::String(s) => quote(s),
            _ => self.to_string(),
        }
    }
}

impl Tagged for RuntimeValue {
    fn type_tag(&self) -> Option<TypeId> {
        Some(self.ty())
    }
}

pub fn values_equal(a: &RuntimeValue, b: &RuntimeValue) -> bool {
    match (&a.payload, &b.payload) {
        (Payload::Nothing, Payload::Nothing) => true,
        (Payload::String(x), Payload::String(y)) => x == y,
        (Payload::Boolean(x), Payload::Boolean(y)) => x == y,
        (Payload::Array(x), Payload::Array(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let Some(_visit) = Visit::enter_pair(x, y) else { return true };
            let (x, y) = (x.items(), y.items());
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| values_equal(a, b))
        }
        (Payload::Object(x), Payload::Object(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let Some(_visit) = Visit::enter_pair(x, y) else { return true };
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.iter().any(|(k2, v2)| k == k2 && values_equal(v, v2)))
        }
        (Payload::Instance(x), Payload::Instance(y)) => {
            a.ty == b.ty
                && x.variant == y.variant
                && x.fields.len() == y.fields.len()
                && x.fields.iter().zip(&y.fields).all(|((k, v), (k2, v2))| k == k2 && values_equal(v, v2))
        }
        (Payload::Closure(x), Payload::Closure(y)) => Rc::ptr_eq(x, y),
        (Payload::Generic(x), Payload::Generic(y)) => x == y,
        (Payload::Constructor(x), Payload::Constructor(y)) => Rc::ptr_eq(x, y),
        (Payload::Type { id: x, .. }, Payload::Type { id: y, .. }) => x == y,
        (Payload::Quoted(x), Payload::Quoted(y)) => x.node == y.node,
        _ => match (a.as_num(), b.as_num()) {
            (Some(x), Some(y)) => x.as_f64() == y.as_f64(),
            _ => false,
        },
    }
}

impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other)
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Nothing => write!(f, "nothing"),
            Payload::Int(n) => write!(f, "{n}"),
            Payload::Float(x) => write!(f, "{}", format_float(*x)),
            Payload::String(s) => write!(f, "{s}"),
            Payload::Boolean(b) => write!(f, "{b}"),
            Payload::Array(data) => {
                let Some(_visit) = Visit::enter(data) else { return write!(f, "{CYCLE_MARKER}") };
                let items: Vec<String> = data.items().iter().map(RuntimeValue::repr).collect();
                write!(f, "{}", render_array(&items))
            }
            Payload::Object(entries) => {
                let Some(_visit) = Visit::enter(entries) else { return write!(f, "{CYCLE_MARKER}") };
                let entries: Vec<(String, String)> =
                    entries.borrow().iter().map(|(k, v)| (k.clone(), v.repr())).collect();
                write!(f, "{}", render_object(&entries))
            }
            Payload::Instance(inst) => {
                let fields: Vec<(String, String)> = inst.fields.iter().map(|(k, v)| (k.clone(), v.repr())).collect();
                let name = inst.variant.as_deref().unwrap_or(&inst.type_name);
                let unit = inst.variant.is_some() && fields.is_empty();
                write!(f, "{}", render_instance(name, &fields, unit))
            }
            Payload::Closure(c) => write!(f, "<closure/{}>", c.params.len()),
            Payload::Generic(name) => write!(f, "<fn {name}>"),
            Payload::Constructor(c) => write!(f, "<constructor {}>", c.variant),
            Payload::Type { name, .. } => write!(f, "{name}"),
            Payload::Quoted(node) => write!(f, "#({})", pretty_expr(&node.node)),
        }
    }
}

impl fmt::Debug for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr())
    }
}

impl Matchable for RuntimeValue {
    fn equals_literal(&self, literal: &Literal) -> bool {
        match (&self.payload, literal) {
            (Payload::Int(a), Literal::Int(b)) => a == b,
            (Payload::Float(a), Literal::Float(b)) => a == b,
            (Payload::String(a), Literal::String(b)) => a == b,
            (Payload::Boolean(a), Literal::Boolean(b)) => a == b,
            _ => false,
        }
    }

    fn variant_name(&self) -> Option<&str> {
        match &self.payload {
            Payload::Instance(inst) => inst.variant.as_deref(),
            _ => None,
        }
    }

    fn instance_fields(&self, name: &str) -> Option<Vec<(String, Self)>> {
        let Payload::Instance(inst) = &self.payload else { return None };
        let matches = match &inst.variant {
            Some(variant) => variant == name,
            None => inst.type_name == name,
        };
        matches.then(|| inst.fields.clone())
    }
}
