//! The built-in registries: operators, global functions and methods, each a
//! generic function per name whose methods are native Rust functions.

use std::collections::HashMap;
use std::rc::Rc;

use super::value::{values_equal, Env, Payload, RuntimeValue};
use super::{Callable, DispatchInterpreter, NativeFn};
use crate::dispatch::GenericFunction;
use crate::interp::format::format_template;
use crate::interp::numeric::{arithmetic, compare, int_range, negate, ordering_matches, repeat, Num};
use crate::interp::{out_of_bounds, resolve_index, write_line, RuntimeError};
use crate::parser::ast::BinOp;
use crate::types::{TypeArena, TypeId};

/// Variadic built-ins are registered once per arity up to this many arguments.
const MAX_VARIADIC: usize = 8;

pub(super) type Registry = HashMap<String, GenericFunction<Callable>>;

struct RegistryBuilder<'a> {
    make: &'a dyn Fn(&str) -> GenericFunction<Callable>,
    table: Registry,
}

impl<'a> RegistryBuilder<'a> {
    fn new(make: &'a dyn Fn(&str) -> GenericFunction<Callable>) -> Self {
        Self { make, table: HashMap::new() }
    }

    fn add(&mut self, name: &str, type_vars: &[TypeId], signature: Vec<TypeId>, func: NativeFn) {
        let generic = self.table.remove(name).unwrap_or_else(|| (self.make)(name));
        self.table.insert(name.to_string(), generic.with_method(type_vars.to_vec(), signature, Callable::Native(func)));
    }

    /// `prefix` followed by `0..=MAX_VARIADIC` arguments of type `rest`.
    fn add_variadic(&mut self, name: &str, prefix: &[TypeId], rest: TypeId, func: NativeFn) {
        for n in 0..=MAX_VARIADIC {
            let mut signature = prefix.to_vec();
            signature.extend(std::iter::repeat_n(rest, n));
            self.add(name, &[], signature, func);
        }
    }
}

pub(super) fn operators(arena: &TypeArena, make: &dyn Fn(&str) -> GenericFunction<Callable>) -> Registry {
    let b = *arena.builtins();
    let mut r = RegistryBuilder::new(make);

    let arith_ops: [(&str, NativeFn); 5] = [("+", add), ("-", sub), ("*", mul), ("%", modulo), ("^", pow)];
    for (sym, func) in arith_ops {
        r.add(sym, &[], vec![b.int, b.int], func);
        r.add(sym, &[], vec![b.number, b.number], func);
    }
    r.add("/", &[], vec![b.number, b.number], div);

    r.add("+", &[], vec![b.string, b.string], concat);
    r.add("+", &[], vec![b.string, b.any], concat);
    r.add("+", &[], vec![b.any, b.string], concat);
    r.add("+", &[], vec![b.array, b.array], concat_arrays);
    r.add("*", &[], vec![b.string, b.int], repeat_string);
    r.add("*", &[], vec![b.int, b.string], repeat_string);

    let comparisons: [(&str, NativeFn); 4] = [("<", lt), (">", gt), ("<=", le), (">=", ge)];
    for (sym, func) in comparisons {
        r.add(sym, &[], vec![b.number, b.number], func);
        r.add(sym, &[], vec![b.string, b.string], func);
    }
    r.add("==", &[], vec![b.any, b.any], eq);
    r.add("!=", &[], vec![b.any, b.any], neq);
    r.add("&&", &[], vec![b.boolean, b.boolean], logical_rhs);
    r.add("||", &[], vec![b.boolean, b.boolean], logical_rhs);

    r.add("neg", &[], vec![b.int], neg);
    r.add("neg", &[], vec![b.float], neg);
    r.add("!", &[], vec![b.boolean], not);
    r.table
}

pub(super) fn functions(arena: &TypeArena, make: &dyn Fn(&str) -> GenericFunction<Callable>) -> Registry {
    let b = *arena.builtins();
    let mut r = RegistryBuilder::new(make);
    r.add_variadic("print", &[], b.any, print);
    r.add("len", &[], vec![b.array], len);
    r.add("len", &[], vec![b.string], len);
    r.add("len", &[], vec![b.object], len);
    r.add("type", &[], vec![b.any], type_of);
    r.add("str", &[], vec![b.any], stringify);
    r.add("range", &[], vec![b.int], range);
    r.add("range", &[], vec![b.int, b.int], range);
    r.add("eval", &[], vec![b.quoted], eval);
    r.table
}

pub(super) fn methods(arena: &TypeArena, make: &dyn Fn(&str) -> GenericFunction<Callable>) -> Registry {
    let b = *arena.builtins();
    let t = arena.type_var("T", b.any);
    let array_t = arena.array_of(t);
    let tv = [t];
    let mut r = RegistryBuilder::new(make);

    r.add("map", &tv, vec![array_t, b.function], map);
    r.add("filter", &tv, vec![array_t, b.function], filter);
    r.add("reduce", &tv, vec![array_t, b.function, b.any], reduce);
    r.add("join", &tv, vec![array_t], join);
    r.add("join", &tv, vec![array_t, b.string], join);
    r.add("push", &tv, vec![array_t, b.any], push);
    r.add("pop", &tv, vec![array_t], pop);
    r.add("format", &tv, vec![array_t, b.string], format_array);
    r.add("at", &tv, vec![array_t, b.int], array_at);
    r.add("contains", &tv, vec![array_t, b.any], array_contains);
    r.add("reverse", &tv, vec![array_t], reverse);
    r.add("sum", &tv, vec![array_t], sum);

    r.add("upper", &[], vec![b.string], upper);
    r.add("lower", &[], vec![b.string], lower);
    r.add("trim", &[], vec![b.string], trim);
    r.add("split", &[], vec![b.string, b.string], split);
    r.add("contains", &[], vec![b.string, b.string], string_contains);
    r.add_variadic("format", &[b.string], b.any, format_string);
    r.add("at", &[], vec![b.string, b.int], string_at);

    r.add("keys", &[], vec![b.object], keys);
    r.add("values", &[], vec![b.object], values);
    r.add("at", &[], vec![b.object, b.string], object_at);
    r.add("has", &[], vec![b.object, b.string], has);
    r.add("set", &[], vec![b.object, b.string, b.any], set);

    r.add_variadic("call", &[b.function], b.any, call);
    r.table
}

type NativeResult = Result<RuntimeValue, RuntimeError>;

fn num(v: &RuntimeValue) -> Result<Num, RuntimeError> {
    v.as_num().ok_or_else(|| RuntimeError::type_mismatch(format!("expected a number, got {v}")))
}

fn text(v: &RuntimeValue) -> Result<&str, RuntimeError> {
    v.as_str().ok_or_else(|| RuntimeError::type_mismatch(format!("expected a String, got {}", v.repr())))
}

fn int(v: &RuntimeValue) -> Result<i64, RuntimeError> {
    match v.payload {
        Payload::Int(n) => Ok(n),
        _ => Err(RuntimeError::type_mismatch(format!("expected an Int, got {}", v.repr()))),
    }
}

fn boolean(v: &RuntimeValue) -> Result<bool, RuntimeError> {
    match v.payload {
        Payload::Boolean(b) => Ok(b),
        _ => Err(RuntimeError::type_mismatch(format!("expected a Boolean, got {}", v.repr()))),
    }
}

fn arith(interp: &DispatchInterpreter, op: BinOp, args: &[RuntimeValue]) -> NativeResult {
    let n = arithmetic(op, num(&args[0])?, num(&args[1])?)?;
    Ok(RuntimeValue::number(&interp.arena, n))
}

fn add(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    arith(interp, BinOp::Add, args)
}

fn sub(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    arith(interp, BinOp::Sub, args)
}

fn mul(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    arith(interp, BinOp::Mul, args)
}

fn div(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    arith(interp, BinOp::Div, args)
}

fn modulo(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    arith(interp, BinOp::Mod, args)
}

fn pow(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    arith(interp, BinOp::Pow, args)
}

fn concat(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    Ok(RuntimeValue::string(&interp.arena, format!("{}{}", args[0], args[1])))
}

fn concat_arrays(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let (Payload::Array(a), Payload::Array(b)) = (&args[0].payload, &args[1].payload) else {
        return Err(RuntimeError::type_mismatch("'+' expects two arrays"));
    };
    let mut joined = a.snapshot();
    joined.extend(b.items().iter().cloned());
    Ok(RuntimeValue::array(&interp.arena, joined))
}

fn repeat_string(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let (s, n) = match (&args[0].payload, &args[1].payload) {
        (Payload::String(s), Payload::Int(n)) | (Payload::Int(n), Payload::String(s)) => (s, *n),
        _ => return Err(RuntimeError::type_mismatch("'*' expects a String and an Int")),
    };
    Ok(RuntimeValue::string(&interp.arena, repeat(s, n)?))
}

fn comparison(interp: &DispatchInterpreter, op: BinOp, args: &[RuntimeValue]) -> NativeResult {
    let result = match (args[0].as_str(), args[1].as_str()) {
        (Some(a), Some(b)) => ordering_matches(op, Some(a.cmp(b))),
        _ => compare(op, num(&args[0])?, num(&args[1])?),
    };
    Ok(RuntimeValue::boolean(&interp.arena, result))
}

fn lt(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    comparison(interp, BinOp::Lt, args)
}

fn gt(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    comparison(interp, BinOp::Gt, args)
}

fn le(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    comparison(interp, BinOp::LtEq, args)
}

fn ge(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    comparison(interp, BinOp::GtEq, args)
}

fn eq(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    Ok(RuntimeValue::boolean(&interp.arena, values_equal(&args[0], &args[1])))
}

fn neq(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    Ok(RuntimeValue::boolean(&interp.arena, !values_equal(&args[0], &args[1])))
}

/// Reached only when the left operand did not short-circuit, so the result is the right one.
fn logical_rhs(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    Ok(RuntimeValue::boolean(&interp.arena, boolean(&args[1])?))
}

fn neg(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    Ok(RuntimeValue::number(&interp.arena, negate(num(&args[0])?)?))
}

fn not(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    Ok(RuntimeValue::boolean(&interp.arena, !boolean(&args[0])?))
}

fn print(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let line: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    write_line(&interp.out, &line.join(" "));
    Ok(RuntimeValue::nothing(&interp.arena))
}

fn len(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let n = match &args[0].payload {
        Payload::Array(data) => data.items().len(),
        Payload::String(s) => s.chars().count(),
        Payload::Object(entries) => entries.borrow().len(),
        _ => return Err(RuntimeError::type_mismatch(format!("len() is not defined for {}", args[0].repr()))),
    };
    Ok(RuntimeValue::int(&interp.arena, n as i64))
}

fn type_of(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    Ok(RuntimeValue::string(&interp.arena, interp.arena.display(args[0].ty())))
}

fn stringify(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    Ok(RuntimeValue::string(&interp.arena, args[0].to_string()))
}

fn range(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let (start, end) = match args {
        [end] => (0, int(end)?),
        [start, end] => (int(start)?, int(end)?),
        _ => return Err(RuntimeError::arity(format!("range expects 1 or 2 arguments, got {}", args.len()))),
    };
    let items = int_range(start, end)?.map(|n| RuntimeValue::int(&interp.arena, n)).collect();
    Ok(RuntimeValue::array(&interp.arena, items))
}

fn eval(interp: &DispatchInterpreter, args: &[RuntimeValue], env: &Rc<Env>) -> NativeResult {
    match &args[0].payload {
        Payload::Quoted(node) => interp.eval(node, env),
        _ => Err(RuntimeError::type_mismatch(format!("eval() expects a quoted form, got {}", args[0].repr()))),
    }
}

fn elements(receiver: &RuntimeValue) -> Result<Vec<RuntimeValue>, RuntimeError> {
    match &receiver.payload {
        Payload::Array(data) => Ok(data.snapshot()),
        _ => Err(RuntimeError::type_mismatch(format!("expected an array, got {}", receiver.repr()))),
    }
}

fn map(interp: &DispatchInterpreter, args: &[RuntimeValue], env: &Rc<Env>) -> NativeResult {
    let mapped = elements(&args[0])?
        .into_iter()
        .map(|x| interp.call_value(&args[1], vec![x], env))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RuntimeValue::array(&interp.arena, mapped))
}

fn filter(interp: &DispatchInterpreter, args: &[RuntimeValue], env: &Rc<Env>) -> NativeResult {
    let mut kept = Vec::new();
    for x in elements(&args[0])? {
        let keep = interp.call_value(&args[1], vec![x.clone()], env)?;
        let keep = boolean(&keep).map_err(|_| {
            RuntimeError::type_mismatch(format!(
                "callback passed to 'filter' must return a Boolean, got {}",
                interp.arena.display(keep.ty())
            ))
        })?;
        if keep {
            kept.push(x);
        }
    }
    Ok(RuntimeValue::array(&interp.arena, kept))
}

fn reduce(interp: &DispatchInterpreter, args: &[RuntimeValue], env: &Rc<Env>) -> NativeResult {
    elements(&args[0])?
        .into_iter()
        .try_fold(args[2].clone(), |acc, x| interp.call_value(&args[1], vec![acc, x], env))
}

fn join(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let sep = match args.get(1) {
        Some(sep) => text(sep)?,
        None => ",",
    };
    let parts: Vec<String> = elements(&args[0])?.iter().map(|v| v.to_string()).collect();
    Ok(RuntimeValue::string(&interp.arena, parts.join(sep)))
}

fn push(_: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    if let Payload::Array(data) = &args[0].payload {
        data.update(|items| items.push(args[1].clone()));
    }
    Ok(args[0].clone())
}

fn pop(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let popped = match &args[0].payload {
        Payload::Array(data) => data.update(|items| items.pop()),
        _ => None,
    };
    Ok(popped.unwrap_or_else(|| RuntimeValue::nothing(&interp.arena)))
}

fn format_array(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let rendered: Vec<String> = elements(&args[0])?.iter().map(|v| v.to_string()).collect();
    let formatted = format_template(text(&args[1])?, &rendered)?;
    Ok(RuntimeValue::string(&interp.arena, formatted))
}

fn array_at(_: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let items = elements(&args[0])?;
    let i = int(&args[1])?;
    resolve_index(i, items.len()).map(|i| items[i].clone()).ok_or_else(|| out_of_bounds(i, items.len()))
}

fn array_contains(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let found = elements(&args[0])?.iter().any(|v| values_equal(v, &args[1]));
    Ok(RuntimeValue::boolean(&interp.arena, found))
}

fn reverse(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let mut items = elements(&args[0])?;
    items.reverse();
    Ok(RuntimeValue::array(&interp.arena, items))
}

fn sum(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let total = elements(&args[0])?.iter().try_fold(Num::Int(0), |acc, v| {
        let n = v.as_num().ok_or_else(|| {
            RuntimeError::type_mismatch(format!("sum() expects numbers, got {}", interp.arena.display(v.ty())))
        })?;
        arithmetic(BinOp::Add, acc, n)
    })?;
    Ok(RuntimeValue::number(&interp.arena, total))
}

fn upper(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    Ok(RuntimeValue::string(&interp.arena, text(&args[0])?.to_uppercase()))
}

fn lower(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    Ok(RuntimeValue::string(&interp.arena, text(&args[0])?.to_lowercase()))
}

fn trim(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    Ok(RuntimeValue::string(&interp.arena, text(&args[0])?.trim()))
}

fn split(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let (s, sep) = (text(&args[0])?, text(&args[1])?);
    let arena = &interp.arena;
    let parts: Vec<RuntimeValue> = if sep.is_empty() {
        s.chars().map(|c| RuntimeValue::string(arena, c.to_string())).collect()
    } else {
        s.split(sep).map(|p| RuntimeValue::string(arena, p)).collect()
    };
    Ok(RuntimeValue::array(arena, parts))
}

fn string_contains(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let found = text(&args[0])?.contains(text(&args[1])?);
    Ok(RuntimeValue::boolean(&interp.arena, found))
}

fn format_string(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let rendered: Vec<String> = args[1..].iter().map(|v| v.to_string()).collect();
    let formatted = format_template(text(&args[0])?, &rendered)?;
    Ok(RuntimeValue::string(&interp.arena, formatted))
}

fn string_at(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let chars: Vec<char> = text(&args[0])?.chars().collect();
    let i = int(&args[1])?;
    resolve_index(i, chars.len())
        .map(|i| RuntimeValue::string(&interp.arena, chars[i].to_string()))
        .ok_or_else(|| out_of_bounds(i, chars.len()))
}

fn entries(receiver: &RuntimeValue) -> Result<Vec<(String, RuntimeValue)>, RuntimeError> {
    match &receiver.payload {
        Payload::Object(entries) => Ok(entries.borrow().clone()),
        _ => Err(RuntimeError::type_mismatch(format!("expected an object, got {}", receiver.repr()))),
    }
}

fn keys(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let keys = entries(&args[0])?.into_iter().map(|(k, _)| RuntimeValue::string(&interp.arena, k)).collect();
    Ok(RuntimeValue::array(&interp.arena, keys))
}

fn values(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let values = entries(&args[0])?.into_iter().map(|(_, v)| v).collect();
    Ok(RuntimeValue::array(&interp.arena, values))
}

fn object_at(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let key = text(&args[1])?;
    let found = entries(&args[0])?.into_iter().find(|(k, _)| k == key).map(|(_, v)| v);
    Ok(found.unwrap_or_else(|| RuntimeValue::nothing(&interp.arena)))
}

fn has(interp: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let key = text(&args[1])?;
    let found = entries(&args[0])?.iter().any(|(k, _)| k == key);
    Ok(RuntimeValue::boolean(&interp.arena, found))
}

fn set(_: &DispatchInterpreter, args: &[RuntimeValue], _: &Rc<Env>) -> NativeResult {
    let key = text(&args[1])?.to_string();
    if let Payload::Object(entries) = &args[0].payload {
        let mut entries = entries.borrow_mut();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = args[2].clone(),
            None => entries.push((key, args[2].clone())),
        }
    }
    Ok(args[0].clone())
}

fn call(interp: &DispatchInterpreter, args: &[RuntimeValue], env: &Rc<Env>) -> NativeResult {
    interp.call_value(&args[0], args[1..].to_vec(), env)
}
