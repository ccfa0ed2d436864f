use std::rc::Rc;

use super::value::{values_equal, Builtin, Env, TypeInfo, Value};
use super::Interpreter;
use crate::interp::format::format_template;
use crate::interp::numeric::{arithmetic, int_range, Num};
use crate::interp::{check_arity, out_of_bounds, resolve_index, write_line, RuntimeError};
use crate::parser::ast::BinOp;

const FUNCTIONS: &[Builtin] = &[
    Builtin { name: "print", func: print },
    Builtin { name: "len", func: len },
    Builtin { name: "type", func: type_of },
    Builtin { name: "str", func: stringify },
    Builtin { name: "range", func: range },
    Builtin { name: "eval", func: eval },
];

const TYPE_NAMES: &[&str] =
    &["Any", "Number", "Int", "Float", "String", "Boolean", "Nothing", "Array", "Object", "Function", "Quoted", "Type"];

pub(super) fn install(globals: &Rc<Env>) {
    for builtin in FUNCTIONS {
        globals.define(builtin.name, Value::Builtin(*builtin));
    }
    for name in TYPE_NAMES {
        let info = TypeInfo { name: name.to_string(), fields: None, variants: Vec::new() };
        globals.define(*name, Value::Type(Rc::new(info)));
    }
}

fn print(interp: &Interpreter, args: &[Value], _env: &Rc<Env>) -> Result<Value, RuntimeError> {
    let line: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    write_line(&interp.out, &line.join(" "));
    Ok(Value::Nothing)
}

fn len(_: &Interpreter, args: &[Value], _env: &Rc<Env>) -> Result<Value, RuntimeError> {
    check_arity("len", 1, args.len())?;
    let n = match &args[0] {
        Value::Array(items) => items.borrow().len(),
        Value::String(s) => s.chars().count(),
        Value::Object(entries) => entries.borrow().len(),
        other => return Err(RuntimeError::type_mismatch(format!("len() is not defined for {}", other.type_name()))),
    };
    Ok(Value::Int(n as i64))
}

fn type_of(_: &Interpreter, args: &[Value], _env: &Rc<Env>) -> Result<Value, RuntimeError> {
    check_arity("type", 1, args.len())?;
    Ok(Value::String(args[0].type_name()))
}

fn stringify(_: &Interpreter, args: &[Value], _env: &Rc<Env>) -> Result<Value, RuntimeError> {
    check_arity("str", 1, args.len())?;
    Ok(Value::String(args[0].to_string()))
}

fn range(_: &Interpreter, args: &[Value], _env: &Rc<Env>) -> Result<Value, RuntimeError> {
    let (start, end) = match args {
        [Value::Int(end)] => (0, *end),
        [Value::Int(start), Value::Int(end)] => (*start, *end),
        [_] | [_, _] => return Err(RuntimeError::type_mismatch("range() expects Int arguments")),
        _ => return Err(RuntimeError::arity(format!("range expects 1 or 2 arguments, got {}", args.len()))),
    };
    Ok(Value::array(int_range(start, end)?.map(Value::Int).collect()))
}

fn eval(interp: &Interpreter, args: &[Value], env: &Rc<Env>) -> Result<Value, RuntimeError> {
    check_arity("eval", 1, args.len())?;
    match &args[0] {
        Value::Quoted(node) => interp.eval(node, env),
        other => Err(RuntimeError::type_mismatch(format!("eval() expects a quoted form, got {}", other.type_name()))),
    }
}

fn expect_int(method: &str, value: &Value) -> Result<i64, RuntimeError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(RuntimeError::type_mismatch(format!(
            "method '{method}' expects an Int argument, got {}",
            other.type_name()
        ))),
    }
}

fn expect_str<'v>(method: &str, value: &'v Value) -> Result<&'v str, RuntimeError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(RuntimeError::type_mismatch(format!(
            "method '{method}' expects a String argument, got {}",
            other.type_name()
        ))),
    }
}

fn expect_bool(method: &str, value: Value) -> Result<bool, RuntimeError> {
    match value {
        Value::Boolean(b) => Ok(b),
        other => Err(RuntimeError::type_mismatch(format!(
            "callback passed to '{method}' must return a Boolean, got {}",
            other.type_name()
        ))),
    }
}

/// Built-in method `name` on `receiver`, or `None` if the receiver kind has no such method.
pub(super) fn call_method(
    interp: &Interpreter,
    receiver: &Value,
    name: &str,
    args: &[Value],
    env: &Rc<Env>,
) -> Option<Result<Value, RuntimeError>> {
    match receiver {
        Value::Array(_) => array_method(interp, receiver, name, args, env),
        Value::String(s) => string_method(s, name, args),
        Value::Object(_) => object_method(receiver, name, args),
        callee if callee.is_callable() && name == "call" => Some(interp.call_value(callee, args.to_vec(), env)),
        _ => None,
    }
}

fn array_method(
    interp: &Interpreter,
    receiver: &Value,
    name: &str,
    args: &[Value],
    env: &Rc<Env>,
) -> Option<Result<Value, RuntimeError>> {
    let Value::Array(items) = receiver else { return None };
    let what = format!("method '{name}'");
    let result = match name {
        "map" => check_arity(&what, 1, args.len()).and_then(|_| {
            let snapshot = items.borrow().clone();
            let mapped = snapshot
                .into_iter()
                .map(|x| interp.call_value(&args[0], vec![x], env))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::array(mapped))
        }),
        "filter" => check_arity(&what, 1, args.len()).and_then(|_| {
            let snapshot = items.borrow().clone();
            let mut kept = Vec::new();
            for x in snapshot {
                if expect_bool(name, interp.call_value(&args[0], vec![x.clone()], env)?)? {
                    kept.push(x);
                }
            }
            Ok(Value::array(kept))
        }),
        "reduce" => check_arity(&what, 2, args.len()).and_then(|_| {
            let snapshot = items.borrow().clone();
            snapshot
                .into_iter()
                .try_fold(args[1].clone(), |acc, x| interp.call_value(&args[0], vec![acc, x], env))
        }),
        "join" => {
            let sep = match args {
                [] => Ok(","),
                [sep] => expect_str(name, sep),
                _ => Err(RuntimeError::arity(format!("{what} expects 0 or 1 arguments, got {}", args.len()))),
            };
            sep.map(|sep| {
                let parts: Vec<String> = items.borrow().iter().map(|v| v.to_string()).collect();
                Value::String(parts.join(sep))
            })
        }
        "push" => check_arity(&what, 1, args.len()).map(|_| {
            items.borrow_mut().push(args[0].clone());
            receiver.clone()
        }),
        "pop" => check_arity(&what, 0, args.len()).map(|_| items.borrow_mut().pop().unwrap_or(Value::Nothing)),
        "format" => check_arity(&what, 1, args.len()).and_then(|_| {
            let template = expect_str(name, &args[0])?;
            let rendered: Vec<String> = items.borrow().iter().map(|v| v.to_string()).collect();
            format_template(template, &rendered).map(Value::String)
        }),
        "at" => check_arity(&what, 1, args.len()).and_then(|_| {
            let i = expect_int(name, &args[0])?;
            let items = items.borrow();
            resolve_index(i, items.len()).map(|i| items[i].clone()).ok_or_else(|| out_of_bounds(i, items.len()))
        }),
        "contains" => check_arity(&what, 1, args.len())
            .map(|_| Value::Boolean(items.borrow().iter().any(|v| values_equal(v, &args[0])))),
        "reverse" => check_arity(&what, 0, args.len()).map(|_| {
            let mut reversed = items.borrow().clone();
            reversed.reverse();
            Value::array(reversed)
        }),
        "sum" => check_arity(&what, 0, args.len()).and_then(|_| {
            items.borrow().iter().try_fold(Value::Int(0), |acc, v| {
                let (Some(a), Some(b)) = (acc.as_num(), v.as_num()) else {
                    return Err(RuntimeError::type_mismatch(format!("sum() expects numbers, got {}", v.type_name())));
                };
                arithmetic(BinOp::Add, a, b).map(Value::from_num)
            })
        }),
        _ => return None,
    };
    Some(result)
}

fn string_method(s: &str, name: &str, args: &[Value]) -> Option<Result<Value, RuntimeError>> {
    let what = format!("method '{name}'");
    let result = match name {
        "upper" => check_arity(&what, 0, args.len()).map(|_| Value::String(s.to_uppercase())),
        "lower" => check_arity(&what, 0, args.len()).map(|_| Value::String(s.to_lowercase())),
        "trim" => check_arity(&what, 0, args.len()).map(|_| Value::string(s.trim())),
        "split" => check_arity(&what, 1, args.len()).and_then(|_| {
            let sep = expect_str(name, &args[0])?;
            let parts: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(sep).map(Value::string).collect()
            };
            Ok(Value::array(parts))
        }),
        "contains" => check_arity(&what, 1, args.len())
            .and_then(|_| expect_str(name, &args[0]).map(|needle| Value::Boolean(s.contains(needle)))),
        "format" => {
            let rendered: Vec<String> = args.iter().map(|v| v.to_string()).collect();
            format_template(s, &rendered).map(Value::String)
        }
        "at" => check_arity(&what, 1, args.len()).and_then(|_| {
            let i = expect_int(name, &args[0])?;
            let chars: Vec<char> = s.chars().collect();
            resolve_index(i, chars.len())
                .map(|i| Value::String(chars[i].to_string()))
                .ok_or_else(|| out_of_bounds(i, chars.len()))
        }),
        _ => return None,
    };
    Some(result)
}

fn object_method(receiver: &Value, name: &str, args: &[Value]) -> Option<Result<Value, RuntimeError>> {
    let Value::Object(entries) = receiver else { return None };
    let what = format!("method '{name}'");
    let result = match name {
        "keys" => check_arity(&what, 0, args.len())
            .map(|_| Value::array(entries.borrow().iter().map(|(k, _)| Value::string(k.as_str())).collect())),
        "values" => check_arity(&what, 0, args.len())
            .map(|_| Value::array(entries.borrow().iter().map(|(_, v)| v.clone()).collect())),
        "at" => check_arity(&what, 1, args.len()).and_then(|_| {
            let key = expect_str(name, &args[0])?;
            Ok(entries.borrow().iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()).unwrap_or(Value::Nothing))
        }),
        "has" => check_arity(&what, 1, args.len()).and_then(|_| {
            let key = expect_str(name, &args[0])?;
            Ok(Value::Boolean(entries.borrow().iter().any(|(k, _)| k == key)))
        }),
        "set" => check_arity(&what, 2, args.len()).and_then(|_| {
            let key = expect_str(name, &args[0])?.to_string();
            let mut entries = entries.borrow_mut();
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = args[1].clone(),
                None => entries.push((key, args[1].clone())),
            }
            Ok(receiver.clone())
        }),
        _ => return None,
    };
    Some(result)
}

/// Numeric view of two operands, or a type mismatch naming the operator.
pub(super) fn numeric_operands(op: BinOp, left: &Value, right: &Value) -> Result<(Num, Num), RuntimeError> {
    match (left.as_num(), right.as_num()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(RuntimeError::type_mismatch(format!(
            "unsupported operand types for '{}': {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
    }
}
