//! Number semantics shared by both evaluators.

use super::RuntimeError;
use crate::parser::ast::BinOp;

/// A numeric operand, after the evaluator has unwrapped its value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Num::Int(n) => n == 0,
            Num::Float(f) => f == 0.0,
        }
    }
}

fn overflow(op: BinOp) -> RuntimeError {
    RuntimeError::arithmetic(format!("integer overflow in '{}'", op.symbol()))
}

/// Apply an arithmetic operator. Int op Int stays Int (checked), mixed operands
/// widen to Float, and `/` always produces a Float.
pub fn arithmetic(op: BinOp, a: Num, b: Num) -> Result<Num, RuntimeError> {
    if matches!(op, BinOp::Div | BinOp::Mod) && b.is_zero() {
        let what = if op == BinOp::Div { "division" } else { "modulo" };
        return Err(RuntimeError::arithmetic(format!("{what} by zero")));
    }
    match (op, a, b) {
        (BinOp::Div, a, b) => Ok(Num::Float(a.as_f64() / b.as_f64())),
        (BinOp::Pow, Num::Int(x), Num::Int(y)) if y >= 0 => {
            let exp = u32::try_from(y).map_err(|_| overflow(op))?;
            x.checked_pow(exp).map(Num::Int).ok_or_else(|| overflow(op))
        }
        (BinOp::Pow, a, b) => Ok(Num::Float(a.as_f64().powf(b.as_f64()))),
        (_, Num::Int(x), Num::Int(y)) => {
            let result = match op {
                BinOp::Add => x.checked_add(y),
                BinOp::Sub => x.checked_sub(y),
                BinOp::Mul => x.checked_mul(y),
                BinOp::Mod => x.checked_rem(y),
                _ => return Err(RuntimeError::type_mismatch(format!("'{}' is not arithmetic", op.symbol()))),
            };
            result.map(Num::Int).ok_or_else(|| overflow(op))
        }
        (_, a, b) => {
            let (x, y) = (a.as_f64(), b.as_f64());
            let result = match op {
                BinOp::Add => x + y,
                BinOp::Sub => x - y,
                BinOp::Mul => x * y,
                BinOp::Mod => x % y,
                _ => return Err(RuntimeError::type_mismatch(format!("'{}' is not arithmetic", op.symbol()))),
            };
            Ok(Num::Float(result))
        }
    }
}

/// Numeric comparison for `< > <= >= == !=`; Int and Float compare by value.
pub fn compare(op: BinOp, a: Num, b: Num) -> bool {
    let ordering = match (a, b) {
        (Num::Int(x), Num::Int(y)) => Some(x.cmp(&y)),
        (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
    };
    ordering_matches(op, ordering)
}

pub fn ordering_matches(op: BinOp, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    match (op, ordering) {
        (BinOp::Lt, Some(Less)) => true,
        (BinOp::Gt, Some(Greater)) => true,
        (BinOp::LtEq, Some(Less | Equal)) => true,
        (BinOp::GtEq, Some(Greater | Equal)) => true,
        (BinOp::Eq, Some(Equal)) => true,
        (BinOp::Neq, Some(Less | Greater) | None) => true,
        _ => false,
    }
}

pub fn negate(n: Num) -> Result<Num, RuntimeError> {
    match n {
        Num::Int(x) => x.checked_neg().map(Num::Int).ok_or_else(|| overflow(BinOp::Sub)),
        Num::Float(f) => Ok(Num::Float(-f)),
    }
}

/// Upper bound on the size of a string or array built in one step (`"a" * n`, `range`).
pub const MAX_BUILD_LEN: usize = 1 << 28;

/// `s * n`: repetition, empty for a negative count.
pub fn repeat(s: &str, n: i64) -> Result<String, RuntimeError> {
    let count = usize::try_from(n).unwrap_or(0);
    match s.len().checked_mul(count) {
        Some(len) if len <= MAX_BUILD_LEN => Ok(s.repeat(count)),
        _ => Err(RuntimeError::arithmetic(format!(
            "repeating a string of {} byte(s) {n} times exceeds the limit of {MAX_BUILD_LEN} bytes",
            s.len()
        ))),
    }
}

/// Elements of `start..end`, refusing ranges longer than `MAX_BUILD_LEN`.
pub fn int_range(start: i64, end: i64) -> Result<std::ops::Range<i64>, RuntimeError> {
    let len = end.saturating_sub(start).max(0);
    if len as u64 > MAX_BUILD_LEN as u64 {
        return Err(RuntimeError::arithmetic(format!(
            "range({start}, {end}) has {len} elements, more than the limit of {MAX_BUILD_LEN}"
        )));
    }
    Ok(start..end)
}

/// Display form of a float: Rust's shortest round-trip representation (`2.5`, `5`).
pub fn format_float(f: f64) -> String {
    f.to_string()
}
