use super::RuntimeError;
use crate::parser::ast::{Expr, Literal, Node};

/// What the matcher needs to know about a runtime value.
pub trait Matchable: Clone {
    /// Strict literal equality: same primitive kind and same value.
    fn equals_literal(&self, literal: &Literal) -> bool;

    /// ADT variant name, if the value is a variant instance.
    fn variant_name(&self) -> Option<&str>;

    /// Fields of the value if it is an instance of the variant or struct type `name`.
    fn instance_fields(&self, name: &str) -> Option<Vec<(String, Self)>>;
}

/// Match `value` against `pattern`, appending captures to `bindings`.
///
/// Returns `Ok(false)` on a mismatch; `bindings` may then hold partial captures and
/// must be discarded by the caller. Errors are reserved for nodes that are not patterns.
pub fn match_pattern<V: Matchable>(
    pattern: &Node,
    value: &V,
    bindings: &mut Vec<(String, V)>,
) -> Result<bool, RuntimeError> {
    match &pattern.node {
        Expr::CapturePattern { name, pattern: inner } => {
            if let Some(inner) = inner {
                if !match_pattern(inner, value, bindings)? {
                    return Ok(false);
                }
            }
            if let Some(name) = name {
                bindings.push((name.clone(), value.clone()));
            }
            Ok(true)
        }
        Expr::Literal { value: literal } => Ok(value.equals_literal(literal)),
        Expr::Identifier { name } => Ok(value.variant_name() == Some(name.as_str())),
        Expr::TypeInstance { name, fields } => {
            let Some(actual) = value.instance_fields(&name.node) else {
                return Ok(false);
            };
            for (field, sub) in fields {
                let Some((_, field_value)) = actual.iter().find(|(n, _)| *n == field.node) else {
                    return Ok(false);
                };
                if !match_pattern(sub, field_value, bindings)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Err(RuntimeError::pattern_match("invalid pattern").with_span(pattern.span)),
    }
}

/// Match and return the captures only if the whole pattern matched.
pub fn try_match<V: Matchable>(pattern: &Node, value: &V) -> Result<Option<Vec<(String, V)>>, RuntimeError> {
    let mut bindings = Vec::new();
    Ok(match_pattern(pattern, value, &mut bindings)?.then_some(bindings))
}
