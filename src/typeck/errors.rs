use serde::Serialize;
use thiserror::Error;

use crate::diagnostics::ErrorKind;
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CheckErrorKind {
    UndefinedVariable,
    UndefinedType,
    UnknownField,
    MissingField,
    DuplicateField,
    TypeMismatch,
    Arity,
    NoMatchingMethod,
    AmbiguousCall,
    UnknownVariant,
    InvalidAssignment,
    InvalidPattern,
}

impl CheckErrorKind {
    /// The shared taxonomy entry a checker finding corresponds to.
    pub fn taxonomy(self) -> ErrorKind {
        match self {
            CheckErrorKind::UndefinedVariable => ErrorKind::UndefinedVariable,
            CheckErrorKind::UndefinedType | CheckErrorKind::UnknownVariant => ErrorKind::UndefinedType,
            CheckErrorKind::UnknownField | CheckErrorKind::MissingField | CheckErrorKind::DuplicateField => {
                ErrorKind::FieldAccess
            }
            CheckErrorKind::Arity => ErrorKind::Arity,
            CheckErrorKind::NoMatchingMethod => ErrorKind::Method,
            CheckErrorKind::AmbiguousCall => ErrorKind::MethodAmbiguity,
            CheckErrorKind::InvalidAssignment | CheckErrorKind::InvalidPattern => ErrorKind::PatternMatch,
            CheckErrorKind::TypeMismatch => ErrorKind::TypeMismatch,
        }
    }
}

/// A single finding. The checker collects these; it never fails.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{msg}")]
pub struct TypeError {
    pub kind: CheckErrorKind,
    pub msg: String,
    pub span: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl TypeError {
    pub fn new(kind: CheckErrorKind, msg: impl Into<String>, span: Span) -> Self {
        Self { kind, msg: msg.into(), span, expected: None, actual: None }
    }

    pub fn mismatch(expected: String, actual: String, context: &str, span: Span) -> Self {
        Self {
            kind: CheckErrorKind::TypeMismatch,
            msg: format!("{context}: expected {expected}, found {actual}"),
            span,
            expected: Some(expected),
            actual: Some(actual),
        }
    }
}

/// Render every finding with ariadne, in source order.
pub fn render_type_errors(source: &str, errors: &[TypeError]) {
    use ariadne::{Label, Report, ReportKind, Source};

    let mut sorted: Vec<&TypeError> = errors.iter().collect();
    sorted.sort_by_key(|e| e.span.start);
    for err in sorted {
        let kind = err.kind.taxonomy();
        if err.span.end > err.span.start && err.span.end <= source.len() {
            let _ = Report::build(ReportKind::Error, (), err.span.start)
                .with_message(kind.to_string())
                .with_label(Label::new(err.span.start..err.span.end).with_message(&err.msg))
                .finish()
                .eprint(Source::from(source));
        } else {
            eprintln!("{kind}: {}", err.msg);
        }
    }
}
