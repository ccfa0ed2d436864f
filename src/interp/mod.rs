pub mod cycle;
pub mod direct;
pub mod dispatch;
pub mod env;
pub mod format;
pub mod numeric;
pub mod pattern;

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::diagnostics::{ErrorKind, SiftError};
use crate::dispatch::DispatchError;
use crate::parser::{self, ast::Node};
use crate::span::Span;

pub use direct::Interpreter;
pub use dispatch::DispatchInterpreter;
pub use env::Environment;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String, span: Option<Span> },

    #[error("undefined type '{name}'")]
    UndefinedType { name: String, span: Option<Span> },

    #[error("{msg}")]
    FieldAccess { msg: String, span: Option<Span> },

    #[error("no method '{method}' for {receiver}")]
    MethodNotFound { method: String, receiver: String, span: Option<Span> },

    #[error("{error}")]
    Dispatch { error: DispatchError, span: Option<Span> },

    #[error("{msg}")]
    Arithmetic { msg: String, span: Option<Span> },

    #[error("{msg}")]
    PatternMatch { msg: String, span: Option<Span> },

    #[error("{msg}")]
    TypeMismatch { msg: String, span: Option<Span> },

    #[error("{msg}")]
    Arity { msg: String, span: Option<Span> },

    #[error("{msg}")]
    Format { msg: String, span: Option<Span> },
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::UndefinedVariable { .. } => ErrorKind::UndefinedVariable,
            RuntimeError::UndefinedType { .. } => ErrorKind::UndefinedType,
            RuntimeError::FieldAccess { .. } => ErrorKind::FieldAccess,
            RuntimeError::MethodNotFound { .. } => ErrorKind::MethodNotFound,
            RuntimeError::Dispatch { error, .. } => error.kind(),
            RuntimeError::Arithmetic { .. } => ErrorKind::Arithmetic,
            RuntimeError::PatternMatch { .. } => ErrorKind::PatternMatch,
            RuntimeError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            RuntimeError::Arity { .. } => ErrorKind::Arity,
            RuntimeError::Format { .. } => ErrorKind::Format,
        }
    }

    pub fn span(&self) -> Option<Span> {
        *self.span_slot()
    }

    fn span_slot(&self) -> &Option<Span> {
        match self {
            RuntimeError::UndefinedVariable { span, .. }
            | RuntimeError::UndefinedType { span, .. }
            | RuntimeError::FieldAccess { span, .. }
            | RuntimeError::MethodNotFound { span, .. }
            | RuntimeError::Dispatch { span, .. }
            | RuntimeError::Arithmetic { span, .. }
            | RuntimeError::PatternMatch { span, .. }
            | RuntimeError::TypeMismatch { span, .. }
            | RuntimeError::Arity { span, .. }
            | RuntimeError::Format { span, .. } => span,
        }
    }

    /// Attach `span` unless a more precise location is already recorded.
    pub fn with_span(mut self, at: Span) -> Self {
        let slot = match &mut self {
            RuntimeError::UndefinedVariable { span, .. }
            | RuntimeError::UndefinedType { span, .. }
            | RuntimeError::FieldAccess { span, .. }
            | RuntimeError::MethodNotFound { span, .. }
            | RuntimeError::Dispatch { span, .. }
            | RuntimeError::Arithmetic { span, .. }
            | RuntimeError::PatternMatch { span, .. }
            | RuntimeError::TypeMismatch { span, .. }
            | RuntimeError::Arity { span, .. }
            | RuntimeError::Format { span, .. } => span,
        };
        if slot.is_none() {
            *slot = Some(at);
        }
        self
    }

    pub fn undefined_variable(name: impl Into<String>) -> Self {
        RuntimeError::UndefinedVariable { name: name.into(), span: None }
    }

    pub fn undefined_type(name: impl Into<String>) -> Self {
        RuntimeError::UndefinedType { name: name.into(), span: None }
    }

    pub fn field_access(msg: impl Into<String>) -> Self {
        RuntimeError::FieldAccess { msg: msg.into(), span: None }
    }

    pub fn method_not_found(method: impl Into<String>, receiver: impl Into<String>) -> Self {
        RuntimeError::MethodNotFound { method: method.into(), receiver: receiver.into(), span: None }
    }

    pub fn arithmetic(msg: impl Into<String>) -> Self {
        RuntimeError::Arithmetic { msg: msg.into(), span: None }
    }

    pub fn pattern_match(msg: impl Into<String>) -> Self {
        RuntimeError::PatternMatch { msg: msg.into(), span: None }
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        RuntimeError::TypeMismatch { msg: msg.into(), span: None }
    }

    pub fn arity(msg: impl Into<String>) -> Self {
        RuntimeError::Arity { msg: msg.into(), span: None }
    }

    pub fn format(msg: impl Into<String>) -> Self {
        RuntimeError::Format { msg: msg.into(), span: None }
    }
}

impl From<DispatchError> for RuntimeError {
    fn from(error: DispatchError) -> Self {
        RuntimeError::Dispatch { error, span: None }
    }
}

/// Where `name := value` writes when `name` is not bound in the current scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentScope {
    /// Update the nearest enclosing binding, else define in the current scope.
    #[default]
    Local,
    /// `Environment::set`: update the nearest binding, else define in the root scope.
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterOptions {
    pub assignment: AssignmentScope,
    pub dispatch_cache: bool,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self { assignment: AssignmentScope::Local, dispatch_cache: true }
    }
}

/// Destination for `print`. Shared so a host can keep a handle to what it installed.
pub type OutputSink = Rc<RefCell<Box<dyn Write>>>;

pub fn stdout_sink() -> OutputSink {
    Rc::new(RefCell::new(Box::new(std::io::stdout())))
}

/// Write one `print` line. A failing sink is logged and the program keeps running.
pub(crate) fn write_line(out: &OutputSink, line: &str) {
    if let Err(e) = writeln!(out.borrow_mut(), "{line}") {
        warn!(error = %e, "print output could not be written");
    }
}

/// One evaluation strategy over the AST. Both interpreters keep their global
/// environment between calls, so a host can feed a program statement by statement.
pub trait Evaluator {
    type Value: std::fmt::Display + Clone;

    /// Run every statement in order and return the value of the last one.
    fn interpret(&mut self, nodes: &[Node]) -> Result<Self::Value, RuntimeError>;

    /// Redirect `print` output.
    fn set_output(&mut self, sink: OutputSink);

    fn eval_source(&mut self, source: &str) -> Result<Self::Value, SiftError> {
        let nodes = parser::parse(source)?;
        Ok(self.interpret(&nodes)?)
    }
}

/// `expected` argument(s) for a call named `what`, as an arity error.
pub(crate) fn check_arity(what: &str, expected: usize, got: usize) -> Result<(), RuntimeError> {
    if expected == got {
        return Ok(());
    }
    let plural = if expected == 1 { "" } else { "s" };
    Err(RuntimeError::arity(format!("{what} expects {expected} argument{plural}, got {got}")))
}

/// Resolve an index that may count from the end (`-1` is the last element).
pub(crate) fn resolve_index(i: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let i = if i < 0 { len + i } else { i };
    (0..len).contains(&i).then_some(i as usize)
}

pub(crate) fn out_of_bounds(i: i64, len: usize) -> RuntimeError {
    RuntimeError::field_access(format!("index {i} is out of bounds for length {len}"))
}
