use crate::interp::RuntimeError;
use crate::span::Span;
use thiserror::Error;

/// Error taxonomy shared by every stage. The name is what a CLI prints before the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lex,
    Parse,
    UndefinedVariable,
    UndefinedType,
    FieldAccess,
    MethodNotFound,
    Method,
    MethodAmbiguity,
    Arithmetic,
    PatternMatch,
    TypeMismatch,
    Arity,
    Format,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Lex => "LexError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::UndefinedVariable => "UndefinedVariableError",
            ErrorKind::UndefinedType => "UndefinedTypeError",
            ErrorKind::FieldAccess => "FieldAccessError",
            ErrorKind::MethodNotFound => "MethodNotFoundError",
            ErrorKind::Method => "MethodError",
            ErrorKind::MethodAmbiguity => "MethodAmbiguity",
            ErrorKind::Arithmetic => "ArithmeticError",
            ErrorKind::PatternMatch => "PatternMatchFailure",
            ErrorKind::TypeMismatch => "TypeMismatchError",
            ErrorKind::Arity => "ArityError",
            ErrorKind::Format => "FormatError",
        };
        f.write_str(name)
    }
}

/// A fatal parse failure. Parsing never returns a partial program.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Syntax error: {msg} at line {}, column {}", span.line, span.column)]
pub struct ParseError {
    pub msg: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(msg: impl Into<String>, span: Span) -> Self {
        Self { msg: msg.into(), span }
    }
}

/// Anything the library can fail with end to end.
#[derive(Debug, Error)]
pub enum SiftError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl SiftError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SiftError::Parse(_) => ErrorKind::Parse,
            SiftError::Runtime(err) => err.kind(),
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            SiftError::Parse(err) => Some(err.span),
            SiftError::Runtime(err) => err.span(),
        }
    }
}

/// Render an error with ariadne for terminal output.
pub fn render_error(source: &str, err: &SiftError) {
    use ariadne::{Label, Report, ReportKind, Source};

    let kind = err.kind();
    match err.span() {
        Some(span) if span.end > span.start && span.end <= source.len() => {
            let msg = match err {
                SiftError::Parse(p) => p.msg.clone(),
                SiftError::Runtime(r) => r.to_string(),
            };
            let _ = Report::build(ReportKind::Error, (), span.start)
                .with_message(kind.to_string())
                .with_label(Label::new(span.start..span.end).with_message(msg))
                .finish()
                .eprint(Source::from(source));
        }
        _ => eprintln!("{kind}: {err}"),
    }
}
