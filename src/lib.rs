pub mod span;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod pretty;
pub mod types;
pub mod dispatch;
pub mod interp;
pub mod typeck;
pub mod config;

pub use diagnostics::{ErrorKind, ParseError, SiftError};
pub use interp::{DispatchInterpreter, Evaluator, Interpreter, InterpreterOptions, RuntimeError};
pub use parser::parse;
pub use typeck::{create_default_type_environment, CheckResult, TypeChecker};

use config::EvaluatorKind;

/// Parse and run `source` with a fresh interpreter of the given kind, returning the
/// display form of the last statement's value.
pub fn run(source: &str, evaluator: EvaluatorKind, options: InterpreterOptions) -> Result<String, SiftError> {
    match evaluator {
        EvaluatorKind::Direct => Interpreter::with_options(options).eval_source(source).map(|v| v.to_string()),
        EvaluatorKind::Dispatch => DispatchInterpreter::with_options(options).eval_source(source).map(|v| v.to_string()),
    }
}

/// Parse and check `source` against the default type environment.
pub fn check(source: &str) -> Result<(TypeChecker, CheckResult), ParseError> {
    let nodes = parse(source)?;
    let mut checker = TypeChecker::default();
    let result = checker.check(&nodes);
    Ok((checker, result))
}
