use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use sift::config::{Config, EvaluatorKind};
use sift::diagnostics::{render_error, SiftError};
use sift::typeck::{render_type_errors, TypeChecker, TypeError};

#[derive(Parser)]
#[command(name = "sift", version, about = "Run, inspect and check sift programs")]
struct Cli {
    /// Print the token stream as JSON
    #[arg(long, group = "mode")]
    lexer: bool,

    /// Print the parsed AST as JSON (or as source with --pretty)
    #[arg(long, group = "mode")]
    ast: bool,

    /// Evaluate with the direct interpreter
    #[arg(long, group = "mode")]
    eval: bool,

    /// Evaluate with the dispatch-based interpreter
    #[arg(long = "eval-v2", group = "mode")]
    eval_v2: bool,

    /// Type check and print findings as JSON
    #[arg(long, group = "mode")]
    typecheck: bool,

    /// Indent JSON output; with --ast, print formatted source instead
    #[arg(long)]
    pretty: bool,

    /// Read the program from a file
    #[arg(long, conflicts_with = "expr")]
    file: Option<PathBuf>,

    /// Configuration file (default: ./sift.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "sift=debug" (overrides the config file and RUST_LOG)
    #[arg(long)]
    log: Option<String>,

    /// Program text
    expr: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Lexer,
    Ast,
    Eval(EvaluatorKind),
    Typecheck,
}

impl Cli {
    fn mode(&self, config: &Config) -> Mode {
        if self.lexer {
            Mode::Lexer
        } else if self.ast {
            Mode::Ast
        } else if self.eval {
            Mode::Eval(EvaluatorKind::Direct)
        } else if self.eval_v2 {
            Mode::Eval(EvaluatorKind::Dispatch)
        } else if self.typecheck {
            Mode::Typecheck
        } else {
            Mode::Eval(config.run.evaluator)
        }
    }
}

fn init_logging(cli: &Cli, config: &Config) {
    let filter = cli
        .log
        .clone()
        .or_else(|| config.log.filter.clone())
        .and_then(|f| EnvFilter::try_new(f).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_ansi(false).with_env_filter(filter).init();
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> ExitCode {
    let out = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    match out {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: could not serialize output: {err}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Serialize)]
struct TypedStatement {
    line: usize,
    column: usize,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Serialize)]
struct TypecheckReport<'a> {
    ok: bool,
    errors: &'a [TypeError],
    statements: Vec<TypedStatement>,
}

fn run(cli: &Cli, config: &Config, source: &str) -> ExitCode {
    let parsed = || sift::parse(source).map_err(SiftError::from);
    let fail = |err: SiftError| {
        render_error(source, &err);
        ExitCode::FAILURE
    };

    match cli.mode(config) {
        Mode::Lexer => print_json(&sift::lexer::tokenize(source), cli.pretty),
        Mode::Ast => match parsed() {
            Ok(nodes) if cli.pretty => {
                print!("{}", sift::pretty::pretty_print(&nodes));
                ExitCode::SUCCESS
            }
            Ok(nodes) => print_json(&nodes, false),
            Err(err) => fail(err),
        },
        Mode::Eval(kind) => match sift::run(source, kind, config.interpreter_options()) {
            Ok(value) => {
                println!("{value}");
                ExitCode::SUCCESS
            }
            Err(err) => fail(err),
        },
        Mode::Typecheck => {
            let nodes = match parsed() {
                Ok(nodes) => nodes,
                Err(err) => return fail(err),
            };
            let mut checker = TypeChecker::default();
            let result = checker.check(&nodes);
            let statements = result
                .typed_nodes
                .iter()
                .map(|t| TypedStatement {
                    line: t.node.span.line,
                    column: t.node.span.column,
                    ty: checker.arena().display(t.ty),
                })
                .collect();
            let report = TypecheckReport { ok: result.is_ok(), errors: &result.errors, statements };
            let code = print_json(&report, cli.pretty);
            if result.is_ok() {
                code
            } else {
                render_type_errors(source, &result.errors);
                ExitCode::FAILURE
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = Config::discover(cli.config.as_deref(), &cwd);
    let config = match config {
        Ok(config) => {
            init_logging(&cli, &config);
            config
        }
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let source = match (&cli.file, &cli.expr) {
        (Some(path), _) => match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("error: could not read {}: {err}", path.display());
                return ExitCode::FAILURE;
            }
        },
        (None, Some(expr)) => expr.clone(),
        (None, None) => {
            eprintln!("error: no input; pass an expression or --file PATH");
            return ExitCode::from(2);
        }
    };

    run(&cli, &config, &source)
}
