// Property tests for the parser and evaluators
//
// 1. The parser never panics, whatever it is given
// 2. Parsing is deterministic
// 3. Pretty-printing is a fixed point: print(parse(print(parse(s)))) == print(parse(s))
// 4. Both evaluators agree on integer arithmetic, errors included

use proptest::prelude::*;
use sift::config::EvaluatorKind;
use sift::pretty::pretty_print;
use sift::{parse, run, InterpreterOptions};

fn arb_ident() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "total", "xs", "f"]).prop_map(str::to_string)
}

fn arb_int_expr() -> impl Strategy<Value = String> {
    let leaf = (0i64..50).prop_map(|n| n.to_string());
    leaf.prop_recursive(4, 64, 4, |inner| {
        prop_oneof![
            (inner.clone(), prop::sample::select(vec!["+", "-", "*", "/", "%", "^"]), inner.clone())
                .prop_map(|(l, op, r)| format!("{l} {op} {r}")),
            inner.clone().prop_map(|e| format!("({e})")),
            inner.prop_map(|e| format!("-{e}")),
        ]
    })
}

fn arb_expr() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (0i64..1000).prop_map(|n| n.to_string()),
        (0u32..100, 1u32..100).prop_map(|(a, b)| format!("{a}.{b}")),
        arb_ident(),
        "[a-z ]{0,8}".prop_map(|s| format!("\"{s}\"")),
        Just("true".to_string()),
    ];
    leaf.prop_recursive(3, 48, 4, |inner| {
        prop_oneof![
            (inner.clone(), prop::sample::select(vec!["+", "*", "==", "<", "&&", "||"]), inner.clone())
                .prop_map(|(l, op, r)| format!("{l} {op} {r}")),
            (arb_ident(), prop::collection::vec(inner.clone(), 0..3))
                .prop_map(|(f, args)| format!("{f}({})", args.join(", "))),
            prop::collection::vec(inner.clone(), 0..3).prop_map(|xs| format!("[{}]", xs.join(", "))),
            (inner.clone(), arb_ident()).prop_map(|(r, m)| format!("({r}).{m}()")),
            inner.clone().prop_map(|e| format!("!({e})")),
            (arb_ident(), inner).prop_map(|(x, e)| format!("{{ {x} | {e} }}")),
        ]
    })
}

fn arb_program() -> impl Strategy<Value = String> {
    let stmt = prop_oneof![
        arb_expr(),
        (arb_ident(), arb_expr()).prop_map(|(x, e)| format!("{x} := {e}")),
        (arb_ident(), arb_ident(), arb_expr()).prop_map(|(f, x, e)| format!("fn {f}({x}) := {e}")),
    ];
    prop::collection::vec(stmt, 1..5).prop_map(|stmts| {
        let mut program = String::new();
        for stmt in stmts {
            if !program.is_empty() {
                // a line opening with `[` or `(` would continue the one above
                if stmt.starts_with(['[', '(']) {
                    program.push(';');
                }
                program.push('\n');
            }
            program.push_str(&stmt);
        }
        program
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn parser_does_not_panic(source in "\\PC{0,200}") {
        let _ = parse(&source);
    }

    #[test]
    fn parse_is_deterministic(source in arb_program()) {
        let first = parse(&source).map_err(|e| e.to_string());
        let second = parse(&source).map_err(|e| e.to_string());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn generated_programs_parse(source in arb_program()) {
        let parsed = parse(&source);
        prop_assert!(parsed.is_ok(), "{source:?}: {:?}", parsed.err());
    }

    #[test]
    fn pretty_printing_is_a_fixed_point(source in arb_program()) {
        let nodes = parse(&source).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let printed = pretty_print(&nodes);
        let reparsed = parse(&printed).map_err(|e| TestCaseError::fail(format!("{printed:?}: {e}")))?;
        prop_assert_eq!(pretty_print(&reparsed), printed);
    }

    #[test]
    fn evaluators_agree_on_integer_arithmetic(expr in arb_int_expr()) {
        let direct = run(&expr, EvaluatorKind::Direct, InterpreterOptions::default()).map_err(|e| e.to_string());
        let dispatch = run(&expr, EvaluatorKind::Dispatch, InterpreterOptions::default()).map_err(|e| e.to_string());
        prop_assert_eq!(direct, dispatch, "{}", expr);
    }

    #[test]
    fn evaluation_is_deterministic(expr in arb_int_expr()) {
        let once = run(&expr, EvaluatorKind::Dispatch, InterpreterOptions::default()).map_err(|e| e.to_string());
        let twice = run(&expr, EvaluatorKind::Dispatch, InterpreterOptions::default()).map_err(|e| e.to_string());
        prop_assert_eq!(once, twice);
    }
}
