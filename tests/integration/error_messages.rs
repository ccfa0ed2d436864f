//! The exact wording users see. Both evaluators share the message text wherever
//! they share the error kind.

mod common;

use common::{eval_direct, eval_dispatch};
use insta::assert_snapshot;

fn parse_error(source: &str) -> String {
    match sift::parse(source) {
        Ok(nodes) => panic!("expected {source:?} to fail, parsed {} statement(s)", nodes.len()),
        Err(e) => e.to_string(),
    }
}

fn runtime_error(source: &str) -> String {
    let direct = eval_direct(source).map_err(|e| e.to_string());
    let dispatch = eval_dispatch(source).map_err(|e| e.to_string());
    match (direct, dispatch) {
        (Err(a), Err(b)) => {
            assert_eq!(a, b, "evaluators word the error for {source:?} differently");
            a
        }
        other => panic!("expected {source:?} to fail in both evaluators, got {other:?}"),
    }
}

fn dispatch_error(source: &str) -> String {
    match eval_dispatch(source) {
        Ok(v) => panic!("expected {source:?} to fail, got {v}"),
        Err(e) => format!("{}: {e}", e.kind()),
    }
}

fn type_errors(source: &str) -> String {
    let (_, result) = sift::check(source).unwrap_or_else(|e| panic!("{e}"));
    result.errors.iter().map(|e| format!("{}: {e}", e.kind.taxonomy())).collect::<Vec<_>>().join("\n")
}

#[test]
fn single_equals() {
    assert_snapshot!(parse_error("x = 1"), @"Syntax error: unexpected '=' (use ':=' for assignment) at line 1, column 3");
}

#[test]
fn reserved_keyword() {
    assert_snapshot!(
        parse_error("trait Show"),
        @"Syntax error: 'trait' is a reserved keyword and cannot start an expression at line 1, column 1"
    );
}

#[test]
fn stray_token_after_expression() {
    assert_snapshot!(parse_error("x := 1\ny := )"), @"Syntax error: unexpected ')' in expression at line 2, column 6");
}

#[test]
fn undefined_variable() {
    assert_snapshot!(runtime_error("total + 1"), @"undefined variable 'total'");
}

#[test]
fn division_by_zero() {
    assert_snapshot!(runtime_error("1 / 0"), @"division by zero");
    assert_snapshot!(runtime_error("1 % 0"), @"modulo by zero");
}

#[test]
fn missing_method() {
    assert_snapshot!(runtime_error("4.nope()"), @"no method 'nope' for Int");
}

#[test]
fn wrong_arity() {
    assert_snapshot!(runtime_error("fn pair(a, b) := [a, b]\npair(1)"), @"function 'pair' expects 2 arguments, got 1");
}

#[test]
fn no_matching_arm() {
    assert_snapshot!(runtime_error("match 5 { 1 => 0 }"), @"no matching pattern for 5");
}

#[test]
fn struct_fields() {
    let decl = "type Point { x: Int, y: Int }\n";
    assert_snapshot!(runtime_error(&format!("{decl}Point {{ x: 1 }}")), @"missing field 'y' for type Point");
    assert_snapshot!(
        runtime_error(&format!("{decl}Point {{ x: 1, y: 2, z: 3 }}")),
        @"unknown field 'z' for type Point"
    );
}

#[test]
fn format_placeholders() {
    assert_snapshot!(
        runtime_error("\"{} {}\".format(1)"),
        @"placeholder 1 is out of range: 1 argument(s) given"
    );
    assert_snapshot!(runtime_error("\"{\".format()"), @"unclosed '{' in format template");
}

#[test]
fn index_out_of_bounds() {
    assert_snapshot!(runtime_error("[1, 2][5]"), @"index 5 is out of bounds for length 2");
}

#[test]
fn dispatch_without_applicable_method() {
    let src = "fn describe(x: Int) := \"int\"\nfn describe(x: Float) := \"float\"\ndescribe(\"s\")";
    assert_snapshot!(dispatch_error(src), @"MethodError: no method of 'describe' matches argument types (String)");
}

#[test]
fn dispatch_ambiguity() {
    let src = "fn f(a: Int, b: Number) := 1\nfn f(a: Number, b: Int) := 2\nf(1, 2)";
    assert_snapshot!(
        dispatch_error(src),
        @"MethodAmbiguity: ambiguous call to 'f' with argument types (Int, Int): candidates (Int, Number) and (Number, Int)"
    );
}

#[test]
fn dispatch_field_type() {
    assert_snapshot!(
        dispatch_error("type P { x: Int }\nP { x: \"a\" }"),
        @"TypeMismatchError: field 'x' of P expects Int, got String"
    );
}

#[test]
fn checker_findings() {
    let src = "type P { a: Int }
fn greet(name: String) := \"hi \" + name
greet(1)
P { a: 1, b: 2 }
nowhere";
    assert_snapshot!(type_errors(src), @r"
    TypeMismatchError: argument 1 of 'greet': expected String, found Int
    FieldAccessError: P has no field 'b'
    UndefinedVariableError: undefined variable 'nowhere'
    ");
}
