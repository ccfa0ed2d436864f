mod common;

use common::eval_dispatch;
use sift::diagnostics::ErrorKind;
use sift::typeck::{CheckErrorKind, TypeError};
use sift::CheckResult;

fn check(source: &str) -> CheckResult {
    sift::check(source).map(|(_, result)| result).unwrap_or_else(|e| panic!("{source:?}: {e}"))
}

fn kinds(source: &str) -> Vec<CheckErrorKind> {
    check(source).errors.iter().map(|e| e.kind).collect()
}

/// Display form of the type of the last statement.
fn type_of_last(source: &str) -> String {
    let (checker, result) = sift::check(source).unwrap_or_else(|e| panic!("{source:?}: {e}"));
    assert!(result.is_ok(), "unexpected errors for {source:?}: {:?}", result.errors);
    let last = result.typed_nodes.last().unwrap_or_else(|| panic!("no statements in {source:?}"));
    checker.arena().display(last.ty)
}

const SHAPES: &str = "abstract Shape
type Circle <: Shape { r: Int }
type Square <: Shape { side: Float }
fn area(c: Circle) := c.r * c.r * 3
fn area(s: Square) := s.side * s.side
";

#[test]
fn well_typed_programs_check_clean_and_run() {
    let programs = [
        format!("{SHAPES}area(Circle {{ r: 2 }})"),
        format!("{SHAPES}area(Square {{ side: 1.5 }})"),
        "fn fact(n: Int) := match n { 0 => 1, ?k => k * fact(k - 1) }\nfact(6)".to_string(),
        "xs := [3, 1, 2]\nxs.reverse().join(\"-\")".to_string(),
        "type Opt = Some(v: Int) | None\nmatch Some(4) { Some { v: ?v } => v * 2, None => 0 }".to_string(),
        "fn first[T](xs: Array[T]) := xs[0]\nfirst([\"a\", \"b\"]).upper()".to_string(),
    ];
    for src in &programs {
        let result = check(src);
        assert!(result.is_ok(), "{src:?}: {:?}", result.errors);
        assert!(eval_dispatch(src).is_ok(), "{src:?} checked clean but failed at runtime");
    }
}

#[test]
fn dispatch_decides_return_types() {
    assert_eq!(type_of_last(&format!("{SHAPES}area(Circle {{ r: 2 }})")), "Int");
    assert_eq!(type_of_last(&format!("{SHAPES}area(Square {{ side: 1.5 }})")), "Float");
}

#[test]
fn type_builtin_returns_a_string() {
    assert_eq!(type_of_last("type(1)"), "String");
    assert_eq!(type_of_last("x := [1]\ntype(x).upper()"), "String");
}

#[test]
fn generic_returns_are_instantiated() {
    assert_eq!(type_of_last("fn first[T](xs: Array[T]) := xs[0]\nfirst([\"a\", \"b\"])"), "String");
    assert_eq!(type_of_last("fn wrap[T](x: T) := [x]\nwrap(1.5)"), "Array[Float]");
}

#[test]
fn builtin_results() {
    assert_eq!(type_of_last("len(\"abc\")"), "Int");
    assert_eq!(type_of_last("range(1, 4)"), "Array[Int]");
    assert_eq!(type_of_last("\"a,b\".split(\",\")"), "Array[String]");
    assert_eq!(type_of_last("[1, 2].contains(1)"), "Boolean");
    assert_eq!(type_of_last("[a: 1].keys()"), "Array[String]");
    assert_eq!(type_of_last("print(1)"), "Nothing");
    assert_eq!(type_of_last("#(1 + 2)"), "Quoted");
}

#[test]
fn match_joins_arm_types() {
    assert_eq!(type_of_last("match 1 { 1 => 2, ? => 3.5 }"), "Number");
    assert_eq!(type_of_last("match 1 { 1 => \"a\", ? => 0 }"), "Any");
}

#[test]
fn closures_have_function_types() {
    assert_eq!(type_of_last("{ x: Int | x + 1 }"), "(Int) -> Int");
    assert_eq!(type_of_last("inc := { x: Int | x + 1 }\ninc(2)"), "Int");
}

#[test]
fn mismatched_argument_is_located() {
    let src = "fn greet(name: String) := \"hi \" + name\ngreet(42)";
    let result = check(src);
    let [err] = result.errors.as_slice() else { panic!("expected one error, got {:?}", result.errors) };
    assert_eq!(err.kind, CheckErrorKind::TypeMismatch);
    assert_eq!(err.to_string(), "argument 1 of 'greet': expected String, found Int");
    assert_eq!(&src[err.span.start..err.span.end], "42");
    assert_eq!(err.span.line, 2);
}

#[test]
fn dispatch_failures_are_reported() {
    assert_eq!(kinds(&format!("{SHAPES}area(3)")), [CheckErrorKind::NoMatchingMethod]);
    let ambiguous = "fn f(a: Int, b: Number) := 1\nfn f(a: Number, b: Int) := 2\nf(1, 2)";
    assert_eq!(kinds(ambiguous), [CheckErrorKind::AmbiguousCall]);
}

#[test]
fn arity_is_checked_before_types() {
    let result = check("len(1, 2)");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, CheckErrorKind::Arity);
    assert!(result.errors[0].msg.contains("expects 1 argument"), "{}", result.errors[0].msg);
}

#[test]
fn struct_literal_problems() {
    let decl = "type P { a: Int, b: String }\n";
    assert_eq!(kinds(&format!("{decl}P {{ a: 1 }}")), [CheckErrorKind::MissingField]);
    assert_eq!(
        kinds(&format!("{decl}P {{ a: 1, a: 2, b: \"x\" }}")),
        [CheckErrorKind::DuplicateField]
    );
    assert_eq!(kinds(&format!("{decl}P {{ a: 1, b: \"x\", c: 0 }}")), [CheckErrorKind::UnknownField]);
    assert_eq!(kinds(&format!("{decl}P {{ a: \"no\", b: \"x\" }}")), [CheckErrorKind::TypeMismatch]);
}

#[test]
fn field_access_is_checked_on_known_types() {
    assert_eq!(kinds("type P { a: Int }\np := P { a: 1 }\np.b"), [CheckErrorKind::UnknownField]);
    assert_eq!(type_of_last("type P { a: Int }\np := P { a: 1 }\np.a"), "Int");
    // nothing is known about an unannotated parameter
    assert!(check("f := { x | x.anything }").is_ok());
}

#[test]
fn every_problem_is_collected() {
    let src = "a := missing_one\nb := missing_two\nc := Nowhere { x: 1 }";
    assert_eq!(
        kinds(src),
        [CheckErrorKind::UndefinedVariable, CheckErrorKind::UndefinedVariable, CheckErrorKind::UndefinedType]
    );
}

#[test]
fn pattern_problems() {
    assert_eq!(kinds("match 1 { Nope => 1 }"), [CheckErrorKind::UnknownVariant]);
    assert_eq!(kinds("?x"), [CheckErrorKind::InvalidPattern]);
    assert_eq!(kinds("type Opt = Some(v: Int) | None\nmatch None { Some { w: ?w } => w }"), [CheckErrorKind::UnknownField]);
}

#[test]
fn findings_map_onto_runtime_kinds() {
    let result = check("missing\nlen(1, 2)");
    let taxonomy: Vec<ErrorKind> = result.errors.iter().map(|e| e.kind.taxonomy()).collect();
    assert_eq!(taxonomy, [ErrorKind::UndefinedVariable, ErrorKind::Arity]);
}

#[test]
fn side_table_covers_sub_expressions() {
    let src = "x := 1 + 2.5";
    let (checker, result) = sift::check(src).unwrap_or_else(|e| panic!("{e}"));
    let nodes = sift::parse(src).unwrap_or_else(|e| panic!("{e}"));
    let sift::parser::ast::Expr::Assignment { value, .. } = &nodes[0].node else { panic!("not an assignment") };
    let ty = result.type_at(value.span).unwrap_or_else(|| panic!("no type recorded for the right-hand side"));
    assert_eq!(checker.arena().display(ty), "Int");
}

#[test]
fn errors_serialize_for_tooling() {
    let result = check("fn f(x: Int) := x\nf(\"s\")");
    let json = serde_json::to_value(&result.errors).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(json[0]["kind"], "TypeMismatch");
    assert_eq!(json[0]["expected"], "Int");
    assert_eq!(json[0]["actual"], "String");
    assert_eq!(json[0]["span"]["line"], 2);
}

#[test]
fn declarations_persist_across_checks() {
    let mut checker = sift::TypeChecker::default();
    let first = sift::parse("fn twice(x: Int) := x * 2").unwrap_or_else(|e| panic!("{e}"));
    assert!(checker.check(&first).is_ok());
    let second = sift::parse("twice(\"a\")").unwrap_or_else(|e| panic!("{e}"));
    let errors: Vec<TypeError> = checker.check(&second).errors;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, CheckErrorKind::TypeMismatch);
}
