mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{eval_dispatch, eval_with};
use sift::diagnostics::ErrorKind;
use sift::dispatch::{DispatchEvent, DispatchObserver};
use sift::interp::{DispatchInterpreter, Evaluator, InterpreterOptions};

fn show(source: &str) -> String {
    eval_dispatch(source).unwrap_or_else(|e| panic!("{source:?}: {e}"))
}

fn kind(source: &str) -> ErrorKind {
    match eval_dispatch(source) {
        Ok(v) => panic!("expected {source:?} to fail, got {v}"),
        Err(e) => e.kind(),
    }
}

const ANIMALS: &str = "abstract Animal
type Dog <: Animal { name: String, breed: String }
type Cat <: Animal { name: String, lives: Int }
fn meet(a: Animal, b: Animal) := \"sniff\"
fn meet(a: Dog, b: Cat) := \"chase\"
fn meet(a: Cat, b: Dog) := \"hiss\"
d := Dog { name: \"rex\", breed: \"collie\" }
c := Cat { name: \"tom\", lives: 9 }
";

#[test]
fn dispatches_on_every_argument() {
    assert_eq!(show(&format!("{ANIMALS}meet(d, c)")), "chase");
    assert_eq!(show(&format!("{ANIMALS}meet(c, d)")), "hiss");
    assert_eq!(show(&format!("{ANIMALS}meet(d, d)")), "sniff");
}

#[test]
fn methods_can_be_added_after_first_call() {
    let src = format!("{ANIMALS}before := meet(d, d)\nfn meet(a: Dog, b: Dog) := \"play\";\n[before, meet(d, d)]");
    assert_eq!(show(&src), "[\"sniff\", \"play\"]");
}

#[test]
fn numeric_tower_selects_methods() {
    let src = "fn kind(x: Number) := \"number\"
fn kind(x: Int) := \"int\"
fn kind(x: Any) := \"thing\";
[kind(1), kind(1.5), kind(\"s\"), kind([1])]";
    assert_eq!(show(src), "[\"int\", \"number\", \"thing\", \"thing\"]");
}

#[test]
fn generic_functions_bind_type_variables_to_types() {
    let src = "fn describe[T](xs: Array[T]) := \"array of \" + str(T)\n";
    assert_eq!(show(&format!("{src}describe([1, 2])")), "array of Int");
    assert_eq!(show(&format!("{src}describe([\"a\"])")), "array of String");
    assert_eq!(show(&format!("{src}describe([1, \"a\"])")), "array of Any");
}

#[test]
fn repeated_type_variable_requires_identical_types() {
    let src = "fn pair[T](a: T, b: T) := [a, b]\n";
    assert_eq!(show(&format!("{src}pair(1, 2)")), "[1, 2]");
    assert_eq!(kind(&format!("{src}pair(1, \"a\")")), ErrorKind::Method);
}

#[test]
fn constrained_type_parameter() {
    let src = "fn twice[N <: Number](x: N) := x * 2\n";
    assert_eq!(show(&format!("{src}twice(1.5)")), "3");
    assert_eq!(kind(&format!("{src}twice(\"a\")")), ErrorKind::Method);
}

#[test]
fn arrays_are_tagged_when_built() {
    assert_eq!(show("type([])"), "Array[Any]");
    assert_eq!(show("type([[1], [2]])"), "Array[Array[Int]]");
    assert_eq!(show("xs := [1, 2]\nxs.push(3)\ntype(xs)"), "Array[Int]");
    assert_eq!(show("xs := [1, 2]\nxs.push(3.5)\ntype(xs)"), "Array[Int]");
    assert_eq!(show("xs := []\nxs.push(1)\ntype(xs)"), "Array[Any]");
}

#[test]
fn array_parameters_are_invariant() {
    let src = "fn total(xs: Array[Number]) := xs.sum()\n";
    assert_eq!(kind(&format!("{src}total([1, 2])")), ErrorKind::Method);
    let generic = "fn total[N <: Number](xs: Array[N]) := xs.sum()\ntotal([1, 2])";
    assert_eq!(show(generic), "3");
}

#[test]
fn user_methods_extend_builtin_functions() {
    let src = "type Vec { x: Int, y: Int }
fn len(v: Vec) := v.x + v.y
fn str(v: Vec) := \"<\" + str(v.x) + \",\" + str(v.y) + \">\"
v := Vec { x: 3, y: 4 };
[len(v), str(v), len(\"abc\"), str(5)]";
    assert_eq!(show(src), "[7, \"<3,4>\", 3, \"5\"]");
}

#[test]
fn ufcs_routes_through_dispatch() {
    let src = "type Celsius { deg: Float }
fn fahrenheit(c: Celsius) := c.deg * 9 / 5 + 32
boiling := Celsius { deg: 100.0 }
boiling.fahrenheit()";
    assert_eq!(show(src), "212");
}

#[test]
fn ambiguous_user_methods() {
    let src = "fn f(a: Int, b: Any) := 1\nfn f(a: Any, b: Int) := 2\n";
    assert_eq!(kind(&format!("{src}f(1, 1)")), ErrorKind::MethodAmbiguity);
    assert_eq!(show(&format!("{src}f(1, \"x\")")), "1");
    assert_eq!(show(&format!("{src}fn f(a: Int, b: Int) := 3\nf(1, 1)")), "3");
}

#[test]
fn types_are_first_class_values() {
    assert_eq!(show("Int"), "Int");
    assert_eq!(show("type(Int)"), "Type");
    assert_eq!(show("type Shape = Dot\nShape"), "Shape");
}

#[test]
fn field_types_are_enforced_at_construction() {
    assert_eq!(kind("type P { x: Int }\nP { x: 1.5 }"), ErrorKind::TypeMismatch);
    assert_eq!(kind("type Box = Full(v: String) | Empty\nFull(1)"), ErrorKind::TypeMismatch);
    assert_eq!(show("type P { x: Any }\nP { x: [1] }"), "P { x: [1] }");
}

#[derive(Default)]
struct Counts {
    hits: Cell<usize>,
    misses: Cell<usize>,
    resolved: Cell<usize>,
}

impl DispatchObserver for Counts {
    fn on_event(&self, event: &DispatchEvent<'_>) {
        match event {
            DispatchEvent::CacheHit { function: "square", .. } => self.hits.set(self.hits.get() + 1),
            DispatchEvent::CacheMiss { function: "square", .. } => self.misses.set(self.misses.get() + 1),
            DispatchEvent::Resolved { function: "square", .. } => self.resolved.set(self.resolved.get() + 1),
            _ => {}
        }
    }
}

const SQUARES: &str = "fn square(x: Number) := x * x\nrange(10).map({ i | square(i) }).sum()";

fn run_observed(cache: bool) -> (String, Rc<Counts>) {
    let counts = Rc::new(Counts::default());
    let options = InterpreterOptions { dispatch_cache: cache, ..Default::default() };
    let interp = DispatchInterpreter::with_observer(options, counts.clone());
    let (value, _) = eval_with(interp, SQUARES).unwrap_or_else(|e| panic!("{e}"));
    (value, counts)
}

#[test]
fn loop_calls_are_served_from_the_cache() {
    let (value, counts) = run_observed(true);
    assert_eq!(value, "285");
    assert_eq!(counts.misses.get(), 1);
    assert_eq!(counts.hits.get(), 9);
    assert_eq!(counts.resolved.get(), 1);
}

#[test]
fn disabling_the_cache_changes_nothing_but_the_work() {
    let (value, counts) = run_observed(false);
    assert_eq!(value, "285");
    assert_eq!(counts.hits.get(), 0);
    assert_eq!(counts.resolved.get(), 10);
}

#[test]
fn redeclaring_invalidates_cached_resolutions() {
    let mut interp = DispatchInterpreter::new();
    let first = interp.eval_source("fn g(x: Number) := \"number\"\ng(1)").map(|v| v.to_string());
    assert_eq!(first.ok().as_deref(), Some("number"));
    let second = interp.eval_source("fn g(x: Int) := \"int\"\ng(1)").map(|v| v.to_string());
    assert_eq!(second.ok().as_deref(), Some("int"));
}
