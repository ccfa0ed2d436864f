mod common;

use common::{assert_error_both, run_both};
use sift::diagnostics::ErrorKind;

const SHAPES: &str = "type Shape = Circle(r: Int) | Rect(w: Int, h: Int) | Empty\n";

#[test]
fn first_matching_arm_wins() {
    let src = "match 2 { 1 => \"one\", 2 => \"two\", ?n => \"other\" }";
    assert_eq!(run_both(src), "two");
    assert_eq!(run_both("match 9 { 2 => \"two\", ? => \"fallback\", 9 => \"nine\" }"), "fallback");
}

#[test]
fn literal_patterns_compare_strictly() {
    assert_eq!(run_both("match 1.0 { 1 => \"int\", ? => \"other\" }"), "other");
    assert_eq!(run_both("match \"1\" { 1 => \"int\", \"1\" => \"string\" }"), "string");
    assert_eq!(run_both("match true { false => 0, true => 1 }"), "1");
    assert_eq!(run_both("match -3 { -3 => \"neg\", ? => \"pos\" }"), "neg");
    assert_eq!(run_both("match 2.5 { 2.5 => \"exact\", ? => \"no\" }"), "exact");
}

#[test]
fn captures_bind_in_the_arm_scope() {
    assert_eq!(run_both("match 21 { ?n => n * 2 }"), "42");
    assert_error_both("match 21 { ?n => n }\nn", ErrorKind::UndefinedVariable);
}

#[test]
fn unit_variants_match_by_name() {
    let src = format!("{SHAPES}match Empty {{ Circle {{ r: ?r }} => r, Empty => -1 }}");
    assert_eq!(run_both(&src), "-1");
}

#[test]
fn variant_fields_destructure() {
    let area = format!(
        "{SHAPES}fn area(s) := match s {{\n  Circle {{ r: ?r }} => r * r * 3\n  Rect {{ w: ?w, h: ?h }} => w * h\n  Empty => 0\n}}\n"
    );
    assert_eq!(run_both(&format!("{area}area(Rect(2, 5))")), "10");
    assert_eq!(run_both(&format!("{area}area(Circle(2))")), "12");
    assert_eq!(run_both(&format!("{area}area(Empty)")), "0");
}

#[test]
fn partial_field_patterns() {
    let src = format!("{SHAPES}match Rect(3, 4) {{ Rect {{ h: ?h }} => h }}");
    assert_eq!(run_both(&src), "4");
}

#[test]
fn nested_literal_inside_fields() {
    let classify = format!(
        "{SHAPES}fn classify(s) := match s {{\n  Rect {{ w: 0 }} => \"flat\"\n  Rect {{ w: ?w, h: ?h }} => \"box\"\n  ? => \"round\"\n}}\n"
    );
    assert_eq!(run_both(&format!("{classify}classify(Rect(0, 9))")), "flat");
    assert_eq!(run_both(&format!("{classify}classify(Rect(1, 9))")), "box");
    assert_eq!(run_both(&format!("{classify}classify(Circle(1))")), "round");
}

#[test]
fn capture_with_nested_pattern_binds_the_whole_value() {
    let src = format!("{SHAPES}match Circle(7) {{ ?c Circle {{ r: ?r }} => [c, r] }}");
    assert_eq!(run_both(&src), "[Circle { r: 7 }, 7]");
}

#[test]
fn struct_patterns_match_by_type_name() {
    let src = "type Point { x: Int, y: Int }
p := Point { x: 0, y: 5 }
match p { Point { x: 0, y: ?y } => y, ? => -1 }";
    assert_eq!(run_both(src), "5");
}

#[test]
fn nested_instances() {
    let src = "type Pair { left: Any, right: Any }
type Opt = Some(v: Any) | None
p := Pair { left: Some(1), right: None }
match p { Pair { left: Some { v: ?v }, right: None } => v, ? => 0 }";
    assert_eq!(run_both(src), "1");
}

#[test]
fn destructuring_assignment_binds_captures() {
    let src = "type Point { x: Int, y: Int }\nPoint { x: ?a, y: ?b } := Point { x: 3, y: 4 }\na * b";
    assert_eq!(run_both(src), "12");
}

#[test]
fn destructuring_mismatch_is_a_pattern_error() {
    let src = "type Point { x: Int, y: Int }\nPoint { x: 0, y: ?b } := Point { x: 3, y: 4 }";
    assert_error_both(src, ErrorKind::PatternMatch);
}

#[test]
fn no_matching_arm() {
    assert_error_both("match 5 { 1 => 0, 2 => 0 }", ErrorKind::PatternMatch);
    let src = format!("{SHAPES}match Empty {{ Circle {{ r: ?r }} => r }}");
    assert_error_both(&src, ErrorKind::PatternMatch);
}

#[test]
fn capture_outside_a_pattern_is_rejected() {
    assert_error_both("?x", ErrorKind::PatternMatch);
}

#[test]
fn arm_bodies_can_be_blocks() {
    let src = "match 3 { ?n => { doubled := n * 2; doubled + 1 } }";
    assert_eq!(run_both(src), "7");
}
