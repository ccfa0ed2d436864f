mod common;

use common::eval_dispatch;
use sift::diagnostics::ErrorKind;
use sift::types::{is_subtype, TypeArena, TypeDef, TypeKind};

#[test]
fn numeric_tower() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    for leaf in [b.int, b.float] {
        assert!(is_subtype(&arena, leaf, b.number));
        assert!(is_subtype(&arena, leaf, b.any));
    }
    assert!(!is_subtype(&arena, b.number, b.int));
    assert!(!is_subtype(&arena, b.boolean, b.number));
}

#[test]
fn every_builtin_is_under_any() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    for t in [b.number, b.string, b.boolean, b.nothing, b.array, b.object, b.function, b.quoted, b.type_] {
        assert!(is_subtype(&arena, t, b.any), "{} <: Any", arena.display(t));
        assert!(!is_subtype(&arena, b.any, t));
    }
}

#[test]
fn arrays_are_invariant() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    assert!(!is_subtype(&arena, arena.array_of(b.int), arena.array_of(b.number)));
    assert!(!is_subtype(&arena, arena.array_of(b.number), arena.array_of(b.int)));
    assert!(is_subtype(&arena, arena.array_of(b.int), arena.array_of(b.int)));
    assert!(is_subtype(&arena, arena.array_of(b.int), b.array));
}

#[test]
fn parametric_types_are_interned() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    let first = arena.array_of(b.string);
    let before = arena.len();
    let second = arena.array_of(b.string);
    assert_eq!(first, second);
    assert_eq!(arena.len(), before);
    assert_eq!(arena.display(first), "Array[String]");
    assert_eq!(arena.display(arena.array_of(first)), "Array[Array[String]]");
}

#[test]
fn join_finds_the_common_ancestor() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    assert_eq!(arena.join(b.int, b.float), b.number);
    assert_eq!(arena.join(b.int, b.int), b.int);
    assert_eq!(arena.join(b.int, b.string), b.any);
}

#[test]
fn declared_hierarchies_follow_parents() {
    let arena = TypeArena::new();
    let any = arena.builtins().any;
    let shape = arena.add(TypeDef::new("Shape", TypeKind::Abstract, Some(any)));
    let polygon = arena.add(TypeDef::new("Polygon", TypeKind::Abstract, Some(shape)));
    let square = arena.add(TypeDef::new("Square", TypeKind::Concrete, Some(polygon)));
    assert!(is_subtype(&arena, square, shape));
    assert!(is_subtype(&arena, square, polygon));
    assert!(!is_subtype(&arena, shape, square));
    assert_eq!(arena.ancestors(square), vec![square, polygon, shape, any]);
}

#[test]
fn same_name_is_not_same_type() {
    let arena = TypeArena::new();
    let any = arena.builtins().any;
    let first = arena.add(TypeDef::new("Token", TypeKind::Concrete, Some(any)));
    let second = arena.add(TypeDef::new("Token", TypeKind::Concrete, Some(any)));
    assert_ne!(first, second);
    assert!(!is_subtype(&arena, first, second));
}

#[test]
fn struct_width_subtyping_at_dispatch() {
    let src = "type Point { x: Int, y: Int }
type Point3 { x: Int, y: Int, z: Int }
fn sum(p: Point) := p.x + p.y
sum(Point3 { x: 1, y: 2, z: 3 })";
    assert_eq!(eval_dispatch(src).unwrap(), "3");
}

#[test]
fn narrower_struct_is_not_accepted() {
    let src = "type Point { x: Int, y: Int }
type Line { x: Int }
fn sum(p: Point) := p.x + p.y
sum(Line { x: 1 })";
    assert_eq!(eval_dispatch(src).unwrap_err().kind(), ErrorKind::Method);
}

#[test]
fn adts_are_nominal_at_dispatch() {
    let src = "type Light = Red | Green
type Signal = Red2 | Green2
fn go(l: Light) := \"light\"
go(Red2)";
    assert_eq!(eval_dispatch(src).unwrap_err().kind(), ErrorKind::Method);
    let ok = "type Light = Red | Green\nfn go(l: Light) := \"light\"\ngo(Green)";
    assert_eq!(eval_dispatch(ok).unwrap(), "light");
}

#[test]
fn abstract_parents_at_dispatch() {
    let src = "abstract Animal
type Dog <: Animal { name: String }
fn describe(a: Animal) := \"animal\"
describe(Dog { name: \"rex\" })";
    assert_eq!(eval_dispatch(src).unwrap(), "animal");
}
