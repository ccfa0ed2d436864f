use std::cell::RefCell;
use std::rc::Rc;

use sift::diagnostics::ErrorKind;
use sift::dispatch::{DispatchError, DispatchEvent, DispatchObserver, GenericFunction};
use sift::types::{TypeArena, TypeDef, TypeId, TypeKind};

/// Records every event as a short string.
#[derive(Default)]
struct Log(RefCell<Vec<String>>);

impl DispatchObserver for Log {
    fn on_event(&self, event: &DispatchEvent<'_>) {
        let line = match event {
            DispatchEvent::CacheHit { function, .. } => format!("hit {function}"),
            DispatchEvent::CacheMiss { function, .. } => format!("miss {function}"),
            DispatchEvent::Resolved { function, method, .. } => format!("resolved {function} #{method}"),
        };
        self.0.borrow_mut().push(line);
    }
}

fn pick<F: Copy>(f: &GenericFunction<F>, arena: &TypeArena, args: &[TypeId]) -> Result<F, DispatchError> {
    f.resolve(arena, args).map(|r| r.method.implementation)
}

fn shapes(arena: &TypeArena) -> (TypeId, TypeId, TypeId) {
    let any = arena.builtins().any;
    let shape = arena.add(TypeDef::new("Shape", TypeKind::Abstract, Some(any)));
    let circle = arena.add(TypeDef::new("Circle", TypeKind::Concrete, Some(shape)));
    let square = arena.add(TypeDef::new("Square", TypeKind::Concrete, Some(shape)));
    (shape, circle, square)
}

#[test]
fn specificity_follows_the_hierarchy() {
    let arena = TypeArena::new();
    let (shape, circle, square) = shapes(&arena);
    let area = GenericFunction::new("area")
        .with_method(vec![], vec![shape], "shape")
        .with_method(vec![], vec![circle], "circle");
    assert_eq!(pick(&area, &arena, &[circle]), Ok("circle"));
    assert_eq!(pick(&area, &arena, &[square]), Ok("shape"));
}

#[test]
fn declaration_order_does_not_matter() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    let forward = GenericFunction::new("f")
        .with_method(vec![], vec![b.number, b.number], "number")
        .with_method(vec![], vec![b.int, b.int], "int");
    let backward = GenericFunction::new("f")
        .with_method(vec![], vec![b.int, b.int], "int")
        .with_method(vec![], vec![b.number, b.number], "number");
    for f in [&forward, &backward] {
        assert_eq!(pick(f, &arena, &[b.int, b.int]), Ok("int"));
        assert_eq!(pick(f, &arena, &[b.int, b.float]), Ok("number"));
    }
}

#[test]
fn arity_selects_methods() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    let range = GenericFunction::new("range")
        .with_method(vec![], vec![b.int], 1)
        .with_method(vec![], vec![b.int, b.int], 2);
    assert_eq!(pick(&range, &arena, &[b.int]), Ok(1));
    assert_eq!(pick(&range, &arena, &[b.int, b.int]), Ok(2));
    let err = pick(&range, &arena, &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Method);
}

#[test]
fn repeated_type_variable_must_bind_identically() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    let t = arena.type_var("T", b.any);
    let same = GenericFunction::new("same").with_method(vec![t], vec![t, t], ());
    let resolution = same.resolve(&arena, &[b.int, b.int]).unwrap();
    assert_eq!(resolution.bindings.get("T"), Some(&b.int));
    assert!(matches!(same.resolve(&arena, &[b.int, b.string]), Err(DispatchError::NoMethod { .. })));
    // Int and Float share a parent but are not the same type
    assert!(same.resolve(&arena, &[b.int, b.float]).is_err());
}

#[test]
fn constrained_type_variables() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    let n = arena.type_var("N", b.number);
    let twice = GenericFunction::new("twice").with_method(vec![n], vec![n], ());
    assert_eq!(twice.resolve(&arena, &[b.float]).unwrap().bindings.get("N"), Some(&b.float));
    assert!(twice.resolve(&arena, &[b.string]).is_err());
}

#[test]
fn type_variables_bind_inside_arrays() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    let t = arena.type_var("T", b.any);
    let first = GenericFunction::new("first").with_method(vec![t], vec![arena.array_of(t)], ());
    let resolution = first.resolve(&arena, &[arena.array_of(b.string)]).unwrap();
    assert_eq!(resolution.bindings.get("T"), Some(&b.string));
    assert!(first.resolve(&arena, &[b.string]).is_err());
}

#[test]
fn concrete_method_beats_generic_one() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    let t = arena.type_var("T", b.any);
    let show = GenericFunction::new("show")
        .with_method(vec![t], vec![arena.array_of(t)], "generic")
        .with_method(vec![], vec![arena.array_of(b.int)], "ints");
    assert_eq!(pick(&show, &arena, &[arena.array_of(b.int)]), Ok("ints"));
    assert_eq!(pick(&show, &arena, &[arena.array_of(b.float)]), Ok("generic"));
}

#[test]
fn ambiguity_names_the_candidates() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    let f = GenericFunction::new("f")
        .with_method(vec![], vec![b.int, b.number], ())
        .with_method(vec![], vec![b.number, b.int], ());
    let err = f.resolve(&arena, &[b.int, b.int]).map(|_| ()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MethodAmbiguity);
    let msg = err.to_string();
    assert!(msg.contains("(Int, Number)") && msg.contains("(Number, Int)"), "{msg}");

    // a third method that dominates both settles it
    let settled = f.with_method(vec![], vec![b.int, b.int], ());
    assert!(settled.resolve(&arena, &[b.int, b.int]).is_ok());
}

#[test]
fn with_method_leaves_the_original_untouched() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    let base = GenericFunction::new("g").with_method(vec![], vec![b.number], "number");
    let extended = base.with_method(vec![], vec![b.int], "int");
    assert_eq!(base.methods().len(), 1);
    assert_eq!(extended.methods().len(), 2);
    assert_eq!(pick(&base, &arena, &[b.int]), Ok("number"));
    assert_eq!(pick(&extended, &arena, &[b.int]), Ok("int"));

    let replaced = extended.with_method(vec![], vec![b.int], "int again");
    assert_eq!(replaced.methods().len(), 2);
    assert_eq!(pick(&replaced, &arena, &[b.int]), Ok("int again"));
}

#[test]
fn cache_serves_repeated_argument_types() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    let log = Rc::new(Log::default());
    let f = GenericFunction::new("f")
        .with_observer(log.clone())
        .with_method(vec![], vec![b.number], 0);
    for _ in 0..3 {
        assert_eq!(pick(&f, &arena, &[b.int]), Ok(0));
    }
    assert_eq!(pick(&f, &arena, &[b.float]), Ok(0));
    assert_eq!(
        *log.0.borrow(),
        ["miss f", "resolved f #0", "hit f", "hit f", "miss f", "resolved f #0"]
    );
}

#[test]
fn extending_a_function_starts_a_fresh_cache() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    let log = Rc::new(Log::default());
    let f = GenericFunction::new("f")
        .with_observer(log.clone())
        .with_method(vec![], vec![b.number], "number");
    assert_eq!(pick(&f, &arena, &[b.int]), Ok("number"));
    let g = f.with_method(vec![], vec![b.int], "int");
    assert_eq!(pick(&g, &arena, &[b.int]), Ok("int"));
    assert_eq!(log.0.borrow().iter().filter(|e| e.starts_with("hit")).count(), 0);
}

#[test]
fn disabled_cache_resolves_every_time() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    let log = Rc::new(Log::default());
    let f = GenericFunction::new("f")
        .with_cache(false)
        .with_observer(log.clone())
        .with_method(vec![], vec![b.number], ());
    for _ in 0..2 {
        assert!(f.resolve(&arena, &[b.int]).is_ok());
    }
    assert_eq!(*log.0.borrow(), ["resolved f #0", "resolved f #0"]);
}

#[test]
fn untagged_arguments_are_rejected() {
    let arena = TypeArena::new();
    let b = *arena.builtins();
    let f = GenericFunction::new("f").with_method(vec![], vec![b.any, b.any], ());
    let err = f.dispatch(&arena, &[Some(b.int), None]).map(|_| ()).unwrap_err();
    assert_eq!(err, DispatchError::Untagged { function: "f".into(), position: 1 });
}
