use std::collections::HashMap;

use crate::types::{is_subtype, TypeArena, TypeId, TypeKind};

/// Type-variable bindings established while matching one call.
pub type Bindings = HashMap<String, TypeId>;

/// Match a signature type against an actual argument type.
///
/// A type variable binds to the first argument type it meets (which must satisfy its
/// constraint) and must be bound to the identical type at every later occurrence.
/// Parametric parameters unify their arguments invariantly; everything else is `is_subtype`.
pub fn unify(arena: &TypeArena, param: TypeId, arg: TypeId, bindings: &mut Bindings) -> bool {
    let p = arena.get(param);
    match &p.kind {
        TypeKind::TypeVar { constraint } => bind(arena, &p.name, *constraint, arg, bindings),
        TypeKind::Parametric { base, args: pargs } if arena.has_type_vars(param) => {
            // walk the argument's parent chain for an instance of the same base
            for candidate in arena.ancestors(arg) {
                if let TypeKind::Parametric { base: ab, args: aargs } = &arena.get(candidate).kind {
                    if ab == base && aargs.len() == pargs.len() {
                        let mut trial = bindings.clone();
                        if pargs.iter().zip(aargs).all(|(p, a)| unify_exact(arena, *p, *a, &mut trial)) {
                            *bindings = trial;
                            return true;
                        }
                    }
                }
            }
            false
        }
        _ => is_subtype(arena, arg, param),
    }
}

/// Unification in an invariant position: no subtyping, only identity or binding.
fn unify_exact(arena: &TypeArena, param: TypeId, arg: TypeId, bindings: &mut Bindings) -> bool {
    let p = arena.get(param);
    match &p.kind {
        TypeKind::TypeVar { constraint } => bind(arena, &p.name, *constraint, arg, bindings),
        TypeKind::Parametric { base, args: pargs } => match &arena.get(arg).kind {
            TypeKind::Parametric { base: ab, args: aargs } if ab == base && aargs.len() == pargs.len() => {
                pargs.iter().zip(aargs).all(|(p, a)| unify_exact(arena, *p, *a, bindings))
            }
            _ => false,
        },
        _ => param == arg,
    }
}

fn bind(arena: &TypeArena, name: &str, constraint: TypeId, arg: TypeId, bindings: &mut Bindings) -> bool {
    match bindings.get(name) {
        Some(bound) => *bound == arg,
        None => {
            if !is_subtype(arena, arg, constraint) {
                return false;
            }
            bindings.insert(name.to_string(), arg);
            true
        }
    }
}

/// Unify a whole signature against argument types. Returns the bindings on success.
pub fn unify_signature(arena: &TypeArena, signature: &[TypeId], args: &[TypeId]) -> Option<Bindings> {
    if signature.len() != args.len() {
        return None;
    }
    let mut bindings = Bindings::new();
    signature
        .iter()
        .zip(args)
        .all(|(p, a)| unify(arena, *p, *a, &mut bindings))
        .then_some(bindings)
}
