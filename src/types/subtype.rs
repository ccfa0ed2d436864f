use super::{TypeArena, TypeId, TypeKind};

/// `child <: parent`. Total and terminating: parent chains are built bottom-up, and
/// recursive struct comparisons assume a pair holds while it is being checked.
pub fn is_subtype(arena: &TypeArena, child: TypeId, parent: TypeId) -> bool {
    check(arena, child, parent, &mut Vec::new())
}

fn check(arena: &TypeArena, child: TypeId, parent: TypeId, assumed: &mut Vec<(TypeId, TypeId)>) -> bool {
    if child == parent {
        return true;
    }
    let any = arena.builtins().any;
    if parent == any {
        return true;
    }
    if child == any {
        return false;
    }

    let c = arena.get(child);
    let p = arena.get(parent);
    match (&c.kind, &p.kind) {
        (_, TypeKind::TypeVar { constraint }) => return check(arena, child, *constraint, assumed),
        (TypeKind::Parametric { base: cb, args: ca }, TypeKind::Parametric { base: pb, args: pa }) if cb == pb => {
            // invariant: arguments must be identical, not merely related
            if ca.len() == pa.len() && ca.iter().zip(pa).all(|(a, b)| a == b) {
                return true;
            }
        }
        (TypeKind::Adt { .. }, TypeKind::Adt { .. }) => {}
        (TypeKind::Struct { fields: cf, .. }, TypeKind::Struct { fields: pf, .. }) => {
            if assumed.contains(&(child, parent)) {
                return true;
            }
            assumed.push((child, parent));
            let ok = pf.iter().all(|(name, pt)| {
                cf.iter().find(|(n, _)| n == name).is_some_and(|(_, ct)| check(arena, *ct, *pt, assumed))
            });
            assumed.pop();
            return ok;
        }
        (TypeKind::Function { params: cp, ret: cr }, TypeKind::Function { params: pp, ret: pr }) => {
            return cp.len() == pp.len()
                && pp.iter().zip(cp).all(|(pp, cp)| check(arena, *pp, *cp, assumed))
                && check(arena, *cr, *pr, assumed);
        }
        _ => {}
    }

    match c.parent {
        Some(up) => check(arena, up, parent, assumed),
        None => false,
    }
}
