//! Multiple dispatch: generic functions holding typed methods, resolved by specificity.

pub mod unify;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::diagnostics::ErrorKind;
use crate::types::{is_subtype, TypeArena, TypeId};
pub use unify::{unify, unify_signature, Bindings};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("no method of '{function}' matches argument types ({})", args.join(", "))]
    NoMethod { function: String, args: Vec<String> },

    #[error(
        "ambiguous call to '{function}' with argument types ({}): candidates {}",
        args.join(", "),
        candidates.join(" and ")
    )]
    Ambiguous { function: String, args: Vec<String>, candidates: Vec<String> },

    #[error("argument {position} of '{function}' carries no runtime type")]
    Untagged { function: String, position: usize },
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Ambiguous { .. } => ErrorKind::MethodAmbiguity,
            DispatchError::NoMethod { .. } | DispatchError::Untagged { .. } => ErrorKind::Method,
        }
    }
}

/// Anything dispatch can read a runtime type from.
pub trait Tagged {
    fn type_tag(&self) -> Option<TypeId>;
}

impl Tagged for TypeId {
    fn type_tag(&self) -> Option<TypeId> {
        Some(*self)
    }
}

impl Tagged for Option<TypeId> {
    fn type_tag(&self) -> Option<TypeId> {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEvent<'a> {
    CacheHit { function: &'a str, args: &'a [TypeId] },
    CacheMiss { function: &'a str, args: &'a [TypeId] },
    Resolved { function: &'a str, args: &'a [TypeId], method: usize },
}

/// Injected hook that sees every resolution; used to observe the cache.
pub trait DispatchObserver {
    fn on_event(&self, event: &DispatchEvent<'_>);
}

#[derive(Debug)]
pub struct MethodEntry<F> {
    pub type_vars: Vec<TypeId>,
    pub signature: Vec<TypeId>,
    pub implementation: F,
}

/// A winning method plus the type-variable bindings it was matched with.
#[derive(Debug)]
pub struct Resolution<F> {
    pub method: Rc<MethodEntry<F>>,
    pub bindings: Bindings,
}

impl<F> Clone for Resolution<F> {
    fn clone(&self) -> Self {
        Self { method: Rc::clone(&self.method), bindings: self.bindings.clone() }
    }
}

/// An ordered, persistent set of methods sharing one name.
///
/// `with_method` returns a new function and leaves `self` untouched. The resolution
/// cache is the only mutable part; it is keyed by argument type ids and is not
/// thread-safe (values are `Rc`-shared).
pub struct GenericFunction<F> {
    name: String,
    methods: Rc<Vec<Rc<MethodEntry<F>>>>,
    cache: RefCell<HashMap<Vec<TypeId>, Resolution<F>>>,
    cache_enabled: bool,
    observer: Option<Rc<dyn DispatchObserver>>,
}

impl<F> Clone for GenericFunction<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            methods: Rc::clone(&self.methods),
            cache: RefCell::new(self.cache.borrow().clone()),
            cache_enabled: self.cache_enabled,
            observer: self.observer.clone(),
        }
    }
}

impl<F> std::fmt::Debug for GenericFunction<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericFunction")
            .field("name", &self.name)
            .field("methods", &self.methods.len())
            .field("cached", &self.cache.borrow().len())
            .finish()
    }
}

impl<F> GenericFunction<F> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Rc::new(Vec::new()),
            cache: RefCell::new(HashMap::new()),
            cache_enabled: true,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Rc<dyn DispatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &[Rc<MethodEntry<F>>] {
        &self.methods
    }

    /// A new function with `implementation` added. A method with an identical
    /// signature is replaced in place. The new function starts with an empty cache.
    pub fn with_method(&self, type_vars: Vec<TypeId>, signature: Vec<TypeId>, implementation: F) -> Self {
        let entry = Rc::new(MethodEntry { type_vars, signature, implementation });
        let mut methods: Vec<_> = self.methods.iter().cloned().collect();
        match methods.iter().position(|m| m.signature == entry.signature) {
            Some(i) => methods[i] = entry,
            None => methods.push(entry),
        }
        Self {
            name: self.name.clone(),
            methods: Rc::new(methods),
            cache: RefCell::new(HashMap::new()),
            cache_enabled: self.cache_enabled,
            observer: self.observer.clone(),
        }
    }

    fn notify(&self, event: DispatchEvent<'_>) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event);
        }
    }

    /// Read each argument's type tag, failing on the first untagged argument.
    pub fn type_tags<A: Tagged>(&self, args: &[A]) -> Result<Vec<TypeId>, DispatchError> {
        args.iter()
            .enumerate()
            .map(|(i, a)| {
                a.type_tag().ok_or_else(|| DispatchError::Untagged { function: self.name.clone(), position: i })
            })
            .collect()
    }

    /// Resolve the method to invoke for tagged runtime arguments.
    pub fn dispatch<A: Tagged>(&self, arena: &TypeArena, args: &[A]) -> Result<Resolution<F>, DispatchError> {
        let tags = self.type_tags(args)?;
        self.resolve(arena, &tags)
    }

    /// Resolve the most specific method for argument types `args`.
    pub fn resolve(&self, arena: &TypeArena, args: &[TypeId]) -> Result<Resolution<F>, DispatchError> {
        if self.cache_enabled {
            if let Some(hit) = self.cache.borrow().get(args) {
                trace!(function = %self.name, "dispatch cache hit");
                self.notify(DispatchEvent::CacheHit { function: &self.name, args });
                return Ok(hit.clone());
            }
            self.notify(DispatchEvent::CacheMiss { function: &self.name, args });
        }

        let applicable: Vec<(usize, Bindings)> = self
            .methods
            .iter()
            .enumerate()
            .filter_map(|(i, m)| unify_signature(arena, &m.signature, args).map(|b| (i, b)))
            .collect();

        if applicable.is_empty() {
            return Err(DispatchError::NoMethod { function: self.name.clone(), args: arena.display_all(args) });
        }

        // instantiate each signature with its bindings so generic methods compare by what they matched
        let instantiated: Vec<Vec<TypeId>> = applicable
            .iter()
            .map(|(i, b)| self.methods[*i].signature.iter().map(|t| arena.substitute(*t, b)).collect())
            .collect();

        let dominates = |a: usize, b: usize| -> bool {
            let (ma, mb) = (&self.methods[applicable[a].0], &self.methods[applicable[b].0]);
            let inst_ab = all_subtypes(arena, &instantiated[a], &instantiated[b]);
            let inst_ba = all_subtypes(arena, &instantiated[b], &instantiated[a]);
            if inst_ab && !inst_ba {
                return true;
            }
            // equal once instantiated: the less generic declaration wins
            inst_ab
                && inst_ba
                && unify_signature(arena, &mb.signature, &ma.signature).is_some()
                && unify_signature(arena, &ma.signature, &mb.signature).is_none()
        };

        let winner = (0..applicable.len()).find(|&w| (0..applicable.len()).all(|o| o == w || dominates(w, o)));

        let Some(winner) = winner else {
            let mut candidates: Vec<usize> =
                (0..applicable.len()).filter(|&c| (0..applicable.len()).all(|o| !dominates(o, c))).collect();
            if candidates.len() < 2 {
                candidates = (0..applicable.len()).collect();
            }
            let candidates = candidates
                .into_iter()
                .map(|c| format!("({})", arena.display_all(&self.methods[applicable[c].0].signature).join(", ")))
                .collect();
            return Err(DispatchError::Ambiguous {
                function: self.name.clone(),
                args: arena.display_all(args),
                candidates,
            });
        };

        let (index, bindings) = applicable[winner].clone();
        debug!(function = %self.name, method = index, args = ?arena.display_all(args), "dispatch resolved");
        self.notify(DispatchEvent::Resolved { function: &self.name, args, method: index });

        let resolution = Resolution { method: Rc::clone(&self.methods[index]), bindings };
        if self.cache_enabled {
            self.cache.borrow_mut().insert(args.to_vec(), resolution.clone());
        }
        Ok(resolution)
    }
}

fn all_subtypes(arena: &TypeArena, a: &[TypeId], b: &[TypeId]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| is_subtype(arena, *x, *y))
}
