use std::collections::HashMap;
use std::rc::Rc;

use crate::dispatch::GenericFunction;
use crate::types::{TypeArena, TypeId};

/// Largest argument count the variadic `print` signature is registered for.
const MAX_VARIADIC: usize = 8;

/// A variant of a declared ADT, by variant name.
#[derive(Debug, Clone)]
pub struct VariantInfo {
    pub adt: TypeId,
    pub fields: Vec<(String, TypeId)>,
}

/// Everything the checker knows about names: value scopes, named types, and
/// function signatures. Functions are generic functions whose "implementation"
/// is the method's function type, so calls resolve exactly as they dispatch.
#[derive(Debug)]
pub struct TypeEnvironment {
    arena: Rc<TypeArena>,
    scopes: Vec<HashMap<String, TypeId>>,
    types: HashMap<String, TypeId>,
    functions: HashMap<String, GenericFunction<TypeId>>,
    variants: HashMap<String, VariantInfo>,
}

impl TypeEnvironment {
    /// An environment with a single empty global scope and no names.
    pub fn new(arena: Rc<TypeArena>) -> Self {
        Self {
            arena,
            scopes: vec![HashMap::new()],
            types: HashMap::new(),
            functions: HashMap::new(),
            variants: HashMap::new(),
        }
    }

    pub fn arena(&self) -> &Rc<TypeArena> {
        &self.arena
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn define(&mut self, name: impl Into<String>, ty: TypeId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), ty);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).copied())
    }

    /// Rebind the nearest existing `name`, else define it in the innermost scope.
    pub fn assign(&mut self, name: &str, ty: TypeId) {
        match self.scopes.iter_mut().rev().find(|scope| scope.contains_key(name)) {
            Some(scope) => {
                scope.insert(name.to_string(), ty);
            }
            None => self.define(name, ty),
        }
    }

    pub fn define_type(&mut self, name: impl Into<String>, id: TypeId) {
        self.types.insert(name.into(), id);
    }

    pub fn lookup_type(&self, name: &str) -> Option<TypeId> {
        self.types.get(name).copied()
    }

    pub fn function(&self, name: &str) -> Option<&GenericFunction<TypeId>> {
        self.functions.get(name)
    }

    /// Add (or replace, for an identical signature) a method of `name`.
    pub fn add_method(&mut self, name: &str, type_vars: Vec<TypeId>, signature: Vec<TypeId>, function_type: TypeId) {
        let generic = match self.functions.get(name) {
            Some(existing) => existing.with_method(type_vars, signature, function_type),
            None => GenericFunction::new(name).with_method(type_vars, signature, function_type),
        };
        self.functions.insert(name.to_string(), generic);
    }

    pub fn define_variant(&mut self, name: impl Into<String>, info: VariantInfo) {
        self.variants.insert(name.into(), info);
    }

    pub fn variant(&self, name: &str) -> Option<&VariantInfo> {
        self.variants.get(name)
    }
}

/// A fresh arena with the built-in types and the signatures of the built-in functions.
pub fn create_default_type_environment() -> TypeEnvironment {
    let arena = Rc::new(TypeArena::new());
    let b = *arena.builtins();
    let mut env = TypeEnvironment::new(Rc::clone(&arena));

    let named = [
        ("Any", b.any),
        ("Number", b.number),
        ("Int", b.int),
        ("Float", b.float),
        ("String", b.string),
        ("Boolean", b.boolean),
        ("Nothing", b.nothing),
        ("Array", b.array),
        ("Object", b.object),
        ("Function", b.function),
        ("Quoted", b.quoted),
        ("Type", b.type_),
    ];
    for (name, id) in named {
        env.define_type(name, id);
    }

    let mut builtin = |name: &str, params: Vec<TypeId>, ret: TypeId| {
        let function_type = arena.function(params.clone(), ret);
        env.add_method(name, Vec::new(), params, function_type);
    };
    for arity in 0..=MAX_VARIADIC {
        builtin("print", vec![b.any; arity], b.nothing);
    }
    builtin("len", vec![b.any], b.int);
    builtin("type", vec![b.any], b.string);
    builtin("str", vec![b.any], b.string);
    builtin("range", vec![b.int], arena.array_of(b.int));
    builtin("range", vec![b.int, b.int], arena.array_of(b.int));
    builtin("eval", vec![b.quoted], b.any);

    env
}
