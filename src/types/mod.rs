pub mod subtype;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;

pub use subtype::is_subtype;

/// Index of a type in its `TypeArena`. Two types are identical iff their ids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantDef {
    pub name: String,
    pub fields: Vec<(String, TypeId)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// The unique top type.
    Any,
    Abstract,
    Concrete,
    /// `base[args]`; invariant in `args`.
    Parametric { base: TypeId, args: Vec<TypeId> },
    /// Only ever appears in method signatures, never as a value's own type.
    TypeVar { constraint: TypeId },
    Adt { type_params: Vec<String>, variants: Vec<VariantDef> },
    Struct { type_params: Vec<String>, fields: Vec<(String, TypeId)> },
    Function { params: Vec<TypeId>, ret: TypeId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    pub parent: Option<TypeId>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>, kind: TypeKind, parent: Option<TypeId>) -> Self {
        Self { name: name.into(), kind, parent }
    }

    pub fn field(&self, name: &str) -> Option<TypeId> {
        match &self.kind {
            TypeKind::Struct { fields, .. } => fields.iter().find(|(n, _)| n == name).map(|(_, t)| *t),
            _ => None,
        }
    }

    pub fn variant(&self, name: &str) -> Option<&VariantDef> {
        match &self.kind {
            TypeKind::Adt { variants, .. } => variants.iter().find(|v| v.name == name),
            _ => None,
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, TypeKind::Abstract | TypeKind::Any)
    }
}

/// Ids of the types every arena starts with.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinTypes {
    pub any: TypeId,
    pub number: TypeId,
    pub int: TypeId,
    pub float: TypeId,
    pub string: TypeId,
    pub boolean: TypeId,
    pub nothing: TypeId,
    pub array: TypeId,
    pub object: TypeId,
    pub function: TypeId,
    pub quoted: TypeId,
    pub type_: TypeId,
}

/// Owner of every type descriptor for one session. Shared as `Rc<TypeArena>`;
/// descriptors are append-only, so ids stay valid for the arena's lifetime.
#[derive(Debug)]
pub struct TypeArena {
    types: RefCell<Vec<Rc<TypeDef>>>,
    parametric: RefCell<HashMap<(TypeId, Vec<TypeId>), TypeId>>,
    type_vars: RefCell<HashMap<(String, TypeId), TypeId>>,
    functions: RefCell<HashMap<(Vec<TypeId>, TypeId), TypeId>>,
    builtins: BuiltinTypes,
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeArena {
    pub fn new() -> Self {
        let mut types = Vec::new();
        let mut push = |def: TypeDef| {
            let id = TypeId(types.len() as u32);
            types.push(Rc::new(def));
            id
        };
        let any = push(TypeDef::new("Any", TypeKind::Any, None));
        let number = push(TypeDef::new("Number", TypeKind::Abstract, Some(any)));
        let int = push(TypeDef::new("Int", TypeKind::Concrete, Some(number)));
        let float = push(TypeDef::new("Float", TypeKind::Concrete, Some(number)));
        let string = push(TypeDef::new("String", TypeKind::Concrete, Some(any)));
        let boolean = push(TypeDef::new("Boolean", TypeKind::Concrete, Some(any)));
        let nothing = push(TypeDef::new("Nothing", TypeKind::Concrete, Some(any)));
        let array = push(TypeDef::new("Array", TypeKind::Concrete, Some(any)));
        let object = push(TypeDef::new("Object", TypeKind::Concrete, Some(any)));
        let function = push(TypeDef::new("Function", TypeKind::Concrete, Some(any)));
        let quoted = push(TypeDef::new("Quoted", TypeKind::Concrete, Some(any)));
        let type_ = push(TypeDef::new("Type", TypeKind::Concrete, Some(any)));

        Self {
            types: RefCell::new(types),
            parametric: RefCell::new(HashMap::new()),
            type_vars: RefCell::new(HashMap::new()),
            functions: RefCell::new(HashMap::new()),
            builtins: BuiltinTypes {
                any,
                number,
                int,
                float,
                string,
                boolean,
                nothing,
                array,
                object,
                function,
                quoted,
                type_,
            },
        }
    }

    pub fn builtins(&self) -> &BuiltinTypes {
        &self.builtins
    }

    pub fn len(&self) -> usize {
        self.types.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: TypeId) -> Rc<TypeDef> {
        Rc::clone(&self.types.borrow()[id.index()])
    }

    pub fn name(&self, id: TypeId) -> String {
        self.get(id).name.clone()
    }

    /// Register a new nominal type. Every call yields a fresh id.
    pub fn add(&self, def: TypeDef) -> TypeId {
        let mut types = self.types.borrow_mut();
        let id = TypeId(types.len() as u32);
        types.push(Rc::new(def));
        id
    }

    /// Replace the descriptor behind `id`, keeping the id. Used to fill in the fields of
    /// a declared type after its own name is bound, so fields may refer to it.
    pub fn redefine(&self, id: TypeId, def: TypeDef) {
        self.types.borrow_mut()[id.index()] = Rc::new(def);
    }

    /// The interned instance `base[args]`. Its parent is `base`, so `Array[Int] <: Array`.
    pub fn parametric(&self, base: TypeId, args: Vec<TypeId>) -> TypeId {
        let key = (base, args);
        if let Some(id) = self.parametric.borrow().get(&key) {
            return *id;
        }
        let name = format!(
            "{}[{}]",
            self.name(base),
            key.1.iter().map(|a| self.display(*a)).collect::<Vec<_>>().join(", ")
        );
        let id = self.add(TypeDef::new(
            name,
            TypeKind::Parametric { base, args: key.1.clone() },
            Some(base),
        ));
        self.parametric.borrow_mut().insert(key, id);
        id
    }

    /// `Array[element]`.
    pub fn array_of(&self, element: TypeId) -> TypeId {
        self.parametric(self.builtins.array, vec![element])
    }

    /// The interned type variable `name <: constraint`.
    pub fn type_var(&self, name: &str, constraint: TypeId) -> TypeId {
        let key = (name.to_string(), constraint);
        if let Some(id) = self.type_vars.borrow().get(&key) {
            return *id;
        }
        let id = self.add(TypeDef::new(name, TypeKind::TypeVar { constraint }, None));
        self.type_vars.borrow_mut().insert(key, id);
        id
    }

    pub fn function(&self, params: Vec<TypeId>, ret: TypeId) -> TypeId {
        let key = (params, ret);
        if let Some(id) = self.functions.borrow().get(&key) {
            return *id;
        }
        let name = format!(
            "({}) -> {}",
            key.0.iter().map(|p| self.display(*p)).collect::<Vec<_>>().join(", "),
            self.display(ret)
        );
        let id = self.add(TypeDef::new(
            name,
            TypeKind::Function { params: key.0.clone(), ret },
            Some(self.builtins.function),
        ));
        self.functions.borrow_mut().insert(key, id);
        id
    }

    /// Human-readable name: `Int`, `Array[Int]`, `(Int) -> String`.
    pub fn display(&self, id: TypeId) -> String {
        self.name(id)
    }

    pub fn display_all(&self, ids: &[TypeId]) -> Vec<String> {
        ids.iter().map(|id| self.display(*id)).collect()
    }

    /// Replace type variables in `id` with their bindings, rebuilding parametric types.
    pub fn substitute(&self, id: TypeId, bindings: &HashMap<String, TypeId>) -> TypeId {
        let def = self.get(id);
        match &def.kind {
            TypeKind::TypeVar { .. } => bindings.get(&def.name).copied().unwrap_or(id),
            TypeKind::Parametric { base, args } => {
                let args = args.iter().map(|a| self.substitute(*a, bindings)).collect();
                self.parametric(*base, args)
            }
            TypeKind::Function { params, ret } => {
                let params = params.iter().map(|p| self.substitute(*p, bindings)).collect();
                let ret = self.substitute(*ret, bindings);
                self.function(params, ret)
            }
            _ => id,
        }
    }

    /// True if `id` mentions a type variable anywhere.
    pub fn has_type_vars(&self, id: TypeId) -> bool {
        match &self.get(id).kind {
            TypeKind::TypeVar { .. } => true,
            TypeKind::Parametric { args, .. } => args.iter().any(|a| self.has_type_vars(*a)),
            TypeKind::Function { params, ret } => {
                params.iter().any(|p| self.has_type_vars(*p)) || self.has_type_vars(*ret)
            }
            _ => false,
        }
    }

    /// The parent chain of `id`, starting with `id` itself.
    pub fn ancestors(&self, id: TypeId) -> Vec<TypeId> {
        let mut chain = vec![id];
        let mut current = self.get(id).parent;
        while let Some(p) = current {
            chain.push(p);
            current = self.get(p).parent;
        }
        chain
    }

    /// Least common ancestor of two types along their parent chains (`Any` at worst).
    pub fn join(&self, a: TypeId, b: TypeId) -> TypeId {
        if a == b {
            return a;
        }
        let left = self.ancestors(a);
        self.ancestors(b).into_iter().find(|t| left.contains(t)).unwrap_or(self.builtins.any)
    }
}
