use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use super::AssignmentScope;

/// A lexical scope. Children share their parent by `Rc` and only write to it
/// through `set`/`assign` when the name is already bound there.
#[derive(Debug)]
pub struct Environment<V> {
    vars: RefCell<HashMap<String, V>>,
    parent: Option<Rc<Environment<V>>>,
}

impl<V: Clone> Environment<V> {
    pub fn new_root() -> Rc<Self> {
        Rc::new(Self { vars: RefCell::new(HashMap::new()), parent: None })
    }

    pub fn child(parent: &Rc<Self>) -> Rc<Self> {
        Rc::new(Self { vars: RefCell::new(HashMap::new()), parent: Some(Rc::clone(parent)) })
    }

    pub fn get(&self, name: &str) -> Option<V> {
        if let Some(v) = self.vars.borrow().get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name) || self.parent.as_ref().is_some_and(|p| p.contains(name))
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
    }

    /// Bind `name` in this scope, shadowing any outer binding.
    pub fn define(&self, name: impl Into<String>, value: V) {
        self.vars.borrow_mut().insert(name.into(), value);
    }

    /// Update the nearest scope that binds `name`; if none does, define it in the root scope.
    pub fn set(&self, name: &str, value: V) {
        if let Err(value) = self.update_existing(name, value) {
            debug!(name, "assignment to unbound name falls through to the root scope");
            self.root_define(name, value);
        }
    }

    /// Assignment under the configured scoping rule.
    pub fn assign(&self, name: &str, value: V, scope: AssignmentScope) {
        match scope {
            AssignmentScope::Global => self.set(name, value),
            AssignmentScope::Local => {
                if let Err(value) = self.update_existing(name, value) {
                    self.define(name, value);
                }
            }
        }
    }

    fn update_existing(&self, name: &str, value: V) -> Result<(), V> {
        {
            let mut vars = self.vars.borrow_mut();
            if let Some(slot) = vars.get_mut(name) {
                *slot = value;
                return Ok(());
            }
        }
        match &self.parent {
            Some(parent) => parent.update_existing(name, value),
            None => Err(value),
        }
    }

    fn root_define(&self, name: &str, value: V) {
        match &self.parent {
            Some(parent) => parent.root_define(name, value),
            None => self.define(name, value),
        }
    }

    /// Names bound directly in this scope, sorted.
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.vars.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}
