use crate::primitives;
use crate::source::Span;
use crate::value::{Function, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScopeError {
    #[error("Unbound symbol: '{0}'")]
    UnboundSymbol(String, Span), // Symbol name, span where lookup happened
}

pub type ScopeRef = Rc<RefCell<Scope>>;

/// Case folding shared by scope keys and function equality.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// A lexical environment frame. Names are case-insensitive and stored
/// folded. Lookups walk outward through enclosing frames, then through the
/// call site of a closure frame, and finally fall back to the shared
/// primitive table, so every scope sees every primitive without holding its
/// own copy.
pub struct Scope {
    outer: Option<ScopeRef>,
    caller: Option<ScopeRef>,
    bindings: HashMap<String, Value>,
}

impl Scope {
    /// Creates a new, top-level scope.
    pub fn new_global() -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            outer: None,
            caller: None,
            bindings: HashMap::new(),
        }))
    }

    /// Creates a new scope enclosed within an outer one. The child never
    /// writes to `outer`.
    pub fn new_enclosed(outer: ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            outer: Some(outer),
            caller: None,
            bindings: HashMap::new(),
        }))
    }

    /// Creates the frame a closure body runs in. Names resolve in the frame,
    /// then through `defining`, and only then through `call_site`.
    pub fn new_call_frame(defining: ScopeRef, call_site: ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            outer: Some(defining),
            caller: Some(call_site),
            bindings: HashMap::new(),
        }))
    }

    /// Binds `name` in this frame, shadowing any outer binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.bindings.insert(fold_name(name), value);
    }

    /// Looks up a symbol. `span` is the location of the reference and is
    /// only used for error reporting.
    pub fn get(&self, name: &str, span: Span) -> Result<Value, ScopeError> {
        let key = fold_name(name);
        self.lookup(&key)
            .or_else(|| primitives::lookup(&key).map(|p| Value::Function(Function::Primitive(p))))
            .ok_or_else(|| ScopeError::UnboundSymbol(name.to_string(), span))
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.bindings.get(key) {
            return Some(value.clone());
        }
        self.outer
            .as_ref()
            .and_then(|outer| outer.borrow().lookup(key))
            .or_else(|| self.caller.as_ref().and_then(|caller| caller.borrow().lookup(key)))
    }

    /// All names visible from this scope, primitives included.
    pub fn get_identifiers(&self) -> HashSet<String> {
        let mut identifiers: HashSet<String> =
            primitives::names().map(str::to_string).collect();
        self.add_identifiers(&mut identifiers);
        identifiers
    }

    fn add_identifiers(&self, identifiers: &mut HashSet<String>) {
        identifiers.extend(self.bindings.keys().cloned());
        for parent in self.outer.iter().chain(&self.caller) {
            parent.borrow().add_identifiers(identifiers);
        }
    }
}

// Closures hold their defining scope, which may hold them in turn.
impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.bindings.keys().collect();
        names.sort();
        f.debug_struct("Scope")
            .field("bindings", &names)
            .field("has_outer", &self.outer.is_some())
            .field("has_caller", &self.caller.is_some())
            .finish()
    }
}
