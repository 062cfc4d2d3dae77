//! Layered variable scopes.

use stencil_types::Value;
use std::collections::BTreeMap;

/// A chain of binding layers.
///
/// Each layer borrows its parent, so a loop iteration or include only
/// allocates its own bindings. Lookups search from the innermost layer
/// outward; names bound nowhere resolve to `undefined`.
#[derive(Debug)]
pub struct Scope<'p> {
    bindings: BTreeMap<String, Value>,
    parent: Option<&'p Scope<'p>>,
}

impl Scope<'static> {
    /// Create an outermost scope.
    pub fn root(bindings: BTreeMap<String, Value>) -> Self {
        Self {
            bindings,
            parent: None,
        }
    }
}

impl<'p> Scope<'p> {
    /// Push a new layer that shadows this scope.
    pub fn layer(&self, bindings: BTreeMap<String, Value>) -> Scope<'_> {
        Scope {
            bindings,
            parent: Some(self),
        }
    }

    /// Look up a name, searching from innermost to outermost layer.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(value) = current.bindings.get(name) {
                return Some(value);
            }
            scope = current.parent;
        }
        None
    }
}
