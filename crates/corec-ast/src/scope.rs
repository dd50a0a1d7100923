//! Lexical scopes: symbol-to-node maps chained to an enclosing scope, per
//! the base spec's data model (`Scope`, used for the universe, package,
//! file, and block levels).
//!
//! Chaining mirrors [`corec_common::symbol::SymPool`]'s parent-chain
//! design: a scope under construction owns its map directly; once it's
//! closed off (a file is fully parsed, a block ends) it's wrapped in `Arc`
//! so nested scopes can share it cheaply without copying.

use corec_common::limits::DEFAULT_SCOPE_CAPACITY;
use corec_common::symbol::Sym;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;

use crate::node::NodeId;

/// A symbol table for one lexical level, optionally chained to a parent.
///
/// Declaration order is preserved (`IndexMap`) because the checker and SSA
/// builder both want struct fields and function parameters in source order
/// even though lookups are by name.
pub struct Scope {
    names: IndexMap<Sym, NodeId, FxBuildHasher>,
    parent: Option<Arc<Scope>>,
}

/// Returned by [`Scope::define`] when a name is already bound in this exact
/// scope (not a parent) — a true redeclaration, per the base spec's
/// "duplicate declaration" diagnostic.
#[derive(Debug)]
pub struct AlreadyDefined(pub NodeId);

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self {
            names: IndexMap::with_capacity_and_hasher(DEFAULT_SCOPE_CAPACITY, FxBuildHasher),
            parent: None,
        }
    }

    #[must_use]
    pub fn with_parent(parent: Arc<Scope>) -> Self {
        Self {
            names: IndexMap::with_capacity_and_hasher(DEFAULT_SCOPE_CAPACITY, FxBuildHasher),
            parent: Some(parent),
        }
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }

    /// Bind `name` to `node` in this scope. Fails if `name` is already bound
    /// *here* (shadowing an outer scope's binding is always allowed).
    pub fn define(&mut self, name: Sym, node: NodeId) -> Result<(), AlreadyDefined> {
        if let Some(&existing) = self.names.get(&name) {
            return Err(AlreadyDefined(existing));
        }
        self.names.insert(name, node);
        Ok(())
    }

    /// Look up `name` in this scope only, without consulting the parent
    /// chain.
    #[must_use]
    pub fn lookup_local(&self, name: &Sym) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Look up `name` in this scope, then each enclosing scope in turn.
    #[must_use]
    pub fn lookup(&self, name: &Sym) -> Option<NodeId> {
        if let Some(id) = self.lookup_local(name) {
            return Some(id);
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Names bound directly in this scope, in declaration order.
    pub fn local_names(&self) -> impl Iterator<Item = (&Sym, NodeId)> {
        self.names.iter().map(|(k, &v)| (k, v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corec_common::arena::ArenaId;
    use corec_common::symbol::SymPool;

    fn id(n: u32) -> NodeId {
        ArenaId::from_u32(n)
    }

    #[test]
    fn define_then_lookup_local() {
        let pool = SymPool::new();
        let mut scope = Scope::new();
        let x = pool.intern_str("x");
        scope.define(x.clone(), id(1)).unwrap();
        assert_eq!(scope.lookup_local(&x), Some(id(1)));
    }

    #[test]
    fn redefining_in_same_scope_fails() {
        let pool = SymPool::new();
        let mut scope = Scope::new();
        let x = pool.intern_str("x");
        scope.define(x.clone(), id(1)).unwrap();
        let err = scope.define(x, id(2)).unwrap_err();
        assert_eq!(err.0, id(1));
    }

    #[test]
    fn child_scope_sees_parent_binding() {
        let pool = SymPool::new();
        let mut parent = Scope::new();
        let x = pool.intern_str("x");
        parent.define(x.clone(), id(1)).unwrap();
        let child = Scope::with_parent(Arc::new(parent));
        assert_eq!(child.lookup(&x), Some(id(1)));
        assert_eq!(child.lookup_local(&x), None);
    }

    #[test]
    fn shadowing_child_binding_does_not_touch_parent() {
        let pool = SymPool::new();
        let mut parent = Scope::new();
        let x = pool.intern_str("x");
        parent.define(x.clone(), id(1)).unwrap();
        let parent = Arc::new(parent);
        let mut child = Scope::with_parent(parent.clone());
        child.define(x.clone(), id(2)).unwrap();
        assert_eq!(child.lookup(&x), Some(id(2)));
        assert_eq!(parent.lookup(&x), Some(id(1)));
    }
}
