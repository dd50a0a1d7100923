//! `NodeArena`: the per-build slab of [`Node`]s plus the symbol pool used to
//! name them.
//!
//! Bundling the two together mirrors the teacher's `NodeArena`/`SymPool`
//! pairing — most callers that walk nodes also need to intern or look up
//! names, and passing two separate handles everywhere just duplicates the
//! bundling at each call site.

use crate::node::{Node, NodeFlags, NodeId, NodeKind, NodePayload};
use corec_common::arena::Arena;
use corec_common::position::{Pos, NO_POS};
use corec_common::symbol::SymPool;
use std::sync::Arc;

pub struct NodeArena {
    arena: Arena<Node>,
    pool: Arc<SymPool>,
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeArena {
    /// A fresh arena with its own, parentless symbol pool.
    #[must_use]
    pub fn new() -> Self {
        Self::with_pool(Arc::new(SymPool::new()))
    }

    /// An arena sharing `pool` — typically a per-package pool chained to the
    /// process-wide universe pool, so builtin names aren't re-interned.
    #[must_use]
    pub fn with_pool(pool: Arc<SymPool>) -> Self {
        Self {
            arena: Arena::new(),
            pool,
        }
    }

    #[must_use]
    pub fn pool(&self) -> &Arc<SymPool> {
        &self.pool
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> &Node {
        self.arena.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        self.arena.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.arena.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.arena.ids()
    }

    /// Allocate a node with an explicit source span.
    pub fn alloc(&mut self, pos: Pos, endpos: Pos, kind: NodeKind, payload: NodePayload) -> NodeId {
        self.arena.alloc(Node::new(pos, endpos, kind, payload))
    }

    /// Allocate a node with `NodeFlags` set at construction, avoiding a
    /// separate `get_mut` round trip for the common case of stamping
    /// `UNRESOLVED` on a freshly parsed `Id`.
    pub fn alloc_with_flags(
        &mut self,
        pos: Pos,
        endpos: Pos,
        kind: NodeKind,
        payload: NodePayload,
        flags: NodeFlags,
    ) -> NodeId {
        let mut node = Node::new(pos, endpos, kind, payload);
        node.flags = flags;
        self.arena.alloc(node)
    }

    /// Allocate a type node. Type nodes are frequently synthesized (e.g. by
    /// the checker, or by template instantiation) with no direct source
    /// span, so this convenience stamps `NO_POS` for both endpoints.
    pub fn alloc_type(&mut self, kind: NodeKind, payload: NodePayload) -> NodeId {
        debug_assert!(kind.is_type(), "alloc_type called with non-type NodeKind");
        self.alloc(NO_POS, NO_POS, kind, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::LitValue;

    #[test]
    fn alloc_and_get_round_trip() {
        let mut arena = NodeArena::new();
        let id = arena.alloc(NO_POS, NO_POS, NodeKind::BoolLit, NodePayload::Lit(LitValue::Bool(true)));
        assert!(matches!(arena.get(id).payload, NodePayload::Lit(LitValue::Bool(true))));
    }

    #[test]
    fn shared_pool_interns_across_arenas() {
        let pool = Arc::new(SymPool::new());
        let sym = pool.intern_str("shared");
        let arena_a = NodeArena::with_pool(pool.clone());
        let arena_b = NodeArena::with_pool(pool.clone());
        assert_eq!(arena_a.pool().lookup(b"shared"), Some(sym.clone()));
        assert_eq!(arena_b.pool().lookup(b"shared"), Some(sym));
    }

    #[test]
    fn alloc_type_stamps_no_pos() {
        let mut arena = NodeArena::new();
        let id = arena.alloc_type(
            NodeKind::BasicType,
            NodePayload::BasicType(crate::ty::TypeCode::Bool),
        );
        assert!(arena.get(id).pos.is_none());
    }
}
