//! Memoized template instantiation.
//!
//! `corec_transform::instantiate` is a pure, unmemoized copy — calling it
//! twice for `Foo<i32>` produces two independent `Fun` nodes. This wraps it
//! with the per-build cache that `corec-transform`'s own module doc defers
//! to "the checker": keyed by the template's `NodeId` plus the typeid of
//! each bound argument, so two call sites instantiating the same template
//! with the same arguments share one expansion.

use corec_ast::{typeid, NodeArena, NodeId, NodeList};
use corec_common::symbol::Sym;
use rustc_hash::FxHashMap;

#[derive(Default)]
pub struct InstanceCache {
    instances: FxHashMap<(NodeId, Vec<Sym>), NodeId>,
}

impl InstanceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate `template` (a `Template` node, `template_params`/`body`
    /// already split out by the caller) with `args`, reusing a prior
    /// expansion keyed on the arguments' typeids when one exists.
    pub fn instantiate(
        &mut self,
        arena: &mut NodeArena,
        template: NodeId,
        template_params: &NodeList,
        args: &NodeList,
        body: NodeId,
    ) -> NodeId {
        let key_args: Vec<Sym> = args.iter().map(|&a| typeid(arena, a)).collect();
        let key = (template, key_args);
        if let Some(&cached) = self.instances.get(&key) {
            return cached;
        }
        let instance = corec_transform::instantiate(arena, template_params, args, body);
        self.instances.insert(key, instance);
        instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corec_ast::{NodeKind, NodePayload, TypeCode};
    use corec_common::position::NO_POS;
    use smallvec::smallvec;

    #[test]
    fn same_argument_typeid_reuses_the_instance() {
        let mut arena = NodeArena::new();
        let param_name = arena.pool().intern_str("T");
        let param = arena.alloc(
            NO_POS,
            NO_POS,
            NodeKind::ParamDecl,
            NodePayload::Local {
                name: param_name,
                declared_type: None,
                init: None,
                is_mut: false,
            },
        );
        let body = arena.alloc(
            NO_POS,
            NO_POS,
            NodeKind::IdType,
            NodePayload::IdType {
                name: param_name,
                target: Some(param),
            },
        );
        let template = arena.alloc(
            NO_POS,
            NO_POS,
            NodeKind::Template,
            NodePayload::Template {
                params: smallvec![param],
                body,
            },
        );
        let arg1 = arena.alloc_type(NodeKind::BasicType, NodePayload::BasicType(TypeCode::I32));
        let arg2 = arena.alloc_type(NodeKind::BasicType, NodePayload::BasicType(TypeCode::I32));

        let mut cache = InstanceCache::new();
        let a = cache.instantiate(&mut arena, template, &smallvec![param], &smallvec![arg1], body);
        let b = cache.instantiate(&mut arena, template, &smallvec![param], &smallvec![arg2], body);
        assert_eq!(a, b, "structurally identical argument typeids should share one instance");
    }

    #[test]
    fn different_argument_typeid_produces_a_fresh_instance() {
        let mut arena = NodeArena::new();
        let param_name = arena.pool().intern_str("T");
        let param = arena.alloc(
            NO_POS,
            NO_POS,
            NodeKind::ParamDecl,
            NodePayload::Local {
                name: param_name,
                declared_type: None,
                init: None,
                is_mut: false,
            },
        );
        let body = arena.alloc(
            NO_POS,
            NO_POS,
            NodeKind::IdType,
            NodePayload::IdType {
                name: param_name,
                target: Some(param),
            },
        );
        let template = arena.alloc(
            NO_POS,
            NO_POS,
            NodeKind::Template,
            NodePayload::Template {
                params: smallvec![param],
                body,
            },
        );
        let arg_i32 = arena.alloc_type(NodeKind::BasicType, NodePayload::BasicType(TypeCode::I32));
        let arg_f64 = arena.alloc_type(NodeKind::BasicType, NodePayload::BasicType(TypeCode::F64));

        let mut cache = InstanceCache::new();
        let a = cache.instantiate(&mut arena, template, &smallvec![param], &smallvec![arg_i32], body);
        let b = cache.instantiate(&mut arena, template, &smallvec![param], &smallvec![arg_f64], body);
        assert_ne!(a, b);
    }
}
