//! The universe: a process-wide root scope holding builtin types and
//! constants, per the base spec's "Universe (root scope)".
//!
//! Every build's top-level scope chains to this one so `bool`, `i32`,
//! `true`, `nil`, and friends resolve without per-build setup. It's built
//! exactly once per process via [`OnceLock`] and never mutated again, so
//! sharing it across threads needs no locking.

use crate::arena::NodeArena;
use crate::node::{LitValue, NodeId, NodeKind, NodePayload};
use crate::scope::Scope;
use crate::ty::TypeCode;
use corec_common::symbol::{Sym, SymPool};
use std::sync::{Arc, OnceLock};

/// Handles to a set of builtin type nodes, returned by [`populate_builtins`]
/// (and, for the process-wide universe itself, stored on [`Universe`]) so a
/// pass that needs `i32` or `bool` doesn't have to re-look the name up by
/// scope lookup on every use. These ids are only valid in the arena that
/// allocated them — see [`populate_builtins`]'s doc comment.
pub struct UniverseTypes {
    pub bool_: NodeId,
    pub i8: NodeId,
    pub u8: NodeId,
    pub i16: NodeId,
    pub u16: NodeId,
    pub i32: NodeId,
    pub u32: NodeId,
    pub i64: NodeId,
    pub u64: NodeId,
    pub i128: NodeId,
    pub u128: NodeId,
    pub f32: NodeId,
    pub f64: NodeId,
    pub f128: NodeId,
    pub int: NodeId,
    pub uint: NodeId,
    pub auto: NodeId,
}

pub struct UniverseConsts {
    pub true_: NodeId,
    pub false_: NodeId,
    pub nil: NodeId,
}

pub struct Universe {
    pub pool: Arc<SymPool>,
    pub arena: NodeArena,
    pub scope: Arc<Scope>,
    pub types: UniverseTypes,
    pub consts: UniverseConsts,
    /// The blank identifier `_`, bound to nothing but interned once so
    /// every pass compares against the same pointer.
    pub blank: Sym,
}

static UNIVERSE: OnceLock<Universe> = OnceLock::new();

/// The process-wide universe, built on first access.
#[must_use]
pub fn universe() -> &'static Universe {
    UNIVERSE.get_or_init(build_universe)
}

/// Allocate one copy of every builtin type and constant into `arena` and
/// bind their names in a fresh, parentless [`Scope`].
///
/// [`NodeId`] is only ever valid within the arena that produced it
/// (`corec_common::arena::ArenaId`'s doc comment), so the process-wide
/// [`Universe`]'s own ids can't be embedded directly into a per-build
/// arena's tree or scope — a per-build pass needs its own copies of `i32`,
/// `true`, `nil`, and friends. This is that mirroring step: every build
/// (the resolver's file scope, the checker's builtin references) calls it
/// once against its own arena rather than reaching into [`universe`]'s.
/// Two builds' copies of `i32` are different `NodeId`s but the same
/// typeid, which is all [`crate::ty::typeeq`] ever compares.
pub fn populate_builtins(arena: &mut NodeArena) -> (Scope, UniverseTypes, UniverseConsts) {
    let mut scope = Scope::new();
    let pool = arena.pool().clone();

    let mut def_type = |arena: &mut NodeArena, scope: &mut Scope, name: &str, code: TypeCode| -> NodeId {
        let id = arena.alloc_type(NodeKind::BasicType, NodePayload::BasicType(code));
        let sym = pool.intern_str(name);
        scope
            .define(sym, id)
            .expect("builtin names are distinct by construction");
        id
    };

    let bool_ = def_type(arena, &mut scope, "bool", TypeCode::Bool);
    let i8 = def_type(arena, &mut scope, "i8", TypeCode::I8);
    let u8 = def_type(arena, &mut scope, "u8", TypeCode::U8);
    let i16 = def_type(arena, &mut scope, "i16", TypeCode::I16);
    let u16 = def_type(arena, &mut scope, "u16", TypeCode::U16);
    let i32 = def_type(arena, &mut scope, "i32", TypeCode::I32);
    let u32 = def_type(arena, &mut scope, "u32", TypeCode::U32);
    let i64 = def_type(arena, &mut scope, "i64", TypeCode::I64);
    let u64 = def_type(arena, &mut scope, "u64", TypeCode::U64);
    let i128 = def_type(arena, &mut scope, "i128", TypeCode::I128);
    let u128 = def_type(arena, &mut scope, "u128", TypeCode::U128);
    let f32 = def_type(arena, &mut scope, "f32", TypeCode::F32);
    let f64 = def_type(arena, &mut scope, "f64", TypeCode::F64);
    let f128 = def_type(arena, &mut scope, "f128", TypeCode::F128);
    let int = def_type(arena, &mut scope, "int", TypeCode::Int);
    let uint = def_type(arena, &mut scope, "uint", TypeCode::Uint);
    let auto = def_type(arena, &mut scope, "auto", TypeCode::Auto);

    let true_ = arena.alloc_type(NodeKind::BoolLit, NodePayload::Lit(LitValue::Bool(true)));
    let false_ = arena.alloc_type(NodeKind::BoolLit, NodePayload::Lit(LitValue::Bool(false)));
    let nil = arena.alloc_type(NodeKind::Nil, NodePayload::Nil);
    scope
        .define(pool.intern_str("true"), true_)
        .expect("builtin names are distinct by construction");
    scope
        .define(pool.intern_str("false"), false_)
        .expect("builtin names are distinct by construction");
    scope
        .define(pool.intern_str("nil"), nil)
        .expect("builtin names are distinct by construction");

    (
        scope,
        UniverseTypes {
            bool_,
            i8,
            u8,
            i16,
            u16,
            i32,
            u32,
            i64,
            u64,
            i128,
            u128,
            f32,
            f64,
            f128,
            int,
            uint,
            auto,
        },
        UniverseConsts { true_, false_, nil },
    )
}

fn build_universe() -> Universe {
    let pool = Arc::new(SymPool::new());
    let mut arena = NodeArena::with_pool(pool.clone());
    let (scope, types, consts) = populate_builtins(&mut arena);
    let blank = pool.intern_str("_");

    Universe {
        pool,
        arena,
        scope: Arc::new(scope),
        types,
        consts,
        blank,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn universe_is_stable_across_calls() {
        let a = universe();
        let b = universe();
        assert_eq!(a.types.i32, b.types.i32);
    }

    #[test]
    fn builtin_names_resolve_in_root_scope() {
        let u = universe();
        let i32_sym = u.pool.intern_str("i32");
        assert_eq!(u.scope.lookup(&i32_sym), Some(u.types.i32));
    }

    #[test]
    fn blank_identifier_is_not_bound() {
        let u = universe();
        assert_eq!(u.scope.lookup(&u.blank), None);
    }
}
