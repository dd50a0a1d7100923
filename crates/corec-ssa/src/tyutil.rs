//! Resolve a type node to its `TypeCode`, following the same wrapper kinds
//! `corec-checker::ctypecast::basic_code` does. Duplicated rather than
//! imported: the checker crate is the SSA builder's upstream neighbor, not
//! a dependency this crate needs for anything but this one lookup, and the
//! AST is already fully type-checked by the time SSA building runs, so the
//! wrapper-following logic is the only thing worth keeping in sync.

use corec_ast::{NodeArena, NodeId, NodePayload, TypeCode};

pub fn basic_code(arena: &NodeArena, ty: NodeId) -> Option<TypeCode> {
    match &arena.get(ty).payload {
        NodePayload::BasicType(code) => Some(*code),
        NodePayload::AliasType { aliased, .. } => basic_code(arena, *aliased),
        NodePayload::IdType { target: Some(target), .. } => basic_code(arena, *target),
        NodePayload::TypeType { inner } => basic_code(arena, *inner),
        _ => None,
    }
}

/// The `TypeCode` of expression node `id`, or `TypeCode::Nil` if untyped
/// (an internal-invariant gap the checker should never leave on a reachable
/// expression, but the SSA builder degrades gracefully rather than
/// panicking on it).
pub fn basic_code_of(arena: &NodeArena, id: NodeId) -> TypeCode {
    arena.get(id).ty.and_then(|ty| basic_code(arena, ty)).unwrap_or(TypeCode::Nil)
}
