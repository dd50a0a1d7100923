//! `ctypecast`: coerce an expression's type toward a target type.
//!
//! Grounded on `original_source/src/parse/ctypecast.h`'s `_ctypecast`
//! contract: convert (or reject) `expr`'s type, reporting one of
//! "unchanged", "converted", or a specific failure reason
//! (`CTypecastResult`) so a caller can tell "no conversion needed" from
//! "converted" without re-inspecting the node. A literal is converted in
//! place (its value doesn't need a runtime operation, only a range check);
//! a non-literal expression that needs an actual conversion is wrapped in a
//! fresh `TypeCastExpr`.

use corec_ast::{typeid, LitValue, NodeArena, NodeId, NodeKind, NodeList, NodePayload, TypeCode};
use corec_common::diagnostics::{DiagCtx, Diagnostic, DiagnosticKind};

/// Mirrors `CTypecastResult`, minus `ErrNoMem` (arena allocation here can't
/// fail short of process OOM, which this codebase doesn't model as a
/// recoverable condition anywhere else either).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastResult {
    Unchanged,
    Converted,
    ErrCompat,
    ErrRangeOver,
    ErrRangeUnder,
}

/// Follow `AliasType`/resolved-`IdType`/`TypeType` wrappers down to the
/// underlying `TypeCode`, or `None` for a composite type (struct, array,
/// tuple, function, reference) ctypecast never applies to.
pub fn basic_code(arena: &NodeArena, ty: NodeId) -> Option<TypeCode> {
    match &arena.get(ty).payload {
        NodePayload::BasicType(code) => Some(*code),
        NodePayload::AliasType { aliased, .. } => basic_code(arena, *aliased),
        NodePayload::IdType {
            target: Some(target),
            ..
        } => basic_code(arena, *target),
        NodePayload::TypeType { inner } => basic_code(arena, *inner),
        _ => None,
    }
}

/// Follow the same wrappers down to a `RefType`'s pointee, for `Deref`.
pub(crate) fn ref_pointee(arena: &NodeArena, ty: NodeId) -> Option<NodeId> {
    match &arena.get(ty).payload {
        NodePayload::RefType { pointee, .. } => Some(*pointee),
        NodePayload::AliasType { aliased, .. } => ref_pointee(arena, *aliased),
        NodePayload::IdType {
            target: Some(target),
            ..
        } => ref_pointee(arena, *target),
        NodePayload::TypeType { inner } => ref_pointee(arena, *inner),
        _ => None,
    }
}

/// Follow the same wrappers down to an `ArrayType`'s element type, for
/// `IndexExpr`/`SliceExpr`.
pub(crate) fn array_elem(arena: &NodeArena, ty: NodeId) -> Option<NodeId> {
    match &arena.get(ty).payload {
        NodePayload::ArrayType { elem, .. } => Some(*elem),
        NodePayload::AliasType { aliased, .. } => array_elem(arena, *aliased),
        NodePayload::IdType {
            target: Some(target),
            ..
        } => array_elem(arena, *target),
        NodePayload::TypeType { inner } => array_elem(arena, *inner),
        _ => None,
    }
}

/// Follow the same wrappers down to a `StructType`'s field list, for
/// `Selector`.
pub(crate) fn struct_fields(arena: &NodeArena, ty: NodeId) -> Option<NodeList> {
    match &arena.get(ty).payload {
        NodePayload::StructType { fields } => Some(fields.clone()),
        NodePayload::AliasType { aliased, .. } => struct_fields(arena, *aliased),
        NodePayload::IdType {
            target: Some(target),
            ..
        } => struct_fields(arena, *target),
        NodePayload::TypeType { inner } => struct_fields(arena, *inner),
        _ => None,
    }
}

/// Whether an already-typed (non-literal) expression of type code `from`
/// may convert to `to` without explicit cast syntax: same-kind widening
/// only, per the base spec's §4.4 "Literal coercion" paragraph (which
/// states the rule generally, not just for literals). Crossing
/// integer/float, or narrowing, or changing signedness at the same width,
/// all require `explicit`.
fn conversion_allowed(from: TypeCode, to: TypeCode, explicit: bool) -> bool {
    if from == to {
        return true;
    }
    if explicit {
        return (from.is_integer() || from.is_float()) && (to.is_integer() || to.is_float());
    }
    if from.is_integer() && to.is_integer() {
        return from.is_signed() == to.is_signed() && to.bit_width() >= from.bit_width();
    }
    if from.is_float() && to.is_float() {
        return to.bit_width() >= from.bit_width();
    }
    false
}

fn emit_incompatible(diags: &mut DiagCtx, arena: &NodeArena, expr: NodeId, _target: NodeId) {
    let pos = arena.get(expr).pos;
    diags.emit(Diagnostic::new(
        DiagnosticKind::InvalidConversion,
        pos,
        "value is not convertible to the destination type",
    ));
}

fn emit_range(diags: &mut DiagCtx, arena: &NodeArena, expr: NodeId, value: i128, target_code: TypeCode, over: bool) {
    let pos = arena.get(expr).pos;
    let direction = if over { "overflows" } else { "underflows" };
    diags.emit(Diagnostic::new(
        DiagnosticKind::ConstantOverflow,
        pos,
        format!("constant {value} {direction} {target_code:?}"),
    ));
}

/// Coerce `expr`'s type to `target`. `explicit` widens the allowed
/// conversions to include integer<->float and same-width signed<->unsigned,
/// which an implicit coercion context (binop operand matching, `if`-branch
/// unification, a plain assignment) must reject.
pub fn ctypecast(
    arena: &mut NodeArena,
    diags: &mut DiagCtx,
    expr: NodeId,
    target: NodeId,
    explicit: bool,
) -> (NodeId, CastResult) {
    let current_ty = arena.get(expr).ty;
    if let Some(cur) = current_ty {
        if typeid(arena, cur) == typeid(arena, target) {
            return (expr, CastResult::Unchanged);
        }
    }

    let Some(target_code) = basic_code(arena, target) else {
        emit_incompatible(diags, arena, expr, target);
        return (expr, CastResult::ErrCompat);
    };

    let pos = arena.get(expr).pos;
    let endpos = arena.get(expr).endpos;

    match arena.get(expr).payload.clone() {
        NodePayload::Lit(LitValue::Int(v)) => {
            if target_code.is_float() {
                if !explicit {
                    emit_incompatible(diags, arena, expr, target);
                    return (expr, CastResult::ErrCompat);
                }
                let new = arena.alloc(pos, endpos, NodeKind::FloatLit, NodePayload::Lit(LitValue::Float(v as f64)));
                arena.get_mut(new).ty = Some(target);
                return (new, CastResult::Converted);
            }
            if !target_code.is_integer() {
                emit_incompatible(diags, arena, expr, target);
                return (expr, CastResult::ErrCompat);
            }
            let (min, max) = target_code
                .literal_range()
                .expect("integer TypeCode always has a literal_range");
            if v < min {
                emit_range(diags, arena, expr, v, target_code, false);
                return (expr, CastResult::ErrRangeUnder);
            }
            if v > max {
                emit_range(diags, arena, expr, v, target_code, true);
                return (expr, CastResult::ErrRangeOver);
            }
            arena.get_mut(expr).ty = Some(target);
            (expr, CastResult::Converted)
        }
        NodePayload::Lit(LitValue::Float(v)) => {
            if target_code.is_float() {
                arena.get_mut(expr).ty = Some(target);
                return (expr, CastResult::Converted);
            }
            if !explicit || !target_code.is_integer() {
                emit_incompatible(diags, arena, expr, target);
                return (expr, CastResult::ErrCompat);
            }
            let truncated = v as i128;
            let (min, max) = target_code
                .literal_range()
                .expect("integer TypeCode always has a literal_range");
            if truncated < min {
                return (expr, CastResult::ErrRangeUnder);
            }
            if truncated > max {
                return (expr, CastResult::ErrRangeOver);
            }
            let new = arena.alloc(pos, endpos, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(truncated)));
            arena.get_mut(new).ty = Some(target);
            (new, CastResult::Converted)
        }
        _ => {
            let Some(source_code) = current_ty.and_then(|t| basic_code(arena, t)) else {
                emit_incompatible(diags, arena, expr, target);
                return (expr, CastResult::ErrCompat);
            };
            if !conversion_allowed(source_code, target_code, explicit) {
                emit_incompatible(diags, arena, expr, target);
                return (expr, CastResult::ErrCompat);
            }
            let cast = arena.alloc(
                pos,
                endpos,
                NodeKind::TypeCastExpr,
                NodePayload::TypeCast {
                    target_type: target,
                    value: expr,
                    explicit,
                },
            );
            arena.get_mut(cast).ty = Some(target);
            (cast, CastResult::Converted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corec_ast::{populate_builtins, NodeArena};
    use corec_common::position::NO_POS;

    #[test]
    fn in_range_int_literal_converts_to_concrete_type() {
        let mut arena = NodeArena::new();
        let (_scope, types, _consts) = populate_builtins(&mut arena);
        let mut diags = DiagCtx::new();
        let lit = arena.alloc(NO_POS, NO_POS, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(4)));

        let (result, code) = ctypecast(&mut arena, &mut diags, lit, types.i32, false);
        assert_eq!(code, CastResult::Converted);
        assert_eq!(result, lit, "a literal converts in place");
        assert_eq!(arena.get(lit).ty, Some(types.i32));
        assert!(!diags.has_errors());
    }

    #[test]
    fn out_of_range_int_literal_overflows() {
        let mut arena = NodeArena::new();
        let (_scope, types, _consts) = populate_builtins(&mut arena);
        let mut diags = DiagCtx::new();
        let lit = arena.alloc(NO_POS, NO_POS, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(500)));

        let (_, code) = ctypecast(&mut arena, &mut diags, lit, types.i8, false);
        assert_eq!(code, CastResult::ErrRangeOver);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn implicit_int_to_float_is_rejected() {
        let mut arena = NodeArena::new();
        let (_scope, types, _consts) = populate_builtins(&mut arena);
        let mut diags = DiagCtx::new();
        let lit = arena.alloc(NO_POS, NO_POS, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(1)));

        let (_, code) = ctypecast(&mut arena, &mut diags, lit, types.f64, false);
        assert_eq!(code, CastResult::ErrCompat);
    }

    #[test]
    fn explicit_int_to_float_converts() {
        let mut arena = NodeArena::new();
        let (_scope, types, _consts) = populate_builtins(&mut arena);
        let mut diags = DiagCtx::new();
        let lit = arena.alloc(NO_POS, NO_POS, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(1)));

        let (result, code) = ctypecast(&mut arena, &mut diags, lit, types.f64, true);
        assert_eq!(code, CastResult::Converted);
        assert!(matches!(arena.get(result).payload, NodePayload::Lit(LitValue::Float(_))));
    }

    #[test]
    fn implicit_widening_of_a_typed_expression_wraps_in_a_cast_node() {
        let mut arena = NodeArena::new();
        let (_scope, types, _consts) = populate_builtins(&mut arena);
        let mut diags = DiagCtx::new();
        // Stand in for a non-literal i16 expression (an `Id` would do, its
        // exact kind doesn't matter to ctypecast beyond "not a literal").
        let expr = arena.alloc(NO_POS, NO_POS, NodeKind::Id, NodePayload::Id { name: arena.pool().intern_str("x"), target: None });
        arena.get_mut(expr).ty = Some(types.i16);

        let (result, code) = ctypecast(&mut arena, &mut diags, expr, types.i32, false);
        assert_eq!(code, CastResult::Converted);
        assert_ne!(result, expr);
        assert_eq!(arena.get(result).kind, NodeKind::TypeCastExpr);
    }
}
