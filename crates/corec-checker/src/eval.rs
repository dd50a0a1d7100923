//! Constant folding: evaluate a fully-typed expression to a literal node.
//!
//! Grounded on `original_source/src/co/parse/eval.c`'s `NodeEval`: recurse
//! through `Id` to its target's initializer, fold literal operands of
//! `BinOp`/`UnaryOp` by dispatching on the left ("dominant") operand's
//! `TypeCode`, and return `None` on a non-constant subexpression. Unlike
//! the original, which relies on native machine-width wraparound for
//! overflow and never checks integer division by zero, this folds with
//! checked arithmetic and reports both conditions as diagnostics — there is
//! no well-defined "silently wrap" behavior to preserve in a language whose
//! own typeid alphabet already names exact bit widths.
//!
//! `must_succeed` mirrors `NodeEvalMustSucceed`: a `ConstDecl`'s initializer
//! must fold (so failure is diagnosed), while a best-effort fold attempted
//! elsewhere (e.g. to shrink a constant array length) fails silently.

use corec_ast::{BinOpKind, LitValue, NodeArena, NodeId, NodeKind, NodePayload, TypeCode, UnaryOpKind};
use corec_common::diagnostics::{DiagCtx, Diagnostic, DiagnosticKind};

use crate::ctypecast::basic_code;

/// Fold `id` to a literal node, or `None` if it isn't a compile-time
/// constant. `bool_ty` is the caller's arena-local `bool` type node, needed
/// to type the result of a comparison/logical fold.
pub fn eval(arena: &mut NodeArena, diags: &mut DiagCtx, bool_ty: NodeId, id: NodeId, must_succeed: bool) -> Option<NodeId> {
    match arena.get(id).payload.clone() {
        NodePayload::Lit(_) => Some(id),
        NodePayload::Id {
            target: Some(target),
            ..
        } => match arena.get(target).payload.clone() {
            NodePayload::Local { init: Some(init), .. } => eval(arena, diags, bool_ty, init, must_succeed),
            _ => fail(diags, arena, id, must_succeed),
        },
        NodePayload::BinOp { op, left, right } => {
            let l = eval(arena, diags, bool_ty, left, must_succeed)?;
            let r = eval(arena, diags, bool_ty, right, must_succeed)?;
            eval_binop(arena, diags, bool_ty, id, op, l, r, must_succeed)
        }
        NodePayload::UnaryOp { op, operand } => {
            let v = eval(arena, diags, bool_ty, operand, must_succeed)?;
            eval_unaryop(arena, diags, id, op, v, must_succeed)
        }
        _ => fail(diags, arena, id, must_succeed),
    }
}

fn fail(diags: &mut DiagCtx, arena: &NodeArena, id: NodeId, must_succeed: bool) -> Option<NodeId> {
    if must_succeed {
        let pos = arena.get(id).pos;
        diags.emit(Diagnostic::new(
            DiagnosticKind::InvalidOperandType,
            pos,
            "expression is not a compile-time constant",
        ));
    }
    None
}

fn lit_int(arena: &NodeArena, id: NodeId) -> Option<i128> {
    match &arena.get(id).payload {
        NodePayload::Lit(LitValue::Int(v)) => Some(*v),
        NodePayload::Lit(LitValue::Bool(b)) => Some(i128::from(*b)),
        _ => None,
    }
}

fn lit_float(arena: &NodeArena, id: NodeId) -> Option<f64> {
    match &arena.get(id).payload {
        NodePayload::Lit(LitValue::Float(v)) => Some(*v),
        NodePayload::Lit(LitValue::Int(v)) => Some(*v as f64),
        _ => None,
    }
}

/// The left operand's resolved `TypeCode`, which drives the fold — per
/// `NodeEval`'s "dominant operand" dispatch, the left side decides which
/// width/signedness rules apply to the whole binop.
fn dominant_code(arena: &NodeArena, left: NodeId) -> Option<TypeCode> {
    arena.get(left).ty.and_then(|t| basic_code(arena, t))
}

fn range_check(diags: &mut DiagCtx, arena: &NodeArena, id: NodeId, v: i128, code: TypeCode) -> bool {
    let Some((min, max)) = code.literal_range() else {
        return true;
    };
    if v < min || v > max {
        let pos = arena.get(id).pos;
        diags.emit(Diagnostic::new(
            DiagnosticKind::ConstantOverflow,
            pos,
            format!("constant {v} overflows {code:?}"),
        ));
        return false;
    }
    true
}

#[allow(clippy::too_many_lines)]
fn eval_binop(
    arena: &mut NodeArena,
    diags: &mut DiagCtx,
    bool_ty: NodeId,
    id: NodeId,
    op: BinOpKind,
    left: NodeId,
    right: NodeId,
    must_succeed: bool,
) -> Option<NodeId> {
    let pos = arena.get(id).pos;
    let endpos = arena.get(id).endpos;
    let ty = arena.get(id).ty;
    let code = dominant_code(arena, left);

    if let Some(code) = code.filter(|c| c.is_float()) {
        let (Some(a), Some(b)) = (lit_float(arena, left), lit_float(arena, right)) else {
            return fail(diags, arena, id, must_succeed);
        };
        let result = match op {
            BinOpKind::Add => a + b,
            BinOpKind::Sub => a - b,
            BinOpKind::Mul => a * b,
            BinOpKind::Div => a / b,
            BinOpKind::Eq | BinOpKind::Ne | BinOpKind::Lt | BinOpKind::Le | BinOpKind::Gt | BinOpKind::Ge => {
                let cmp = compare(a, b, op);
                let node = arena.alloc(pos, endpos, NodeKind::BoolLit, NodePayload::Lit(LitValue::Bool(cmp)));
                arena.get_mut(node).ty = Some(bool_ty);
                return Some(node);
            }
            _ => return fail(diags, arena, id, must_succeed),
        };
        let node = arena.alloc(pos, endpos, NodeKind::FloatLit, NodePayload::Lit(LitValue::Float(result)));
        arena.get_mut(node).ty = ty.or(arena.get(left).ty);
        return Some(node);
    }

    let (Some(a), Some(b)) = (lit_int(arena, left), lit_int(arena, right)) else {
        return fail(diags, arena, id, must_succeed);
    };

    if op.is_comparison() {
        let cmp = match op {
            BinOpKind::Eq => a == b,
            BinOpKind::Ne => a != b,
            BinOpKind::Lt => a < b,
            BinOpKind::Le => a <= b,
            BinOpKind::Gt => a > b,
            BinOpKind::Ge => a >= b,
            _ => unreachable!("op.is_comparison() guards this match"),
        };
        let node = arena.alloc(pos, endpos, NodeKind::BoolLit, NodePayload::Lit(LitValue::Bool(cmp)));
        arena.get_mut(node).ty = Some(bool_ty);
        return Some(node);
    }
    if op.is_logical() {
        let av = a != 0;
        let bv = b != 0;
        let result = match op {
            BinOpKind::LogAnd => av && bv,
            BinOpKind::LogOr => av || bv,
            _ => unreachable!(),
        };
        let node = arena.alloc(pos, endpos, NodeKind::BoolLit, NodePayload::Lit(LitValue::Bool(result)));
        arena.get_mut(node).ty = Some(bool_ty);
        return Some(node);
    }

    let result = match op {
        BinOpKind::Add => a.checked_add(b),
        BinOpKind::Sub => a.checked_sub(b),
        BinOpKind::Mul => a.checked_mul(b),
        BinOpKind::Div => {
            if b == 0 {
                let pos = arena.get(id).pos;
                diags.emit(Diagnostic::new(DiagnosticKind::InvalidOperandType, pos, "division by zero in constant expression"));
                return None;
            }
            a.checked_div(b)
        }
        BinOpKind::Rem => {
            if b == 0 {
                let pos = arena.get(id).pos;
                diags.emit(Diagnostic::new(DiagnosticKind::InvalidOperandType, pos, "division by zero in constant expression"));
                return None;
            }
            a.checked_rem(b)
        }
        BinOpKind::BitAnd => Some(a & b),
        BinOpKind::BitOr => Some(a | b),
        BinOpKind::BitXor => Some(a ^ b),
        BinOpKind::Shl => b.try_into().ok().and_then(|s: u32| a.checked_shl(s)),
        // i128's `>>` is arithmetic (sign-extending); that's correct both
        // for signed left operands and for unsigned ones, whose stored
        // value is always nonnegative so sign-extension never triggers.
        BinOpKind::Shr => b.try_into().ok().and_then(|s: u32| a.checked_shr(s)),
        _ => return fail(diags, arena, id, must_succeed),
    };
    let Some(result) = result else {
        let pos = arena.get(id).pos;
        diags.emit(Diagnostic::new(DiagnosticKind::ConstantOverflow, pos, "constant expression overflows"));
        return None;
    };
    if let Some(c) = code {
        if !range_check(diags, arena, id, result, c) {
            return None;
        }
    }
    let node = arena.alloc(pos, endpos, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(result)));
    arena.get_mut(node).ty = ty.or(arena.get(left).ty);
    Some(node)
}

fn compare(a: f64, b: f64, op: BinOpKind) -> bool {
    match op {
        BinOpKind::Eq => a == b,
        BinOpKind::Ne => a != b,
        BinOpKind::Lt => a < b,
        BinOpKind::Le => a <= b,
        BinOpKind::Gt => a > b,
        BinOpKind::Ge => a >= b,
        _ => unreachable!("compare called with a non-comparison op"),
    }
}

fn eval_unaryop(arena: &mut NodeArena, diags: &mut DiagCtx, id: NodeId, op: UnaryOpKind, operand: NodeId, must_succeed: bool) -> Option<NodeId> {
    let pos = arena.get(id).pos;
    let endpos = arena.get(id).endpos;
    let ty = arena.get(operand).ty;
    match op {
        UnaryOpKind::Neg => {
            if let Some(v) = lit_float(arena, operand) {
                if matches!(arena.get(operand).payload, NodePayload::Lit(LitValue::Float(_))) {
                    let node = arena.alloc(pos, endpos, NodeKind::FloatLit, NodePayload::Lit(LitValue::Float(-v)));
                    arena.get_mut(node).ty = ty;
                    return Some(node);
                }
            }
            let v = lit_int(arena, operand)?;
            let Some(result) = v.checked_neg() else {
                diags.emit(Diagnostic::new(DiagnosticKind::ConstantOverflow, pos, "negation overflows"));
                return None;
            };
            let node = arena.alloc(pos, endpos, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(result)));
            arena.get_mut(node).ty = ty;
            Some(node)
        }
        UnaryOpKind::Not => {
            let v = matches!(arena.get(operand).payload, NodePayload::Lit(LitValue::Bool(true)));
            let node = arena.alloc(pos, endpos, NodeKind::BoolLit, NodePayload::Lit(LitValue::Bool(!v)));
            arena.get_mut(node).ty = ty;
            Some(node)
        }
        UnaryOpKind::BitNot => {
            let v = lit_int(arena, operand)?;
            // Two's-complement identity: `~a == -a - 1`.
            let node = arena.alloc(pos, endpos, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(-v - 1)));
            arena.get_mut(node).ty = ty;
            Some(node)
        }
        _ => fail(diags, arena, id, must_succeed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corec_ast::{populate_builtins, NodeArena};
    use corec_common::position::NO_POS;

    fn int(arena: &mut NodeArena, ty: NodeId, v: i128) -> NodeId {
        let id = arena.alloc(NO_POS, NO_POS, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(v)));
        arena.get_mut(id).ty = Some(ty);
        id
    }

    #[test]
    fn folds_addition_of_two_literals() {
        let mut arena = NodeArena::new();
        let (_scope, types, _consts) = populate_builtins(&mut arena);
        let mut diags = DiagCtx::new();
        let l = int(&mut arena, types.i32, 2);
        let r = int(&mut arena, types.i32, 3);
        let add = arena.alloc(NO_POS, NO_POS, NodeKind::BinOp, NodePayload::BinOp { op: BinOpKind::Add, left: l, right: r });
        arena.get_mut(add).ty = Some(types.i32);

        let folded = eval(&mut arena, &mut diags, types.bool_, add, true).expect("should fold");
        assert_eq!(lit_int(&arena, folded), Some(5));
    }

    #[test]
    fn division_by_zero_is_diagnosed_not_panicked() {
        let mut arena = NodeArena::new();
        let (_scope, types, _consts) = populate_builtins(&mut arena);
        let mut diags = DiagCtx::new();
        let l = int(&mut arena, types.i32, 1);
        let r = int(&mut arena, types.i32, 0);
        let div = arena.alloc(NO_POS, NO_POS, NodeKind::BinOp, NodePayload::BinOp { op: BinOpKind::Div, left: l, right: r });

        let folded = eval(&mut arena, &mut diags, types.bool_, div, true);
        assert!(folded.is_none());
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn overflow_in_constant_addition_is_diagnosed() {
        let mut arena = NodeArena::new();
        let (_scope, types, _consts) = populate_builtins(&mut arena);
        let mut diags = DiagCtx::new();
        let l = int(&mut arena, types.i8, 120);
        let r = int(&mut arena, types.i8, 120);
        let add = arena.alloc(NO_POS, NO_POS, NodeKind::BinOp, NodePayload::BinOp { op: BinOpKind::Add, left: l, right: r });
        arena.get_mut(add).ty = Some(types.i8);

        let folded = eval(&mut arena, &mut diags, types.bool_, add, true);
        assert!(folded.is_none());
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn bitnot_uses_twos_complement_identity() {
        let mut arena = NodeArena::new();
        let (_scope, types, _consts) = populate_builtins(&mut arena);
        let mut diags = DiagCtx::new();
        let v = int(&mut arena, types.i32, 5);
        let not = arena.alloc(NO_POS, NO_POS, NodeKind::UnaryOp, NodePayload::UnaryOp { op: UnaryOpKind::BitNot, operand: v });

        let folded = eval(&mut arena, &mut diags, types.bool_, not, true).expect("should fold");
        assert_eq!(lit_int(&arena, folded), Some(-6));
    }

    #[test]
    fn non_constant_id_fails_without_panicking() {
        let mut arena = NodeArena::new();
        let (_scope, types, _consts) = populate_builtins(&mut arena);
        let mut diags = DiagCtx::new();
        let name = arena.pool().intern_str("x");
        let id = arena.alloc(NO_POS, NO_POS, NodeKind::Id, NodePayload::Id { name, target: None });

        let folded = eval(&mut arena, &mut diags, types.bool_, id, false);
        assert!(folded.is_none());
        assert_eq!(diags.error_count(), 0, "must_succeed=false should stay silent");
    }
}
