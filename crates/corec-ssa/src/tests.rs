//! Tests against hand-built, checker-validated ASTs — the same
//! construction style `corec-checker`'s own tests use, since this crate has
//! no parser dependency to generate fixtures from source text.

use corec_ast::{BinOpKind, LitValue, NodeArena, NodeId, NodeKind, NodePayload, TypeCode};
use corec_common::diagnostics::DiagCtx;
use corec_common::position::NO_POS;
use smallvec::smallvec;

use crate::{build_pkg, BlockId, BlockKind, Op};

fn id_to(arena: &mut NodeArena, name: &str, target: NodeId) -> NodeId {
    let sym = arena.pool().intern_str(name);
    arena.alloc(NO_POS, NO_POS, NodeKind::Id, NodePayload::Id { name: sym, target: Some(target) })
}

/// `fun f(b bool) i32 { if b 1 else 2 }`: four blocks (entry/then/else/cont),
/// one `i32` phi at the join with operands `(1, 2)` in predecessor order.
#[test]
fn if_join_phi_matches_predecessor_order() {
    let mut arena = NodeArena::new();
    let mut diags = DiagCtx::new();
    let bool_ty = arena.alloc_type(NodeKind::BasicType, NodePayload::BasicType(TypeCode::Bool));
    let i32_ty = arena.alloc_type(NodeKind::BasicType, NodePayload::BasicType(TypeCode::I32));
    let b_name = arena.pool().intern_str("b");
    let b_param = arena.alloc(
        NO_POS,
        NO_POS,
        NodeKind::ParamDecl,
        NodePayload::Local { name: b_name, declared_type: Some(bool_ty), init: None, is_mut: false },
    );
    let b_ref = id_to(&mut arena, "b", b_param);
    let one = arena.alloc(NO_POS, NO_POS, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(1)));
    let two = arena.alloc(NO_POS, NO_POS, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(2)));
    let if_expr = arena.alloc(NO_POS, NO_POS, NodeKind::IfExpr, NodePayload::If { cond: b_ref, then_branch: one, else_branch: Some(two) });
    let fun_id = arena.alloc(
        NO_POS,
        NO_POS,
        NodeKind::Fun,
        NodePayload::Fun { name: Some(arena.pool().intern_str("f")), params: smallvec![b_param], result_type: Some(i32_ty), body: Some(if_expr) },
    );
    let file = arena.alloc(NO_POS, NO_POS, NodeKind::File, NodePayload::File { decls: smallvec![fun_id] });

    corec_checker::check_file(&mut arena, file, &mut diags);
    assert!(!diags.has_errors(), "{:?}", diags.diagnostics());

    let pkg = build_pkg(&mut arena, file, &mut diags);
    assert!(!diags.has_errors(), "{:?}", diags.diagnostics());

    let fun = pkg.find("f").expect("f lowered");
    assert_eq!(fun.blocks.len(), 4, "entry, then, else, cont");
    assert_eq!(fun.blocks.get(fun.entry).kind, BlockKind::First);
    assert!(fun.blocks.get(fun.entry).sealed);

    let then_block = BlockId::from_u32(1);
    let else_block = BlockId::from_u32(2);
    let cont_block = BlockId::from_u32(3);

    for b in [then_block, else_block, cont_block] {
        assert!(fun.blocks.get(b).sealed, "every block should be sealed once its function is built");
    }

    let then_b = fun.blocks.get(then_block);
    assert_eq!(then_b.preds.len(), 1);
    assert_eq!(then_b.preds[0], fun.entry);

    let else_b = fun.blocks.get(else_block);
    assert_eq!(else_b.preds.len(), 1);
    assert_eq!(else_b.preds[0], fun.entry);

    let cont = fun.blocks.get(cont_block);
    assert_eq!(cont.preds.len(), 2);
    assert_eq!(cont.preds[0], then_block);
    assert_eq!(cont.preds[1], else_block);
    assert_eq!(cont.kind, BlockKind::Ret);

    let ret_val = cont.control.expect("cont ends with a returned value");
    let phi = fun.values.get(ret_val);
    assert_eq!(phi.op, Op::Phi);
    assert_eq!(phi.args.len(), 2);
    assert_eq!(fun.values.get(phi.args[0]).op, Op::ConstInt(1));
    assert_eq!(fun.values.get(phi.args[1]).op, Op::ConstInt(2));
}

/// Every predecessor/successor list stays within the at-most-two-edges
/// shape this language's only branch (`if`) can produce, and every
/// surviving phi's operand count equals its own block's predecessor count.
#[test]
fn blocks_and_phis_respect_predecessor_invariant() {
    let mut arena = NodeArena::new();
    let mut diags = DiagCtx::new();
    let bool_ty = arena.alloc_type(NodeKind::BasicType, NodePayload::BasicType(TypeCode::Bool));
    let i32_ty = arena.alloc_type(NodeKind::BasicType, NodePayload::BasicType(TypeCode::I32));
    let b_name = arena.pool().intern_str("b");
    let b_param = arena.alloc(
        NO_POS,
        NO_POS,
        NodeKind::ParamDecl,
        NodePayload::Local { name: b_name, declared_type: Some(bool_ty), init: None, is_mut: false },
    );
    let b_ref = id_to(&mut arena, "b", b_param);
    let one = arena.alloc(NO_POS, NO_POS, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(1)));
    let two = arena.alloc(NO_POS, NO_POS, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(2)));
    let if_expr = arena.alloc(NO_POS, NO_POS, NodeKind::IfExpr, NodePayload::If { cond: b_ref, then_branch: one, else_branch: Some(two) });
    let fun_id = arena.alloc(
        NO_POS,
        NO_POS,
        NodeKind::Fun,
        NodePayload::Fun { name: Some(arena.pool().intern_str("f")), params: smallvec![b_param], result_type: Some(i32_ty), body: Some(if_expr) },
    );
    let file = arena.alloc(NO_POS, NO_POS, NodeKind::File, NodePayload::File { decls: smallvec![fun_id] });
    corec_checker::check_file(&mut arena, file, &mut diags);
    let pkg = build_pkg(&mut arena, file, &mut diags);
    let fun = pkg.find("f").unwrap();

    for bid in fun.block_ids() {
        let b = fun.blocks.get(bid);
        assert!(b.preds.len() <= 2, "if is the only branch this language has");
        for &v in &b.values {
            let val = fun.values.get(v);
            if val.op == Op::Phi {
                assert_eq!(val.args.len(), b.preds.len(), "phi operand count must track predecessor count");
            }
        }
    }
}

/// `fun f(b bool, x i32) i32 { if b x else x }`: both arms yield the same
/// parameter, so the join's phi is trivial and reduces away — the return
/// value is `x` itself, not a `Phi`.
#[test]
fn trivial_phi_reduces_to_its_single_operand() {
    let mut arena = NodeArena::new();
    let mut diags = DiagCtx::new();
    let bool_ty = arena.alloc_type(NodeKind::BasicType, NodePayload::BasicType(TypeCode::Bool));
    let i32_ty = arena.alloc_type(NodeKind::BasicType, NodePayload::BasicType(TypeCode::I32));
    let b_name = arena.pool().intern_str("b");
    let b_param = arena.alloc(
        NO_POS,
        NO_POS,
        NodeKind::ParamDecl,
        NodePayload::Local { name: b_name, declared_type: Some(bool_ty), init: None, is_mut: false },
    );
    let x_name = arena.pool().intern_str("x");
    let x_param = arena.alloc(
        NO_POS,
        NO_POS,
        NodeKind::ParamDecl,
        NodePayload::Local { name: x_name, declared_type: Some(i32_ty), init: None, is_mut: false },
    );
    let b_ref = id_to(&mut arena, "b", b_param);
    let then_x = id_to(&mut arena, "x", x_param);
    let else_x = id_to(&mut arena, "x", x_param);
    let if_expr = arena.alloc(NO_POS, NO_POS, NodeKind::IfExpr, NodePayload::If { cond: b_ref, then_branch: then_x, else_branch: Some(else_x) });
    let fun_id = arena.alloc(
        NO_POS,
        NO_POS,
        NodeKind::Fun,
        NodePayload::Fun {
            name: Some(arena.pool().intern_str("f")),
            params: smallvec![b_param, x_param],
            result_type: Some(i32_ty),
            body: Some(if_expr),
        },
    );
    let file = arena.alloc(NO_POS, NO_POS, NodeKind::File, NodePayload::File { decls: smallvec![fun_id] });
    corec_checker::check_file(&mut arena, file, &mut diags);
    assert!(!diags.has_errors(), "{:?}", diags.diagnostics());

    let pkg = build_pkg(&mut arena, file, &mut diags);
    let fun = pkg.find("f").unwrap();

    let cont_block = BlockId::from_u32(3);
    let cont = fun.blocks.get(cont_block);
    let ret_val = cont.control.expect("cont ends with a returned value");
    assert_eq!(fun.values.get(ret_val).op, Op::Arg(1), "reduces to the x parameter, not a phi");
}

/// Calling a pure, earlier-built function keeps the caller pure;
/// `nglobal_writes` stays `0` since this language has no modeled globals.
#[test]
fn call_to_pure_function_keeps_caller_pure() {
    let mut arena = NodeArena::new();
    let mut diags = DiagCtx::new();
    let i32_ty = arena.alloc_type(NodeKind::BasicType, NodePayload::BasicType(TypeCode::I32));
    let x_name = arena.pool().intern_str("x");
    let x_param = arena.alloc(
        NO_POS,
        NO_POS,
        NodeKind::ParamDecl,
        NodePayload::Local { name: x_name, declared_type: Some(i32_ty), init: None, is_mut: false },
    );
    let x_ref = id_to(&mut arena, "x", x_param);
    let one = arena.alloc(NO_POS, NO_POS, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(1)));
    let add_expr = arena.alloc(NO_POS, NO_POS, NodeKind::BinOp, NodePayload::BinOp { op: BinOpKind::Add, left: x_ref, right: one });
    let inc = arena.alloc(
        NO_POS,
        NO_POS,
        NodeKind::Fun,
        NodePayload::Fun { name: Some(arena.pool().intern_str("inc")), params: smallvec![x_param], result_type: Some(i32_ty), body: Some(add_expr) },
    );

    let y_name = arena.pool().intern_str("y");
    let y_param = arena.alloc(
        NO_POS,
        NO_POS,
        NodeKind::ParamDecl,
        NodePayload::Local { name: y_name, declared_type: Some(i32_ty), init: None, is_mut: false },
    );
    let inc_ref = id_to(&mut arena, "inc", inc);
    let y_ref = id_to(&mut arena, "y", y_param);
    let call = arena.alloc(NO_POS, NO_POS, NodeKind::Call, NodePayload::Call { callee: inc_ref, args: smallvec![y_ref] });
    let caller = arena.alloc(
        NO_POS,
        NO_POS,
        NodeKind::Fun,
        NodePayload::Fun { name: Some(arena.pool().intern_str("caller")), params: smallvec![y_param], result_type: Some(i32_ty), body: Some(call) },
    );
    let file = arena.alloc(NO_POS, NO_POS, NodeKind::File, NodePayload::File { decls: smallvec![inc, caller] });

    corec_checker::check_file(&mut arena, file, &mut diags);
    assert!(!diags.has_errors(), "{:?}", diags.diagnostics());

    let pkg = build_pkg(&mut arena, file, &mut diags);
    let inc_fun = pkg.find("inc").unwrap();
    assert!(inc_fun.is_pure());
    let caller_fun = pkg.find("caller").unwrap();
    assert!(caller_fun.is_pure(), "calling a pure function keeps the caller pure");
    assert_eq!(caller_fun.nglobal_writes, 0);
}

/// A mutable reassignment inside a sealed block is a plain `writeVariable`:
/// subsequent reads in the same block see the new value without a phi.
#[test]
fn reassignment_in_one_block_needs_no_phi() {
    let mut arena = NodeArena::new();
    let mut diags = DiagCtx::new();
    let i32_ty = arena.alloc_type(NodeKind::BasicType, NodePayload::BasicType(TypeCode::I32));
    let x_name = arena.pool().intern_str("x");
    let x_param = arena.alloc(
        NO_POS,
        NO_POS,
        NodeKind::ParamDecl,
        NodePayload::Local { name: x_name, declared_type: Some(i32_ty), init: None, is_mut: true },
    );
    let x_ref_lhs = id_to(&mut arena, "x", x_param);
    let two = arena.alloc(NO_POS, NO_POS, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(2)));
    let assign = arena.alloc(NO_POS, NO_POS, NodeKind::BinOp, NodePayload::BinOp { op: BinOpKind::Assign, left: x_ref_lhs, right: two });
    let x_ref_rhs = id_to(&mut arena, "x", x_param);
    let body = arena.alloc(NO_POS, NO_POS, NodeKind::Block, NodePayload::List { items: smallvec![assign, x_ref_rhs] });
    let fun_id = arena.alloc(
        NO_POS,
        NO_POS,
        NodeKind::Fun,
        NodePayload::Fun { name: Some(arena.pool().intern_str("f")), params: smallvec![x_param], result_type: Some(i32_ty), body: Some(body) },
    );
    let file = arena.alloc(NO_POS, NO_POS, NodeKind::File, NodePayload::File { decls: smallvec![fun_id] });
    corec_checker::check_file(&mut arena, file, &mut diags);
    assert!(!diags.has_errors(), "{:?}", diags.diagnostics());

    let pkg = build_pkg(&mut arena, file, &mut diags);
    let fun = pkg.find("f").unwrap();
    let entry = fun.blocks.get(fun.entry);
    let ret_val = entry.control.expect("single-block function ends as Ret");
    assert_eq!(fun.values.get(ret_val).op, Op::ConstInt(2), "reads the reassigned value, not the original param");
}
