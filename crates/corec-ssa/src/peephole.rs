//! Peephole simplification over already-built SSA: identity-arithmetic
//! collapse and constant folding, run once per function right after Braun
//! et al. construction finishes.
//!
//! Constant folding here mirrors `corec_checker::eval`'s checked-arithmetic
//! semantics — overflow and division/remainder by zero leave the operation
//! in place rather than wrapping or panicking — but is reimplemented
//! directly over `Value`/`Op` shapes. `eval` folds `NodeArena`/`NodeId`
//! trees; an SSA value has no backing AST node to hand it.

use corec_ast::{BinOpKind, TypeCode};
use corec_common::position::Pos;

use crate::block::BlockId;
use crate::fun::Fun;
use crate::value::{Op, Value, ValueId};

pub fn run(fun: &mut Fun) {
    loop {
        let mut changed = false;
        for bid in fun.blocks.ids().collect::<Vec<_>>() {
            for vid in fun.blocks.get(bid).values.clone() {
                if simplify_one(fun, vid) {
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
}

fn simplify_one(fun: &mut Fun, vid: ValueId) -> bool {
    let v = fun.values.get(vid).clone();
    let Op::BinOp(op) = v.op else { return false };
    let (a, b) = match v.args.as_slice() {
        [a, b] => (*a, *b),
        _ => return false,
    };
    let a_val = fun.values.get(a).clone();
    let b_val = fun.values.get(b).clone();

    if a_val.op.is_const() && b_val.op.is_const() {
        if let Some(replacement) = fold_const(fun, v.ty, op, &a_val, &b_val, v.pos) {
            replace_uses(fun, vid, replacement);
            return true;
        }
    }

    if let Some(replacement) = identity_operand(op, a, &a_val, b, &b_val) {
        replace_uses(fun, vid, replacement);
        return true;
    }

    false
}

fn is_zero(v: &Value) -> bool {
    match v.op {
        Op::ConstInt(n) => n == 0,
        Op::ConstFloat(f) => f == 0.0,
        _ => false,
    }
}

fn is_one(v: &Value) -> bool {
    match v.op {
        Op::ConstInt(n) => n == 1,
        Op::ConstFloat(f) => f == 1.0,
        _ => false,
    }
}

fn identity_operand(op: BinOpKind, a: ValueId, a_val: &Value, b: ValueId, b_val: &Value) -> Option<ValueId> {
    match op {
        BinOpKind::Add => {
            if is_zero(a_val) {
                Some(b)
            } else if is_zero(b_val) {
                Some(a)
            } else {
                None
            }
        }
        BinOpKind::Mul => {
            if is_one(a_val) {
                Some(b)
            } else if is_one(b_val) {
                Some(a)
            } else {
                None
            }
        }
        BinOpKind::Sub if is_zero(b_val) => Some(a),
        _ => None,
    }
}

fn const_int(v: &Value) -> Option<i128> {
    match v.op {
        Op::ConstInt(n) => Some(n),
        Op::ConstBool(b) => Some(i128::from(b)),
        _ => None,
    }
}

fn const_float(v: &Value) -> Option<f64> {
    match v.op {
        Op::ConstFloat(f) => Some(f),
        Op::ConstInt(n) => Some(n as f64),
        _ => None,
    }
}

fn compare_f(a: f64, b: f64, op: BinOpKind) -> Option<bool> {
    Some(match op {
        BinOpKind::Eq => a == b,
        BinOpKind::Ne => a != b,
        BinOpKind::Lt => a < b,
        BinOpKind::Le => a <= b,
        BinOpKind::Gt => a > b,
        BinOpKind::Ge => a >= b,
        _ => return None,
    })
}

fn compare_i(a: i128, b: i128, op: BinOpKind) -> Option<bool> {
    Some(match op {
        BinOpKind::Eq => a == b,
        BinOpKind::Ne => a != b,
        BinOpKind::Lt => a < b,
        BinOpKind::Le => a <= b,
        BinOpKind::Gt => a > b,
        BinOpKind::Ge => a >= b,
        _ => return None,
    })
}

fn fold_const(fun: &mut Fun, ty: TypeCode, op: BinOpKind, a: &Value, b: &Value, pos: Pos) -> Option<ValueId> {
    if ty.is_float() {
        let (av, bv) = (const_float(a)?, const_float(b)?);
        if op.is_comparison() {
            let r = compare_f(av, bv, op)?;
            return Some(make_const(fun, Op::ConstBool(r), TypeCode::Bool, pos));
        }
        let result = match op {
            BinOpKind::Add => av + bv,
            BinOpKind::Sub => av - bv,
            BinOpKind::Mul => av * bv,
            BinOpKind::Div => av / bv,
            _ => return None,
        };
        return Some(make_const(fun, Op::ConstFloat(result), ty, pos));
    }

    let (av, bv) = (const_int(a)?, const_int(b)?);

    if op.is_comparison() {
        let r = compare_i(av, bv, op)?;
        return Some(make_const(fun, Op::ConstBool(r), TypeCode::Bool, pos));
    }
    if op.is_logical() {
        let r = match op {
            BinOpKind::LogAnd => (av != 0) && (bv != 0),
            BinOpKind::LogOr => (av != 0) || (bv != 0),
            _ => return None,
        };
        return Some(make_const(fun, Op::ConstBool(r), TypeCode::Bool, pos));
    }

    let result = match op {
        BinOpKind::Add => av.checked_add(bv),
        BinOpKind::Sub => av.checked_sub(bv),
        BinOpKind::Mul => av.checked_mul(bv),
        BinOpKind::Div if bv != 0 => av.checked_div(bv),
        BinOpKind::Rem if bv != 0 => av.checked_rem(bv),
        BinOpKind::BitAnd => Some(av & bv),
        BinOpKind::BitOr => Some(av | bv),
        BinOpKind::BitXor => Some(av ^ bv),
        BinOpKind::Shl => u32::try_from(bv).ok().and_then(|s| av.checked_shl(s)),
        BinOpKind::Shr => u32::try_from(bv).ok().and_then(|s| av.checked_shr(s)),
        _ => None,
    }?;

    if let Some((min, max)) = ty.literal_range() {
        if result < min || result > max {
            return None;
        }
    }
    Some(make_const(fun, Op::ConstInt(result), ty, pos))
}

fn make_const(fun: &mut Fun, op: Op, ty: TypeCode, pos: Pos) -> ValueId {
    let bits = match op {
        Op::ConstInt(v) => v as i64 as u64,
        Op::ConstFloat(f) => f.to_bits(),
        Op::ConstBool(b) => u64::from(b),
        _ => 0,
    };
    if let Some(&v) = fun.const_cache.get(&(ty, bits)) {
        return v;
    }
    let entry = fun.entry;
    let v = fun.values.alloc(Value::new(op, ty, smallvec::smallvec![], pos));
    fun.blocks.get_mut(entry).values.push(v);
    fun.const_cache.insert((ty, bits), v);
    v
}

fn replace_uses(fun: &mut Fun, old: ValueId, new: ValueId) {
    for vid in fun.values.ids().collect::<Vec<_>>() {
        if vid == old {
            continue;
        }
        let v = fun.values.get_mut(vid);
        for a in v.args.iter_mut() {
            if *a == old {
                *a = new;
            }
        }
    }
    for bid in fun.blocks.ids().collect::<Vec<BlockId>>() {
        let b = fun.blocks.get_mut(bid);
        if b.control == Some(old) {
            b.control = Some(new);
        }
        for slot in b.vars.values_mut() {
            if *slot == old {
                *slot = new;
            }
        }
        b.values.retain(|&v| v != old);
    }
}
