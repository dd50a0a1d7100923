//! SSA value: one operation with its typed operands.
//!
//! Grounded on `original_source/src/co/ir/ir.h`'s `IRValue` (`id, op, type,
//! args, pos`, a union `aux` for constants/callee names). Rust has a real
//! sum type, so the union collapses into `Op`'s own payload variants rather
//! than a separate `auxInt`/`auxSym` pair guarded by `op`.

use corec_ast::{BinOpKind, TypeCode, UnaryOpKind};
use corec_common::arena::ArenaId;
use corec_common::position::Pos;
use corec_common::symbol::Sym;
use smallvec::SmallVec;

pub type ValueId = ArenaId<Value>;

/// Inline operand list; binops/phis-at-a-join rarely exceed two or three
/// operands, so this avoids a heap allocation for the common shapes.
pub type ValueArgs = SmallVec<[ValueId; 2]>;

/// What a value computes. Constants carry their own bit pattern (the same
/// one used as the constant cache's key) rather than re-deriving it from
/// `args`, since a constant has none.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Op {
    ConstInt(i128),
    ConstFloat(f64),
    ConstBool(bool),
    ConstNil,
    /// `n`th function parameter, materialized at function start.
    Arg(u32),
    /// Braun-et-al. phi. Operand count equals the owning block's predecessor
    /// count once the block seals (invariant 7).
    Phi,
    BinOp(BinOpKind),
    UnaryOp(UnaryOpKind),
    /// Direct call to the function named by `callee`. `args` holds the
    /// (already-lowered) argument values.
    Call { callee: Sym },
    /// Explicit type conversion (`T(x)`); `ty` names the destination.
    Cast,
}

impl Op {
    #[must_use]
    pub const fn is_const(self) -> bool {
        matches!(self, Op::ConstInt(_) | Op::ConstFloat(_) | Op::ConstBool(_) | Op::ConstNil)
    }

    #[must_use]
    pub const fn is_phi(self) -> bool {
        matches!(self, Op::Phi)
    }
}

#[derive(Clone, Debug)]
pub struct Value {
    pub op: Op,
    pub ty: TypeCode,
    pub args: ValueArgs,
    pub pos: Pos,
}

impl Value {
    #[must_use]
    pub fn new(op: Op, ty: TypeCode, args: ValueArgs, pos: Pos) -> Self {
        Self { op, ty, args, pos }
    }
}
