//! SSA basic block: a straight-line run of values ending in control flow.
//!
//! Grounded on `ir.h`'s `IRBlock` (`kind, sealed, preds[2], succs[2],
//! values, control`). `vars`/`incomplete_phis` are this port's share of what
//! the original's `IRBuilder` kept in a separate `defvars` array keyed by
//! block id — putting them directly on `Block` drops that indirection since
//! each block is already independently addressable by its own arena id.

use corec_common::symbol::Sym;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::value::ValueId;
use corec_common::arena::ArenaId;

pub type BlockId = ArenaId<Block>;

/// At most two predecessors/successors exist in this language's control
/// flow (the only branch is `if`); `SmallVec` stores them inline.
pub type EdgeList = SmallVec<[BlockId; 2]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// A function's entry block. Exactly one per `Fun`.
    First,
    /// Ordinary fall-through block (a branch target, or a join point).
    Cont,
    /// Ends with a two-way branch; `control` is the condition.
    If,
    /// Ends the function; `control` is the returned value, if any.
    Ret,
}

#[derive(Clone, Debug)]
pub struct Block {
    pub kind: BlockKind,
    pub sealed: bool,
    pub preds: EdgeList,
    pub succs: EdgeList,
    pub values: Vec<ValueId>,
    pub control: Option<ValueId>,
    /// Block-local variable assignments, per `writeVariable`/`readVariable`.
    pub(crate) vars: FxHashMap<Sym, ValueId>,
    /// Phis inserted while this block was still unsealed, completed by
    /// `seal_block` once every predecessor is known.
    pub(crate) incomplete_phis: Vec<(Sym, ValueId)>,
}

impl Block {
    #[must_use]
    pub(crate) fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            sealed: false,
            preds: EdgeList::new(),
            succs: EdgeList::new(),
            values: Vec::new(),
            control: None,
            vars: FxHashMap::default(),
            incomplete_phis: Vec::new(),
        }
    }
}
