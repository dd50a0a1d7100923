//! SSA function: its blocks, values, and the per-function constant cache.
//!
//! Grounded on `ir.h`'s `IRFun` (`blocks, type, typeid, nparams,
//! ncalls/npurecalls/nglobalw, consts`) and `IRFunIsPure`'s
//! `ncalls - npurecalls == 0 && nglobalw == 0` purity test.

use corec_ast::TypeCode;
use corec_common::arena::Arena;
use corec_common::symbol::Sym;
use rustc_hash::FxHashMap;

use crate::block::{Block, BlockId};
use crate::value::{Value, ValueId};

/// `(type code, bit pattern)`: the constant cache's key, per the base
/// spec's note that a plain map reproduces the original's red-black-tree
/// bucket design with identical observable behavior.
pub type ConstKey = (TypeCode, u64);

pub struct Fun {
    pub name: Option<Sym>,
    /// Cached typeid of this function's `^(...)result` signature.
    pub typeid: Sym,
    pub nparams: u32,
    pub blocks: Arena<Block>,
    pub values: Arena<Value>,
    pub entry: BlockId,
    pub ncalls: u32,
    pub npure_calls: u32,
    pub nglobal_writes: u32,
    pub(crate) const_cache: FxHashMap<ConstKey, ValueId>,
}

impl Fun {
    /// Mirrors `IRFunIsPure`: a function is pure iff every call it makes is
    /// itself to a pure function, and it never writes a global.
    #[must_use]
    pub fn is_pure(&self) -> bool {
        self.ncalls == self.npure_calls && self.nglobal_writes == 0
    }

    /// Iterate this function's blocks in allocation order (entry first).
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks.ids()
    }
}
