//! AST-to-SSA lowering: Braun et al. variable/phi construction, `if`
//! lowering with a phi at the join, and function-start/end bookkeeping.
//!
//! Grounded on `original_source/src/co/ir/irbuilder.c`. That file's
//! `sealBlock`, `writeVariable`, and `readVariable` only ever handle the
//! "no predecessor lookup needed" case — the multi-predecessor recursive
//! read, the incomplete-phi bookkeeping, and trivial-phi reduction are all
//! left as `// TODO` there. This module is the finished version of exactly
//! that TODO, built from the paper's construction algorithm the comments
//! point at rather than from any working C to imitate line-for-line.

use corec_ast::{
    BinOpKind, LitValue, NodeArena, NodeId, NodeKind, NodePayload, TypeCode, UnaryOpKind,
};
use corec_common::diagnostics::{DiagCtx, Diagnostic, DiagnosticKind};
use corec_common::limits::MAX_SSA_READ_RECURSION_DEPTH;
use corec_common::position::{Pos, NO_POS};
use corec_common::symbol::Sym;
use rustc_hash::FxHashMap;
use smallvec::smallvec;

use crate::block::{Block, BlockId, BlockKind};
use crate::fun::Fun;
use crate::pkg::Pkg;
use crate::value::{Op, Value, ValueId};

/// Lower every top-level `fun` declaration in `file` to an SSA `Fun`.
/// `file` must already be resolved and checked (every reachable expression
/// has a concrete `.ty`).
#[must_use]
pub fn build_pkg(arena: &mut NodeArena, file: NodeId, diags: &mut DiagCtx) -> Pkg {
    let decls = match arena.get(file).payload.clone() {
        NodePayload::File { decls } => decls,
        _ => return Pkg::new(),
    };
    let mut pkg = Pkg::new();
    let mut built: FxHashMap<Sym, usize> = FxHashMap::default();
    for &decl in &decls {
        if arena.get(decl).kind != NodeKind::Fun {
            continue;
        }
        let NodePayload::Fun { body: Some(_), .. } = arena.get(decl).payload.clone() else {
            continue; // signature-only (external) declarations have no body to lower
        };
        let fun = FunBuilder::new(arena, decl, diags, &built, &pkg.funs).build();
        if let Some(name) = fun.name.clone() {
            built.insert(name, pkg.funs.len());
        }
        pkg.funs.push(fun);
    }
    pkg
}

struct FunBuilder<'a, 'd, 'p> {
    arena: &'a mut NodeArena,
    diags: &'d mut DiagCtx,
    fun: Fun,
    params: corec_ast::NodeList,
    result_type: Option<NodeId>,
    body: Option<NodeId>,
    /// Name-to-index map of every function lowered earlier in this package
    /// build, so a call can be classified pure/impure without a second
    /// pass. Forward or recursive calls to a not-yet-built function are
    /// conservatively treated as impure.
    built: &'p FxHashMap<Sym, usize>,
    funs_so_far: &'p [Fun],
}

impl<'a, 'd, 'p> FunBuilder<'a, 'd, 'p> {
    fn new(
        arena: &'a mut NodeArena,
        fun_id: NodeId,
        diags: &'d mut DiagCtx,
        built: &'p FxHashMap<Sym, usize>,
        funs_so_far: &'p [Fun],
    ) -> Self {
        let NodePayload::Fun { name, params, result_type, body } = arena.get(fun_id).payload.clone() else {
            unreachable!("FunBuilder::new called on a non-Fun node")
        };
        let fun_ty = arena.get(fun_id).ty;
        let typeid = fun_ty
            .map(|t| corec_ast::typeid(arena, t))
            .unwrap_or_else(|| arena.pool().intern_str("?"));
        let mut entry_block = Block::new(BlockKind::First);
        entry_block.sealed = true; // a function's entry block has no predecessors by definition
        let mut fun = Fun {
            name,
            typeid,
            nparams: u32::try_from(params.len()).unwrap_or(u32::MAX),
            blocks: corec_common::arena::Arena::new(),
            values: corec_common::arena::Arena::new(),
            entry: BlockId::from_u32(0),
            ncalls: 0,
            npure_calls: 0,
            nglobal_writes: 0,
            const_cache: FxHashMap::default(),
        };
        let entry = fun.blocks.alloc(entry_block);
        fun.entry = entry;
        Self { arena, diags, fun, params, result_type, body, built, funs_so_far }
    }

    /// Lower the function body and return the finished `Fun`.
    fn build(mut self) -> Fun {
        let mut cur = self.fun.entry;
        let params = self.params.clone();
        for (i, &param) in params.iter().enumerate() {
            let NodePayload::Local { name, .. } = self.arena.get(param).payload.clone() else {
                continue;
            };
            let ty = crate::tyutil::basic_code_of(self.arena, param);
            let pos = self.arena.get(param).pos;
            let index = u32::try_from(i).unwrap_or(u32::MAX);
            let arg = self.fun.values.alloc(Value::new(Op::Arg(index), ty, smallvec![], pos));
            self.fun.blocks.get_mut(cur).values.push(arg);
            self.write_variable(name, cur, arg);
        }

        let result_ty = self
            .result_type
            .and_then(|t| crate::tyutil::basic_code(self.arena, t))
            .unwrap_or(TypeCode::Nil);

        let ret_val = if let Some(body) = self.body {
            self.emit_expr(&mut cur, body)
        } else {
            self.zero_const(result_ty, NO_POS)
        };

        if !matches!(self.fun.blocks.get(cur).kind, BlockKind::Ret) {
            self.end_as_ret(cur, Some(ret_val));
        }

        self.cleanup_trivial_phis();
        crate::peephole::run(&mut self.fun);
        self.fun
    }

    // ---- Braun et al. variable/phi machinery ----

    fn write_variable(&mut self, name: Sym, block: BlockId, value: ValueId) {
        self.fun.blocks.get_mut(block).vars.insert(name, value);
    }

    fn read_variable(&mut self, name: &Sym, block: BlockId) -> ValueId {
        self.read_variable_depth(name, block, 0)
    }

    fn read_variable_depth(&mut self, name: &Sym, block: BlockId, depth: u32) -> ValueId {
        if let Some(&v) = self.fun.blocks.get(block).vars.get(name) {
            return v;
        }
        if depth >= MAX_SSA_READ_RECURSION_DEPTH {
            self.diags.emit(Diagnostic::new(
                DiagnosticKind::MissingControlValue,
                NO_POS,
                format!("variable '{}' could not be resolved: predecessor chain too deep", name.as_str()),
            ));
            return self.zero_const(TypeCode::Nil, NO_POS);
        }

        let sealed = self.fun.blocks.get(block).sealed;
        let value = if !sealed {
            // Not every predecessor is known yet: park an incomplete phi,
            // completed once this block seals.
            let phi = self.new_phi(block, NO_POS);
            self.fun.blocks.get_mut(block).incomplete_phis.push((name.clone(), phi));
            phi
        } else {
            let preds = self.fun.blocks.get(block).preds.clone();
            match preds.len() {
                0 => {
                    self.diags.emit(Diagnostic::new(
                        DiagnosticKind::InvalidAstNode,
                        NO_POS,
                        format!("read of unbound variable '{}'", name.as_str()),
                    ));
                    self.zero_const(TypeCode::Nil, NO_POS)
                }
                1 => self.read_variable_depth(name, preds[0], depth + 1),
                _ => {
                    let phi = self.new_phi(block, NO_POS);
                    // Write the placeholder before recursing so a cycle back
                    // into `block` finds it locally and stops.
                    self.write_variable(name.clone(), block, phi);
                    self.add_phi_operands(name, block, phi, depth)
                }
            }
        };
        self.write_variable(name.clone(), block, value);
        value
    }

    fn new_phi(&mut self, block: BlockId, pos: Pos) -> ValueId {
        let v = self.fun.values.alloc(Value::new(Op::Phi, TypeCode::Nil, smallvec![], pos));
        self.fun.blocks.get_mut(block).values.push(v);
        v
    }

    fn add_phi_operands(&mut self, name: &Sym, block: BlockId, phi: ValueId, depth: u32) -> ValueId {
        let preds = self.fun.blocks.get(block).preds.clone();
        for pred in preds {
            let operand = self.read_variable_depth(name, pred, depth + 1);
            let operand_ty = self.fun.values.get(operand).ty;
            let val = self.fun.values.get_mut(phi);
            if val.args.is_empty() {
                val.ty = operand_ty;
            }
            val.args.push(operand);
        }
        self.try_remove_trivial_phi(phi, block)
    }

    /// `Some(replacement)` if `phi` is trivial (all non-self operands
    /// identical, or none at all), `None` if it genuinely merges more than
    /// one distinct value. `replacement` is `None` itself when every
    /// operand is a self-reference (an unreachable phi).
    fn trivial_phi_replacement(&self, phi: ValueId) -> Option<Option<ValueId>> {
        let v = self.fun.values.get(phi);
        if !v.op.is_phi() {
            return None;
        }
        let mut same: Option<ValueId> = None;
        for &arg in &v.args {
            if arg == phi {
                continue;
            }
            match same {
                None => same = Some(arg),
                Some(s) if s == arg => {}
                Some(_) => return None,
            }
        }
        Some(same)
    }

    fn try_remove_trivial_phi(&mut self, phi: ValueId, block: BlockId) -> ValueId {
        match self.trivial_phi_replacement(phi) {
            Some(Some(replacement)) => {
                self.replace_value_uses(phi, replacement);
                replacement
            }
            Some(None) => {
                // Every operand was a self-reference: the phi is unreachable.
                let ty = self.fun.values.get(phi).ty;
                let replacement = self.zero_const(ty, NO_POS);
                self.replace_value_uses(phi, replacement);
                replacement
            }
            None => phi,
        }
    }

    /// Whole-function fixed-point cleanup, run once after the body is
    /// built: a phi made trivial by a later reduction (one of its operands
    /// was itself a phi that just got replaced) needs a second look, since
    /// this builder doesn't track per-phi "users" lists to re-check
    /// incrementally.
    fn cleanup_trivial_phis(&mut self) {
        loop {
            let mut changed = false;
            for bid in self.fun.blocks.ids().collect::<Vec<_>>() {
                for vid in self.fun.blocks.get(bid).values.clone() {
                    let Some(replacement) = self.trivial_phi_replacement(vid) else {
                        continue;
                    };
                    let new = match replacement {
                        Some(v) => v,
                        None => {
                            let ty = self.fun.values.get(vid).ty;
                            self.zero_const(ty, NO_POS)
                        }
                    };
                    if new != vid {
                        self.replace_value_uses(vid, new);
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Rewrite every use of `old` (in other values' `args`, a block's
    /// `control`, a block's `vars` map, or a pending incomplete-phi entry)
    /// to `new`, function-wide, and drop `old` from its owning block's
    /// instruction list.
    fn replace_value_uses(&mut self, old: ValueId, new: ValueId) {
        for vid in self.fun.values.ids().collect::<Vec<_>>() {
            if vid == old {
                continue;
            }
            let v = self.fun.values.get_mut(vid);
            for a in v.args.iter_mut() {
                if *a == old {
                    *a = new;
                }
            }
        }
        for bid in self.fun.blocks.ids().collect::<Vec<_>>() {
            let b = self.fun.blocks.get_mut(bid);
            if b.control == Some(old) {
                b.control = Some(new);
            }
            for slot in b.vars.values_mut() {
                if *slot == old {
                    *slot = new;
                }
            }
            for (_, slot) in b.incomplete_phis.iter_mut() {
                if *slot == old {
                    *slot = new;
                }
            }
            b.values.retain(|&v| v != old);
        }
    }

    fn seal_block(&mut self, block: BlockId) {
        self.fun.blocks.get_mut(block).sealed = true;
        let pending = std::mem::take(&mut self.fun.blocks.get_mut(block).incomplete_phis);
        for (name, phi) in &pending {
            self.add_phi_operands(name, block, *phi, 0);
        }
    }

    fn new_block(&mut self, kind: BlockKind) -> BlockId {
        self.fun.blocks.alloc(Block::new(kind))
    }

    fn add_edge(&mut self, from: BlockId, to: BlockId) {
        self.fun.blocks.get_mut(from).succs.push(to);
        self.fun.blocks.get_mut(to).preds.push(from);
    }

    fn end_as_if(&mut self, block: BlockId, cond: ValueId) {
        let b = self.fun.blocks.get_mut(block);
        b.kind = BlockKind::If;
        b.control = Some(cond);
    }

    fn end_as_ret(&mut self, block: BlockId, control: Option<ValueId>) {
        let b = self.fun.blocks.get_mut(block);
        b.kind = BlockKind::Ret;
        b.control = control;
    }

    // ---- Constants ----

    fn get_or_make_const(&mut self, ty: TypeCode, bits: u64, pos: Pos, op: Op) -> ValueId {
        if let Some(&v) = self.fun.const_cache.get(&(ty, bits)) {
            return v;
        }
        let entry = self.fun.entry;
        let v = self.fun.values.alloc(Value::new(op, ty, smallvec![], pos));
        self.fun.blocks.get_mut(entry).values.push(v);
        self.fun.const_cache.insert((ty, bits), v);
        v
    }

    fn const_int(&mut self, ty: TypeCode, v: i128, pos: Pos) -> ValueId {
        let bits = v as i64 as u64;
        self.get_or_make_const(ty, bits, pos, Op::ConstInt(v))
    }

    fn const_float(&mut self, ty: TypeCode, v: f64, pos: Pos) -> ValueId {
        self.get_or_make_const(ty, v.to_bits(), pos, Op::ConstFloat(v))
    }

    fn const_bool(&mut self, v: bool, pos: Pos) -> ValueId {
        self.get_or_make_const(TypeCode::Bool, u64::from(v), pos, Op::ConstBool(v))
    }

    fn const_nil(&mut self, pos: Pos) -> ValueId {
        self.get_or_make_const(TypeCode::Nil, 0, pos, Op::ConstNil)
    }

    fn zero_const(&mut self, ty: TypeCode, pos: Pos) -> ValueId {
        if ty.is_float() {
            self.const_float(ty, 0.0, pos)
        } else if ty == TypeCode::Bool {
            self.const_bool(false, pos)
        } else if ty.is_integer() {
            self.const_int(ty, 0, pos)
        } else {
            self.const_nil(pos)
        }
    }

    fn invalid_node(&mut self, id: NodeId, message: &str) -> ValueId {
        let pos = self.arena.get(id).pos;
        self.diags.emit(Diagnostic::new(DiagnosticKind::InvalidAstNode, pos, message.to_string()));
        let ty = crate::tyutil::basic_code_of(self.arena, id);
        self.zero_const(ty, pos)
    }

    // ---- Expression lowering ----

    fn emit_expr(&mut self, block: &mut BlockId, id: NodeId) -> ValueId {
        let pos = self.arena.get(id).pos;
        let payload = self.arena.get(id).payload.clone();
        match payload {
            NodePayload::Bad => self.const_nil(pos),
            NodePayload::Lit(LitValue::Bool(b)) => self.const_bool(b, pos),
            NodePayload::Lit(LitValue::Int(v)) => {
                let ty = crate::tyutil::basic_code_of(self.arena, id);
                self.const_int(ty, v, pos)
            }
            NodePayload::Lit(LitValue::Float(v)) => {
                let ty = crate::tyutil::basic_code_of(self.arena, id);
                self.const_float(ty, v, pos)
            }
            NodePayload::Lit(LitValue::Str(_)) => {
                self.invalid_node(id, "string literals are not modeled in SSA")
            }
            NodePayload::Nil => self.const_nil(pos),
            NodePayload::Id { name, target } => self.emit_id(block, id, name, target),
            NodePayload::BinOp { op, left, right } => self.emit_binop_expr(block, id, op, left, right),
            NodePayload::UnaryOp { op, operand } => self.emit_unaryop_expr(block, id, op, operand),
            NodePayload::List { items } if self.arena.get(id).kind == NodeKind::Block => {
                self.emit_block_items(block, &items)
            }
            NodePayload::Local { name, init, .. } => {
                let ty = crate::tyutil::basic_code_of(self.arena, id);
                let value = match init {
                    Some(init) => self.emit_expr(block, init),
                    None => self.zero_const(ty, pos),
                };
                self.write_variable(name, *block, value);
                value
            }
            NodePayload::If { cond, then_branch, else_branch } => {
                self.emit_if(block, cond, then_branch, else_branch)
            }
            NodePayload::Call { callee, args } => self.emit_call(block, id, callee, &args),
            NodePayload::TypeCast { target_type, value, .. } => self.emit_cast(block, id, target_type, value),
            _ => self.invalid_node(id, "construct not supported by the SSA builder"),
        }
    }

    fn emit_id(&mut self, block: &mut BlockId, id: NodeId, name: Sym, target: Option<NodeId>) -> ValueId {
        let Some(target) = target else {
            return self.invalid_node(id, "unresolved identifier reached the SSA builder");
        };
        let kind = self.arena.get(target).kind;
        if matches!(kind, NodeKind::ParamDecl | NodeKind::VarDecl | NodeKind::ConstDecl) {
            self.read_variable(&name, *block)
        } else {
            self.invalid_node(id, "identifier does not name a local binding")
        }
    }

    fn emit_block_items(&mut self, block: &mut BlockId, items: &[NodeId]) -> ValueId {
        let mut last = None;
        for &item in items {
            last = Some(self.emit_expr(block, item));
        }
        last.unwrap_or_else(|| self.zero_const(TypeCode::Nil, NO_POS))
    }

    fn emit_binop_expr(&mut self, block: &mut BlockId, id: NodeId, op: BinOpKind, left: NodeId, right: NodeId) -> ValueId {
        if op == BinOpKind::Assign {
            return self.emit_assign(block, id, left, right);
        }
        let l = self.emit_expr(block, left);
        let r = self.emit_expr(block, right);
        let ty = crate::tyutil::basic_code_of(self.arena, id);
        let pos = self.arena.get(id).pos;
        let v = self.fun.values.alloc(Value::new(Op::BinOp(op), ty, smallvec![l, r], pos));
        self.fun.blocks.get_mut(*block).values.push(v);
        v
    }

    fn emit_assign(&mut self, block: &mut BlockId, id: NodeId, left: NodeId, right: NodeId) -> ValueId {
        let value = self.emit_expr(block, right);
        let NodePayload::Id { name, target: Some(target) } = self.arena.get(left).payload.clone() else {
            return self.invalid_node(id, "assignment target is not a local binding");
        };
        if !matches!(self.arena.get(target).kind, NodeKind::VarDecl | NodeKind::ParamDecl) {
            return self.invalid_node(id, "assignment target is not a mutable local binding");
        }
        self.write_variable(name, *block, value);
        value
    }

    fn emit_unaryop_expr(&mut self, block: &mut BlockId, id: NodeId, op: UnaryOpKind, operand: NodeId) -> ValueId {
        match op {
            UnaryOpKind::Return => {
                let v = self.emit_expr(block, operand);
                self.end_as_ret(*block, Some(v));
                v
            }
            UnaryOpKind::PostfixInc | UnaryOpKind::PostfixDec => {
                let old = self.emit_expr(block, operand);
                let ty = crate::tyutil::basic_code_of(self.arena, operand);
                let pos = self.arena.get(id).pos;
                let one = self.const_int(ty, 1, pos);
                let binop = if op == UnaryOpKind::PostfixInc { BinOpKind::Add } else { BinOpKind::Sub };
                let new = self.fun.values.alloc(Value::new(Op::BinOp(binop), ty, smallvec![old, one], pos));
                self.fun.blocks.get_mut(*block).values.push(new);
                if let NodePayload::Id { name, .. } = self.arena.get(operand).payload.clone() {
                    self.write_variable(name, *block, new);
                }
                old
            }
            _ => {
                let v = self.emit_expr(block, operand);
                let ty = crate::tyutil::basic_code_of(self.arena, id);
                let pos = self.arena.get(id).pos;
                let out = self.fun.values.alloc(Value::new(Op::UnaryOp(op), ty, smallvec![v], pos));
                self.fun.blocks.get_mut(*block).values.push(out);
                out
            }
        }
    }

    /// `if` lowering: split the current block into `if`/`then`/`else`/`cont`,
    /// with a phi at `cont` whose operands line up with `cont`'s
    /// predecessors in edge-insertion order (invariant 7). A branch that
    /// ends in `return` contributes neither an edge nor an operand, since
    /// control never actually reaches `cont` along that path.
    fn emit_if(&mut self, block: &mut BlockId, cond: NodeId, then_branch: NodeId, else_branch: Option<NodeId>) -> ValueId {
        let cond_val = self.emit_expr(block, cond);
        let if_block = *block;
        self.end_as_if(if_block, cond_val);

        let then_block = self.new_block(BlockKind::Cont);
        self.add_edge(if_block, then_block);
        self.seal_block(then_block);
        let mut then_cur = then_block;
        let then_val = self.emit_expr(&mut then_cur, then_branch);
        let then_end = then_cur;
        let then_live = !matches!(self.fun.blocks.get(then_end).kind, BlockKind::Ret);

        let (else_end, else_val, else_live) = match else_branch {
            Some(else_branch) => {
                let else_block = self.new_block(BlockKind::Cont);
                self.add_edge(if_block, else_block);
                self.seal_block(else_block);
                let mut else_cur = else_block;
                let v = self.emit_expr(&mut else_cur, else_branch);
                let live = !matches!(self.fun.blocks.get(else_cur).kind, BlockKind::Ret);
                (else_cur, v, live)
            }
            None => {
                let ty = self.fun.values.get(then_val).ty;
                let pos = self.arena.get(then_branch).pos;
                let zero = self.zero_const(ty, pos);
                (if_block, zero, true)
            }
        };

        let cont_block = self.new_block(BlockKind::Cont);
        let mut live_values = smallvec::SmallVec::<[ValueId; 2]>::new();
        if then_live {
            self.add_edge(then_end, cont_block);
            live_values.push(then_val);
        }
        if else_live {
            self.add_edge(else_end, cont_block);
            live_values.push(else_val);
        }
        self.seal_block(cont_block);

        let pos = self.arena.get(then_branch).pos;
        let ty = self.fun.values.get(then_val).ty;
        let result = match live_values.len() {
            0 => self.zero_const(ty, pos), // both branches returned: cont_block is unreachable
            1 => live_values[0],
            _ => {
                let phi = self.fun.values.alloc(Value::new(Op::Phi, ty, live_values, pos));
                self.fun.blocks.get_mut(cont_block).values.push(phi);
                self.try_remove_trivial_phi(phi, cont_block)
            }
        };

        *block = cont_block;
        result
    }

    fn emit_call(&mut self, block: &mut BlockId, id: NodeId, callee: NodeId, args: &[NodeId]) -> ValueId {
        let mut arg_vals = smallvec::SmallVec::<[ValueId; 2]>::new();
        for &a in args {
            arg_vals.push(self.emit_expr(block, a));
        }
        let ty = crate::tyutil::basic_code_of(self.arena, id);
        let pos = self.arena.get(id).pos;

        // A direct call's callee is ordinarily already the `Fun` node itself
        // (the resolver unwinds an `Id` that targets a function straight to
        // its declaration), but fall through an `Id` wrapper if one is
        // still present rather than assume that invariant holds everywhere.
        let mut target = callee;
        while let NodePayload::Id { target: Some(t), .. } = self.arena.get(target).payload {
            target = t;
        }
        let NodePayload::Fun { name: Some(name), .. } = self.arena.get(target).payload.clone() else {
            return self.invalid_node(id, "call target is not a named function");
        };

        self.fun.ncalls += 1;
        let pure = self.built.get(&name).map(|&i| self.funs_so_far[i].is_pure()).unwrap_or(false);
        if pure {
            self.fun.npure_calls += 1;
        }

        let v = self.fun.values.alloc(Value::new(Op::Call { callee: name }, ty, arg_vals, pos));
        self.fun.blocks.get_mut(*block).values.push(v);
        v
    }

    fn emit_cast(&mut self, block: &mut BlockId, id: NodeId, target_type: NodeId, value: NodeId) -> ValueId {
        let v = self.emit_expr(block, value);
        let ty = crate::tyutil::basic_code(self.arena, target_type).unwrap_or(TypeCode::Nil);
        let pos = self.arena.get(id).pos;
        let out = self.fun.values.alloc(Value::new(Op::Cast, ty, smallvec![v], pos));
        self.fun.blocks.get_mut(*block).values.push(out);
        out
    }
}
