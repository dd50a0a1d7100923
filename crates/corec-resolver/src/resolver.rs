//! The resolver itself: a single post-parse walk that binds names and
//! performs name-dependent simplification.
//!
//! Grounded on `original_source/src/co/parse/resolve_sym.c`: a file-level
//! scope is pre-populated with every top-level declaration before any body
//! is walked (so forward references across declarations in the same file
//! work), then a recursive `resolve` pushes a child [`Scope`] at each block,
//! function, and template boundary and rewrites each subtree in place.
//! Unlike the original, this parser never does any eager binding of its
//! own (see `corec-parser`'s `DESIGN.md` entry), so there is exactly one
//! resolution pass here rather than the original's interleaved parse/first
//! pass followed by a second pass — the tree arriving here is already
//! fully parsed and entirely `UNRESOLVED`.

use corec_ast::{
    populate_builtins, BinOpKind, LitValue, NodeArena, NodeFlags, NodeId, NodeKind, NodeList,
    NodePayload, Scope,
};
use corec_common::diagnostics::{DiagCtx, Diagnostic, DiagnosticKind};
use corec_common::options::BuildOptions;
use corec_common::symbol::Sym;
use std::sync::Arc;

/// Resolve every name in `file` (a `NodeKind::File` node) against a fresh
/// scope chained to this arena's own copy of the builtin types and
/// constants, mutating `arena` in place.
///
/// The chain can't point at `universe().scope` directly: that scope's
/// bindings are `NodeId`s into the universe's own arena, not this one (see
/// `corec_ast::populate_builtins`'s doc comment), so every build mirrors
/// the builtins into its own arena first.
pub fn resolve_file(arena: &mut NodeArena, file: NodeId, diags: &mut DiagCtx, options: &BuildOptions) {
    let decls = match &arena.get(file).payload {
        NodePayload::File { decls } => decls.clone(),
        _ => return,
    };

    let (builtins, _types, _consts) = populate_builtins(arena);
    let mut file_scope = Scope::with_parent(Arc::new(builtins));
    for &d in &decls {
        if let Some(name) = decl_name(arena, d) {
            if let Err(prev) = file_scope.define(name.clone(), d) {
                let pos = arena.get(d).pos;
                let prev_pos = arena.get(prev.0).pos;
                diags.emit(
                    Diagnostic::new(
                        DiagnosticKind::SyntaxInContext,
                        pos,
                        format!("'{}' is already declared in this file", name.as_str()),
                    )
                    .with_note(prev_pos, "previous declaration is here"),
                );
            }
        }
    }
    let file_scope = Arc::new(file_scope);

    let mut resolver = Resolver {
        arena,
        diags,
        fnest: 0,
        parse_opt: options.parse_opt,
    };
    let mut new_decls = NodeList::new();
    for &d in &decls {
        new_decls.push(resolver.resolve(d, &file_scope));
    }
    arena.get_mut(file).payload = NodePayload::File { decls: new_decls };
}

/// The declared name of a top-level node, if it introduces one. Recurses
/// through `Template` to the generic type-alias case, the one shape where a
/// top-level declaration isn't a `ConstDecl`/`VarDecl` wrapper (see
/// `corec-parser`'s desugaring notes).
fn decl_name(arena: &NodeArena, id: NodeId) -> Option<Sym> {
    match &arena.get(id).payload {
        NodePayload::Local { name, .. } => Some(name.clone()),
        NodePayload::AliasType { name, .. } => Some(name.clone()),
        NodePayload::Template { body, .. } => decl_name(arena, *body),
        NodePayload::TemplateType { body, .. } => decl_name(arena, *body),
        _ => None,
    }
}

/// Node kinds a resolved identifier may safely unwind straight to: pure
/// values and type expressions with no remaining runtime effect. Mirrors
/// `resolve_sym.c`'s case list (`NBoolLit`/`NIntLit`/`NNil`/`NFun`/
/// `NBasicType`/`NTupleType`/`NFunType`), extended with `FloatLit`/`StrLit`
/// since this language has float and string literals the original case
/// list predates.
fn unwinds_to_value(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::BoolLit
            | NodeKind::IntLit
            | NodeKind::FloatLit
            | NodeKind::StrLit
            | NodeKind::Nil
            | NodeKind::Fun
            | NodeKind::BasicType
            | NodeKind::TupleType
            | NodeKind::FunType
    )
}

struct Resolver<'a> {
    arena: &'a mut NodeArena,
    diags: &'a mut DiagCtx,
    fnest: u32,
    parse_opt: bool,
}

impl<'a> Resolver<'a> {
    /// Resolve `id` against `scope`, returning the node that should take its
    /// place in the parent (usually `id` itself, but block collapsing and
    /// constant unwinding can substitute a different, already-existing
    /// node).
    fn resolve(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        match self.arena.get(id).kind {
            NodeKind::Id => self.resolve_id(id, scope),
            NodeKind::IdType => self.resolve_idtype(id, scope),
            NodeKind::Block => self.resolve_block(id, scope),
            NodeKind::Tuple | NodeKind::Array => self.resolve_list(id, scope),
            NodeKind::Fun => self.resolve_fun(id, scope),
            NodeKind::Template => self.resolve_template(id, scope),
            NodeKind::TemplateType => self.resolve_template_type(id, scope),
            NodeKind::TemplateInstance => self.resolve_template_instance(id, scope),
            NodeKind::ConstDecl | NodeKind::VarDecl | NodeKind::ParamDecl | NodeKind::FieldDecl => {
                self.resolve_local(id, scope)
            }
            NodeKind::BinOp => self.resolve_binop(id, scope),
            NodeKind::UnaryOp => self.resolve_unaryop(id, scope),
            NodeKind::Call => self.resolve_call(id, scope),
            NodeKind::TypeCastExpr => self.resolve_typecast(id, scope),
            NodeKind::RefExpr => self.resolve_ref(id, scope),
            NodeKind::NamedArg => self.resolve_named_arg(id, scope),
            NodeKind::Selector => self.resolve_selector(id, scope),
            NodeKind::IndexExpr => self.resolve_index(id, scope),
            NodeKind::SliceExpr => self.resolve_slice(id, scope),
            NodeKind::IfExpr => self.resolve_if(id, scope),
            NodeKind::RefType => self.resolve_ref_type(id, scope),
            NodeKind::ArrayType => self.resolve_array_type(id, scope),
            NodeKind::TupleType => self.resolve_tuple_type(id, scope),
            NodeKind::StructType => self.resolve_struct_type(id, scope),
            NodeKind::FunType => self.resolve_fun_type(id, scope),
            NodeKind::AliasType => self.resolve_alias_type(id, scope),
            // Bad, Comment, literals, Nil, BasicType, TypeType: nothing to
            // bind. Pkg/File are only ever driven from the top by their own
            // callers (resolve_file, or a future multi-file package driver),
            // not recursed into generically.
            _ => id,
        }
    }

    /// `x op= y`'s desugared LHS (an `Id` the parser reused a `NodeId` for,
    /// see `corec-parser`'s `precedence::compound_assign_op`) and a plain
    /// `x = y`'s LHS both need `target` filled in without unwinding to a
    /// constant value — an assignment target names the *binding*, not its
    /// current value, mirroring `resolve_sym.c`'s `assignNest` guard.
    fn resolve_id_as_assign_target(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (name, existing) = match &self.arena.get(id).payload {
            NodePayload::Id { name, target } => (name.clone(), *target),
            _ => return self.resolve(id, scope),
        };
        if existing.is_none() {
            match scope.lookup(&name) {
                Some(t) => {
                    if let NodePayload::Id { target, .. } = &mut self.arena.get_mut(id).payload {
                        *target = Some(t);
                    }
                    self.arena.get_mut(id).flags.remove(NodeFlags::UNRESOLVED);
                }
                None => {
                    let pos = self.arena.get(id).pos;
                    self.diags.emit(Diagnostic::new(
                        DiagnosticKind::UndefinedSymbol,
                        pos,
                        format!("undefined symbol '{}'", name.as_str()),
                    ));
                }
            }
        }
        id
    }

    fn resolve_id(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let mut cur = id;
        loop {
            let (name, existing_target) = match &self.arena.get(cur).payload {
                NodePayload::Id { name, target } => (name.clone(), *target),
                _ => return cur,
            };
            let target = match existing_target {
                Some(t) => t,
                None => match scope.lookup(&name) {
                    Some(t) => {
                        if let NodePayload::Id { target, .. } = &mut self.arena.get_mut(cur).payload {
                            *target = Some(t);
                        }
                        self.arena.get_mut(cur).flags.remove(NodeFlags::UNRESOLVED);
                        t
                    }
                    None => {
                        let pos = self.arena.get(cur).pos;
                        self.diags.emit(Diagnostic::new(
                            DiagnosticKind::UndefinedSymbol,
                            pos,
                            format!("undefined symbol '{}'", name.as_str()),
                        ));
                        return self
                            .arena
                            .alloc(pos, pos, NodeKind::Bad, NodePayload::Bad);
                    }
                },
            };

            let (target_kind, target_init, target_is_mut) = {
                let t = self.arena.get(target);
                match &t.payload {
                    NodePayload::Local { init, is_mut, .. } => (t.kind, *init, *is_mut),
                    _ => (t.kind, None, false),
                }
            };

            if matches!(target_kind, NodeKind::Id) {
                cur = target;
                continue;
            }
            if !target_is_mut {
                if let Some(init) = target_init {
                    if unwinds_to_value(self.arena.get(init).kind) {
                        return init;
                    }
                }
            }
            if unwinds_to_value(target_kind) {
                return target;
            }
            return cur;
        }
    }

    fn resolve_idtype(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (name, existing) = match &self.arena.get(id).payload {
            NodePayload::IdType { name, target } => (name.clone(), *target),
            _ => return id,
        };
        if existing.is_some() {
            return id;
        }
        match scope.lookup(&name) {
            Some(t) => {
                if let NodePayload::IdType { target, .. } = &mut self.arena.get_mut(id).payload {
                    *target = Some(t);
                }
                self.arena.get_mut(id).flags.remove(NodeFlags::UNRESOLVED);
            }
            None => {
                let pos = self.arena.get(id).pos;
                self.diags.emit(Diagnostic::new(
                    DiagnosticKind::UndefinedSymbol,
                    pos,
                    format!("undefined type '{}'", name.as_str()),
                ));
                // Left `UNRESOLVED` with no target: the checker treats an
                // unresolved type position as an error type rather than
                // substituting a placeholder node, since a type slot (unlike
                // an expression slot) must stay structurally a type node.
            }
        }
        id
    }

    fn resolve_block(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let items = match &self.arena.get(id).payload {
            NodePayload::List { items } => items.clone(),
            _ => return id,
        };
        let block_scope = Arc::new(Scope::with_parent(scope.clone()));
        let mut new_items = NodeList::new();
        for it in items {
            new_items.push(self.resolve(it, &block_scope));
        }
        if new_items.len() == 1 {
            return new_items[0];
        }
        self.arena.get_mut(id).payload = NodePayload::List { items: new_items };
        id
    }

    fn resolve_list(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let items = match &self.arena.get(id).payload {
            NodePayload::List { items } => items.clone(),
            _ => return id,
        };
        let mut new_items = NodeList::new();
        for it in items {
            new_items.push(self.resolve(it, scope));
        }
        self.arena.get_mut(id).payload = NodePayload::List { items: new_items };
        id
    }

    fn resolve_local(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (name, declared_type, init, is_mut) = match &self.arena.get(id).payload {
            NodePayload::Local {
                name,
                declared_type,
                init,
                is_mut,
            } => (name.clone(), *declared_type, *init, *is_mut),
            _ => return id,
        };
        let declared_type = declared_type.map(|t| self.resolve(t, scope));
        let init = init.map(|i| self.resolve(i, scope));
        self.arena.get_mut(id).payload = NodePayload::Local {
            name,
            declared_type,
            init,
            is_mut,
        };
        id
    }

    fn resolve_fun(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (name, params, result_type, body) = match &self.arena.get(id).payload {
            NodePayload::Fun {
                name,
                params,
                result_type,
                body,
            } => (name.clone(), params.clone(), *result_type, *body),
            _ => return id,
        };
        self.fnest += 1;
        let mut fun_scope = Scope::with_parent(scope.clone());
        let mut new_params = NodeList::new();
        for p in params {
            // Each parameter's declared type (and default, if any) resolves
            // in the *outer* scope — a parameter can't reference itself or a
            // sibling — and is only then bound into the function's scope
            // for the body to see.
            let resolved = self.resolve_local(p, scope);
            new_params.push(resolved);
            if let Some(pname) = decl_name(self.arena, resolved) {
                let _ = fun_scope.define(pname, resolved);
            }
        }
        let fun_scope = Arc::new(fun_scope);
        let result_type = result_type.map(|t| self.resolve(t, &fun_scope));
        let body = body.map(|b| self.resolve(b, &fun_scope));
        self.fnest -= 1;
        self.arena.get_mut(id).payload = NodePayload::Fun {
            name,
            params: new_params,
            result_type,
            body,
        };
        id
    }

    fn resolve_template(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (params, body) = match &self.arena.get(id).payload {
            NodePayload::Template { params, body } => (params.clone(), *body),
            _ => return id,
        };
        let mut tscope = Scope::with_parent(scope.clone());
        for p in &params {
            if let Some(pname) = decl_name(self.arena, *p) {
                let _ = tscope.define(pname, *p);
            }
        }
        let tscope = Arc::new(tscope);
        let body = self.resolve(body, &tscope);
        self.arena.get_mut(id).payload = NodePayload::Template { params, body };
        id
    }

    fn resolve_template_type(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (params, body) = match &self.arena.get(id).payload {
            NodePayload::TemplateType { params, body } => (params.clone(), *body),
            _ => return id,
        };
        let mut tscope = Scope::with_parent(scope.clone());
        for p in &params {
            if let Some(pname) = decl_name(self.arena, *p) {
                let _ = tscope.define(pname, *p);
            }
        }
        let tscope = Arc::new(tscope);
        let body = self.resolve(body, &tscope);
        self.arena.get_mut(id).payload = NodePayload::TemplateType { params, body };
        id
    }

    fn resolve_template_instance(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (template, args) = match &self.arena.get(id).payload {
            NodePayload::TemplateInstance { template, args } => (*template, args.clone()),
            _ => return id,
        };
        let mut new_args = NodeList::new();
        for a in args {
            new_args.push(self.resolve(a, scope));
        }
        self.arena.get_mut(id).payload = NodePayload::TemplateInstance {
            template,
            args: new_args,
        };
        id
    }

    fn resolve_binop(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (op, left, right) = match &self.arena.get(id).payload {
            NodePayload::BinOp { op, left, right } => (*op, *left, *right),
            _ => return id,
        };
        let left_is_plain_id = matches!(self.arena.get(left).kind, NodeKind::Id);
        let new_left = if op == BinOpKind::Assign && left_is_plain_id {
            self.resolve_id_as_assign_target(left, scope)
        } else {
            self.resolve(left, scope)
        };
        let new_right = self.resolve(right, scope);
        self.arena.get_mut(id).payload = NodePayload::BinOp {
            op,
            left: new_left,
            right: new_right,
        };
        id
    }

    fn resolve_unaryop(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (op, operand) = match &self.arena.get(id).payload {
            NodePayload::UnaryOp { op, operand } => (*op, *operand),
            _ => return id,
        };
        let operand = self.resolve(operand, scope);
        self.arena.get_mut(id).payload = NodePayload::UnaryOp { op, operand };
        id
    }

    /// `Call` resolution additionally implements `resolve_sym.c`'s
    /// receiver-is-a-type-name rewrite: once the callee resolves, a call
    /// whose callee turns out to name a type (`i32(4)`) is not a function
    /// call at all but an explicit type cast, so it's rewritten to a
    /// `TypeCastExpr` here rather than left for the checker to special-case
    /// every `Call` site.
    fn resolve_call(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (callee, args) = match &self.arena.get(id).payload {
            NodePayload::Call { callee, args } => (*callee, args.clone()),
            _ => return id,
        };
        let mut new_args = NodeList::new();
        for a in args {
            new_args.push(self.resolve(a, scope));
        }
        let callee = self.resolve(callee, scope);
        if self.arena.get(callee).kind.is_type() {
            if new_args.len() == 1 {
                let pos = self.arena.get(id).pos;
                let endpos = self.arena.get(id).endpos;
                return self.arena.alloc(
                    pos,
                    endpos,
                    NodeKind::TypeCastExpr,
                    NodePayload::TypeCast {
                        target_type: callee,
                        value: new_args[0],
                        explicit: true,
                    },
                );
            }
            let pos = self.arena.get(id).pos;
            self.diags.emit(Diagnostic::new(
                DiagnosticKind::CallArity,
                pos,
                "a type conversion takes exactly one argument",
            ));
        }
        self.arena.get_mut(id).payload = NodePayload::Call {
            callee,
            args: new_args,
        };
        id
    }

    fn resolve_typecast(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (target_type, value, explicit) = match &self.arena.get(id).payload {
            NodePayload::TypeCast {
                target_type,
                value,
                explicit,
            } => (*target_type, *value, *explicit),
            _ => return id,
        };
        let target_type = self.resolve(target_type, scope);
        let value = self.resolve(value, scope);
        self.arena.get_mut(id).payload = NodePayload::TypeCast {
            target_type,
            value,
            explicit,
        };
        id
    }

    fn resolve_ref(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (is_mut, referent) = match &self.arena.get(id).payload {
            NodePayload::Ref { is_mut, referent } => (*is_mut, *referent),
            _ => return id,
        };
        let referent = self.resolve(referent, scope);
        self.arena.get_mut(id).payload = NodePayload::Ref { is_mut, referent };
        id
    }

    fn resolve_named_arg(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (name, value) = match &self.arena.get(id).payload {
            NodePayload::NamedArg { name, value } => (name.clone(), *value),
            _ => return id,
        };
        let value = self.resolve(value, scope);
        self.arena.get_mut(id).payload = NodePayload::NamedArg { name, value };
        id
    }

    fn resolve_selector(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (base, field) = match &self.arena.get(id).payload {
            NodePayload::Selector { base, field } => (*base, field.clone()),
            _ => return id,
        };
        let base = self.resolve(base, scope);
        self.arena.get_mut(id).payload = NodePayload::Selector { base, field };
        id
    }

    fn resolve_index(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (base, index) = match &self.arena.get(id).payload {
            NodePayload::Index { base, index } => (*base, *index),
            _ => return id,
        };
        let base = self.resolve(base, scope);
        let index = self.resolve(index, scope);
        self.arena.get_mut(id).payload = NodePayload::Index { base, index };
        id
    }

    fn resolve_slice(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (base, start, end) = match &self.arena.get(id).payload {
            NodePayload::Slice { base, start, end } => (*base, *start, *end),
            _ => return id,
        };
        let base = self.resolve(base, scope);
        let start = start.map(|s| self.resolve(s, scope));
        let end = end.map(|e| self.resolve(e, scope));
        self.arena.get_mut(id).payload = NodePayload::Slice { base, start, end };
        id
    }

    /// Collapses `if <const bool> then else` to whichever branch the
    /// constant selects, but only when both branches are present — an
    /// empty `else` still needs the checker's zero-value synthesis to know
    /// what to substitute, which needs the branch's type, not available
    /// yet here.
    fn resolve_if(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (cond, then_branch, else_branch) = match &self.arena.get(id).payload {
            NodePayload::If {
                cond,
                then_branch,
                else_branch,
            } => (*cond, *then_branch, *else_branch),
            _ => return id,
        };
        let cond = self.resolve(cond, scope);
        let then_branch = self.resolve(then_branch, scope);
        let else_branch = else_branch.map(|e| self.resolve(e, scope));

        if self.parse_opt {
            if let NodePayload::Lit(LitValue::Bool(b)) = &self.arena.get(cond).payload {
                if let Some(else_id) = else_branch {
                    return if *b { then_branch } else { else_id };
                }
            }
        }

        self.arena.get_mut(id).payload = NodePayload::If {
            cond,
            then_branch,
            else_branch,
        };
        id
    }

    fn resolve_ref_type(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (is_mut, pointee) = match &self.arena.get(id).payload {
            NodePayload::RefType { is_mut, pointee } => (*is_mut, *pointee),
            _ => return id,
        };
        let pointee = self.resolve(pointee, scope);
        self.arena.get_mut(id).payload = NodePayload::RefType { is_mut, pointee };
        id
    }

    fn resolve_array_type(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (len, elem) = match &self.arena.get(id).payload {
            NodePayload::ArrayType { len, elem } => (*len, *elem),
            _ => return id,
        };
        let elem = self.resolve(elem, scope);
        self.arena.get_mut(id).payload = NodePayload::ArrayType { len, elem };
        id
    }

    fn resolve_tuple_type(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let elems = match &self.arena.get(id).payload {
            NodePayload::TupleType { elems } => elems.clone(),
            _ => return id,
        };
        let mut new_elems = NodeList::new();
        for e in elems {
            new_elems.push(self.resolve(e, scope));
        }
        self.arena.get_mut(id).payload = NodePayload::TupleType { elems: new_elems };
        id
    }

    fn resolve_struct_type(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let fields = match &self.arena.get(id).payload {
            NodePayload::StructType { fields } => fields.clone(),
            _ => return id,
        };
        let mut new_fields = NodeList::new();
        for f in fields {
            // A field's declared type resolves in the struct's enclosing
            // scope, not a scope containing sibling fields — field-name
            // lookup for `.field` selectors is a separate, direct walk of
            // `StructType::fields` the checker does, not a `Scope` lookup.
            new_fields.push(self.resolve_local(f, scope));
        }
        self.arena.get_mut(id).payload = NodePayload::StructType { fields: new_fields };
        id
    }

    fn resolve_fun_type(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (params, result) = match &self.arena.get(id).payload {
            NodePayload::FunType { params, result } => (params.clone(), *result),
            _ => return id,
        };
        let mut new_params = NodeList::new();
        for p in params {
            new_params.push(self.resolve(p, scope));
        }
        let result = self.resolve(result, scope);
        self.arena.get_mut(id).payload = NodePayload::FunType {
            params: new_params,
            result,
        };
        id
    }

    fn resolve_alias_type(&mut self, id: NodeId, scope: &Arc<Scope>) -> NodeId {
        let (name, aliased) = match &self.arena.get(id).payload {
            NodePayload::AliasType { name, aliased } => (name.clone(), *aliased),
            _ => return id,
        };
        let aliased = self.resolve(aliased, scope);
        self.arena.get_mut(id).payload = NodePayload::AliasType { name, aliased };
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corec_ast::{universe, NodeKind};
    use corec_common::position::NO_POS;
    use corec_common::symbol::SymPool;

    fn nl(items: &[NodeId]) -> NodeList {
        let mut list = NodeList::new();
        list.extend_from_slice(items);
        list
    }

    fn file_with(arena: &mut NodeArena, decls: NodeList) -> NodeId {
        arena.alloc(NO_POS, NO_POS, NodeKind::File, NodePayload::File { decls })
    }

    fn id_node(arena: &mut NodeArena, name: &str) -> NodeId {
        let sym = arena.pool().intern_str(name);
        arena.alloc_with_flags(
            NO_POS,
            NO_POS,
            NodeKind::Id,
            NodePayload::Id { name: sym, target: None },
            NodeFlags::UNRESOLVED,
        )
    }

    fn const_decl(arena: &mut NodeArena, name: &str, init: NodeId) -> NodeId {
        let sym = arena.pool().intern_str(name);
        arena.alloc(
            NO_POS,
            NO_POS,
            NodeKind::ConstDecl,
            NodePayload::Local {
                name: sym,
                declared_type: None,
                init: Some(init),
                is_mut: false,
            },
        )
    }

    #[test]
    fn forward_reference_resolves_via_prepopulated_file_scope() {
        let mut arena = NodeArena::new();
        let lit = arena.alloc(NO_POS, NO_POS, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(1)));
        let later = const_decl(&mut arena, "later", lit);
        let use_of_later = id_node(&mut arena, "later");
        let earlier = const_decl(&mut arena, "earlier", use_of_later);
        let file = file_with(&mut arena, nl(&[earlier, later]));

        let mut diags = DiagCtx::new();
        resolve_file(&mut arena, file, &mut diags, &BuildOptions::default());

        assert!(!diags.has_errors());
    }

    #[test]
    fn undefined_identifier_is_reported_and_substituted_with_bad() {
        let mut arena = NodeArena::new();
        let unknown = id_node(&mut arena, "nowhere");
        let decl = const_decl(&mut arena, "x", unknown);
        let file = file_with(&mut arena, nl(&[decl]));

        let mut diags = DiagCtx::new();
        resolve_file(&mut arena, file, &mut diags, &BuildOptions::default());

        assert!(diags.has_errors());
        let init = match &arena.get(decl).payload {
            NodePayload::Local { init, .. } => init.expect("const has an init"),
            _ => unreachable!(),
        };
        assert!(arena.get(init).is_bad());
    }

    #[test]
    fn reference_to_a_const_literal_unwinds_to_the_literal() {
        let mut arena = NodeArena::new();
        let lit = arena.alloc(NO_POS, NO_POS, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(7)));
        let decl = const_decl(&mut arena, "seven", lit);
        let use_of_seven = id_node(&mut arena, "seven");
        let other = const_decl(&mut arena, "also_seven", use_of_seven);
        let file = file_with(&mut arena, nl(&[decl, other]));

        let mut diags = DiagCtx::new();
        resolve_file(&mut arena, file, &mut diags, &BuildOptions::default());
        assert!(!diags.has_errors());

        let resolved_init = match &arena.get(other).payload {
            NodePayload::Local { init, .. } => init.expect("const has an init"),
            _ => unreachable!(),
        };
        assert_eq!(resolved_init, lit);
    }

    #[test]
    fn single_statement_block_collapses_to_that_statement() {
        let mut arena = NodeArena::new();
        let lit = arena.alloc(NO_POS, NO_POS, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(1)));
        let block = arena.alloc(
            NO_POS,
            NO_POS,
            NodeKind::Block,
            NodePayload::List {
                items: nl(&[lit]),
            },
        );
        let decl = const_decl(&mut arena, "x", block);
        let file = file_with(&mut arena, nl(&[decl]));

        let mut diags = DiagCtx::new();
        resolve_file(&mut arena, file, &mut diags, &BuildOptions::default());

        let resolved_init = match &arena.get(decl).payload {
            NodePayload::Local { init, .. } => init.expect("const has an init"),
            _ => unreachable!(),
        };
        assert_eq!(resolved_init, lit);
    }

    #[test]
    fn call_of_a_type_name_becomes_a_type_cast() {
        // Chain this arena's pool to the universe's so `"i32"` interns to
        // the exact same `Sym` the universe bound `i32` under — in the real
        // driver every per-build arena's pool is built this way (see
        // `corec-ast`'s `NodeArena::with_pool`).
        let pool = Arc::new(SymPool::with_parent(universe().pool.clone()));
        let mut arena = NodeArena::with_pool(pool);
        let callee = id_node(&mut arena, "i32");
        let arg = arena.alloc(NO_POS, NO_POS, NodeKind::IntLit, NodePayload::Lit(LitValue::Int(4)));
        let call = arena.alloc(
            NO_POS,
            NO_POS,
            NodeKind::Call,
            NodePayload::Call {
                callee,
                args: nl(&[arg]),
            },
        );
        let decl = const_decl(&mut arena, "x", call);
        let file = file_with(&mut arena, nl(&[decl]));

        let mut diags = DiagCtx::new();
        resolve_file(&mut arena, file, &mut diags, &BuildOptions::default());
        assert!(!diags.has_errors());

        let resolved_init = match &arena.get(decl).payload {
            NodePayload::Local { init, .. } => init.expect("const has an init"),
            _ => unreachable!(),
        };
        assert_eq!(arena.get(resolved_init).kind, NodeKind::TypeCastExpr);
    }
}
