//! The substitution walker itself.
//!
//! Grounded on the base spec's §4.6 "AST Transformer (C11)": a copy-on-write
//! visitor that walks a `Template`'s body, replacing every reference to one
//! of its `MACRO_PARAM`-flagged parameters with the corresponding argument,
//! duplicating a node only when one of its descendants actually changed.
//! An `old -> new` map (`pmap`) makes the walk idempotent for a node
//! reachable from more than one parent slot within the same body — the
//! case `corec_ast::NodeFlags::SHARED` flags, whether the sharing came from
//! the original template body itself or from `corec-parser`'s
//! compound-assignment desugaring (`x op= y` reuses one `NodeId` as both
//! the assignment target and the left operand of the op).
//!
//! Memoizing instantiations by their argument tuple (so `Foo<i32>` invoked
//! twice shares one `Fun`) is the checker's job, not this crate's: that
//! memo key is typeid-encoded, which needs `corec-ast::ty`'s structural
//! typeid computation wired to a per-build cache the checker already owns.
//! This crate only ever produces one fresh copy per call.

use corec_ast::{NodeArena, NodeId, NodeKind, NodeList, NodePayload};
use corec_common::limits::MAX_TEMPLATE_INSTANTIATION_DEPTH;
use rustc_hash::FxHashMap;

struct Transformer<'a> {
    arena: &'a mut NodeArena,
    /// Template parameter `NodeId` (the `ParamDecl` itself) to bound
    /// argument `NodeId`.
    params: FxHashMap<NodeId, NodeId>,
    /// Old node id to its substituted replacement, filled in as the walk
    /// proceeds so a doubly-referenced node is substituted exactly once.
    pmap: FxHashMap<NodeId, NodeId>,
    depth: u32,
}

/// Instantiate a template: walk `body`, replacing every `Id`/`IdType`
/// resolved to one of `template_params` with the paired entry in `args`,
/// copying only the spine of nodes that actually changed. `template_params`
/// and `args` must be the same length and in the template's declared
/// parameter order (the checker's job to arrange, after checking arity).
pub fn instantiate(
    arena: &mut NodeArena,
    template_params: &NodeList,
    args: &NodeList,
    body: NodeId,
) -> NodeId {
    let mut params = FxHashMap::default();
    for (&p, &a) in template_params.iter().zip(args.iter()) {
        params.insert(p, a);
    }
    let mut transformer = Transformer {
        arena,
        params,
        pmap: FxHashMap::default(),
        depth: 0,
    };
    transformer.subst(body)
}

impl<'a> Transformer<'a> {
    fn subst(&mut self, id: NodeId) -> NodeId {
        if let Some(&mapped) = self.pmap.get(&id) {
            return mapped;
        }
        // A self-referential template (a recursive type alias with no base
        // case) would otherwise substitute forever; past this depth, stop
        // descending and return the subtree unchanged rather than overflow
        // the stack. The checker is expected to have already diagnosed such
        // a template as non-terminating before calling `instantiate`.
        if self.depth >= MAX_TEMPLATE_INSTANTIATION_DEPTH {
            return id;
        }
        self.depth += 1;
        let result = self.subst_inner(id);
        self.depth -= 1;
        result
    }

    fn subst_inner(&mut self, id: NodeId) -> NodeId {
        let node = self.arena.get(id).clone();

        match &node.payload {
            NodePayload::Id { target: Some(t), .. } => {
                if let Some(&arg) = self.params.get(t) {
                    let replacement = self.as_expr_value(arg);
                    self.pmap.insert(id, replacement);
                    return replacement;
                }
            }
            NodePayload::IdType { target: Some(t), .. } => {
                if let Some(&arg) = self.params.get(t) {
                    self.pmap.insert(id, arg);
                    return arg;
                }
            }
            _ => {}
        }

        let (new_payload, changed) = self.subst_payload(&node.payload);
        let result = if changed {
            self.arena
                .alloc_with_flags(node.pos, node.endpos, node.kind, new_payload, node.flags)
        } else {
            id
        };
        self.pmap.insert(id, result);
        result
    }

    /// An argument substituted into an expression-position reference must
    /// itself denote a value. A type argument bound to an expression-kind
    /// `Id` (a template body using its type parameter as a first-class
    /// value, e.g. in a future `sizeof`-style construct) is wrapped in a
    /// `TypeType` so the slot still carries a single `NodeId` the rest of
    /// the tree can point at; a value argument is used as-is.
    fn as_expr_value(&mut self, arg: NodeId) -> NodeId {
        if self.arena.get(arg).kind.is_type() {
            self.arena
                .alloc_type(NodeKind::TypeType, NodePayload::TypeType { inner: arg })
        } else {
            arg
        }
    }

    fn subst_opt(&mut self, id: Option<NodeId>) -> (Option<NodeId>, bool) {
        match id {
            Some(i) => {
                let n = self.subst(i);
                let changed = n != i;
                (Some(n), changed)
            }
            None => (None, false),
        }
    }

    fn subst_list(&mut self, items: &NodeList) -> (NodeList, bool) {
        let mut changed = false;
        let mut new_items = NodeList::new();
        for &it in items {
            let n = self.subst(it);
            changed |= n != it;
            new_items.push(n);
        }
        (new_items, changed)
    }

    fn subst_payload(&mut self, payload: &NodePayload) -> (NodePayload, bool) {
        match payload {
            NodePayload::Bad | NodePayload::Nil | NodePayload::Lit(_) | NodePayload::BasicType(_) => {
                (payload.clone(), false)
            }
            NodePayload::Comment { text } => (NodePayload::Comment { text: text.clone() }, false),
            NodePayload::Pkg { files } => {
                let (new_files, c) = self.subst_list(files);
                (NodePayload::Pkg { files: new_files }, c)
            }
            NodePayload::File { decls } => {
                let (new_decls, c) = self.subst_list(decls);
                (NodePayload::File { decls: new_decls }, c)
            }
            NodePayload::Id { name, target } => {
                let (new_target, c) = self.subst_opt(*target);
                (
                    NodePayload::Id {
                        name: name.clone(),
                        target: new_target,
                    },
                    c,
                )
            }
            NodePayload::IdType { name, target } => {
                let (new_target, c) = self.subst_opt(*target);
                (
                    NodePayload::IdType {
                        name: name.clone(),
                        target: new_target,
                    },
                    c,
                )
            }
            NodePayload::BinOp { op, left, right } => {
                let nl = self.subst(*left);
                let nr = self.subst(*right);
                let c = nl != *left || nr != *right;
                (
                    NodePayload::BinOp {
                        op: *op,
                        left: nl,
                        right: nr,
                    },
                    c,
                )
            }
            NodePayload::UnaryOp { op, operand } => {
                let no = self.subst(*operand);
                let c = no != *operand;
                (NodePayload::UnaryOp { op: *op, operand: no }, c)
            }
            NodePayload::List { items } => {
                let (ni, c) = self.subst_list(items);
                (NodePayload::List { items: ni }, c)
            }
            NodePayload::Fun {
                name,
                params,
                result_type,
                body,
            } => {
                let (np, c1) = self.subst_list(params);
                let (nr, c2) = self.subst_opt(*result_type);
                let (nb, c3) = self.subst_opt(*body);
                (
                    NodePayload::Fun {
                        name: name.clone(),
                        params: np,
                        result_type: nr,
                        body: nb,
                    },
                    c1 || c2 || c3,
                )
            }
            NodePayload::Template { params, body } => {
                let (np, c1) = self.subst_list(params);
                let nb = self.subst(*body);
                (
                    NodePayload::Template { params: np, body: nb },
                    c1 || nb != *body,
                )
            }
            NodePayload::TemplateType { params, body } => {
                let (np, c1) = self.subst_list(params);
                let nb = self.subst(*body);
                (
                    NodePayload::TemplateType { params: np, body: nb },
                    c1 || nb != *body,
                )
            }
            NodePayload::TemplateInstance { template, args } => {
                let nt = self.subst(*template);
                let (na, c2) = self.subst_list(args);
                (
                    NodePayload::TemplateInstance {
                        template: nt,
                        args: na,
                    },
                    nt != *template || c2,
                )
            }
            NodePayload::Call { callee, args } => {
                let nc = self.subst(*callee);
                let (na, c2) = self.subst_list(args);
                (
                    NodePayload::Call {
                        callee: nc,
                        args: na,
                    },
                    nc != *callee || c2,
                )
            }
            NodePayload::TypeCast {
                target_type,
                value,
                explicit,
            } => {
                let nt = self.subst(*target_type);
                let nv = self.subst(*value);
                (
                    NodePayload::TypeCast {
                        target_type: nt,
                        value: nv,
                        explicit: *explicit,
                    },
                    nt != *target_type || nv != *value,
                )
            }
            NodePayload::Local {
                name,
                declared_type,
                init,
                is_mut,
            } => {
                let (nd, c1) = self.subst_opt(*declared_type);
                let (ni, c2) = self.subst_opt(*init);
                (
                    NodePayload::Local {
                        name: name.clone(),
                        declared_type: nd,
                        init: ni,
                        is_mut: *is_mut,
                    },
                    c1 || c2,
                )
            }
            NodePayload::Ref { is_mut, referent } => {
                let nr = self.subst(*referent);
                (
                    NodePayload::Ref {
                        is_mut: *is_mut,
                        referent: nr,
                    },
                    nr != *referent,
                )
            }
            NodePayload::NamedArg { name, value } => {
                let nv = self.subst(*value);
                (
                    NodePayload::NamedArg {
                        name: name.clone(),
                        value: nv,
                    },
                    nv != *value,
                )
            }
            NodePayload::Selector { base, field } => {
                let nb = self.subst(*base);
                (
                    NodePayload::Selector {
                        base: nb,
                        field: field.clone(),
                    },
                    nb != *base,
                )
            }
            NodePayload::Index { base, index } => {
                let nb = self.subst(*base);
                let ni = self.subst(*index);
                (
                    NodePayload::Index { base: nb, index: ni },
                    nb != *base || ni != *index,
                )
            }
            NodePayload::Slice { base, start, end } => {
                let nb = self.subst(*base);
                let (ns, c1) = self.subst_opt(*start);
                let (ne, c2) = self.subst_opt(*end);
                (
                    NodePayload::Slice {
                        base: nb,
                        start: ns,
                        end: ne,
                    },
                    nb != *base || c1 || c2,
                )
            }
            NodePayload::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let nc = self.subst(*cond);
                let nt = self.subst(*then_branch);
                let (ne, c3) = self.subst_opt(*else_branch);
                (
                    NodePayload::If {
                        cond: nc,
                        then_branch: nt,
                        else_branch: ne,
                    },
                    nc != *cond || nt != *then_branch || c3,
                )
            }
            NodePayload::RefType { is_mut, pointee } => {
                let np = self.subst(*pointee);
                (
                    NodePayload::RefType {
                        is_mut: *is_mut,
                        pointee: np,
                    },
                    np != *pointee,
                )
            }
            NodePayload::ArrayType { len, elem } => {
                let ne = self.subst(*elem);
                (
                    NodePayload::ArrayType { len: *len, elem: ne },
                    ne != *elem,
                )
            }
            NodePayload::TupleType { elems } => {
                let (ne, c) = self.subst_list(elems);
                (NodePayload::TupleType { elems: ne }, c)
            }
            NodePayload::StructType { fields } => {
                let (nf, c) = self.subst_list(fields);
                (NodePayload::StructType { fields: nf }, c)
            }
            NodePayload::FunType { params, result } => {
                let (np, c1) = self.subst_list(params);
                let nr = self.subst(*result);
                (
                    NodePayload::FunType {
                        params: np,
                        result: nr,
                    },
                    c1 || nr != *result,
                )
            }
            NodePayload::AliasType { name, aliased } => {
                let na = self.subst(*aliased);
                (
                    NodePayload::AliasType {
                        name: name.clone(),
                        aliased: na,
                    },
                    na != *aliased,
                )
            }
            NodePayload::TypeType { inner } => {
                let ni = self.subst(*inner);
                (NodePayload::TypeType { inner: ni }, ni != *inner)
            }
        }
    }
}
