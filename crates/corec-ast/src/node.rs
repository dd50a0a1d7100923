//! Tagged-variant AST nodes.
//!
//! Each `Node` has a common header (`pos`, `endpos`, `flags`, `kind`) plus a
//! one-of payload, per the base spec's data model. `kind` is a plain
//! `#[repr(u16)]` enum (no data) so classification (`is_stmt`/`is_expr`/
//! `is_type`) is a cheap range test on the discriminant rather than a
//! `match` — the base spec's design notes call this out as worth
//! preserving for efficiency. The actual payload lives in the separate
//! [`NodePayload`] enum, the same split the teacher uses between
//! `SyntaxKind` (a plain tag) and the node's typed fields.

use bitflags::bitflags;
use corec_common::arena::ArenaId;
use corec_common::position::Pos;
use corec_common::symbol::Sym;
use smallvec::SmallVec;

pub type NodeId = ArenaId<Node>;

/// Small inline vector of child node ids; most lists (params, struct
/// fields, call args) are short, so `SmallVec` avoids a heap allocation for
/// the common case.
pub type NodeList = SmallVec<[NodeId; 4]>;

bitflags! {
    /// Contract-bearing node flags from the base spec's data model.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct NodeFlags: u16 {
        /// Subtree has unbound names; cleared by the resolver.
        const UNRESOLVED = 1 << 0;
        /// Value is known at compile time.
        const CONST = 1 << 1;
        /// Resolved as a value, not a location (an assignable place).
        const RVALUE = 1 << 2;
        /// Local is a function parameter (local-kind discriminator).
        const PARAM = 1 << 3;
        /// Local is a template (macro) parameter.
        const MACRO_PARAM = 1 << 4;
        /// Never referenced after binding.
        const UNUSED = 1 << 5;
        /// Exported from its containing file/package.
        const PUBLIC = 1 << 6;
        /// Node is structurally shared; template instantiation must
        /// deep-copy before mutating it.
        const SHARED = 1 << 7;
        /// The resolver must revisit this node even though it already has a
        /// type, because that type is provisional (e.g. inside a
        /// self-referential function type).
        const PARTIAL_TYPE = 1 << 8;
    }
}

/// Classification tag. Variants are grouped into three contiguous ranges —
/// statements, expressions, types — so `is_stmt`/`is_expr`/`is_type` are a
/// single comparison against the range bounds below.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum NodeKind {
    // --- Statements (STMT_FIRST..=STMT_LAST) ---
    Bad = 0,
    Pkg,
    File,
    Comment,

    // --- Expressions, including literals (EXPR_FIRST..=EXPR_LAST) ---
    BoolLit,
    IntLit,
    FloatLit,
    StrLit,
    Nil,
    Id,
    BinOp,
    UnaryOp,
    Array,
    Tuple,
    Block,
    Fun,
    Template,
    TemplateInstance,
    Call,
    TypeCastExpr,
    ConstDecl,
    VarDecl,
    ParamDecl,
    FieldDecl,
    RefExpr,
    NamedArg,
    Selector,
    IndexExpr,
    SliceExpr,
    IfExpr,

    // --- Types (TYPE_FIRST..=TYPE_LAST) ---
    BasicType,
    RefType,
    ArrayType,
    TupleType,
    StructType,
    FunType,
    TemplateType,
    AliasType,
    IdType,
    TypeType,
}

const STMT_FIRST: u16 = NodeKind::Bad as u16;
const STMT_LAST: u16 = NodeKind::Comment as u16;
const EXPR_FIRST: u16 = NodeKind::BoolLit as u16;
const EXPR_LAST: u16 = NodeKind::IfExpr as u16;
const TYPE_FIRST: u16 = NodeKind::BasicType as u16;
const TYPE_LAST: u16 = NodeKind::TypeType as u16;

impl NodeKind {
    #[inline]
    #[must_use]
    pub const fn is_stmt(self) -> bool {
        let k = self as u16;
        k >= STMT_FIRST && k <= STMT_LAST
    }

    #[inline]
    #[must_use]
    pub const fn is_expr(self) -> bool {
        let k = self as u16;
        k >= EXPR_FIRST && k <= EXPR_LAST
    }

    #[inline]
    #[must_use]
    pub const fn is_type(self) -> bool {
        let k = self as u16;
        k >= TYPE_FIRST && k <= TYPE_LAST
    }
}

/// Binary operator tokens the parser/checker/SSA builder all need to agree
/// on; kept here (rather than in the scanner) because the checker's binop
/// dispatch table and the AST's `BinOp` payload share this type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    LogAnd,
    LogOr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
}

impl BinOpKind {
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOpKind::Eq
                | BinOpKind::Ne
                | BinOpKind::Lt
                | BinOpKind::Le
                | BinOpKind::Gt
                | BinOpKind::Ge
        )
    }

    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, BinOpKind::LogAnd | BinOpKind::LogOr)
    }
}

/// Unary operator / statement-like prefix-postfix shape, per the base
/// spec's "`UnaryOp` (prefix/postfix/return/assign share a shape)".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOpKind {
    Neg,
    Not,
    BitNot,
    Deref,
    Return,
    PostfixInc,
    PostfixDec,
}

/// Literal payload values.
#[derive(Clone, Debug)]
pub enum LitValue {
    Bool(bool),
    /// Stored as a signed 128-bit integer; the checker's `ctypecast`
    /// validates range at coercion time. Negative values are permissible
    /// for signed destinations only.
    Int(i128),
    Float(f64),
    Str(String),
}

/// The one-of payload for a node, keyed structurally by [`NodeKind`].
#[derive(Clone, Debug)]
pub enum NodePayload {
    // Statements
    Bad,
    Pkg {
        files: NodeList,
    },
    File {
        decls: NodeList,
    },
    Comment {
        text: String,
    },

    // Literals
    Lit(LitValue),
    Nil,

    // Expressions
    Id {
        name: Sym,
        /// Filled in by the resolver; `None` while `UNRESOLVED` is set.
        target: Option<NodeId>,
    },
    BinOp {
        op: BinOpKind,
        left: NodeId,
        right: NodeId,
    },
    UnaryOp {
        op: UnaryOpKind,
        operand: NodeId,
    },
    /// Shared list shape for `Array`, `Tuple`, and `Block`.
    List {
        items: NodeList,
    },
    Fun {
        name: Option<Sym>,
        params: NodeList,
        result_type: Option<NodeId>,
        body: Option<NodeId>,
    },
    Template {
        params: NodeList,
        body: NodeId,
    },
    TemplateInstance {
        template: NodeId,
        args: NodeList,
    },
    Call {
        callee: NodeId,
        args: NodeList,
    },
    TypeCast {
        target_type: NodeId,
        value: NodeId,
        explicit: bool,
    },
    /// Shared "local" shape for `ConstDecl`/`VarDecl`/`ParamDecl`/`FieldDecl`.
    Local {
        name: Sym,
        declared_type: Option<NodeId>,
        init: Option<NodeId>,
        is_mut: bool,
    },
    Ref {
        is_mut: bool,
        referent: NodeId,
    },
    NamedArg {
        name: Sym,
        value: NodeId,
    },
    Selector {
        base: NodeId,
        field: Sym,
    },
    Index {
        base: NodeId,
        index: NodeId,
    },
    Slice {
        base: NodeId,
        start: Option<NodeId>,
        end: Option<NodeId>,
    },
    If {
        cond: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },

    // Types
    BasicType(crate::ty::TypeCode),
    RefType {
        is_mut: bool,
        pointee: NodeId,
    },
    ArrayType {
        len: u64,
        elem: NodeId,
    },
    TupleType {
        elems: NodeList,
    },
    StructType {
        fields: NodeList,
    },
    FunType {
        params: NodeList,
        result: NodeId,
    },
    TemplateType {
        params: NodeList,
        body: NodeId,
    },
    AliasType {
        name: Sym,
        aliased: NodeId,
    },
    IdType {
        name: Sym,
        target: Option<NodeId>,
    },
    /// The meta-type of a type expression used as a template value (e.g.
    /// `T` where `T` is itself a type parameter).
    TypeType {
        inner: NodeId,
    },
}

/// One AST node: common header plus payload.
#[derive(Clone, Debug)]
pub struct Node {
    pub pos: Pos,
    pub endpos: Pos,
    pub flags: NodeFlags,
    pub kind: NodeKind,
    pub payload: NodePayload,
    /// The expression's type, or (for a type node) unused — type nodes
    /// cache their own typeid in `tid` instead. Absent (`None`) until the
    /// checker assigns it.
    pub ty: Option<NodeId>,
    /// Cached typeid for type nodes; `None` until first computed. See
    /// `corec_ast::ty::typeid`.
    pub tid: Option<Sym>,
}

impl Node {
    #[must_use]
    pub fn new(pos: Pos, endpos: Pos, kind: NodeKind, payload: NodePayload) -> Self {
        Self {
            pos,
            endpos,
            flags: NodeFlags::empty(),
            kind,
            payload,
            ty: None,
            tid: None,
        }
    }

    #[must_use]
    pub fn is_bad(&self) -> bool {
        matches!(self.kind, NodeKind::Bad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_ranges_classify_correctly() {
        assert!(NodeKind::File.is_stmt());
        assert!(!NodeKind::File.is_expr());
        assert!(NodeKind::BinOp.is_expr());
        assert!(!NodeKind::BinOp.is_type());
        assert!(NodeKind::FunType.is_type());
        assert!(!NodeKind::FunType.is_stmt());
    }

    #[test]
    fn node_flags_are_bit_distinct() {
        let f = NodeFlags::UNRESOLVED | NodeFlags::SHARED;
        assert!(f.contains(NodeFlags::UNRESOLVED));
        assert!(f.contains(NodeFlags::SHARED));
        assert!(!f.contains(NodeFlags::CONST));
    }
}
