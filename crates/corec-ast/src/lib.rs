//! Arena-allocated AST nodes, type identity, lexical scopes, and the
//! process-wide universe of builtin types and constants.
//!
//! This crate owns the data model shared by every later pass (parser,
//! resolver, checker, transformer, SSA builder): nodes never move once
//! allocated, are addressed by small `Copy` ids, and carry their own flags
//! so passes can communicate results (`UNRESOLVED`, `CONST`, a cached
//! typeid) without a side table.

pub mod arena;
pub mod node;
pub mod scope;
pub mod ty;
pub mod universe;

pub use arena::NodeArena;
pub use node::{
    BinOpKind, LitValue, Node, NodeFlags, NodeId, NodeKind, NodeList, NodePayload, UnaryOpKind,
};
pub use scope::{AlreadyDefined, Scope};
pub use ty::{typeeq, typeid, TypeCode, TypeFlags};
pub use universe::{populate_builtins, universe, Universe, UniverseConsts, UniverseTypes};
