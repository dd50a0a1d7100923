//! Bidirectional type checker: literal coercion, binary-operator dispatch,
//! template instantiation, and constant evaluation over a resolved AST.
//!
//! Sits between `corec-resolver` (binds every `Id` to a target, leaves
//! `.ty` empty) and `corec-ssa` (lowers a fully-typed tree to SSA form).
//! [`check_file`] is the single entry point; everything else here is
//! plumbing for it.

mod binop;
mod checker;
mod ctypecast;
mod eval;
mod templates;

pub use binop::{accepts, classify, BinOpClass};
pub use checker::{check_file, Checker};
pub use ctypecast::{basic_code, ctypecast, CastResult};
pub use eval::eval;
pub use templates::InstanceCache;
