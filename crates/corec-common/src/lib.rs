//! Common types and utilities shared by every stage of the corec compiler core.
//!
//! This crate provides the foundational substrate described by the core's
//! data model: bump-allocated arenas (`Arena`), interned symbols (`Sym`,
//! `SymPool`), source positions (`Pos`, `PosMap`), source buffers (`Source`),
//! and diagnostics (`Diagnostic`, `DiagCtx`). Every later stage (scanner,
//! parser, resolver, checker, SSA builder) depends on this crate and nothing
//! else in the reverse direction, so it must stay free of cycles.

pub mod arena;
pub use arena::{Arena, ArenaId};

pub mod symbol;
pub use symbol::{Sym, SymFlags, SymPool};

pub mod position;
pub use position::{NO_POS, Pos, PosMap};

pub mod source;
pub use source::Source;

pub mod diagnostics;
pub use diagnostics::{DiagCtx, Diagnostic, DiagnosticLevel};

pub mod options;
pub use options::{BuildOptions, OptLevel};

pub mod limits;
