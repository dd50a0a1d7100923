//! The build driver: the thin orchestration layer that threads a set of
//! `Source`s through every in-scope pass (scan, parse, resolve, check,
//! build SSA) and collects the result.
//!
//! File-system discovery, CLI argument parsing, and the code generator are
//! all external-collaborator concerns per the base spec's scope note — this
//! crate only owns the pipeline glue and the build context `BuildCtx` holds
//! while running it.

mod driver;

pub use driver::{BuildCtx, BuildOutput};
