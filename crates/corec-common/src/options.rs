//! Driver-facing configuration, kept here (rather than in the parser or
//! checker crate) so every stage can read it without creating a dependency
//! cycle — the same reason the teacher keeps `CheckerOptions` in
//! `tsz-common` instead of `tsz-checker`.

use crate::diagnostics::DiagnosticLevel;

/// Backend optimization level, consumed by the external code generator but
/// threaded through the core because the SSA builder's peephole pass
/// behaves differently at `OptNone`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OptLevel {
    #[default]
    None,
    Speed,
    Size,
}

/// Flags consumed by the driver, per the base spec's §6 "Flags consumed by
/// the driver".
#[derive(Clone, Copy, Debug)]
pub struct BuildOptions {
    /// Build mode: enables extra invariant checks such as the scanner's
    /// mixed-tabs-and-spaces diagnostic.
    pub debug: bool,
    pub opt_level: OptLevel,
    /// Enables runtime bounds checks inserted by later (out-of-scope)
    /// passes; the core only threads the flag through.
    pub safe: bool,
    /// Collect comments into the scanner's comment list.
    pub parse_comments: bool,
    /// Enable resolver simplifications such as single-statement block
    /// collapsing and constant-condition `if` folding.
    pub parse_opt: bool,
    /// Diagnostics at or above this level are retained; see `DiagCtx`.
    pub diag_level: DiagnosticLevel,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            debug: true,
            opt_level: OptLevel::None,
            safe: true,
            parse_comments: false,
            parse_opt: true,
            diag_level: DiagnosticLevel::Note,
        }
    }
}
