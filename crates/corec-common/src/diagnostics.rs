//! Diagnostic records, collection, and the caret/squiggle snippet renderer.

use crate::position::{Pos, PosMap};
use crate::source::Source;
use serde::Serialize;

/// Severity of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DiagnosticLevel {
    Note,
    Warn,
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DiagnosticLevel::Note => "note",
            DiagnosticLevel::Warn => "warning",
            DiagnosticLevel::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// One diagnostic kind per failure mode named in the base spec's error
/// handling design (§7), grouped by owning component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    // Scanner
    InvalidUtf8,
    UnterminatedString,
    BadEscape,
    MixedIndent,
    InvalidCharacter,
    StringTooLarge,
    MultilineMisaligned,
    // Parser
    UnexpectedToken,
    MissingToken,
    SyntaxInContext,
    // Resolver
    UndefinedSymbol,
    InconsistentUnresolvedState,
    // Type checker
    TypeMismatch,
    ConstantOverflow,
    InvalidConversion,
    InvalidOperandType,
    NonBoolCondition,
    CallArity,
    CallSignatureMismatch,
    CannotCallNonFunction,
    UnusedExpression,
    // SSA builder
    InvalidAstNode,
    MissingControlValue,
}

impl DiagnosticKind {
    /// Internal-invariant diagnostics: these indicate a compiler bug, not a
    /// user error, but are still surfaced as diagnostics rather than panics
    /// per §1A's ambient error-handling policy.
    #[must_use]
    pub const fn is_internal(self) -> bool {
        matches!(
            self,
            DiagnosticKind::InconsistentUnresolvedState
                | DiagnosticKind::InvalidAstNode
                | DiagnosticKind::MissingControlValue
        )
    }

    #[must_use]
    pub const fn default_level(self) -> DiagnosticLevel {
        match self {
            DiagnosticKind::UnusedExpression => DiagnosticLevel::Warn,
            _ => DiagnosticLevel::Error,
        }
    }
}

/// A single diagnostic: a level, a position span, and a message, per the
/// base spec's §6 `Diagnostic` contract.
#[derive(Clone, Debug, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub kind: DiagnosticKind,
    pub pos: Pos,
    pub message: String,
    /// Optional follow-on notes attached to this diagnostic (e.g. "previous
    /// declaration was here").
    pub notes: Vec<(Pos, String)>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagnosticKind, pos: Pos, message: impl Into<String>) -> Self {
        Self {
            level: kind.default_level(),
            kind,
            pos,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: DiagnosticLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_note(mut self, pos: Pos, message: impl Into<String>) -> Self {
        self.notes.push((pos, message.into()));
        self
    }

    /// Render `file:line:col: level: message`, plus a source snippet with a
    /// caret (width 1) or squiggle (width > 1) underline, per §7/§4.7.
    #[must_use]
    pub fn render(&self, source: &Source, pos_map: &PosMap) -> String {
        let mut out = format!(
            "{}:{}:{}: {}: {}",
            source.filename(),
            self.pos.line() + 1,
            self.pos.column() + 1,
            self.level,
            self.message
        );
        if !self.pos.is_none() {
            let line_text = pos_map.line_text(source.body(), self.pos);
            let col = self.pos.column() as usize;
            let width = (self.pos.width() as usize).max(1);
            let underline: String = if width <= 1 {
                "^".to_string()
            } else {
                "~".repeat(width)
            };
            out.push('\n');
            out.push_str(line_text);
            out.push('\n');
            out.push_str(&" ".repeat(col.min(line_text.len())));
            out.push_str(&underline);
        }
        for (note_pos, note_message) in &self.notes {
            out.push('\n');
            out.push_str(&format!(
                "  note: {note_message} ({}:{})",
                note_pos.line() + 1,
                note_pos.column() + 1
            ));
        }
        out
    }
}

/// Collects diagnostics for one build and counts errors, so a driver can
/// refuse to advance to the next pass while `error_count() > 0`.
#[derive(Default)]
pub struct DiagCtx {
    diagnostics: Vec<Diagnostic>,
    error_count: u32,
    /// Diagnostics at or above this level are suppressed from `diagnostics()`
    /// but still counted (the base spec's "diagnostic level filter").
    level_filter: Option<DiagnosticLevel>,
}

impl DiagCtx {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_level_filter(min_level: DiagnosticLevel) -> Self {
        Self {
            level_filter: Some(min_level),
            ..Self::default()
        }
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.level == DiagnosticLevel::Error {
            self.error_count += 1;
        }
        if self
            .level_filter
            .is_none_or(|min| diagnostic.level >= min)
        {
            self.diagnostics.push(diagnostic);
        }
    }

    #[must_use]
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn drain(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
