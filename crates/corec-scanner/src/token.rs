//! Token kinds and the fixed keyword table.
//!
//! Keyword recognition is a side effect of symbol interning, not a separate
//! lookup: [`intern_keywords`] stamps each keyword's index into the symbol
//! pool once, and [`keyword_tok`] turns that index back into a `Tok` when
//! the scanner sees an identifier whose `Sym` carries the keyword flag.

use corec_common::symbol::SymPool;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Tok {
    None,
    Comma,
    Semi,
    Colon,

    // Primary operator tokens
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Shl,
    Shr,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    // Comparisons (kept contiguous; the checker's binop dispatch relies on
    // `Tok::is_comparison` rather than this ordering, but it mirrors the
    // base spec's "binary comparison ops packed" note)
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    PlusPlus,
    MinusMinus,

    Assign,
    ShlAssign,
    ShrAssign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AmpAssign,
    PipeAssign,
    TildeAssign,
    CaretAssign,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBrack,
    RBrack,
    AmpAmp,
    PipePipe,
    Arrow,
    Dot,

    Id,
    IntLit,
    FloatLit,
    StrLit,

    // Keywords, in the order they're registered in `KEYWORDS`
    As,
    Auto,
    Break,
    Continue,
    Defer,
    Else,
    Enum,
    For,
    Fun,
    If,
    Import,
    In,
    Nil,
    Return,
    Struct,
    Switch,
    Type,
    Const,
    Mut,
    Var,

    Eof,
}

impl Tok {
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Tok::EqEq | Tok::NotEq | Tok::Lt | Tok::Le | Tok::Gt | Tok::Ge
        )
    }

    /// Tokens after which a newline or EOF should insert a synthetic `;`,
    /// per the base spec's semicolon-insertion rule.
    #[must_use]
    pub const fn triggers_semi_insertion(self) -> bool {
        matches!(
            self,
            Tok::Id
                | Tok::IntLit
                | Tok::FloatLit
                | Tok::StrLit
                | Tok::RParen
                | Tok::RBrack
                | Tok::RBrace
                | Tok::Return
                | Tok::Break
                | Tok::Continue
                | Tok::Nil
                | Tok::PlusPlus
                | Tok::MinusMinus
        )
    }
}

/// The fixed keyword table. Index into this array doubles as the keyword
/// index stamped into a `Sym`'s flags (`SymFlags::keyword`), so it's capped
/// at 31 entries; 20 are defined here, leaving headroom.
pub const KEYWORDS: &[(&str, Tok)] = &[
    ("as", Tok::As),
    ("auto", Tok::Auto),
    ("break", Tok::Break),
    ("continue", Tok::Continue),
    ("defer", Tok::Defer),
    ("else", Tok::Else),
    ("enum", Tok::Enum),
    ("for", Tok::For),
    ("fun", Tok::Fun),
    ("if", Tok::If),
    ("import", Tok::Import),
    ("in", Tok::In),
    ("nil", Tok::Nil),
    ("return", Tok::Return),
    ("struct", Tok::Struct),
    ("switch", Tok::Switch),
    ("type", Tok::Type),
    ("const", Tok::Const),
    ("mut", Tok::Mut),
    ("var", Tok::Var),
];

/// Stamp every keyword in [`KEYWORDS`] into `pool`, so that later plain
/// `intern`/`lookup` calls on an identifier's bytes come back flagged.
/// Idempotent; safe to call once per pool (the universe pool, typically).
pub fn intern_keywords(pool: &SymPool) {
    for (index, (text, _)) in KEYWORDS.iter().enumerate() {
        pool.intern_keyword(
            text.as_bytes(),
            u8::try_from(index).expect("keyword table fits in 5 bits"),
        );
    }
}

#[must_use]
pub fn keyword_tok(index: u8) -> Tok {
    KEYWORDS
        .get(index as usize)
        .map_or(Tok::Id, |&(_, tok)| tok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_table_fits_five_bits() {
        assert!(KEYWORDS.len() <= 31);
    }

    #[test]
    fn intern_keywords_is_idempotent_and_round_trips() {
        let pool = SymPool::new();
        intern_keywords(&pool);
        intern_keywords(&pool);
        let fun = pool.lookup(b"fun").unwrap();
        assert_eq!(fun.flags().keyword_index().map(keyword_tok), Some(Tok::Fun));
    }
}
