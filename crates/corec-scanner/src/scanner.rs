//! The scanner: byte stream to token stream, with indentation-sensitive
//! layout, per the base spec's §4.1.

use crate::string_lit::decode_string_body;
use crate::token::{keyword_tok, Tok};
use corec_common::diagnostics::{DiagCtx, Diagnostic, DiagnosticKind};
use corec_common::options::BuildOptions;
use corec_common::position::{Pos, PosMap};
use corec_common::symbol::{Sym, SymPool};
use smallvec::SmallVec;
use std::sync::Arc;

const CH_IDENT: u8 = 1 << 0;
const CH_WHITESPACE: u8 = 1 << 1;

/// Per-byte classification table, mirroring the scanner's `charflags`:
/// which ASCII bytes are valid mid-identifier, and which are whitespace.
const fn build_charflags() -> [u8; 256] {
    let mut flags = [0u8; 256];
    let mut c = 0usize;
    while c < 256 {
        let is_ident = matches!(c as u8, b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z' | b'_');
        let is_ws = matches!(c as u8, b' ' | b'\t' | b'\r' | b'\n');
        flags[c] = (is_ident as u8 * CH_IDENT) | (is_ws as u8 * CH_WHITESPACE);
        c += 1;
    }
    flags
}
const CHARFLAGS: [u8; 256] = build_charflags();

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Indent {
    isblock: bool,
    n: u32,
}

/// A scanned `//` or `/* */` comment, collected only when
/// [`BuildOptions::parse_comments`] is set.
#[derive(Clone, Debug)]
pub struct Comment {
    pub pos: Pos,
    pub text: String,
}

/// Byte-stream tokenizer. Produced tokens are consumed on demand by
/// calling [`Scanner::next`]; there is no token buffer.
pub struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    origin: u32,
    pos_map: PosMap,
    pool: Arc<SymPool>,
    options: BuildOptions,

    cursor: usize,
    line_start: usize,
    insert_semi: bool,

    indent: Indent,
    indent_dst: Indent,
    indent_stack: SmallVec<[Indent; 16]>,

    tok: Tok,
    tok_start: usize,
    tok_end: usize,
    name: Option<Sym>,
    int_value: i128,
    float_value: f64,
    str_value: String,

    comments: Vec<Comment>,
}

impl<'a> Scanner<'a> {
    #[must_use]
    pub fn new(text: &'a str, origin: u32, pool: Arc<SymPool>, options: BuildOptions) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            origin,
            pos_map: PosMap::build(text),
            pool,
            options,
            cursor: 0,
            line_start: 0,
            insert_semi: false,
            indent: Indent::default(),
            indent_dst: Indent::default(),
            indent_stack: SmallVec::new(),
            tok: Tok::None,
            tok_start: 0,
            tok_end: 0,
            name: None,
            int_value: 0,
            float_value: 0.0,
            str_value: String::new(),
            comments: Vec::new(),
        }
    }

    #[must_use]
    pub fn token(&self) -> Tok {
        self.tok
    }

    #[must_use]
    pub fn token_text(&self) -> &'a str {
        &self.text[self.tok_start..self.tok_end]
    }

    #[must_use]
    pub fn name(&self) -> Option<&Sym> {
        self.name.as_ref()
    }

    #[must_use]
    pub fn int_value(&self) -> i128 {
        self.int_value
    }

    #[must_use]
    pub fn float_value(&self) -> f64 {
        self.float_value
    }

    #[must_use]
    pub fn str_value(&self) -> &str {
        &self.str_value
    }

    #[must_use]
    pub fn pos(&self) -> Pos {
        let width = u32::try_from(self.tok_end.saturating_sub(self.tok_start)).unwrap_or(u32::MAX);
        self.pos_map.make_pos(self.origin, self.tok_start as u32, width)
    }

    /// Drain comments collected so far, oldest first, matching the
    /// scanner's comment linked-list FIFO semantics.
    pub fn take_comments(&mut self) -> Vec<Comment> {
        std::mem::take(&mut self.comments)
    }

    fn at(&self, i: usize) -> u8 {
        self.bytes.get(i).copied().unwrap_or(0)
    }

    fn newline(&mut self) {
        self.cursor += 1;
        self.line_start = self.cursor;
    }

    fn indent_push(&mut self) {
        self.indent_stack.push(self.indent);
        self.indent = self.indent_dst;
    }

    /// Pop one indentation level, returning whether the popped level was a
    /// block (should emit `}`).
    fn indent_pop(&mut self) -> bool {
        let isblock = self.indent.isblock;
        self.indent = self.indent_stack.pop().unwrap_or(self.indent_dst);
        isblock
    }

    fn check_mixed_indent(&mut self, diags: &mut DiagCtx) {
        let line = &self.bytes[self.line_start..self.cursor];
        if let Some(&first) = line.first() {
            if line.iter().any(|&b| b != first) {
                diags.emit(Diagnostic::new(
                    DiagnosticKind::MixedIndent,
                    self.pos(),
                    "mixed whitespace characters in indentation",
                ));
            }
        }
    }

    /// Scan and return the next token. This is the single entry point
    /// driving indentation layout, comment skipping, and the rest of the
    /// token grammar.
    pub fn next(&mut self, diags: &mut DiagCtx) -> Tok {
        loop {
            // Unwind more than one indentation level at a time.
            if self.indent.n > self.indent_dst.n && self.indent_pop() {
                self.tok = Tok::RBrace;
                return self.tok;
            }

            let mut at_line_start = self.cursor == self.line_start;
            while self.cursor < self.bytes.len()
                && CHARFLAGS[self.at(self.cursor) as usize] & CH_WHITESPACE != 0
            {
                if self.at(self.cursor) == b'\n' {
                    self.newline();
                    at_line_start = true;
                } else {
                    self.cursor += 1;
                }
            }

            if at_line_start {
                self.tok_start = self.line_start;
                self.tok_end = self.line_start;
                self.indent_dst = Indent {
                    isblock: self.insert_semi,
                    n: u32::try_from(self.cursor - self.line_start).unwrap_or(u32::MAX),
                };
                if self.indent_dst.n > self.indent.n {
                    self.indent_push();
                    if self.insert_semi {
                        if self.options.debug {
                            self.check_mixed_indent(diags);
                        }
                        self.insert_semi = false;
                        self.tok = Tok::LBrace;
                        return self.tok;
                    }
                } else {
                    if self.options.debug {
                        self.check_mixed_indent(diags);
                    }
                    if self.indent_dst.n < self.indent.n && self.indent_pop() {
                        self.insert_semi = false;
                        self.tok = Tok::RBrace;
                        return self.tok;
                    }
                    if self.insert_semi {
                        self.insert_semi = false;
                        self.tok = Tok::Semi;
                        return self.tok;
                    }
                }
            }

            if self.cursor >= self.bytes.len() {
                self.tok_start = self.cursor;
                self.tok_end = self.cursor;
                self.indent_dst.n = 0;
                if self.indent.n > 0 && self.indent_pop() {
                    self.tok = Tok::RBrace;
                    self.insert_semi = false;
                    return self.tok;
                }
                self.tok = if self.insert_semi {
                    self.insert_semi = false;
                    Tok::Semi
                } else {
                    Tok::Eof
                };
                return self.tok;
            }

            if self.scan_one(diags) {
                return self.tok;
            }
            // Comment: loop back ("scan_again" in the source).
        }
    }

    /// Scan one real token starting at `self.cursor`. Returns `false` if the
    /// scanned item was a comment that should be skipped (caller loops).
    fn scan_one(&mut self, diags: &mut DiagCtx) -> bool {
        self.tok_start = self.cursor;
        let c = self.at(self.cursor);
        self.cursor += 1;
        self.tok_end = self.cursor;
        let nextc = self.at(self.cursor);

        let mut insert_semi = false;
        self.tok = match c {
            b'-' => match nextc {
                b'>' => {
                    self.consume();
                    Tok::Arrow
                }
                b'-' => {
                    self.consume();
                    insert_semi = true;
                    Tok::MinusMinus
                }
                b'=' => {
                    self.consume();
                    Tok::MinusAssign
                }
                _ => Tok::Minus,
            },
            b'+' => match nextc {
                b'+' => {
                    self.consume();
                    insert_semi = true;
                    Tok::PlusPlus
                }
                b'=' => {
                    self.consume();
                    Tok::PlusAssign
                }
                _ => Tok::Plus,
            },
            b'&' => match nextc {
                b'&' => {
                    self.consume();
                    Tok::AmpAmp
                }
                b'=' => {
                    self.consume();
                    Tok::AmpAssign
                }
                _ => Tok::Amp,
            },
            b'|' => match nextc {
                b'|' => {
                    self.consume();
                    Tok::PipePipe
                }
                b'=' => {
                    self.consume();
                    Tok::PipeAssign
                }
                _ => Tok::Pipe,
            },
            b'^' => {
                if nextc == b'=' {
                    self.consume();
                    Tok::CaretAssign
                } else {
                    Tok::Caret
                }
            }
            b'~' => {
                if nextc == b'=' {
                    self.consume();
                    Tok::TildeAssign
                } else {
                    Tok::Tilde
                }
            }
            b'!' => {
                if nextc == b'=' {
                    self.consume();
                    Tok::NotEq
                } else {
                    Tok::Bang
                }
            }
            b'=' => {
                if nextc == b'=' {
                    self.consume();
                    Tok::EqEq
                } else {
                    Tok::Assign
                }
            }
            b'*' => {
                if nextc == b'=' {
                    self.consume();
                    Tok::StarAssign
                } else {
                    Tok::Star
                }
            }
            b'%' => {
                if nextc == b'=' {
                    self.consume();
                    Tok::PercentAssign
                } else {
                    Tok::Percent
                }
            }
            b'<' => match nextc {
                b'<' => {
                    self.consume();
                    if self.at(self.cursor) == b'=' {
                        self.consume();
                        Tok::ShlAssign
                    } else {
                        Tok::Shl
                    }
                }
                b'=' => {
                    self.consume();
                    Tok::Le
                }
                _ => Tok::Lt,
            },
            b'>' => match nextc {
                b'>' => {
                    self.consume();
                    if self.at(self.cursor) == b'=' {
                        self.consume();
                        Tok::ShrAssign
                    } else {
                        Tok::Shr
                    }
                }
                b'=' => {
                    self.consume();
                    Tok::Ge
                }
                _ => Tok::Gt,
            },
            b'/' => {
                if nextc == b'/' {
                    self.scan_line_comment(diags);
                    return false;
                } else if nextc == b'*' {
                    self.scan_block_comment(diags);
                    return false;
                } else if nextc == b'=' {
                    self.consume();
                    Tok::SlashAssign
                } else {
                    Tok::Slash
                }
            }
            b'(' => Tok::LParen,
            b')' => {
                insert_semi = true;
                Tok::RParen
            }
            b'{' => Tok::LBrace,
            b'}' => {
                insert_semi = true;
                Tok::RBrace
            }
            b'[' => Tok::LBrack,
            b']' => {
                insert_semi = true;
                Tok::RBrack
            }
            b',' => Tok::Comma,
            b':' => Tok::Colon,
            b';' => Tok::Semi,
            b'.' => Tok::Dot,
            b'"' => {
                self.scan_string(diags);
                insert_semi = true;
                self.tok
            }
            b'0'..=b'9' => {
                self.scan_number();
                insert_semi = true;
                self.tok
            }
            _ if CHARFLAGS[c as usize] & CH_IDENT != 0 || c >= 0x80 => {
                self.scan_name();
                insert_semi = true;
                self.tok
            }
            _ => {
                diags.emit(Diagnostic::new(
                    DiagnosticKind::InvalidCharacter,
                    self.pos(),
                    format!("invalid character {:?}", c as char),
                ));
                Tok::None
            }
        };

        self.insert_semi = insert_semi || self.tok.triggers_semi_insertion();
        true
    }

    fn consume(&mut self) {
        self.cursor += 1;
        self.tok_end = self.cursor;
    }

    fn scan_line_comment(&mut self, diags: &mut DiagCtx) {
        let _ = diags;
        let start = self.tok_start;
        while self.cursor < self.bytes.len() && self.at(self.cursor) != b'\n' {
            self.cursor += 1;
        }
        self.tok_end = self.cursor;
        if self.options.parse_comments {
            self.comments.push(Comment {
                pos: self.pos(),
                text: self.text[start..self.tok_end].to_string(),
            });
        }
    }

    fn scan_block_comment(&mut self, diags: &mut DiagCtx) {
        let start = self.tok_start;
        self.cursor += 1; // skip '*' of "/*"
        let mut terminated = false;
        while self.cursor < self.bytes.len() {
            if self.at(self.cursor) == b'\n' {
                self.newline();
                continue;
            }
            if self.at(self.cursor) == b'*' && self.at(self.cursor + 1) == b'/' {
                self.cursor += 2;
                terminated = true;
                break;
            }
            self.cursor += 1;
        }
        self.tok_end = self.cursor;
        if !terminated {
            diags.emit(Diagnostic::new(
                DiagnosticKind::UnterminatedString,
                self.pos(),
                "unterminated block comment",
            ));
        }
        if self.options.parse_comments {
            self.comments.push(Comment {
                pos: self.pos(),
                text: self.text[start..self.tok_end].to_string(),
            });
        }
    }

    fn scan_name(&mut self) {
        while self.cursor < self.bytes.len() {
            let b = self.at(self.cursor);
            if b < 0x80 {
                if CHARFLAGS[b as usize] & CH_IDENT == 0 {
                    break;
                }
                self.cursor += 1;
            } else {
                // Multi-byte UTF-8 sequences are always valid mid-identifier;
                // `self.text` is guaranteed valid UTF-8 already.
                self.cursor += utf8_len(b);
            }
        }
        self.tok_end = self.cursor;
        let text = &self.text[self.tok_start..self.tok_end];
        let sym = self.pool.intern_str(text);
        self.tok = sym
            .flags()
            .keyword_index()
            .map_or(Tok::Id, keyword_tok);
        self.name = Some(sym);
    }

    fn scan_number(&mut self) {
        while self.cursor < self.bytes.len() && self.at(self.cursor).is_ascii_digit() {
            self.cursor += 1;
        }
        let mut is_float = false;
        if self.at(self.cursor) == b'.' && self.at(self.cursor + 1).is_ascii_digit() {
            is_float = true;
            self.cursor += 1;
            while self.cursor < self.bytes.len() && self.at(self.cursor).is_ascii_digit() {
                self.cursor += 1;
            }
        }
        if matches!(self.at(self.cursor), b'e' | b'E') {
            let mut look = self.cursor + 1;
            if matches!(self.at(look), b'+' | b'-') {
                look += 1;
            }
            if self.at(look).is_ascii_digit() {
                is_float = true;
                self.cursor = look;
                while self.cursor < self.bytes.len() && self.at(self.cursor).is_ascii_digit() {
                    self.cursor += 1;
                }
            }
        }
        self.tok_end = self.cursor;
        let text = &self.text[self.tok_start..self.tok_end];
        if is_float {
            self.float_value = text.parse().unwrap_or(0.0);
            self.tok = Tok::FloatLit;
        } else {
            self.int_value = text.parse().unwrap_or(i128::MAX);
            self.tok = Tok::IntLit;
        }
    }

    fn scan_string(&mut self, diags: &mut DiagCtx) {
        let body_start = self.cursor;
        let mut terminated = false;
        while self.cursor < self.bytes.len() {
            match self.at(self.cursor) {
                b'\\' => {
                    self.cursor += 2;
                }
                b'\n' => {
                    self.newline();
                }
                b'"' => {
                    let body_end = self.cursor;
                    self.cursor += 1;
                    self.tok_end = self.cursor;
                    let raw = &self.text[body_start..body_end];
                    self.str_value = decode_string_body(raw, self.pos(), diags);
                    self.tok = Tok::StrLit;
                    terminated = true;
                    break;
                }
                _ => self.cursor += 1,
            }
        }
        if !terminated {
            self.tok_end = self.cursor;
            self.str_value.clear();
            diags.emit(Diagnostic::new(
                DiagnosticKind::UnterminatedString,
                self.pos(),
                "unterminated string literal",
            ));
            self.tok = Tok::StrLit;
        }
    }
}

fn utf8_len(first_byte: u8) -> usize {
    if first_byte & 0xE0 == 0xC0 {
        2
    } else if first_byte & 0xF0 == 0xE0 {
        3
    } else if first_byte & 0xF8 == 0xF0 {
        4
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::intern_keywords;

    fn scan_all(text: &str) -> (Vec<Tok>, u32) {
        let pool = Arc::new(SymPool::new());
        intern_keywords(&pool);
        let mut scanner = Scanner::new(text, 0, pool, BuildOptions::default());
        let mut diags = DiagCtx::new();
        let mut toks = Vec::new();
        loop {
            let t = scanner.next(&mut diags);
            if t == Tok::Eof {
                break;
            }
            toks.push(t);
        }
        (toks, diags.error_count())
    }

    #[test]
    fn scans_simple_expression() {
        let (toks, errs) = scan_all("x + 1");
        assert_eq!(errs, 0);
        assert_eq!(toks, vec![Tok::Id, Tok::Plus, Tok::IntLit, Tok::Semi]);
    }

    #[test]
    fn keyword_is_recognized() {
        let (toks, _) = scan_all("fun f");
        assert_eq!(toks[0], Tok::Fun);
        assert_eq!(toks[1], Tok::Id);
    }

    #[test]
    fn indentation_emits_braces_and_semicolons() {
        let src = "fun f() i32\n  x\n  y\n";
        let (toks, errs) = scan_all(src);
        assert_eq!(errs, 0);
        assert_eq!(
            toks,
            vec![
                Tok::Fun,
                Tok::Id,
                Tok::LParen,
                Tok::RParen,
                Tok::Id,
                Tok::LBrace,
                Tok::Id,
                Tok::Semi,
                Tok::Id,
                Tok::RBrace,
            ]
        );
    }

    #[test]
    fn shift_assign_operators_need_three_bytes() {
        let (toks, _) = scan_all("x <<= 1");
        assert_eq!(toks[1], Tok::ShlAssign);
    }

    #[test]
    fn string_literal_decodes_escapes() {
        let pool = Arc::new(SymPool::new());
        intern_keywords(&pool);
        let mut scanner = Scanner::new("\"a\\nb\"", 0, pool, BuildOptions::default());
        let mut diags = DiagCtx::new();
        assert_eq!(scanner.next(&mut diags), Tok::StrLit);
        assert_eq!(scanner.str_value(), "a\nb");
    }

    #[test]
    fn unterminated_string_is_diagnosed() {
        let pool = Arc::new(SymPool::new());
        intern_keywords(&pool);
        let mut scanner = Scanner::new("\"abc", 0, pool, BuildOptions::default());
        let mut diags = DiagCtx::new();
        let _ = scanner.next(&mut diags);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn float_literal_with_exponent() {
        let (toks, _) = scan_all("1.5e10");
        assert_eq!(toks[0], Tok::FloatLit);
    }

    #[test]
    fn line_comment_is_skipped() {
        let (toks, errs) = scan_all("x // comment\ny");
        assert_eq!(errs, 0);
        assert_eq!(toks, vec![Tok::Id, Tok::Semi, Tok::Id, Tok::Semi]);
    }
}
