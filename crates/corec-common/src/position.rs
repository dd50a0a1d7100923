//! Packed source positions and the map that resolves them back to source
//! text for diagnostics.
//!
//! A [`Pos`] packs `(origin, line, column, width)` into a single `u64` so
//! that AST node headers can carry two of them (`pos`, `endpos`) at no more
//! cost than two machine words, and so positions within one origin are
//! totally ordered by plain numeric comparison.

/// Bit widths for each field, per the base spec: origin 20, line 20, column
/// 12, width 12 (64 bits total).
const ORIGIN_BITS: u32 = 20;
const LINE_BITS: u32 = 20;
const COL_BITS: u32 = 12;
const WIDTH_BITS: u32 = 12;

const ORIGIN_MAX: u32 = (1 << ORIGIN_BITS) - 1;
const LINE_MAX: u32 = (1 << LINE_BITS) - 1;
const COL_MAX: u32 = (1 << COL_BITS) - 1;
const WIDTH_MAX: u32 = (1 << WIDTH_BITS) - 1;

const WIDTH_SHIFT: u32 = 0;
const COL_SHIFT: u32 = WIDTH_SHIFT + WIDTH_BITS;
const LINE_SHIFT: u32 = COL_SHIFT + COL_BITS;
const ORIGIN_SHIFT: u32 = LINE_SHIFT + LINE_BITS;

/// A 64-bit packed source position. `Pos::NO_POS` (value `0`) marks the
/// absence of a position, matching the base spec's `NoPos`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos(u64);

/// The sentinel "no position" value.
pub const NO_POS: Pos = Pos(0);

impl Pos {
    /// Build a position, clamping any field that exceeds its bit width's
    /// capacity rather than panicking or wrapping — per the base spec's
    /// testable property 3 ("larger inputs clamp to the cap").
    #[must_use]
    pub fn make(origin: u32, line: u32, column: u32, width: u32) -> Self {
        let origin = origin.min(ORIGIN_MAX);
        let line = line.min(LINE_MAX);
        let column = column.min(COL_MAX);
        let width = width.min(WIDTH_MAX);
        let packed = (u64::from(origin) << ORIGIN_SHIFT)
            | (u64::from(line) << LINE_SHIFT)
            | (u64::from(column) << COL_SHIFT)
            | (u64::from(width) << WIDTH_SHIFT);
        // origin=0,line=0,col=0,width=0 is indistinguishable from NO_POS;
        // that's intentional and matches the base spec's `NoPos = 0`.
        Pos(packed)
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn origin(self) -> u32 {
        ((self.0 >> ORIGIN_SHIFT) & u64::from(ORIGIN_MAX)) as u32
    }

    #[must_use]
    pub const fn line(self) -> u32 {
        ((self.0 >> LINE_SHIFT) & u64::from(LINE_MAX)) as u32
    }

    #[must_use]
    pub const fn column(self) -> u32 {
        ((self.0 >> COL_SHIFT) & u64::from(COL_MAX)) as u32
    }

    #[must_use]
    pub const fn width(self) -> u32 {
        ((self.0 >> WIDTH_SHIFT) & u64::from(WIDTH_MAX)) as u32
    }

    #[must_use]
    pub const fn with_width(self, width: u32) -> Self {
        Self::make_const(self.origin(), self.line(), self.column(), width)
    }

    const fn make_const(origin: u32, line: u32, column: u32, width: u32) -> Self {
        let origin = if origin > ORIGIN_MAX { ORIGIN_MAX } else { origin };
        let line = if line > LINE_MAX { LINE_MAX } else { line };
        let column = if column > COL_MAX { COL_MAX } else { column };
        let width = if width > WIDTH_MAX { WIDTH_MAX } else { width };
        Pos(
            (origin as u64) << ORIGIN_SHIFT
                | (line as u64) << LINE_SHIFT
                | (column as u64) << COL_SHIFT
                | (width as u64) << WIDTH_SHIFT,
        )
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "<no-pos>")
        } else {
            write!(f, "{}:{}", self.line() + 1, self.column() + 1)
        }
    }
}

/// Maps byte offsets within one origin's source text to `(line, column)`
/// pairs, and positions back to the source line for diagnostic snippets.
///
/// One `PosMap` entry exists per `Source` registered with a build context;
/// `origin` in `Pos` indexes into the build's table of `PosMap`s.
pub struct PosMap {
    /// Starting byte offset of each line; `line_starts[0]` is always `0`.
    line_starts: Vec<u32>,
}

impl PosMap {
    #[must_use]
    pub fn build(text: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(u32::try_from(i + 1).unwrap_or(u32::MAX));
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset into `(line, column)`, both 0-indexed, counting
    /// columns in bytes (the scanner only ever reports positions at
    /// character boundaries it has already validated as UTF-8).
    #[must_use]
    pub fn offset_to_line_col(&self, offset: u32) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        let line_start = self.line_starts[line];
        (line as u32, offset - line_start)
    }

    #[must_use]
    pub fn make_pos(&self, origin: u32, offset: u32, width: u32) -> Pos {
        let (line, col) = self.offset_to_line_col(offset);
        Pos::make(origin, line, col, width)
    }

    /// Return the text of the line containing `pos`, for diagnostic
    /// snippets.
    #[must_use]
    pub fn line_text<'a>(&self, text: &'a str, pos: Pos) -> &'a str {
        let line = pos.line() as usize;
        let start = *self.line_starts.get(line).unwrap_or(&0) as usize;
        let end = self
            .line_starts
            .get(line + 1)
            .map_or(text.len(), |&e| e as usize - 1);
        text.get(start.min(text.len())..end.min(text.len()))
            .unwrap_or("")
    }
}
