//! String literal decoding: verbatim slices, backslash escapes, and the
//! multiline `"\n...|...` pipe form, per the base spec's "String literals".

use corec_common::diagnostics::{DiagCtx, Diagnostic, DiagnosticKind};
use corec_common::position::Pos;

/// Decode one escape sequence starting just after the backslash. Returns
/// the decoded codepoint and the number of input bytes consumed (not
/// counting the backslash itself), or `None` if `bytes` doesn't start with
/// a recognized escape.
fn decode_escape(bytes: &[u8]) -> Option<(u32, usize)> {
    let (&first, rest) = bytes.split_first()?;
    let single = |v: u32| Some((v, 1));
    match first {
        b'"' | b'\'' | b'\\' => single(u32::from(first)),
        b'0' => single(0x0),
        b'a' => single(0x7),
        b'b' => single(0x8),
        b't' => single(0x9),
        b'n' => single(0xA),
        b'v' => single(0xB),
        b'f' => single(0xC),
        b'r' => single(0xD),
        b'x' | b'u' | b'U' => {
            let hex_len = match first {
                b'x' => 2,
                b'u' => 4,
                _ => 8,
            };
            if rest.len() < hex_len {
                return None;
            }
            let hex = std::str::from_utf8(&rest[..hex_len]).ok()?;
            let value = u32::from_str_radix(hex, 16).ok()?;
            Some((value, 1 + hex_len))
        }
        _ => None,
    }
}

fn push_codepoint(out: &mut String, value: u32, is_byte_escape: bool) -> bool {
    if is_byte_escape {
        // `\xXX` denotes a raw byte, not necessarily valid UTF-8 on its own;
        // values under 0x80 are plain ASCII and always valid.
        if value < 0x80 {
            out.push(value as u8 as char);
            true
        } else {
            // Fall through to codepoint decoding for consistency; a bare
            // high byte from `\xXX` is otherwise inexpressible in a `String`.
            char::from_u32(value).is_some_and(|c| {
                out.push(c);
                true
            })
        }
    } else {
        char::from_u32(value).is_some_and(|c| {
            out.push(c);
            true
        })
    }
}

/// Split off the whitespace run before a `|` marker at the start of `line`.
/// Returns `(indent_bytes, rest_after_pipe)`, or `None` if `line` has no
/// `|` preceded only by spaces/tabs.
fn split_pipe_prefix(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let mut i = 0;
    while i < line.len() && (line[i] == b' ' || line[i] == b'\t') {
        i += 1;
    }
    if i < line.len() && line[i] == b'|' {
        Some((&line[..i], &line[i + 1..]))
    } else {
        None
    }
}

/// Decode the body of a string literal (the bytes between the quotes,
/// already known to be valid UTF-8). Dispatches on its first byte: `\n`
/// selects the multiline pipe form, anything else is scanned for escapes
/// with a literal fast path when none are found.
#[must_use]
pub fn decode_string_body(raw: &str, pos: Pos, diags: &mut DiagCtx) -> String {
    if raw.as_bytes().first() == Some(&b'\n') {
        decode_multiline(raw, pos, diags)
    } else if raw.contains('\\') {
        decode_escaped(raw.as_bytes(), pos, diags)
    } else {
        raw.to_string()
    }
}

fn decode_escaped(bytes: &[u8], pos: Pos, diags: &mut DiagCtx) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            match decode_escape(&bytes[i + 1..]) {
                Some((value, consumed)) => {
                    let is_byte = matches!(bytes[i + 1], b'x');
                    if !push_codepoint(&mut out, value, is_byte) {
                        diags.emit(Diagnostic::new(
                            DiagnosticKind::BadEscape,
                            pos,
                            format!("invalid Unicode codepoint U+{value:04X}"),
                        ));
                    }
                    i += 1 + consumed;
                }
                None => {
                    diags.emit(Diagnostic::new(
                        DiagnosticKind::BadEscape,
                        pos,
                        "invalid string escape sequence",
                    ));
                    i += 1;
                }
            }
        } else {
            let ch_len = utf8_char_len(bytes[i]);
            let end = (i + ch_len).min(bytes.len());
            if let Ok(s) = std::str::from_utf8(&bytes[i..end]) {
                out.push_str(s);
            }
            i = end;
        }
    }
    out
}

fn utf8_char_len(first_byte: u8) -> usize {
    if first_byte & 0x80 == 0 {
        1
    } else if first_byte & 0xE0 == 0xC0 {
        2
    } else if first_byte & 0xF0 == 0xE0 {
        3
    } else if first_byte & 0xF8 == 0xF0 {
        4
    } else {
        1
    }
}

fn decode_multiline(raw: &str, pos: Pos, diags: &mut DiagCtx) -> String {
    // `raw` starts with '\n'; split into the continuation lines that
    // follow it.
    let body = &raw[1..];
    let mut out = String::with_capacity(body.len());
    let mut reference_indent: Option<&[u8]> = None;
    let mut first = true;

    for line in body.split('\n') {
        let line_bytes = line.as_bytes();
        match split_pipe_prefix(line_bytes) {
            Some((indent, rest)) => {
                match reference_indent {
                    None => reference_indent = Some(indent),
                    Some(reference) if reference == indent => {}
                    Some(_) => {
                        diags.emit(Diagnostic::new(
                            DiagnosticKind::MultilineMisaligned,
                            pos,
                            "inconsistent indentation of multiline string",
                        ));
                    }
                }
                if !first {
                    out.push('\n');
                }
                first = false;
                out.push_str(&decode_escaped(rest, pos, diags));
            }
            None => {
                diags.emit(Diagnostic::new(
                    DiagnosticKind::MultilineMisaligned,
                    pos,
                    "missing \"|\" after linebreak in multiline string",
                ));
            }
        }
    }
    out
}
