//! Source buffers handed to the scanner.
//!
//! Per the base spec's scope note, the actual file-system I/O (discovery,
//! `mmap`, caching) is an external collaborator's job; this crate only
//! defines the `Source` value type and two plain constructors. There is no
//! `mmap` path here — lifetime management of a memory-mapped region is
//! explicitly out of scope for the core, so `open_file` does a direct
//! `std::fs::read`.

use std::path::Path;
use std::sync::Arc;

/// An opened source buffer: a filename and its UTF-8 body.
///
/// `Source` is reference-counted (`Arc` internals) so it can be shared
/// between the scanner, the position map, and diagnostics without cloning
/// the body bytes.
#[derive(Clone)]
pub struct Source {
    inner: Arc<SourceInner>,
}

struct SourceInner {
    filename: String,
    body: String,
}

/// Errors constructing a `Source`.
#[derive(Debug)]
pub enum SourceError {
    Io(std::io::Error),
    InvalidUtf8 { valid_up_to: usize },
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Io(e) => write!(f, "{e}"),
            SourceError::InvalidUtf8 { valid_up_to } => {
                write!(f, "invalid UTF-8 at byte {valid_up_to}")
            }
        }
    }
}
impl std::error::Error for SourceError {}

impl Source {
    /// Open a source file from disk. This is a plain `std::fs::read`, not a
    /// memory map (see module docs).
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(SourceError::Io)?;
        let body = String::from_utf8(bytes)
            .map_err(|e| SourceError::InvalidUtf8 { valid_up_to: e.utf8_error().valid_up_to() })?;
        Ok(Self::open_data(path.to_string_lossy().into_owned(), body))
    }

    /// Build a `Source` directly from an in-memory buffer.
    #[must_use]
    pub fn open_data(filename: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SourceInner {
                filename: filename.into(),
                body: body.into(),
            }),
        }
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.inner.filename
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.inner.body
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.body.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.body.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_data_round_trips() {
        let src = Source::open_data("mem.co", "fun f() i32 { 0 }");
        assert_eq!(src.filename(), "mem.co");
        assert_eq!(src.body(), "fun f() i32 { 0 }");
    }

    #[test]
    fn open_file_reads_real_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("input.co");
        std::fs::write(&path, "const x i8 = 1").unwrap();
        let src = Source::open_file(&path).expect("open");
        assert_eq!(src.body(), "const x i8 = 1");
    }
}
