//! Interned, identity-comparable byte strings ("symbols"), and the pool that
//! interns them.
//!
//! A [`Sym`] is cheap to copy (it's an `Arc` clone) and compares equal to
//! another `Sym` iff they point at the *same* allocation — the pool
//! guarantees that two calls with equal bytes return the same allocation, so
//! pointer identity stands in for byte equality everywhere downstream
//! (scopes, typeids, the SSA constant cache).

use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Maximum symbol length: 2^27 - 1 bytes, per the base spec's data model.
pub const MAX_SYM_LEN: usize = (1 << 27) - 1;

/// Flag bits carried by a symbol.
///
/// Five bits are defined: bit 0 marks the symbol as a reserved word; bits
/// 1..=5 hold the keyword's index into the scanner's keyword table (0..=31)
/// when bit 0 is set. A single pool lookup therefore yields both "is this an
/// identifier or a keyword" and, if a keyword, which one — the scanner never
/// needs a second lookup to classify a token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SymFlags(u8);

impl SymFlags {
    pub const NONE: Self = Self(0);
    const IS_KEYWORD: u8 = 1 << 0;
    const KEYWORD_INDEX_SHIFT: u8 = 1;
    const KEYWORD_INDEX_MASK: u8 = 0b0111_1100;

    #[must_use]
    pub const fn keyword(index: u8) -> Self {
        debug_assert!(index <= 31);
        Self(Self::IS_KEYWORD | (index << Self::KEYWORD_INDEX_SHIFT))
    }

    #[must_use]
    pub const fn is_keyword(self) -> bool {
        self.0 & Self::IS_KEYWORD != 0
    }

    #[must_use]
    pub const fn keyword_index(self) -> Option<u8> {
        if self.is_keyword() {
            Some((self.0 & Self::KEYWORD_INDEX_MASK) >> Self::KEYWORD_INDEX_SHIFT)
        } else {
            None
        }
    }
}

struct SymData {
    hash: u32,
    bytes: Box<[u8]>,
    flags: SymFlags,
}

/// An interned, immutable byte sequence.
///
/// `Sym` implements `PartialEq`/`Hash` in terms of allocation identity, not
/// byte content — two `Sym`s from the same pool compare equal iff `intern`
/// returned the same `Arc` for both, which the pool's `(hash, length, bytes)`
/// lookup guarantees for equal content.
#[derive(Clone)]
pub struct Sym(Arc<SymData>);

impl Sym {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0.bytes
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0.bytes).unwrap_or("<invalid-utf8>")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.bytes.is_empty()
    }

    #[must_use]
    pub fn precomputed_hash(&self) -> u32 {
        self.0.hash
    }

    #[must_use]
    pub fn flags(&self) -> SymFlags {
        self.0.flags
    }

    #[must_use]
    pub fn is_keyword(&self) -> bool {
        self.0.flags.is_keyword()
    }

    /// Raw identity of the backing allocation, used by maps that want to key
    /// on `Sym` without re-hashing the bytes.
    fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Sym {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Sym {}

impl Hash for Sym {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl std::fmt::Debug for Sym {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sym({:?})", self.as_str())
    }
}

impl std::fmt::Display for Sym {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut hasher = FxHasher::default();
    bytes.hash(&mut hasher);
    hasher.finish() as u32
}

/// Concurrent-read, exclusive-write associative set of interned symbols.
///
/// Pools may chain: a lookup that misses locally descends to `parent` before
/// giving up. This lets a per-build pool share a long-lived universe pool
/// (built-in type and keyword names) without re-interning them. `intern` is
/// idempotent: interning the same bytes twice, from any pool in the chain,
/// returns the same `Sym`.
pub struct SymPool {
    table: DashMap<(u32, u32, Box<[u8]>), Sym, rustc_hash::FxBuildHasher>,
    parent: Option<Arc<SymPool>>,
}

impl SymPool {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: DashMap::default(),
            parent: None,
        }
    }

    #[must_use]
    pub fn with_parent(parent: Arc<SymPool>) -> Self {
        Self {
            table: DashMap::default(),
            parent: Some(parent),
        }
    }

    fn key(hash: u32, bytes: &[u8]) -> (u32, u32, Box<[u8]>) {
        (hash, bytes.len() as u32, Box::from(bytes))
    }

    /// Look up `bytes` without interning; checks this pool then the parent
    /// chain. Returns `None` if not already interned anywhere in the chain.
    #[must_use]
    pub fn lookup(&self, bytes: &[u8]) -> Option<Sym> {
        let hash = hash_bytes(bytes);
        let key = Self::key(hash, bytes);
        if let Some(sym) = self.table.get(&key) {
            return Some(sym.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(bytes))
    }

    /// Intern `bytes`, returning the existing `Sym` if already present
    /// (locally or via the parent chain) or allocating and inserting a new
    /// one. Idempotent.
    ///
    /// # Panics
    /// Panics if `bytes` exceeds [`MAX_SYM_LEN`].
    pub fn intern(&self, bytes: &[u8]) -> Sym {
        assert!(bytes.len() <= MAX_SYM_LEN, "symbol exceeds maximum length");
        if let Some(found) = self.lookup(bytes) {
            return found;
        }
        let hash = hash_bytes(bytes);
        let key = Self::key(hash, bytes);
        // Re-check under the entry API to stay idempotent under concurrent
        // interning of the same bytes from sibling readers.
        self.table
            .entry(key)
            .or_insert_with(|| {
                Sym(Arc::new(SymData {
                    hash,
                    bytes: Box::from(bytes),
                    flags: SymFlags::NONE,
                }))
            })
            .clone()
    }

    /// Intern `bytes` as a keyword, stamping `flags` into the symbol at
    /// construction time so later lookups never need a second check. Only
    /// meaningful the first time a given byte sequence is interned; if
    /// already present, the existing symbol (and its existing flags) is
    /// returned unchanged.
    pub fn intern_keyword(&self, bytes: &[u8], keyword_index: u8) -> Sym {
        assert!(bytes.len() <= MAX_SYM_LEN, "symbol exceeds maximum length");
        if let Some(found) = self.lookup(bytes) {
            return found;
        }
        let hash = hash_bytes(bytes);
        let key = Self::key(hash, bytes);
        self.table
            .entry(key)
            .or_insert_with(|| {
                Sym(Arc::new(SymData {
                    hash,
                    bytes: Box::from(bytes),
                    flags: SymFlags::keyword(keyword_index),
                }))
            })
            .clone()
    }

    pub fn intern_str(&self, s: &str) -> Sym {
        self.intern(s.as_bytes())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len() + self.parent.as_ref().map_or(0, |p| p.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SymPool {
    fn default() -> Self {
        Self::new()
    }
}
