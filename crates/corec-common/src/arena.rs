//! Bump/slab allocation tied to the lifetime of one build.
//!
//! The base spec's design notes prefer modeling the arena as a slab of
//! fixed-size chunks addressed by 32-bit indices over raw pointers or
//! `Rc`/`Weak`: an index is `Copy`, carries no borrow, and makes
//! self-referential structures (a function type that returns itself) cost
//! nothing to represent. `Arena<T>` is that slab. It never frees individual
//! elements; the whole arena (and every `T` in it) is dropped together when
//! the owning build context goes out of scope.

use std::marker::PhantomData;

/// A 32-bit index into an `Arena<T>`.
///
/// Indices from one arena are not valid in another; nothing prevents mixing
/// them up at the type level (that would require per-arena generative
/// brands), so callers that juggle multiple arenas must track which arena an
/// id belongs to themselves, the same discipline the teacher's
/// `NodeIndex`/`NodeArena` pairing assumes.
pub struct ArenaId<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ArenaId<T> {
    #[must_use]
    pub const fn from_u32(index: u32) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }
}

impl<T> Clone for ArenaId<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for ArenaId<T> {}
impl<T> PartialEq for ArenaId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}
impl<T> Eq for ArenaId<T> {}
impl<T> std::hash::Hash for ArenaId<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}
impl<T> std::fmt::Debug for ArenaId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Chunk size (in elements) for each slab. Chosen so a chunk of `Node`-sized
/// values (roughly 64 bytes) stays a handful of KiB.
const SLAB_SIZE: usize = 1024;

/// A bump allocator organized as a linked list of fixed-size slabs, per the
/// base spec's "Arena allocation" paragraph.
///
/// Elements are pushed with [`Arena::alloc`] and never removed individually.
/// Random access by [`ArenaId`] is `O(1)`: the id is split into a slab index
/// and an in-slab offset.
pub struct Arena<T> {
    slabs: Vec<Vec<T>>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { slabs: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slabs.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocate `value` in the arena, returning its stable id.
    pub fn alloc(&mut self, value: T) -> ArenaId<T> {
        let global_index = self.len();
        let slab_index = global_index / SLAB_SIZE;
        if slab_index >= self.slabs.len() {
            self.slabs.push(Vec::with_capacity(SLAB_SIZE));
        }
        self.slabs[slab_index].push(value);
        ArenaId::from_u32(u32::try_from(global_index).expect("arena exceeded u32 capacity"))
    }

    #[must_use]
    pub fn get(&self, id: ArenaId<T>) -> &T {
        let index = id.index() as usize;
        let slab_index = index / SLAB_SIZE;
        let offset = index % SLAB_SIZE;
        &self.slabs[slab_index][offset]
    }

    pub fn get_mut(&mut self, id: ArenaId<T>) -> &mut T {
        let index = id.index() as usize;
        let slab_index = index / SLAB_SIZE;
        let offset = index % SLAB_SIZE;
        &mut self.slabs[slab_index][offset]
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slabs.iter().flatten()
    }

    pub fn ids(&self) -> impl Iterator<Item = ArenaId<T>> + '_ {
        (0..self.len()).map(|i| ArenaId::from_u32(i as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_get_round_trip() {
        let mut arena: Arena<u32> = Arena::new();
        let a = arena.alloc(10);
        let b = arena.alloc(20);
        assert_eq!(*arena.get(a), 10);
        assert_eq!(*arena.get(b), 20);
    }

    #[test]
    fn spans_multiple_slabs() {
        let mut arena: Arena<usize> = Arena::new();
        let ids: Vec<_> = (0..SLAB_SIZE * 3 + 7).map(|i| arena.alloc(i)).collect();
        for (i, id) in ids.into_iter().enumerate() {
            assert_eq!(*arena.get(id), i);
        }
        assert_eq!(arena.len(), SLAB_SIZE * 3 + 7);
    }

    #[test]
    fn get_mut_mutates_in_place() {
        let mut arena: Arena<u32> = Arena::new();
        let a = arena.alloc(1);
        *arena.get_mut(a) = 42;
        assert_eq!(*arena.get(a), 42);
    }
}
