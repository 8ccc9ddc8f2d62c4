// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Insertion-ordered table of keys.
//!
//! [`PointerTable`] is the lightweight ordered set used by every algorithm in
//! the kernel: free-edge lists, traversal stacks, shared-edge tables. Order is
//! stable, duplicates are tolerated unless [`PointerTable::insert_unique`] is
//! used, and [`PointerTable::reset`] keeps the backing storage for reuse in hot
//! loops. Searches scan from the end because the most recently inserted entry
//! is the one most likely to be queried again.

use std::ops::Index;

/// Result of [`PointerTable::insert_unique`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    /// The entry was appended at this index.
    At(usize),
    /// The entry was already in the table at this index; nothing was added.
    AlreadyPresent(usize),
}

impl Inserted {
    /// Index of the entry, whether or not it was newly added.
    pub fn index(self) -> usize {
        match self {
            Inserted::At(i) | Inserted::AlreadyPresent(i) => i,
        }
    }
}

/// Growable, insertion-ordered table of copyable keys.
#[derive(Debug, Clone)]
pub struct PointerTable<T> {
    items: Vec<T>,
}

impl<T: Copy + PartialEq> PointerTable<T> {
    /// Capacity allocated by [`PointerTable::new`].
    pub const INITIAL_CAPACITY: usize = 64;

    /// Creates an empty table with the initial capacity.
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(Self::INITIAL_CAPACITY),
        }
    }

    /// Appends `item` and returns the index it was stored at.
    ///
    /// Capacity grows by a factor of four when the table is full.
    pub fn insert(&mut self, item: T) -> usize {
        if self.items.len() == self.items.capacity() {
            let grow = self.items.capacity().max(Self::INITIAL_CAPACITY / 4) * 3;
            self.items.reserve_exact(grow);
        }
        self.items.push(item);
        self.items.len() - 1
    }

    /// Appends `item` unless it is already present.
    pub fn insert_unique(&mut self, item: T) -> Inserted {
        match self.locate(item) {
            Some(i) => Inserted::AlreadyPresent(i),
            None => Inserted::At(self.insert(item)),
        }
    }

    /// Returns the index of the last occurrence of `item`.
    pub fn locate(&self, item: T) -> Option<usize> {
        self.items.iter().rposition(|&x| x == item)
    }

    /// Returns `true` if `item` is in the table.
    pub fn contains(&self, item: T) -> bool {
        self.locate(item).is_some()
    }

    /// Removes every occurrence of `item`, keeping survivors in order.
    ///
    /// Returns the number of entries removed.
    pub fn remove(&mut self, item: T) -> usize {
        let before = self.items.len();
        self.items.retain(|&x| x != item);
        before - self.items.len()
    }

    /// Appends all entries of `src`, in order.
    pub fn concat(&mut self, src: &PointerTable<T>) {
        for &item in &src.items {
            self.insert(item);
        }
    }

    /// Logically empties the table; backing storage is kept.
    pub fn reset(&mut self) {
        self.items.clear();
    }

    /// Empties the table and releases its backing storage.
    pub fn free(&mut self) {
        self.items = Vec::new();
    }

    /// Takes the last entry and removes every occurrence of it.
    ///
    /// This is the stack discipline used by the flood-fill traversals: an
    /// entry pushed twice is visited once.
    pub fn pop(&mut self) -> Option<T> {
        let last = *self.items.last()?;
        self.remove(last);
        Some(last)
    }

    /// Returns the entry at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        self.items.get(index).copied()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current backing capacity.
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// The live entries as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterates over the live entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: Copy + PartialEq> Default for PointerTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for PointerTable<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a PointerTable<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Copy + PartialEq> FromIterator<T> for PointerTable<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut table = Self::new();
        for item in iter {
            table.insert(item);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_has_initial_capacity() {
        let t: PointerTable<u32> = PointerTable::new();
        assert!(t.is_empty());
        assert!(t.capacity() >= 64);
    }

    #[test]
    fn insert_returns_index_and_grows() {
        let mut t = PointerTable::new();
        for i in 0..200u32 {
            assert_eq!(t.insert(i), i as usize);
        }
        assert_eq!(t.len(), 200);
        assert!(t.capacity() >= 200);
        assert_eq!(t[150], 150);
    }

    #[test]
    fn insert_unique_never_duplicates() {
        let mut t = PointerTable::new();
        assert_eq!(t.insert_unique(7), Inserted::At(0));
        assert_eq!(t.insert_unique(9), Inserted::At(1));
        assert_eq!(t.insert_unique(7), Inserted::AlreadyPresent(0));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn locate_prefers_latest_occurrence() {
        let t: PointerTable<u32> = [1, 2, 1, 3].into_iter().collect();
        assert_eq!(t.locate(1), Some(2));
        assert_eq!(t.locate(4), None);
    }

    #[test]
    fn remove_drops_every_occurrence_and_keeps_order() {
        let mut t: PointerTable<u32> = [1, 2, 1, 3, 1, 4].into_iter().collect();
        assert_eq!(t.remove(1), 3);
        assert_eq!(t.as_slice(), &[2, 3, 4]);
        assert!(!t.contains(1));
        assert_eq!(t.remove(1), 0);
    }

    #[test]
    fn concat_appends_in_order() {
        let mut a: PointerTable<u32> = [1, 2].into_iter().collect();
        let b: PointerTable<u32> = [3, 1].into_iter().collect();
        a.concat(&b);
        assert_eq!(a.as_slice(), &[1, 2, 3, 1]);
    }

    #[test]
    fn reset_empties_but_keeps_storage() {
        let mut t: PointerTable<u32> = (0..100).collect();
        let cap = t.capacity();
        t.reset();
        assert!(t.is_empty());
        assert_eq!(t.locate(5), None);
        assert_eq!(t.capacity(), cap);
        t.free();
        assert_eq!(t.capacity(), 0);
    }

    #[test]
    fn pop_removes_all_copies_of_last() {
        let mut t: PointerTable<u32> = [5, 6, 5].into_iter().collect();
        assert_eq!(t.pop(), Some(5));
        assert_eq!(t.as_slice(), &[6]);
        assert_eq!(t.pop(), Some(6));
        assert_eq!(t.pop(), None);
    }

    #[test]
    fn mixed_operation_sequence_keeps_invariants() {
        // Deterministic pseudo-random sequence of inserts and removes.
        let mut t = PointerTable::new();
        let mut reference: Vec<u32> = Vec::new();
        let mut seed = 0x2545_f491_u32;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let value = seed % 17;
            match seed % 3 {
                0 => {
                    t.insert(value);
                    reference.push(value);
                }
                1 => {
                    let before = t.len();
                    let was_present = t.contains(value);
                    t.insert_unique(value);
                    if was_present {
                        assert_eq!(t.len(), before);
                    } else {
                        reference.push(value);
                    }
                }
                _ => {
                    t.remove(value);
                    reference.retain(|&x| x != value);
                    assert!(!t.contains(value));
                }
            }
            assert_eq!(t.as_slice(), reference.as_slice());
        }
    }
}
