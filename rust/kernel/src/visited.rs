// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generation-stamped visited sets keyed by arena keys.
//!
//! A traversal marks elements by stamping them with the set's current
//! generation. Clearing the set bumps the generation, so every previous stamp
//! becomes stale in O(1) without touching the storage.

use slotmap::{Key, SecondaryMap};

/// Set of visited arena keys with O(1) `clear`.
#[derive(Debug, Clone)]
pub struct VisitedSet<K: Key> {
    stamps: SecondaryMap<K, u32>,
    generation: u32,
}

impl<K: Key> VisitedSet<K> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            stamps: SecondaryMap::new(),
            generation: 1,
        }
    }

    /// Marks `key`. Returns `true` if it was not already marked.
    pub fn insert(&mut self, key: K) -> bool {
        let generation = self.generation;
        match self.stamps.insert(key, generation) {
            Some(previous) => previous != generation,
            None => true,
        }
    }

    /// Returns `true` if `key` is marked in the current generation.
    pub fn contains(&self, key: K) -> bool {
        self.stamps.get(key) == Some(&self.generation)
    }

    /// Unmarks every key.
    pub fn clear(&mut self) {
        if self.generation == u32::MAX {
            self.stamps.clear();
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }
}

impl<K: Key> Default for VisitedSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::FaceKey;
    use slotmap::SlotMap;

    #[test]
    fn insert_reports_first_visit_only() {
        let mut map: SlotMap<FaceKey, ()> = SlotMap::with_key();
        let a = map.insert(());
        let mut set = VisitedSet::new();
        assert!(!set.contains(a));
        assert!(set.insert(a));
        assert!(!set.insert(a));
        assert!(set.contains(a));
    }

    #[test]
    fn clear_forgets_marks() {
        let mut map: SlotMap<FaceKey, ()> = SlotMap::with_key();
        let a = map.insert(());
        let b = map.insert(());
        let mut set = VisitedSet::new();
        set.insert(a);
        set.clear();
        assert!(!set.contains(a));
        assert!(set.insert(b));
        assert!(set.insert(a));
    }
}
