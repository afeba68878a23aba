//! Level-synchronised breadth-first traversal over a growing graph.
//!
//! [`LevelIterator`] keeps two queues: the level currently drained and the
//! next one. Entries can be added to either level while iterating, and an
//! entry whose level was raised can be moved from the current to the next
//! level so that it is processed only after everything on lower levels.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct LevelIterator<K, V> {
    current_level: VecDeque<(K, V)>,
    next_level: VecDeque<(K, V)>,
}

impl<K: PartialEq, V> LevelIterator<K, V> {
    pub fn new(root: (K, V)) -> Self {
        Self {
            current_level: VecDeque::from([root]),
            next_level: VecDeque::new(),
        }
    }

    pub fn has_next(&self) -> bool {
        !self.current_level.is_empty() || !self.next_level.is_empty()
    }

    /// Adds (or replaces) an entry on the level currently drained.
    pub fn add_to_current_level(&mut self, entry: (K, V)) {
        upsert(&mut self.current_level, entry);
    }

    /// Adds (or replaces) an entry on the next level.
    pub fn add_to_next_level(&mut self, entry: (K, V)) {
        upsert(&mut self.next_level, entry);
    }

    /// Removes the entry with the same key from the current level (if still
    /// pending there) and (re-)adds it to the next level.
    pub fn remove_if_on_same_level_and_re_add_on_next(&mut self, entry: (K, V)) {
        self.current_level.retain(|(key, _)| *key != entry.0);
        upsert(&mut self.next_level, entry);
    }
}

impl<K: PartialEq, V> Iterator for LevelIterator<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_level.is_empty() {
            std::mem::swap(&mut self.current_level, &mut self.next_level);
        }
        self.current_level.pop_front()
    }
}

fn upsert<K: PartialEq, V>(queue: &mut VecDeque<(K, V)>, entry: (K, V)) {
    match queue.iter_mut().find(|(key, _)| *key == entry.0) {
        Some(existing) => existing.1 = entry.1,
        None => queue.push_back(entry),
    }
}
