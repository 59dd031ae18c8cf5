//! Id-indexed, arrival-ordered collection shared by all domain stores.
//!
//! Entries are kept oldest-first in an `IndexMap`, so appending the newest
//! arrival is O(1), lookups by id are O(1), and `shift_remove` keeps the
//! relative order of everything else. Public iteration is newest-first.

use indexmap::IndexMap;

/// Entities with a stable identifier.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Result of adding an entity to a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ingest {
    /// The id was new; the entity is now the most recent entry.
    Inserted,
    /// The id already existed; the existing entry was updated.
    Replaced,
}

#[derive(Clone, Debug)]
pub struct OrderedStore<V> {
    entries: IndexMap<String, V>,
}

impl<V> Default for OrderedStore<V> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<V: Keyed> OrderedStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert as the newest entry, or merge into the existing entry in place.
    ///
    /// On replacement the entry keeps its position; `merge` decides which of
    /// the existing fields survive.
    pub fn upsert_in_place(&mut self, value: V, merge: impl FnOnce(&mut V, V)) -> Ingest {
        match self.entries.get_mut(value.key()) {
            Some(existing) => {
                merge(existing, value);
                Ingest::Replaced
            }
            None => {
                self.entries.insert(value.key().to_owned(), value);
                Ingest::Inserted
            }
        }
    }

    /// Insert as the newest entry, dropping any previous entry with the same
    /// id from its old position.
    pub fn upsert_newest(&mut self, value: V) -> Ingest {
        let outcome = match self.entries.shift_remove(value.key()) {
            Some(_) => Ingest::Replaced,
            None => Ingest::Inserted,
        };
        self.entries.insert(value.key().to_owned(), value);
        outcome
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove an entry without disturbing the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.shift_remove(key)
    }

    /// Keep only the `retain` most recent entries. Returns how many were dropped.
    pub fn retain_newest(&mut self, retain: usize) -> usize {
        let excess = self.entries.len().saturating_sub(retain);
        if excess > 0 {
            self.entries.drain(..excess);
        }
        excess
    }

    pub fn iter_newest_first(&self) -> impl Iterator<Item = &V> {
        self.entries.values().rev()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.values_mut()
    }

    pub fn to_vec_newest_first(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.iter_newest_first().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
