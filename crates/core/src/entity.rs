//! Entity trait (identity + continuity across state changes) and an indexed
//! entity table for aggregates that own a collection of entities.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Arena of entities with an id index.
///
/// Entries keep their insertion position, so iteration order is stable.
/// Replacing an entry swaps that one slot and leaves the rest untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTable<T: Entity> {
    entries: Vec<T>,
    index: HashMap<T::Id, usize>,
}

impl<T: Entity> Default for EntityTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Entity> EntityTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entity. Returns the entity back if its id is already present.
    pub fn insert(&mut self, entity: T) -> Result<(), T> {
        let id = *entity.id();
        if self.index.contains_key(&id) {
            return Err(entity);
        }
        self.index.insert(id, self.entries.len());
        self.entries.push(entity);
        Ok(())
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.index.contains_key(id)
    }

    /// Swap the entry with the same id for `entity`, returning the previous value.
    pub fn replace(&mut self, entity: T) -> Option<T> {
        let pos = *self.index.get(entity.id())?;
        Some(core::mem::replace(&mut self.entries[pos], entity))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Entity + Serialize> Serialize for EntityTable<T> {
    /// Serialized as a plain list in table order.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}

impl<T: Entity> FromIterator<T> for EntityTable<T> {
    /// Later duplicates are dropped.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut table = Self::new();
        for entity in iter {
            let _ = table.insert(entity);
        }
        table
    }
}
