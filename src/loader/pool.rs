//! Insertion-ordered entity registry

use std::collections::HashMap;

use crate::error::ConfigError;
use crate::model::{Entity, EntityKind};

/// Registry of entities of one kind, keyed by identifier
///
/// Iteration follows insertion order, which is document declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPool<E> {
    kind: EntityKind,
    entries: Vec<E>,
    index: HashMap<String, usize>,
}

impl<E: Entity> EntityPool<E> {
    /// Create an empty pool for entities of `kind`
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register an entity; its identifier must not be taken yet
    pub fn insert(&mut self, entity: E) -> Result<(), ConfigError> {
        if self.index.contains_key(entity.id()) {
            return Err(ConfigError::duplicate(self.kind, entity.id()));
        }
        self.index.insert(entity.id().to_string(), self.entries.len());
        self.entries.push(entity);
        Ok(())
    }

    /// Register an entity, replacing any previous one with the same identifier in place
    pub fn upsert(&mut self, entity: E) {
        match self.index.get(entity.id()) {
            Some(&position) => self.entries[position] = entity,
            None => {
                self.index.insert(entity.id().to_string(), self.entries.len());
                self.entries.push(entity);
            }
        }
    }

    /// Get an entity by identifier
    pub fn get(&self, id: &str) -> Option<&E> {
        self.index.get(id).map(|&position| &self.entries[position])
    }

    /// Check if an identifier is taken
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// The kind of entity stored
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entities in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entries.iter()
    }

    /// Identifiers in insertion order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id())
    }
}
