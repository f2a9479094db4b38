use crate::data::{BlockCoordinate, EntityKey};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Entity(EntityKey),
    Cell(BlockCoordinate),
}

/// Keys already placed during one stage run. Entity and cell keys are tracked
/// independently.
#[derive(Debug, Default)]
pub struct DeduplicationIndex {
    entities: HashSet<EntityKey>,
    cells: HashSet<BlockCoordinate>,
}

impl DeduplicationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the key was not seen before.
    pub fn add_entity(&mut self, key: EntityKey) -> bool {
        self.entities.insert(key)
    }

    pub fn add_cell(&mut self, cell: BlockCoordinate) -> bool {
        self.cells.insert(cell)
    }

    pub fn add(&mut self, key: &DedupKey) -> bool {
        match *key {
            DedupKey::Entity(e) => self.add_entity(e),
            DedupKey::Cell(c) => self.add_cell(c),
        }
    }

    pub fn contains_entity(&self, key: &EntityKey) -> bool {
        self.entities.contains(key)
    }

    pub fn contains_cell(&self, cell: &BlockCoordinate) -> bool {
        self.cells.contains(cell)
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        match key {
            DedupKey::Entity(e) => self.contains_entity(e),
            DedupKey::Cell(c) => self.contains_cell(c),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len() + self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.cells.is_empty()
    }
}
