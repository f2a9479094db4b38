use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerticalRange {
    pub min_y: i32,
    pub max_y: i32,
}

impl VerticalRange {
    pub fn contains(&self, y: i32) -> bool {
        y >= self.min_y && y <= self.max_y
    }

    pub fn clamp(&self, y: i32) -> i32 {
        y.clamp(self.min_y, self.max_y)
    }
}

impl Default for VerticalRange {
    fn default() -> Self {
        Self {
            min_y: -64,
            max_y: 319,
        }
    }
}

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("y={y} outside vertical range {min_y}..={max_y}")]
    OutOfRange { y: i32, min_y: i32, max_y: i32 },
    #[error("save failed: {0}")]
    Save(String),
}

/// The host world the placement stages write into.
///
/// Implementations are used from a single thread; stages never hold a
/// reference across runs.
pub trait WorldSink {
    fn write_block(&mut self, x: i32, y: i32, z: i32, material: &str) -> Result<(), WorldError>;

    fn is_empty(&self, x: i32, y: i32, z: i32) -> bool;

    /// Highest non-empty cell of the column, if any.
    fn top_non_empty_y(&self, x: i32, z: i32) -> Option<i32>;

    fn vertical_range(&self) -> VerticalRange;

    fn save(&mut self) -> Result<(), WorldError> {
        Ok(())
    }
}

/// In-memory world keyed by column, used by the CLI and by tests.
#[derive(Debug, Default)]
pub struct MemoryWorld {
    range: VerticalRange,
    columns: HashMap<(i32, i32), BTreeMap<i32, String>>,
    writes: usize,
    saves: usize,
}

impl MemoryWorld {
    pub fn new(range: VerticalRange) -> Self {
        Self {
            range,
            ..Default::default()
        }
    }

    pub fn block(&self, x: i32, y: i32, z: i32) -> Option<&str> {
        self.columns
            .get(&(x, z))
            .and_then(|col| col.get(&y))
            .map(|m| m.as_str())
    }

    /// Fills a column from the bottom of the range up to `top` inclusive.
    pub fn fill_column(&mut self, x: i32, z: i32, top: i32, material: &str) -> Result<(), WorldError> {
        for y in self.range.min_y..=top {
            self.write_block(x, y, z, material)?;
        }
        Ok(())
    }

    pub fn clear_column(&mut self, x: i32, z: i32) {
        self.columns.remove(&(x, z));
    }

    pub fn block_count(&self) -> usize {
        self.columns.values().map(|c| c.len()).sum()
    }

    /// Total successful `write_block` calls, overwrites included.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }

    /// Every block of the given material, sorted.
    pub fn blocks_of(&self, material: &str) -> Vec<(i32, i32, i32)> {
        let mut out: Vec<_> = self
            .columns
            .iter()
            .flat_map(|(&(x, z), col)| {
                col.iter()
                    .filter(|(_, m)| m.as_str() == material)
                    .map(move |(&y, _)| (x, y, z))
            })
            .collect();
        out.sort_unstable();
        out
    }
}

impl WorldSink for MemoryWorld {
    fn write_block(&mut self, x: i32, y: i32, z: i32, material: &str) -> Result<(), WorldError> {
        if !self.range.contains(y) {
            return Err(WorldError::OutOfRange {
                y,
                min_y: self.range.min_y,
                max_y: self.range.max_y,
            });
        }
        self.columns
            .entry((x, z))
            .or_default()
            .insert(y, material.to_string());
        self.writes += 1;
        Ok(())
    }

    fn is_empty(&self, x: i32, y: i32, z: i32) -> bool {
        self.block(x, y, z).is_none()
    }

    fn top_non_empty_y(&self, x: i32, z: i32) -> Option<i32> {
        self.columns
            .get(&(x, z))
            .and_then(|col| col.keys().next_back().copied())
    }

    fn vertical_range(&self) -> VerticalRange {
        self.range
    }

    fn save(&mut self) -> Result<(), WorldError> {
        self.saves += 1;
        Ok(())
    }
}
