use super::grid::TerrainGrid;
use crate::world::WorldSink;
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_HINT_WINDOW: i32 = 16;

/// Which tier produced a height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HeightSource {
    PrecomputedGrid,
    EmbeddedGrid,
    HintWindow,
    FullScan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeightSample {
    pub y: i32,
    pub source: HeightSource,
}

impl HeightSample {
    fn new(y: i32, source: HeightSource) -> Self {
        Self { y, source }
    }
}

/// Resolves ground height with tiered fallback:
/// 1. precomputed raster from the sidecar store
/// 2. raster embedded in the input payload
/// 3. the live world
#[derive(Debug, Clone)]
pub struct TerrainHeightResolver {
    precomputed: Option<Arc<TerrainGrid>>,
    embedded: Option<Arc<TerrainGrid>>,
    hint_window: i32,
}

impl Default for TerrainHeightResolver {
    fn default() -> Self {
        Self::new(DEFAULT_HINT_WINDOW)
    }
}

impl TerrainHeightResolver {
    pub fn new(hint_window: i32) -> Self {
        Self {
            precomputed: None,
            embedded: None,
            hint_window: hint_window.max(0),
        }
    }

    pub fn with_precomputed(mut self, grid: Option<Arc<TerrainGrid>>) -> Self {
        self.precomputed = grid;
        self
    }

    pub fn with_embedded(mut self, grid: Option<Arc<TerrainGrid>>) -> Self {
        self.embedded = grid;
        self
    }

    pub fn hint_window(&self) -> i32 {
        self.hint_window
    }

    pub fn has_grid(&self) -> bool {
        self.precomputed.is_some() || self.embedded.is_some()
    }

    /// Rasters in tier order.
    pub fn grids(&self) -> impl Iterator<Item = &TerrainGrid> + '_ {
        self.precomputed.iter().chain(self.embedded.iter()).map(|g| g.as_ref())
    }

    /// Tiers 1 and 2 only.
    pub fn grid_height(&self, x: i32, z: i32) -> Option<HeightSample> {
        if let Some(y) = self.precomputed.as_ref().and_then(|g| g.ground_y(x, z)) {
            return Some(HeightSample::new(y, HeightSource::PrecomputedGrid));
        }
        self.embedded
            .as_ref()
            .and_then(|g| g.ground_y(x, z))
            .map(|y| HeightSample::new(y, HeightSource::EmbeddedGrid))
    }

    pub fn ground_height(&self, x: i32, z: i32, world: &dyn WorldSink) -> Option<HeightSample> {
        self.grid_height(x, z).or_else(|| full_scan(x, z, world))
    }

    /// Like [`ground_height`](Self::ground_height), but the world tier first
    /// looks for a surface cell near `hint` before scanning the whole column.
    pub fn ground_height_hinted(
        &self,
        x: i32,
        z: i32,
        hint: Option<i32>,
        world: &dyn WorldSink,
    ) -> Option<HeightSample> {
        if let Some(sample) = self.grid_height(x, z) {
            return Some(sample);
        }
        if let Some(hint) = hint {
            if let Some(y) = self.scan_window(x, z, hint, world) {
                return Some(HeightSample::new(y, HeightSource::HintWindow));
            }
        }
        full_scan(x, z, world)
    }

    fn scan_window(&self, x: i32, z: i32, hint: i32, world: &dyn WorldSink) -> Option<i32> {
        let range = world.vertical_range();
        let lo = range.clamp(hint.saturating_sub(self.hint_window));
        let hi = range.clamp(hint.saturating_add(self.hint_window));
        (lo..=hi)
            .rev()
            .find(|&y| !world.is_empty(x, y, z) && (y == range.max_y || world.is_empty(x, y + 1, z)))
    }
}

fn full_scan(x: i32, z: i32, world: &dyn WorldSink) -> Option<HeightSample> {
    world
        .top_non_empty_y(x, z)
        .map(|y| HeightSample::new(y, HeightSource::FullScan))
}
