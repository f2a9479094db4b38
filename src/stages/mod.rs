//! Placement stages
//!
//! A stage is a policy layer: it picks features, reduces them to candidates
//! and hands them to the executor. Everything a stage touches comes in
//! through [`StageContext`].

pub mod marker;
pub mod road;
pub mod surface;

pub use marker::MarkerStage;
pub use road::RoadStage;
pub use surface::SurfaceStage;

use crate::classify::PointCategory;
use crate::error::StageError;
use crate::placement::PlacementSummary;
use crate::progress::ProgressSink;
use crate::projection::{ProjectionFrame, Region};
use crate::source::FeatureOrigin;
use crate::terrain::TerrainHeightResolver;
use crate::world::WorldSink;
use tracing::warn;

pub struct StageContext<'a> {
    pub frame: &'a ProjectionFrame,
    pub region: Region,
    pub origin: &'a FeatureOrigin,
    pub resolver: &'a TerrainHeightResolver,
    pub world: &'a mut dyn WorldSink,
    pub progress: &'a mut dyn ProgressSink,
    pub progress_steps: usize,
}

pub trait PlacementStage {
    fn name(&self) -> &str;

    /// True when the stage changes the ground surface itself, so whatever
    /// stands on it may need to move afterwards.
    fn reshapes_terrain(&self) -> bool {
        false
    }

    fn run(&mut self, ctx: &mut StageContext<'_>) -> Result<PlacementSummary, StageError>;
}

/// Builds stages by name in the given order. Unknown names are skipped.
pub fn build_stages(names: &[String], surface_material: &str) -> Vec<Box<dyn PlacementStage>> {
    let mut stages: Vec<Box<dyn PlacementStage>> = Vec::new();
    for name in names {
        match name.as_str() {
            "surface" => stages.push(Box::new(SurfaceStage::new(surface_material))),
            "roads" => stages.push(Box::new(RoadStage::new())),
            other => match PointCategory::from_stage_name(other) {
                Some(category) => stages.push(Box::new(MarkerStage::new(category))),
                None => warn!("Unknown stage '{}' ignored", other),
            },
        }
    }
    stages
}
