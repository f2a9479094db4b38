use super::{PlacementStage, StageContext};
use crate::data::BlockCoordinate;
use crate::dedup::DeduplicationIndex;
use crate::error::StageError;
use crate::placement::{DedupPolicy, PlacementCandidate, PlacementExecutor, PlacementSummary};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Stamps the surface material on every region cell that has a known grid
/// height. Only raster tiers are consulted; the live world is what this
/// stage builds.
pub struct SurfaceStage {
    material: String,
}

impl SurfaceStage {
    pub fn new(material: &str) -> Self {
        Self {
            material: material.to_string(),
        }
    }
}

impl PlacementStage for SurfaceStage {
    fn name(&self) -> &str {
        "surface"
    }

    fn reshapes_terrain(&self) -> bool {
        true
    }

    fn run(&mut self, ctx: &mut StageContext<'_>) -> Result<PlacementSummary, StageError> {
        if !ctx.resolver.has_grid() {
            warn!("No terrain raster available, surface left untouched");
            return Ok(PlacementSummary::default());
        }

        // Walk the rasters rather than the region, which may be far larger.
        let cells: BTreeSet<(i32, i32)> = ctx
            .resolver
            .grids()
            .flat_map(|g| g.known_coords())
            .map(|(x, z)| (z, x))
            .filter(|&(z, x)| ctx.region.contains(BlockCoordinate::new(x, z)))
            .collect();
        let candidates: Vec<PlacementCandidate<i32>> = cells
            .into_iter()
            .filter_map(|(z, x)| {
                ctx.resolver
                    .grid_height(x, z)
                    .map(|h| PlacementCandidate::new(BlockCoordinate::new(x, z), None, h.y))
            })
            .collect();
        info!(
            "Surface: {} of {} cells have ground data",
            candidates.len(),
            ctx.region.area()
        );

        let executor = PlacementExecutor::new(self.name(), ctx.region, DedupPolicy::CELL_ONLY)
            .with_progress_steps(ctx.progress_steps);
        let world = &mut *ctx.world;
        let material = self.material.as_str();
        Ok(executor.execute(
            &candidates,
            &mut DeduplicationIndex::new(),
            &mut *ctx.progress,
            |c| {
                world.write_block(c.coord.x, c.meta, c.coord.z, material)?;
                Ok(())
            },
        ))
    }
}
