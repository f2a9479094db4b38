use super::{PlacementStage, StageContext};
use crate::classify::PointCategory;
use crate::dedup::DeduplicationIndex;
use crate::error::{PlacementError, StageError};
use crate::geometry::GeometryReducer;
use crate::placement::{DedupPolicy, PlacementCandidate, PlacementExecutor, PlacementSummary};
use crate::source::collect_features;
use tracing::info;

/// Stacks a pillar of the category's material on the ground at each matching
/// feature's representative point.
pub struct MarkerStage {
    category: PointCategory,
}

impl MarkerStage {
    pub fn new(category: PointCategory) -> Self {
        Self { category }
    }

    pub fn category(&self) -> PointCategory {
        self.category
    }
}

impl PlacementStage for MarkerStage {
    fn name(&self) -> &str {
        self.category.stage_name()
    }

    fn run(&mut self, ctx: &mut StageContext<'_>) -> Result<PlacementSummary, StageError> {
        let category = self.category;
        let reducer = GeometryReducer::new(ctx.frame);
        let collected = collect_features(ctx.origin.open()?, |f| {
            if !category.matches(&f.tags) {
                return None;
            }
            let coord = reducer.point(&f)?;
            Some(PlacementCandidate::new(
                coord,
                f.entity_key(),
                category.pillar_height(&f.tags),
            ))
        });
        info!(
            "{}: {} candidates from {} features",
            self.name(),
            collected.items.len(),
            collected.read
        );

        let executor = PlacementExecutor::new(self.name(), ctx.region, DedupPolicy::ENTITY_AND_CELL)
            .with_progress_steps(ctx.progress_steps);
        let resolver = ctx.resolver;
        let world = &mut *ctx.world;
        let material = category.material();
        Ok(executor.execute(
            &collected.items,
            &mut DeduplicationIndex::new(),
            &mut *ctx.progress,
            |c| {
                let (x, z) = (c.coord.x, c.coord.z);
                let ground = resolver
                    .ground_height(x, z, &*world)
                    .ok_or(PlacementError::HeightUnknown { x, z })?;
                for dy in 1..=c.meta {
                    world.write_block(x, ground.y + dy, z, material)?;
                }
                Ok(())
            },
        ))
    }
}
