use crate::data::{BlockCoordinate, EntityKey};
use crate::dedup::DeduplicationIndex;
use crate::error::PlacementError;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::projection::Region;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

pub const DEFAULT_PROGRESS_STEPS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct PlacementCandidate<M> {
    pub coord: BlockCoordinate,
    pub entity: Option<EntityKey>,
    pub meta: M,
}

impl<M> PlacementCandidate<M> {
    pub fn new(coord: BlockCoordinate, entity: Option<EntityKey>, meta: M) -> Self {
        Self {
            coord,
            entity,
            meta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupPolicy {
    pub by_entity: bool,
    pub by_cell: bool,
}

impl DedupPolicy {
    pub const ENTITY_AND_CELL: DedupPolicy = DedupPolicy {
        by_entity: true,
        by_cell: true,
    };
    pub const CELL_ONLY: DedupPolicy = DedupPolicy {
        by_entity: false,
        by_cell: true,
    };
    pub const NONE: DedupPolicy = DedupPolicy {
        by_entity: false,
        by_cell: false,
    };
}

/// Per-stage counters. Every candidate lands in exactly one bucket, so
/// `placed + skipped() == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlacementSummary {
    /// Candidates handed to the executor
    pub total: usize,
    /// Callbacks that returned Ok
    pub placed: usize,
    /// Outside the frame region
    pub skipped_out_of_bounds: usize,
    /// Entity or cell already taken
    pub skipped_duplicate: usize,
    /// Callback failed or panicked
    pub skipped_error: usize,
    /// No ground height for the cell
    pub skipped_no_height: usize,
}

impl PlacementSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_out_of_bounds + self.skipped_duplicate + self.skipped_error + self.skipped_no_height
    }
}

/// Applies candidates one by one. A failing candidate is counted and never
/// stops the batch.
pub struct PlacementExecutor<'a> {
    stage: &'a str,
    region: Region,
    policy: DedupPolicy,
    progress_steps: usize,
}

impl<'a> PlacementExecutor<'a> {
    pub fn new(stage: &'a str, region: Region, policy: DedupPolicy) -> Self {
        Self {
            stage,
            region,
            policy,
            progress_steps: DEFAULT_PROGRESS_STEPS,
        }
    }

    pub fn with_progress_steps(mut self, steps: usize) -> Self {
        self.progress_steps = steps.max(1);
        self
    }

    pub fn execute<M, F>(
        &self,
        candidates: &[PlacementCandidate<M>],
        dedup: &mut DeduplicationIndex,
        progress: &mut dyn ProgressSink,
        mut place: F,
    ) -> PlacementSummary
    where
        F: FnMut(&PlacementCandidate<M>) -> Result<(), PlacementError>,
    {
        let total = candidates.len();
        let step = (total / self.progress_steps).max(1);
        let mut summary = PlacementSummary {
            total,
            ..Default::default()
        };

        for (i, candidate) in candidates.iter().enumerate() {
            self.apply(candidate, dedup, &mut place, &mut summary);

            let done = i + 1;
            if done % step == 0 || done == total {
                progress.emit(ProgressEvent::Milestone {
                    stage: self.stage.to_string(),
                    done,
                    total,
                    percent: (done * 100 / total) as u8,
                });
            }
        }
        summary
    }

    fn apply<M, F>(
        &self,
        candidate: &PlacementCandidate<M>,
        dedup: &mut DeduplicationIndex,
        place: &mut F,
        summary: &mut PlacementSummary,
    ) where
        F: FnMut(&PlacementCandidate<M>) -> Result<(), PlacementError>,
    {
        let coord = candidate.coord;
        if !self.region.contains(coord) {
            summary.skipped_out_of_bounds += 1;
            return;
        }
        let entity = candidate.entity.filter(|_| self.policy.by_entity);
        if entity.is_some_and(|e| dedup.contains_entity(&e)) {
            summary.skipped_duplicate += 1;
            return;
        }
        if self.policy.by_cell && dedup.contains_cell(&coord) {
            summary.skipped_duplicate += 1;
            return;
        }
        if let Some(e) = entity {
            dedup.add_entity(e);
        }
        if self.policy.by_cell {
            dedup.add_cell(coord);
        }

        match panic::catch_unwind(AssertUnwindSafe(|| place(candidate))) {
            Ok(Ok(())) => summary.placed += 1,
            Ok(Err(PlacementError::HeightUnknown { x, z })) => {
                debug!("{}: no ground height at ({}, {})", self.stage, x, z);
                summary.skipped_no_height += 1;
            }
            Ok(Err(e)) => {
                warn!("{}: placement at ({}, {}) failed: {}", self.stage, coord.x, coord.z, e);
                summary.skipped_error += 1;
            }
            Err(payload) => {
                warn!(
                    "{}: placement at ({}, {}) panicked: {}",
                    self.stage,
                    coord.x,
                    coord.z,
                    panic_message(payload.as_ref())
                );
                summary.skipped_error += 1;
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
