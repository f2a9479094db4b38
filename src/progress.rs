use crate::orchestrator::RunState;
use crate::placement::PlacementSummary;
use crate::source::SourceMode;
use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProgressEvent {
    RunState {
        run_id: Uuid,
        state: RunState,
    },
    StageStarted {
        stage: String,
        index: usize,
        count: usize,
    },
    Milestone {
        stage: String,
        done: usize,
        total: usize,
        percent: u8,
    },
    StageFinished {
        stage: String,
        summary: PlacementSummary,
    },
    StageFailed {
        stage: String,
        error: String,
    },
    /// The feature origin of a run was released. Sent once per run that got
    /// past loading its input.
    SourceClosed {
        run_id: Uuid,
        mode: SourceMode,
    },
}

/// Receiver of progress events. Broadcasting to players or a UI is up to the
/// host; the core only emits.
pub trait ProgressSink {
    fn emit(&mut self, event: ProgressEvent);
}

impl ProgressSink for Vec<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

/// Renders events as log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn emit(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::RunState { run_id, state } => {
                info!("Run {} -> {:?}", run_id, state);
            }
            ProgressEvent::StageStarted { stage, index, count } => {
                info!("Stage {}/{}: {}", index, count, stage);
            }
            ProgressEvent::Milestone {
                stage,
                done,
                total,
                percent,
            } => {
                info!("{}: {}% ({}/{})", stage, percent, done, total);
            }
            ProgressEvent::StageFinished { stage, summary } => {
                info!(
                    "{} done: placed {} of {} (out of bounds {}, duplicate {}, no height {}, errors {})",
                    stage,
                    summary.placed,
                    summary.total,
                    summary.skipped_out_of_bounds,
                    summary.skipped_duplicate,
                    summary.skipped_no_height,
                    summary.skipped_error
                );
            }
            ProgressEvent::StageFailed { stage, error: err } => {
                error!("{} failed: {}", stage, err);
            }
            ProgressEvent::SourceClosed { run_id, mode } => {
                debug!("Run {}: {:?} feature source closed", run_id, mode);
            }
        }
    }
}
