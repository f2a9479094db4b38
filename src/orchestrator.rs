use crate::error::StageError;
use crate::payload::{InputPayload, PayloadLoader};
use crate::placement::{panic_message, PlacementSummary, DEFAULT_PROGRESS_STEPS};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::projection::{ProjectionFrame, Region};
use crate::source::{FeatureOrigin, SourceMode};
use crate::stages::{PlacementStage, StageContext};
use crate::store::GenerationStore;
use crate::terrain::{TerrainHeightResolver, DEFAULT_HINT_WINDOW};
use crate::world::WorldSink;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    Preparing,
    /// 1-based index of the running stage.
    RunningStage(usize),
    Saving,
    Done,
    Failed,
}

/// Outcome of one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    /// Configured stage name
    pub name: String,
    /// Counters of a finished stage; `None` when it failed
    pub summary: Option<PlacementSummary>,
    /// Why the stage aborted the run
    pub error: Option<String>,
}

/// Outcome of one run, in stage order. Stages after a failure are absent.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Final state, `Done` or `Failed`
    pub state: RunState,
    pub stages: Vec<StageReport>,
    /// How features were read during this run
    pub store_mode: SourceMode,
    /// First failure that ended the run
    pub error: Option<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Done
    }

    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }
}

/// Notified after a stage reshaped the terrain, e.g. to move players standing
/// on it. Fire-and-forget: nothing flows back into the run.
pub trait SurfaceHook {
    fn terrain_ready(&mut self, frame: &ProjectionFrame, region: Region);
}

#[derive(Debug, Default)]
pub struct NoSurfaceHook;

impl SurfaceHook for NoSurfaceHook {
    fn terrain_ready(&mut self, _frame: &ProjectionFrame, _region: Region) {}
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub store_dir: Option<PathBuf>,
    pub prepare_store: bool,
    pub hint_window: i32,
    pub progress_steps: usize,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            store_dir: None,
            prepare_store: true,
            hint_window: DEFAULT_HINT_WINDOW,
            progress_steps: DEFAULT_PROGRESS_STEPS,
        }
    }
}

/// Runs the configured stages in order over one shared frame.
pub struct GenerationOrchestrator {
    options: OrchestratorOptions,
    stages: Vec<Box<dyn PlacementStage>>,
    hook: Box<dyn SurfaceHook>,
    state: RunState,
}

fn set_state(state: &mut RunState, run_id: Uuid, next: RunState, progress: &mut dyn ProgressSink) {
    *state = next;
    progress.emit(ProgressEvent::RunState { run_id, state: next });
}

impl GenerationOrchestrator {
    pub fn new(options: OrchestratorOptions, stages: Vec<Box<dyn PlacementStage>>) -> Self {
        Self {
            options,
            stages,
            hook: Box::new(NoSurfaceHook),
            state: RunState::Idle,
        }
    }

    pub fn with_surface_hook(mut self, hook: Box<dyn SurfaceHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Loads the payload at `input` and runs every stage. The sidecar store,
    /// when configured, is prepared from the same file.
    pub fn run_file(
        &mut self,
        input: &Path,
        world: &mut dyn WorldSink,
        progress: &mut dyn ProgressSink,
    ) -> RunReport {
        let run_id = Uuid::new_v4();
        set_state(&mut self.state, run_id, RunState::Preparing, progress);
        match PayloadLoader::load_from_file(input) {
            Ok(payload) => self.execute(run_id, payload, Some(input), world, progress),
            Err(e) => self.fail_early(run_id, format!("cannot load {}: {}", input.display(), e), progress),
        }
    }

    /// Runs every stage over an already loaded payload. A configured store is
    /// opened but never rebuilt, since there is no file to split. Frame fields
    /// the payload lacks are taken from the store index.
    pub fn run_payload(
        &mut self,
        payload: InputPayload,
        world: &mut dyn WorldSink,
        progress: &mut dyn ProgressSink,
    ) -> RunReport {
        let run_id = Uuid::new_v4();
        set_state(&mut self.state, run_id, RunState::Preparing, progress);
        self.execute(run_id, payload, None, world, progress)
    }

    fn fail_early(&mut self, run_id: Uuid, message: String, progress: &mut dyn ProgressSink) -> RunReport {
        error!("Run {} failed while preparing: {}", run_id, message);
        set_state(&mut self.state, run_id, RunState::Failed, progress);
        RunReport {
            run_id,
            state: RunState::Failed,
            stages: Vec::new(),
            store_mode: SourceMode::Batch,
            error: Some(message),
        }
    }

    fn open_store(&self, coords: Option<&Path>) -> Option<GenerationStore> {
        let dir = self.options.store_dir.as_deref()?;
        let opened = match coords {
            Some(coords) if self.options.prepare_store => GenerationStore::prepare(dir, coords),
            _ => GenerationStore::open(dir),
        };
        match opened {
            Ok(store) => Some(store),
            Err(e) => {
                warn!("Sidecar store unavailable ({}), reading embedded features", e);
                None
            }
        }
    }

    fn execute(
        &mut self,
        run_id: Uuid,
        mut payload: InputPayload,
        coords: Option<&Path>,
        world: &mut dyn WorldSink,
        progress: &mut dyn ProgressSink,
    ) -> RunReport {
        let store = self.open_store(coords);
        if let Some(store) = &store {
            store.index().fill_missing(&mut payload);
        }
        let embedded_grid = payload.terrain_grid.as_ref().and_then(|t| match t.to_grid() {
            Ok(grid) => Some(Arc::new(grid)),
            Err(e) => {
                warn!("Ignoring embedded terrain grid: {}", e);
                None
            }
        });
        let precomputed = store.as_ref().and_then(|s| s.ground_grid());
        let resolver = TerrainHeightResolver::new(self.options.hint_window)
            .with_precomputed(precomputed)
            .with_embedded(embedded_grid);
        let origin = match store {
            Some(store) => FeatureOrigin::Store(store),
            None => FeatureOrigin::Embedded(payload.take_elements()),
        };
        let store_mode = origin.mode();

        let (reports, mut failure) = match ProjectionFrame::from_payload(&payload) {
            Ok(frame) => self.run_stages(run_id, &frame, &origin, &resolver, world, progress),
            Err(e) => (Vec::new(), Some(e.to_string())),
        };

        if failure.is_none() {
            set_state(&mut self.state, run_id, RunState::Saving, progress);
            failure = match panic::catch_unwind(AssertUnwindSafe(|| world.save())) {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(format!("save failed: {}", e)),
                Err(panic) => Some(format!("save panicked: {}", panic_message(panic.as_ref()))),
            };
        }

        origin.close();
        progress.emit(ProgressEvent::SourceClosed {
            run_id,
            mode: store_mode,
        });

        let state = if failure.is_some() {
            RunState::Failed
        } else {
            RunState::Done
        };
        match &failure {
            Some(message) => error!("Run {} failed: {}", run_id, message),
            None => info!("Run {} done", run_id),
        }
        set_state(&mut self.state, run_id, state, progress);

        RunReport {
            run_id,
            state,
            stages: reports,
            store_mode,
            error: failure,
        }
    }

    /// Runs the stages in order until one fails. Returns the reports so far
    /// and the failure message, if any.
    fn run_stages(
        &mut self,
        run_id: Uuid,
        frame: &ProjectionFrame,
        origin: &FeatureOrigin,
        resolver: &TerrainHeightResolver,
        world: &mut dyn WorldSink,
        progress: &mut dyn ProgressSink,
    ) -> (Vec<StageReport>, Option<String>) {
        let region = frame.region();
        info!(
            "Run {}: region x {}..={} z {}..={}, {:?} features, {} stages",
            run_id,
            region.min_x,
            region.max_x,
            region.min_z,
            region.max_z,
            origin.mode(),
            self.stages.len()
        );

        let count = self.stages.len();
        let mut reports = Vec::with_capacity(count);
        for (i, stage) in self.stages.iter_mut().enumerate() {
            let name = stage.name().to_string();
            set_state(&mut self.state, run_id, RunState::RunningStage(i + 1), progress);
            progress.emit(ProgressEvent::StageStarted {
                stage: name.clone(),
                index: i + 1,
                count,
            });

            let mut ctx = StageContext {
                frame,
                region,
                origin,
                resolver,
                world: &mut *world,
                progress: &mut *progress,
                progress_steps: self.options.progress_steps,
            };
            let result = panic::catch_unwind(AssertUnwindSafe(|| stage.run(&mut ctx)))
                .unwrap_or_else(|panic| Err(StageError::Panicked(panic_message(panic.as_ref()))));

            match result {
                Ok(summary) => {
                    progress.emit(ProgressEvent::StageFinished {
                        stage: name.clone(),
                        summary,
                    });
                    if stage.reshapes_terrain() {
                        let hook = &mut self.hook;
                        if let Err(panic) =
                            panic::catch_unwind(AssertUnwindSafe(|| hook.terrain_ready(frame, region)))
                        {
                            warn!(
                                "Surface hook panicked after {}: {}",
                                name,
                                panic_message(panic.as_ref())
                            );
                        }
                    }
                    reports.push(StageReport {
                        name,
                        summary: Some(summary),
                        error: None,
                    });
                }
                Err(e) => {
                    let message = e.to_string();
                    progress.emit(ProgressEvent::StageFailed {
                        stage: name.clone(),
                        error: message.clone(),
                    });
                    let failure = format!("stage {} failed: {}", name, message);
                    reports.push(StageReport {
                        name,
                        summary: None,
                        error: Some(message),
                    });
                    return (reports, Some(failure));
                }
            }
        }
        (reports, None)
    }
}
