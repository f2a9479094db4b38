use geovox::data::{BlockCoordinate, GeoPoint};
use geovox::error::StageError;
use geovox::orchestrator::{GenerationOrchestrator, OrchestratorOptions, RunState, SurfaceHook};
use geovox::payload::{BoundingBox, InputPayload};
use geovox::placement::PlacementSummary;
use geovox::progress::ProgressEvent;
use geovox::projection::{ProjectionFrame, Region};
use geovox::raster::LineRasterizer;
use geovox::source::SourceMode;
use geovox::stages::{build_stages, PlacementStage, StageContext};
use geovox::terrain::{HeightSource, TerrainHeightResolver};
use geovox::world::{MemoryWorld, VerticalRange, WorldSink};
use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;

// Frame used throughout: 200 blocks across ±0.001 degrees, so one block is
// 0.00001 degrees and north is negative z.
fn payload(elements: Vec<Value>) -> InputPayload {
    serde_json::from_value(json!({
        "center": {"lat": 0.0, "lng": 0.0},
        "bbox": {"north": 0.001, "south": -0.001, "east": 0.001, "west": -0.001},
        "sizeMeters": 200,
        "player": {"x": 0, "z": 0},
        "features": {"elements": elements}
    }))
    .unwrap()
}

fn at(x: f64, z: f64) -> Value {
    json!({"lat": -z * 0.00001, "lon": x * 0.00001})
}

fn world() -> MemoryWorld {
    MemoryWorld::new(VerticalRange { min_y: 0, max_y: 100 })
}

fn stages(names: &[&str]) -> Vec<Box<dyn PlacementStage>> {
    let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    build_stages(&names, "minecraft:grass_block")
}

fn summary(report: &geovox::RunReport, stage: &str) -> PlacementSummary {
    report
        .stage(stage)
        .and_then(|s| s.summary)
        .unwrap_or_else(|| panic!("no summary for {}", stage))
}

#[test]
fn test_node_projects_north_of_origin() {
    let mut world = world();
    world.fill_column(0, -50, 10, "minecraft:stone").unwrap();
    let input = payload(vec![json!({
        "type": "node", "id": 1, "lat": 0.0005, "lon": 0.0,
        "tags": {"amenity": "fountain"}
    })]);

    let mut orchestrator =
        GenerationOrchestrator::new(OrchestratorOptions::default(), stages(&["fountains"]));
    let mut events: Vec<ProgressEvent> = Vec::new();
    let report = orchestrator.run_payload(input, &mut world, &mut events);

    assert!(report.succeeded(), "{:?}", report.error);
    assert_eq!(report.store_mode, SourceMode::Batch);
    assert_eq!(summary(&report, "fountains").placed, 1);
    let expected: Vec<_> = (11..=18).map(|y| (0, y, -50)).collect();
    assert_eq!(world.blocks_of("minecraft:water"), expected);
    assert_eq!(world.save_count(), 1);
}

#[test]
fn test_duplicate_way_ids_place_once() {
    let mut world = world();
    for (x, z) in [(10, 10), (20, 20)] {
        world.fill_column(x, z, 5, "minecraft:stone").unwrap();
    }
    let input = payload(vec![
        json!({"type": "way", "id": 5, "tags": {"tourism": "artwork"},
               "geometry": [at(9.0, 10.0), at(11.0, 10.0)]}),
        json!({"type": "way", "id": 5, "tags": {"tourism": "artwork"},
               "geometry": [at(19.0, 20.0), at(21.0, 20.0)]}),
    ]);

    let mut orchestrator =
        GenerationOrchestrator::new(OrchestratorOptions::default(), stages(&["monuments"]));
    let report = orchestrator.run_payload(input, &mut world, &mut Vec::<ProgressEvent>::new());

    let monuments = summary(&report, "monuments");
    assert_eq!(monuments.placed, 1);
    assert_eq!(monuments.skipped_duplicate, 1);
    assert!(!world.is_empty(10, 6, 10));
    assert!(world.is_empty(20, 6, 20));
}

#[test]
fn test_features_sharing_a_cell_place_once() {
    let mut world = world();
    world.fill_column(3, 3, 5, "minecraft:stone").unwrap();
    let input = payload(vec![
        json!({"type": "node", "id": 1, "lat": -0.00003, "lon": 0.00003, "tags": {"amenity": "post_box"}}),
        json!({"type": "node", "id": 2, "lat": -0.000031, "lon": 0.000029, "tags": {"amenity": "post_box"}}),
    ]);
    let mut orchestrator =
        GenerationOrchestrator::new(OrchestratorOptions::default(), stages(&["post_boxes"]));
    let report = orchestrator.run_payload(input, &mut world, &mut Vec::<ProgressEvent>::new());

    let boxes = summary(&report, "post_boxes");
    assert_eq!(boxes.placed, 1);
    assert_eq!(boxes.skipped_duplicate, 1);
}

#[test]
fn test_out_of_region_features_are_skipped() {
    let mut world = world();
    let input = payload(vec![json!({
        "type": "node", "id": 1, "lat": 0.0, "lon": 0.0015,
        "tags": {"natural": "cave_entrance"}
    })]);
    let mut orchestrator =
        GenerationOrchestrator::new(OrchestratorOptions::default(), stages(&["cave_entrances"]));
    let report = orchestrator.run_payload(input, &mut world, &mut Vec::<ProgressEvent>::new());

    let caves = summary(&report, "cave_entrances");
    assert_eq!(caves.skipped_out_of_bounds, 1);
    assert_eq!(world.block_count(), 0);
}

#[test]
fn test_missing_height_is_a_silent_skip() {
    let mut world = world();
    let input = payload(vec![json!({
        "type": "node", "id": 1, "lat": 0.0, "lon": 0.0, "tags": {"aeroway": "windsock"}
    })]);
    let mut orchestrator =
        GenerationOrchestrator::new(OrchestratorOptions::default(), stages(&["windsocks"]));
    let report = orchestrator.run_payload(input, &mut world, &mut Vec::<ProgressEvent>::new());

    assert!(report.succeeded());
    let windsocks = summary(&report, "windsocks");
    assert_eq!(windsocks.skipped_no_height, 1);
    assert_eq!(windsocks.skipped_error, 0);
}

#[test]
fn test_l_shaped_road_rescans_only_at_discontinuity() {
    let frame = ProjectionFrame::from_payload(&payload(Vec::new())).unwrap();
    let mut world = world();
    for x in -5..=35 {
        for z in -5..=25 {
            let top = if x < 10 { 10 } else { 40 };
            world.fill_column(x, z, top, "minecraft:stone").unwrap();
        }
    }
    let resolver = TerrainHeightResolver::default();
    let rasterizer = LineRasterizer::new(frame.region(), &resolver);
    let path = [
        BlockCoordinate::new(0, 0),
        BlockCoordinate::new(20, 0),
        BlockCoordinate::new(20, 20),
        BlockCoordinate::new(30, 20),
    ];

    let out = rasterizer.rasterize(&path, 5, &world);

    assert_eq!(out.clipped, 0);
    assert_eq!(out.unresolved, 0);
    assert_eq!(out.full_scans, 2);
    let scanned: Vec<BlockCoordinate> = out
        .cells
        .iter()
        .filter(|c| c.meta.source == HeightSource::FullScan)
        .map(|c| c.coord)
        .collect();
    assert_eq!(scanned, vec![BlockCoordinate::new(0, -2), BlockCoordinate::new(10, -2)]);

    let jump = out
        .cells
        .iter()
        .position(|c| c.coord == BlockCoordinate::new(10, -2))
        .unwrap();
    let after = &out.cells[jump + 1];
    assert_eq!(after.meta.source, HeightSource::HintWindow);
    assert_eq!(after.meta.y, 40);
    assert!(out
        .cells
        .iter()
        .all(|c| c.meta.y == (if c.coord.x < 10 { 10 } else { 40 })));
}

#[test]
fn test_roads_paint_surface_and_skip_bridges() {
    let mut world = world();
    for x in -2..=12 {
        for z in -5..=5 {
            world.fill_column(x, z, 20, "minecraft:dirt").unwrap();
        }
    }
    let input = payload(vec![
        json!({"type": "way", "id": 1, "tags": {"highway": "footway", "width": "1"},
               "geometry": [at(0.0, 0.0), at(10.0, 0.0)]}),
        json!({"type": "way", "id": 2, "tags": {"highway": "primary", "bridge": "yes"},
               "geometry": [at(0.0, 3.0), at(10.0, 3.0)]}),
        json!({"type": "way", "id": 3, "tags": {"highway": "footway", "width": "1", "surface": "wood"},
               "geometry": [at(0.0, -3.0), at(10.0, -3.0)]}),
    ]);
    let mut orchestrator =
        GenerationOrchestrator::new(OrchestratorOptions::default(), stages(&["roads"]));
    let report = orchestrator.run_payload(input, &mut world, &mut Vec::<ProgressEvent>::new());

    assert!(report.succeeded());
    assert_eq!(summary(&report, "roads").placed, 22);
    assert_eq!(world.blocks_of("minecraft:stone").len(), 11);
    assert_eq!(world.blocks_of("minecraft:spruce_planks").len(), 11);
    assert_eq!(world.block(5, 20, 0), Some("minecraft:stone"));
    assert_eq!(world.block(5, 20, 3), Some("minecraft:dirt"));
}

#[test]
fn test_surface_stage_feeds_marker_heights() {
    let mut input = payload(vec![json!({
        "type": "node", "id": 1, "lat": 0.0, "lon": 0.0, "tags": {"natural": "spring"}
    })]);
    input.terrain_grid = serde_json::from_value(json!({
        "minX": -1, "minZ": -1, "width": 3, "height": 3, "data": [30, 30, 30, 30, 31, 30, 30, 30, 30]
    }))
    .unwrap();

    struct CountingHook(Rc<Cell<usize>>);
    impl SurfaceHook for CountingHook {
        fn terrain_ready(&mut self, _frame: &ProjectionFrame, _region: Region) {
            self.0.set(self.0.get() + 1);
        }
    }
    let calls = Rc::new(Cell::new(0));

    let mut world = world();
    let mut orchestrator = GenerationOrchestrator::new(
        OrchestratorOptions::default(),
        stages(&["surface", "water_sources"]),
    )
    .with_surface_hook(Box::new(CountingHook(calls.clone())));
    let report = orchestrator.run_payload(input, &mut world, &mut Vec::<ProgressEvent>::new());

    assert!(report.succeeded());
    assert_eq!(summary(&report, "surface").placed, 9);
    assert_eq!(calls.get(), 1);
    assert_eq!(world.block(0, 31, 0), Some("minecraft:grass_block"));
    assert_eq!(world.block(0, 32, 0), Some("minecraft:cauldron"));
}

struct FailingStage;

impl PlacementStage for FailingStage {
    fn name(&self) -> &str {
        "broken"
    }

    fn run(&mut self, _ctx: &mut StageContext<'_>) -> Result<PlacementSummary, StageError> {
        Err(StageError::Other("boom".to_string()))
    }
}

struct PanickingStage;

impl PlacementStage for PanickingStage {
    fn name(&self) -> &str {
        "panicky"
    }

    fn run(&mut self, _ctx: &mut StageContext<'_>) -> Result<PlacementSummary, StageError> {
        panic!("stage bug")
    }
}

struct CountingStage(Rc<Cell<usize>>);

impl PlacementStage for CountingStage {
    fn name(&self) -> &str {
        "after"
    }

    fn run(&mut self, _ctx: &mut StageContext<'_>) -> Result<PlacementSummary, StageError> {
        self.0.set(self.0.get() + 1);
        Ok(PlacementSummary::default())
    }
}

#[test]
fn test_stage_failure_stops_run_and_keeps_earlier_work() {
    let mut world = world();
    world.fill_column(0, 0, 10, "minecraft:stone").unwrap();
    let input = payload(vec![json!({
        "type": "node", "id": 1, "lat": 0.0, "lon": 0.0, "tags": {"amenity": "fountain"}
    })]);
    let ran_after = Rc::new(Cell::new(0));
    let mut all = stages(&["fountains"]);
    all.push(Box::new(FailingStage));
    all.push(Box::new(CountingStage(ran_after.clone())));

    let mut orchestrator = GenerationOrchestrator::new(OrchestratorOptions::default(), all);
    let mut events: Vec<ProgressEvent> = Vec::new();
    let report = orchestrator.run_payload(input, &mut world, &mut events);

    assert_eq!(report.state, RunState::Failed);
    assert_eq!(orchestrator.state(), RunState::Failed);
    assert!(report.error.as_deref().unwrap_or_default().contains("broken"));
    assert_eq!(report.stages.len(), 2);
    assert_eq!(report.stages[1].error.as_deref(), Some("boom"));
    assert_eq!(ran_after.get(), 0);
    assert_eq!(world.blocks_of("minecraft:water").len(), 8);
    assert_eq!(world.save_count(), 0);

    let states: Vec<RunState> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::RunState { state, .. } => Some(*state),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            RunState::Preparing,
            RunState::RunningStage(1),
            RunState::RunningStage(2),
            RunState::Failed
        ]
    );
}

#[test]
fn test_stage_panic_fails_run() {
    let mut world = world();
    let ran_after = Rc::new(Cell::new(0));
    let all: Vec<Box<dyn PlacementStage>> =
        vec![Box::new(PanickingStage), Box::new(CountingStage(ran_after.clone()))];
    let mut orchestrator = GenerationOrchestrator::new(OrchestratorOptions::default(), all);
    let report = orchestrator.run_payload(payload(Vec::new()), &mut world, &mut Vec::<ProgressEvent>::new());

    assert_eq!(report.state, RunState::Failed);
    assert!(report.stages[0]
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("stage bug"));
    assert_eq!(ran_after.get(), 0);
}

#[test]
fn test_missing_frame_fails_before_stages() {
    let ran = Rc::new(Cell::new(0));
    let all: Vec<Box<dyn PlacementStage>> = vec![Box::new(CountingStage(ran.clone()))];
    let mut orchestrator = GenerationOrchestrator::new(OrchestratorOptions::default(), all);
    let input: InputPayload = serde_json::from_value(json!({"sizeMeters": 200})).unwrap();
    let report = orchestrator.run_payload(input, &mut world(), &mut Vec::<ProgressEvent>::new());

    assert_eq!(report.state, RunState::Failed);
    assert!(report.stages.is_empty());
    assert_eq!(ran.get(), 0);
}

#[test]
fn test_frame_scenario_values() {
    let frame = ProjectionFrame::new(
        GeoPoint::new(0.0, 0.0),
        200.0,
        BoundingBox {
            north: 0.001,
            south: -0.001,
            east: 0.001,
            west: -0.001,
        },
        BlockCoordinate::new(0, 0),
    )
    .unwrap();
    assert_eq!(frame.project(0.0005, 0.0), BlockCoordinate::new(0, -50));
}

struct PanickingHook;

impl SurfaceHook for PanickingHook {
    fn terrain_ready(&mut self, _frame: &ProjectionFrame, _region: Region) {
        panic!("host hook bug")
    }
}

#[test]
fn test_hook_panic_does_not_escape_the_run() {
    let mut input = payload(vec![json!({
        "type": "node", "id": 1, "lat": 0.0, "lon": 0.0, "tags": {"natural": "spring"}
    })]);
    input.terrain_grid = serde_json::from_value(json!({
        "minX": 0, "minZ": 0, "width": 1, "height": 1, "data": [20]
    }))
    .unwrap();

    let mut world = world();
    let mut orchestrator = GenerationOrchestrator::new(
        OrchestratorOptions::default(),
        stages(&["surface", "water_sources"]),
    )
    .with_surface_hook(Box::new(PanickingHook));
    let mut events: Vec<ProgressEvent> = Vec::new();
    let report = orchestrator.run_payload(input, &mut world, &mut events);

    assert!(report.succeeded(), "{:?}", report.error);
    assert_eq!(orchestrator.state(), RunState::Done);
    assert_eq!(report.stages.len(), 2);
    assert_eq!(world.block(0, 21, 0), Some("minecraft:cauldron"));
    assert_eq!(world.save_count(), 1);
    let closes = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::SourceClosed { .. }))
        .count();
    assert_eq!(closes, 1);
}

struct PanickingSaveWorld(MemoryWorld);

impl WorldSink for PanickingSaveWorld {
    fn write_block(&mut self, x: i32, y: i32, z: i32, material: &str) -> Result<(), geovox::world::WorldError> {
        self.0.write_block(x, y, z, material)
    }

    fn is_empty(&self, x: i32, y: i32, z: i32) -> bool {
        self.0.is_empty(x, y, z)
    }

    fn top_non_empty_y(&self, x: i32, z: i32) -> Option<i32> {
        self.0.top_non_empty_y(x, z)
    }

    fn vertical_range(&self) -> VerticalRange {
        self.0.vertical_range()
    }

    fn save(&mut self) -> Result<(), geovox::world::WorldError> {
        panic!("disk gone")
    }
}

#[test]
fn test_save_panic_fails_the_run() {
    let mut world = PanickingSaveWorld(world());
    let mut orchestrator =
        GenerationOrchestrator::new(OrchestratorOptions::default(), stages(&["fountains"]));
    let mut events: Vec<ProgressEvent> = Vec::new();
    let report = orchestrator.run_payload(payload(Vec::new()), &mut world, &mut events);

    assert_eq!(report.state, RunState::Failed);
    assert!(report.error.as_deref().unwrap_or_default().contains("disk gone"));
    assert!(matches!(events.last(), Some(ProgressEvent::RunState { state: RunState::Failed, .. })));
}
