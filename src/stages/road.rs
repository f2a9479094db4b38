use super::{PlacementStage, StageContext};
use crate::classify::{first_number, is_bridge_or_tunnel, is_road_candidate};
use crate::data::{BlockCoordinate, FeatureKind, Tags};
use crate::dedup::DeduplicationIndex;
use crate::error::StageError;
use crate::geometry::GeometryReducer;
use crate::placement::{DedupPolicy, PlacementCandidate, PlacementExecutor, PlacementSummary};
use crate::raster::LineRasterizer;
use crate::source::collect_features;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoadStyle {
    pub material: &'static str,
    pub width: i32,
}

const GRAY_CONCRETE: &str = "minecraft:gray_concrete";
const STONE: &str = "minecraft:stone";
const COBBLESTONE: &str = "minecraft:cobblestone";
const PLANKS: &str = "minecraft:spruce_planks";
const CHISELED: &str = "minecraft:chiseled_stone_bricks";

const DEFAULT_STYLE: RoadStyle = RoadStyle {
    material: STONE,
    width: 4,
};

/// Style for a `highway` value, or `aeroway:<value>` for airfield ways.
pub fn road_style(key: &str) -> RoadStyle {
    let (material, width) = match key {
        "motorway" => (GRAY_CONCRETE, 20),
        "trunk" | "primary" | "secondary" | "tertiary" | "residential" => (GRAY_CONCRETE, 15),
        "unclassified" => (GRAY_CONCRETE, 6),
        "service" => (GRAY_CONCRETE, 5),
        "footway" | "path" | "cycleway" | "pedestrian" => (STONE, 4),
        "track" => (COBBLESTONE, 4),
        "aeroway:runway" => (GRAY_CONCRETE, 45),
        "aeroway:taxiway" => (GRAY_CONCRETE, 15),
        "aeroway:taxilane" => (GRAY_CONCRETE, 8),
        _ => return DEFAULT_STYLE,
    };
    RoadStyle { material, width }
}

fn style_for(tags: &Tags) -> RoadStyle {
    if let Some(highway) = tags.get("highway") {
        return road_style(highway.trim());
    }
    match tags.get("aeroway") {
        Some(aeroway) => road_style(&format!("aeroway:{}", aeroway.trim())),
        None => DEFAULT_STYLE,
    }
}

/// Upper bound for a tagged width, in blocks.
pub const MAX_ROAD_WIDTH: i32 = 64;

/// Width in blocks from tags, metres taken as blocks, capped at
/// [`MAX_ROAD_WIDTH`].
pub fn width_from_tags(tags: &Tags) -> Option<i32> {
    ["width:carriageway", "width", "est_width", "runway:width", "taxiway:width"]
        .iter()
        .filter_map(|k| tags.get(*k))
        .filter_map(|v| first_number(v))
        .map(|m| m.round().min(f64::from(MAX_ROAD_WIDTH)) as i32)
        .find(|&blocks| blocks >= 1)
}

const WOODY: &[&str] = &["wood", "wooden", "boards", "board", "boardwalk", "planks", "timber"];
const METALLIC: &[&str] = &[
    "metal",
    "metallic",
    "steel",
    "iron",
    "metal_grid",
    "metal_grate",
    "grate",
    "grating",
    "grid",
    "chequer_plate",
    "tread_plate",
];
const SETTS: &[&str] = &[
    "sett",
    "setts",
    "stone_setts",
    "granite_setts",
    "basalt_setts",
    "sandstone_setts",
    "paving_stones",
    "paving-stones",
    "paving_stone",
    "paving-stone",
    "cobblestone",
    "cobblestones",
    "cobbled",
    "cobbles",
    "cobble",
    "cobblestone:flattened",
    "unhewn_cobblestone",
];

/// Material override from `surface` or `material`. Wood beats metal beats setts.
pub fn surface_material(tags: &Tags) -> Option<&'static str> {
    let value = ["surface", "material"]
        .iter()
        .filter_map(|k| tags.get(*k))
        .map(|v| v.trim().to_ascii_lowercase())
        .find(|v| !v.is_empty())?;
    let tokens: Vec<&str> = value
        .split(|c: char| matches!(c, ';' | ',' | '/') || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect();
    [(WOODY, PLANKS), (METALLIC, CHISELED), (SETTS, COBBLESTONE)]
        .into_iter()
        .find(|(set, _)| tokens.iter().any(|t| set.contains(t)))
        .map(|(_, material)| material)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoadCell {
    pub y: i32,
    pub material: &'static str,
}

struct RoadPlan {
    path: Vec<BlockCoordinate>,
    width: i32,
    material: &'static str,
}

/// Paints surface roads and airfield ways. Bridges, tunnels and ways on a
/// non-zero layer are left to dedicated stages.
#[derive(Debug, Default)]
pub struct RoadStage;

impl RoadStage {
    pub fn new() -> Self {
        Self
    }
}

impl PlacementStage for RoadStage {
    fn name(&self) -> &str {
        "roads"
    }

    fn run(&mut self, ctx: &mut StageContext<'_>) -> Result<PlacementSummary, StageError> {
        let reducer = GeometryReducer::new(ctx.frame);
        let mut seen = DeduplicationIndex::new();
        let collected = collect_features(ctx.origin.open()?, |f| {
            if f.kind != FeatureKind::Way
                || !is_road_candidate(&f.tags)
                || is_bridge_or_tunnel(&f.tags)
            {
                return None;
            }
            if let Some(key) = f.entity_key() {
                if !seen.add_entity(key) {
                    return None;
                }
            }
            let path = reducer.path(&f)?;
            let style = style_for(&f.tags);
            Some(RoadPlan {
                path,
                width: width_from_tags(&f.tags).unwrap_or(style.width).max(1),
                material: surface_material(&f.tags).unwrap_or(style.material),
            })
        });
        info!(
            "Roads: {} ways selected from {} features",
            collected.items.len(),
            collected.read
        );

        let rasterizer = LineRasterizer::new(ctx.region, ctx.resolver);
        let (mut clipped, mut unresolved, mut full_scans) = (0, 0, 0);
        let mut candidates = Vec::new();
        for plan in &collected.items {
            let raster = rasterizer.rasterize(&plan.path, plan.width, &*ctx.world);
            clipped += raster.clipped;
            unresolved += raster.unresolved;
            full_scans += raster.full_scans;
            candidates.extend(raster.cells.into_iter().map(|c| {
                PlacementCandidate::new(
                    c.coord,
                    None,
                    RoadCell {
                        y: c.meta.y,
                        material: plan.material,
                    },
                )
            }));
        }
        info!(
            "Roads: {} cells to paint, {} clipped, {} without height, {} full column scans",
            candidates.len(),
            clipped,
            unresolved,
            full_scans
        );

        let executor = PlacementExecutor::new(self.name(), ctx.region, DedupPolicy::CELL_ONLY)
            .with_progress_steps(ctx.progress_steps);
        let world = &mut *ctx.world;
        let mut summary = executor.execute(
            &candidates,
            &mut DeduplicationIndex::new(),
            &mut *ctx.progress,
            |c| {
                world.write_block(c.coord.x, c.meta.y, c.coord.z, c.meta.material)?;
                Ok(())
            },
        );
        summary.total += clipped + unresolved;
        summary.skipped_out_of_bounds += clipped;
        summary.skipped_no_height += unresolved;
        Ok(summary)
    }
}
