//! Width-aware rasterization of block paths.

use crate::data::BlockCoordinate;
use crate::placement::PlacementCandidate;
use crate::projection::Region;
use crate::terrain::{HeightSource, TerrainHeightResolver};
use crate::world::WorldSink;
use std::collections::HashSet;

/// Integer Bresenham line from `from` to `to`, both endpoints included.
pub fn bresenham(from: BlockCoordinate, to: BlockCoordinate) -> Vec<BlockCoordinate> {
    let dx = (to.x - from.x).abs();
    let dz = (to.z - from.z).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sz = if from.z < to.z { 1 } else { -1 };
    let mut err = dx - dz;
    let (mut x, mut z) = (from.x, from.z);

    let mut out = Vec::with_capacity(dx.max(dz) as usize + 1);
    loop {
        out.push(BlockCoordinate::new(x, z));
        if x == to.x && z == to.z {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dz {
            err -= dz;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            z += sz;
        }
    }
    out
}

/// Every cell covered by `path` drawn `width` cells wide, in walk order and
/// without repeats. The band spans `-width/2..=width/2` along the minor axis
/// of each segment, so even widths come out one wider.
pub fn band_cells(path: &[BlockCoordinate], width: i32) -> Vec<BlockCoordinate> {
    let half = width.max(1) / 2;
    let mut seen = HashSet::new();
    centre_walk(path)
        .flat_map(|(p, horizontal)| (-half..=half).map(move |o| offset(p, horizontal, o)))
        .filter(|c| seen.insert(*c))
        .collect()
}

/// [`band_cells`] restricted to `region`, plus the number of band cells left
/// outside it. Strips are cut to the region before any cell is built, so the
/// cost follows the region and not the width. Outside cells are counted per
/// centre-line step.
pub fn band_cells_within(
    path: &[BlockCoordinate],
    width: i32,
    region: &Region,
) -> (Vec<BlockCoordinate>, usize) {
    let half = i64::from(width.max(1) / 2);
    let strip = 2 * half + 1;
    let mut seen = HashSet::new();
    let mut cells = Vec::new();
    let mut clipped: i64 = 0;
    for (p, horizontal) in centre_walk(path) {
        let (fixed, along, fixed_range, along_range) = if horizontal {
            (p.x, p.z, (region.min_x, region.max_x), (region.min_z, region.max_z))
        } else {
            (p.z, p.x, (region.min_z, region.max_z), (region.min_x, region.max_x))
        };
        if fixed < fixed_range.0 || fixed > fixed_range.1 {
            clipped += strip;
            continue;
        }
        let lo = (i64::from(along) - half).max(i64::from(along_range.0));
        let hi = (i64::from(along) + half).min(i64::from(along_range.1));
        clipped += strip - (hi - lo + 1).max(0);
        for o in lo..=hi {
            // lo..=hi lies inside the region bounds, so it fits in i32.
            let o = o as i32;
            let cell = if horizontal {
                BlockCoordinate::new(fixed, o)
            } else {
                BlockCoordinate::new(o, fixed)
            };
            if seen.insert(cell) {
                cells.push(cell);
            }
        }
    }
    (cells, clipped as usize)
}

fn offset(p: BlockCoordinate, horizontal: bool, o: i32) -> BlockCoordinate {
    if horizontal {
        BlockCoordinate::new(p.x, p.z.saturating_add(o))
    } else {
        BlockCoordinate::new(p.x.saturating_add(o), p.z)
    }
}

/// Centre-line cells with the direction their band extends in: `true` when
/// the band runs along z.
fn centre_walk(path: &[BlockCoordinate]) -> impl Iterator<Item = (BlockCoordinate, bool)> + '_ {
    let single = (path.len() == 1).then(|| (path[0], true));
    path.windows(2)
        .flat_map(|seg| {
            let (a, b) = (seg[0], seg[1]);
            let horizontal = (b.x - a.x).abs() >= (b.z - a.z).abs();
            bresenham(a, b).into_iter().map(move |p| (p, horizontal))
        })
        .chain(single)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterCell {
    pub y: i32,
    pub source: HeightSource,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RasterizedPath {
    pub cells: Vec<PlacementCandidate<RasterCell>>,
    /// Cells outside the region.
    pub clipped: usize,
    /// Cells without a resolvable height.
    pub unresolved: usize,
    /// Cells that needed a full column scan.
    pub full_scans: usize,
}

/// Turns block paths into height-resolved cells inside a region.
pub struct LineRasterizer<'a> {
    region: Region,
    resolver: &'a TerrainHeightResolver,
}

impl<'a> LineRasterizer<'a> {
    pub fn new(region: Region, resolver: &'a TerrainHeightResolver) -> Self {
        Self { region, resolver }
    }

    /// The height hint slides along the whole path, so neighbouring cells are
    /// resolved from a short window instead of a full column scan.
    pub fn rasterize(
        &self,
        path: &[BlockCoordinate],
        width: i32,
        world: &dyn WorldSink,
    ) -> RasterizedPath {
        let (cells, clipped) = band_cells_within(path, width, &self.region);
        let mut out = RasterizedPath {
            clipped,
            ..Default::default()
        };
        let mut hint = None;
        for cell in cells {
            let Some(sample) = self.resolver.ground_height_hinted(cell.x, cell.z, hint, world) else {
                out.unresolved += 1;
                continue;
            };
            if sample.source == HeightSource::FullScan {
                out.full_scans += 1;
            }
            hint = Some(sample.y);
            out.cells.push(PlacementCandidate::new(
                cell,
                None,
                RasterCell {
                    y: sample.y,
                    source: sample.source,
                },
            ));
        }
        out
    }
}
