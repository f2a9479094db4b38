use super::StoreError;
use crate::terrain::TerrainGrid;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Marker for cells without ground data in the binary raster.
pub const NO_DATA: i32 = i32::MIN;

pub const GRID_META_FILE: &str = "terrain/grid.meta.json";
pub const GROUND_Y_FILE: &str = "terrain/groundY.i32";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridMeta {
    pub min_x: i32,
    pub min_z: i32,
    pub width: usize,
    pub height: usize,
    pub endianness: String,
    pub ground_y: String,
}

/// Writes the raster as little-endian i32 cells plus its meta file.
pub fn write_ground_grid(dir: &Path, grid: &TerrainGrid) -> Result<GridMeta, StoreError> {
    let meta = GridMeta {
        min_x: grid.min_x,
        min_z: grid.min_z,
        width: grid.width,
        height: grid.height,
        endianness: "LE".to_string(),
        ground_y: GROUND_Y_FILE.to_string(),
    };

    let bin_path = dir.join(GROUND_Y_FILE);
    if let Some(parent) = bin_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(fs::File::create(&bin_path)?);
    for cell in grid.cells() {
        out.write_all(&cell.unwrap_or(NO_DATA).to_le_bytes())?;
    }
    out.flush()?;

    fs::write(dir.join(GRID_META_FILE), serde_json::to_vec(&meta)?)?;
    Ok(meta)
}

/// Loads the raster described by `grid.meta.json`, if the store has one.
pub fn read_ground_grid(dir: &Path) -> Result<Option<TerrainGrid>, StoreError> {
    let meta_path = dir.join(GRID_META_FILE);
    if !meta_path.exists() {
        return Ok(None);
    }
    let meta: GridMeta = serde_json::from_slice(&fs::read(&meta_path)?)?;
    if meta.endianness != "LE" {
        return Err(StoreError::InvalidGrid(format!(
            "unsupported endianness {}",
            meta.endianness
        )));
    }

    let bytes = fs::read(dir.join(&meta.ground_y))?;
    let expected = meta
        .width
        .checked_mul(meta.height)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| StoreError::InvalidGrid("grid dimensions overflow".to_string()))?;
    if bytes.len() != expected {
        return Err(StoreError::InvalidGrid(format!(
            "expected {} bytes for {}x{} cells, found {}",
            expected,
            meta.width,
            meta.height,
            bytes.len()
        )));
    }

    let cells = bytes
        .chunks_exact(4)
        .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .map(|v| (v != NO_DATA).then_some(v))
        .collect();
    TerrainGrid::new(meta.min_x, meta.min_z, meta.width, meta.height, cells)
        .map(Some)
        .ok_or_else(|| StoreError::InvalidGrid("cell count mismatch".to_string()))
}
