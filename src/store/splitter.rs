use super::grid::{write_ground_grid, GRID_META_FILE};
use super::{StoreError, StoreIndex, FEATURES_FILE, INDEX_FILE, STORE_VERSION};
use crate::payload::{InputPayload, PayloadLoader};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Splits an input payload file into the sidecar layout under `dir`.
pub fn split(coords: &Path, dir: &Path) -> Result<StoreIndex, StoreError> {
    let payload = PayloadLoader::load_from_file(coords)?;
    let coords_file = coords
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    write_store(&payload, &coords_file, dir)
}

/// Writes features, terrain raster and finally the index. A store whose
/// index is missing is considered incomplete and gets rebuilt.
pub fn write_store(
    payload: &InputPayload,
    coords_file: &str,
    dir: &Path,
) -> Result<StoreIndex, StoreError> {
    fs::create_dir_all(dir.join("features"))?;
    fs::create_dir_all(dir.join("terrain"))?;

    let features_path = dir.join(FEATURES_FILE);
    let mut out = BufWriter::new(fs::File::create(&features_path)?);
    let mut features_count = 0;
    if let Some(features) = &payload.features {
        for element in &features.elements {
            serde_json::to_writer(&mut out, element)?;
            out.write_all(b"\n")?;
            features_count += 1;
        }
    }
    out.flush()?;

    // A raster left over from an earlier split must not outlive its payload.
    remove_if_present(&dir.join(GRID_META_FILE))?;
    if let Some(terrain) = &payload.terrain_grid {
        match terrain.to_grid() {
            Ok(grid) => {
                write_ground_grid(dir, &grid)?;
            }
            Err(e) => warn!("Skipping terrain raster: {}", e),
        }
    }

    let index = StoreIndex {
        version: STORE_VERSION,
        coords_file: coords_file.to_string(),
        features_count,
        center: payload.center,
        bbox: payload.bbox,
        player: payload.player,
        size_meters: payload.size_meters,
    };
    fs::write(dir.join(INDEX_FILE), serde_json::to_vec_pretty(&index)?)?;

    info!(
        "Split {} into {} ({} features)",
        coords_file,
        dir.display(),
        features_count
    );
    Ok(index)
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
