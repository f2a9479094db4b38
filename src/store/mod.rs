//! Sidecar store: an input payload split into line-delimited features and a
//! binary ground raster so that stages can stream instead of holding the
//! whole document in memory.

pub mod grid;
pub mod splitter;
pub mod stream;

pub use stream::FeatureStream;

use crate::data::GeoPoint;
use crate::payload::{BoundingBox, InputPayload, PayloadError, PlayerOrigin};
use crate::terrain::TerrainGrid;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub const INDEX_FILE: &str = "geovox.index.json";
pub const FEATURES_FILE: &str = "features/elements.ndjson";
pub const STORE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),
    #[error("store not found at {0}")]
    Missing(PathBuf),
    #[error("invalid terrain raster: {0}")]
    InvalidGrid(String),
}

/// Light metadata written last by the splitter.
///
/// Carries the frame fields of the payload it was split from, so a run can
/// rebuild its frame from the store alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreIndex {
    /// Layout version, [`STORE_VERSION`] when written by this crate
    pub version: u32,
    /// File name of the payload the store was split from
    pub coords_file: String,
    /// Lines in the features file
    pub features_count: usize,
    #[serde(default)]
    pub center: Option<GeoPoint>,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    /// Block the center projects to
    #[serde(default)]
    pub player: Option<PlayerOrigin>,
    /// Blocks spanned by the bounding box on each axis
    #[serde(default)]
    pub size_meters: Option<f64>,
}

impl StoreIndex {
    /// Copies frame fields into `payload` where it has none of its own.
    pub fn fill_missing(&self, payload: &mut InputPayload) {
        payload.center = payload.center.or(self.center);
        payload.bbox = payload.bbox.or(self.bbox);
        payload.player = payload.player.or(self.player);
        payload.size_meters = payload.size_meters.or(self.size_meters);
    }
}

#[derive(Debug)]
pub struct GenerationStore {
    dir: PathBuf,
    index: StoreIndex,
    ground: Option<Arc<TerrainGrid>>,
}

impl GenerationStore {
    /// Opens the store under `dir`, splitting `coords` first when the index is
    /// missing or older than the payload.
    pub fn prepare(dir: &Path, coords: &Path) -> Result<Self, StoreError> {
        if Self::is_stale(dir, coords)? {
            splitter::split(coords, dir)?;
        } else {
            debug!("Sidecar store at {} is up to date", dir.display());
        }
        Self::open(dir)
    }

    pub fn is_stale(dir: &Path, coords: &Path) -> Result<bool, StoreError> {
        let index_path = dir.join(INDEX_FILE);
        if !index_path.exists() {
            return Ok(true);
        }
        let index_time = fs::metadata(&index_path)?.modified()?;
        let coords_time = fs::metadata(coords)?.modified()?;
        Ok(index_time < coords_time)
    }

    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let index_path = dir.join(INDEX_FILE);
        if !index_path.exists() {
            return Err(StoreError::Missing(dir.to_path_buf()));
        }
        let index: StoreIndex = serde_json::from_slice(&fs::read(&index_path)?)?;
        if !dir.join(FEATURES_FILE).exists() {
            return Err(StoreError::Missing(dir.join(FEATURES_FILE)));
        }
        let ground = grid::read_ground_grid(dir)?.map(Arc::new);
        info!(
            "Opened sidecar store {} ({} features, raster: {})",
            dir.display(),
            index.features_count,
            ground.is_some()
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            index,
            ground,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index(&self) -> &StoreIndex {
        &self.index
    }

    pub fn features_path(&self) -> PathBuf {
        self.dir.join(FEATURES_FILE)
    }

    pub fn feature_stream(&self) -> Result<FeatureStream, StoreError> {
        Ok(FeatureStream::open(&self.features_path())?)
    }

    pub fn ground_grid(&self) -> Option<Arc<TerrainGrid>> {
        self.ground.clone()
    }

    /// Releases the store. Dropping it has the same effect.
    pub fn close(self) {}
}

impl Drop for GenerationStore {
    fn drop(&mut self) {
        info!("Closed sidecar store {}", self.dir.display());
    }
}
