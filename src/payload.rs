use crate::data::GeoPoint;
use crate::terrain::TerrainGrid;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerOrigin {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub z: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub elements: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GridLayers {
    #[serde(rename = "groundY", default)]
    pub ground_y: Option<Vec<Option<f64>>>,
}

/// Elevation raster as carried inside the payload. Two layouts exist: the
/// older flat `data[]` and the layered `grids.groundY[]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainGridPayload {
    pub min_x: i32,
    pub min_z: i32,
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub data: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub grids: Option<GridLayers>,
}

impl TerrainGridPayload {
    pub fn ground_cells(&self) -> Option<&[Option<f64>]> {
        self.data
            .as_deref()
            .or_else(|| self.grids.as_ref().and_then(|g| g.ground_y.as_deref()))
    }

    pub fn to_grid(&self) -> Result<TerrainGrid, PayloadError> {
        let cells = self
            .ground_cells()
            .ok_or_else(|| PayloadError::InvalidData("terrainGrid has no ground layer".to_string()))?;
        let cells: Vec<Option<i32>> = cells
            .iter()
            .map(|c| c.filter(|v| v.is_finite()).map(|v| crate::projection::round_half_up(v)))
            .collect();
        TerrainGrid::new(self.min_x, self.min_z, self.width, self.height, cells)
            .ok_or_else(|| {
                PayloadError::InvalidData(format!(
                    "terrainGrid cell count does not match {}x{}",
                    self.width, self.height
                ))
            })
    }
}

/// The input document (`coords.json`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputPayload {
    #[serde(default)]
    pub center: Option<GeoPoint>,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub size_meters: Option<f64>,
    #[serde(default)]
    pub player: Option<PlayerOrigin>,
    #[serde(default)]
    pub features: Option<FeatureCollection>,
    #[serde(default)]
    pub terrain_grid: Option<TerrainGridPayload>,
}

impl InputPayload {
    /// Moves the resident elements out, leaving an empty collection behind.
    pub fn take_elements(&mut self) -> Arc<[Value]> {
        self.features
            .take()
            .map(|f| f.elements)
            .unwrap_or_default()
            .into()
    }

    pub fn element_count(&self) -> usize {
        self.features.as_ref().map_or(0, |f| f.elements.len())
    }
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub struct PayloadLoader;

impl PayloadLoader {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<InputPayload, PayloadError> {
        let content = fs::read_to_string(path)?;
        Self::load_from_string(&content)
    }

    pub fn load_from_string(content: &str) -> Result<InputPayload, PayloadError> {
        let payload = if content.trim_start().starts_with('{') {
            serde_json::from_str(content)?
        } else {
            serde_yaml::from_str(content)?
        };
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_payload_json() {
        let json = r#"{
            "center": {"lat": 10.0, "lng": 20.0},
            "bbox": {"north": 10.01, "south": 9.99, "east": 20.01, "west": 19.99},
            "sizeMeters": 400,
            "player": {"x": 5, "z": -3},
            "features": {"elements": [{"type": "node", "id": 1, "lat": 10.0, "lon": 20.0}]}
        }"#;

        let payload = PayloadLoader::load_from_string(json).unwrap();
        assert_eq!(payload.center, Some(GeoPoint::new(10.0, 20.0)));
        assert_eq!(payload.size_meters, Some(400.0));
        assert_eq!(payload.player, Some(PlayerOrigin { x: 5.0, z: -3.0 }));
        assert_eq!(payload.element_count(), 1);
    }

    #[test]
    fn test_load_payload_yaml() {
        let yaml = r#"
center:
  lat: 1.0
  lng: 2.0
bbox:
  north: 1.1
  south: 0.9
  east: 2.1
  west: 1.9
sizeMeters: 100
features:
  elements:
    - type: way
      id: 3
      geometry:
        - lat: 1.0
          lon: 2.0
"#;
        let mut payload = PayloadLoader::load_from_string(yaml).unwrap();
        assert_eq!(payload.bbox.map(|b| b.north), Some(1.1));
        let elements = payload.take_elements();
        assert_eq!(elements.len(), 1);
        assert_eq!(payload.element_count(), 0);
    }

    #[test]
    fn test_terrain_grid_layouts() {
        let v1 = r#"{"terrainGrid": {"minX": -1, "minZ": -1, "width": 2, "height": 1, "data": [64, null]}}"#;
        let payload = PayloadLoader::load_from_string(v1).unwrap();
        let grid = payload.terrain_grid.unwrap().to_grid().unwrap();
        assert_eq!(grid.ground_y(-1, -1), Some(64));
        assert_eq!(grid.ground_y(0, -1), None);

        let v2 = r#"{"terrainGrid": {"minX": 0, "minZ": 0, "width": 1, "height": 1, "grids": {"groundY": [70.4]}}}"#;
        let payload = PayloadLoader::load_from_string(v2).unwrap();
        let grid = payload.terrain_grid.unwrap().to_grid().unwrap();
        assert_eq!(grid.ground_y(0, 0), Some(70));
    }

    #[test]
    fn test_terrain_grid_size_mismatch() {
        let bad = r#"{"terrainGrid": {"minX": 0, "minZ": 0, "width": 2, "height": 2, "data": [1, 2, 3]}}"#;
        let payload = PayloadLoader::load_from_string(bad).unwrap();
        assert!(matches!(
            payload.terrain_grid.unwrap().to_grid(),
            Err(PayloadError::InvalidData(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            PayloadLoader::load_from_string("{ not json"),
            Err(PayloadError::Json(_))
        ));
    }
}
