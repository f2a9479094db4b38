use crate::orchestrator::OrchestratorOptions;
use crate::world::VerticalRange;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeovoxConfig {
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub terrain: TerrainSettings,
    #[serde(default)]
    pub placement: PlacementSettings,
    #[serde(default)]
    pub stages: StageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub input: PathBuf,
    /// Sidecar store directory; no store when absent.
    pub store_dir: Option<PathBuf>,
    pub prepare_store: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainSettings {
    pub min_y: i32,
    pub max_y: i32,
    pub hint_window: i32,
    pub surface_material: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementSettings {
    pub progress_steps: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSettings {
    pub enabled: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("./coords.json"),
            store_dir: Some(PathBuf::from("./geovox-store")),
            prepare_store: true,
        }
    }
}

impl Default for TerrainSettings {
    fn default() -> Self {
        let range = VerticalRange::default();
        Self {
            min_y: range.min_y,
            max_y: range.max_y,
            hint_window: crate::terrain::DEFAULT_HINT_WINDOW,
            surface_material: "minecraft:grass_block".to_string(),
        }
    }
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            progress_steps: crate::placement::DEFAULT_PROGRESS_STEPS,
        }
    }
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            enabled: [
                "surface",
                "roads",
                "fountains",
                "post_boxes",
                "monuments",
                "cave_entrances",
                "water_sources",
                "windsocks",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl GeovoxConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: GeovoxConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            eprintln!("Failed to load config: {}, using defaults", e);
            Self::default()
        })
    }

    pub fn vertical_range(&self) -> VerticalRange {
        VerticalRange {
            min_y: self.terrain.min_y.min(self.terrain.max_y),
            max_y: self.terrain.max_y.max(self.terrain.min_y),
        }
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            store_dir: self.generation.store_dir.clone(),
            prepare_store: self.generation.prepare_store,
            hint_window: self.terrain.hint_window,
            progress_steps: self.placement.progress_steps,
        }
    }
}
