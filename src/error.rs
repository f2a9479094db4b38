use crate::data::ElementError;
use crate::store::StoreError;
use crate::world::WorldError;
use thiserror::Error;

/// The projection frame cannot be built from the input.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("missing input: {0}")]
    MissingInput(&'static str),
    #[error("degenerate bounding box: {0}")]
    DegenerateBbox(&'static str),
}

/// A record of a feature source could not be decoded. Aborts the current pass only.
#[derive(Debug, Error)]
pub enum FeatureParseError {
    #[error("record {position}: invalid JSON: {source}")]
    Json {
        position: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("record {position}: {source}")]
    Element {
        position: usize,
        #[source]
        source: ElementError,
    },
    #[error("read error after record {position}: {source}")]
    Io {
        position: usize,
        #[source]
        source: std::io::Error,
    },
}

impl FeatureParseError {
    pub fn position(&self) -> usize {
        match self {
            FeatureParseError::Json { position, .. }
            | FeatureParseError::Element { position, .. }
            | FeatureParseError::Io { position, .. } => *position,
        }
    }
}

/// Failure of a single placement callback.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("no ground height at ({x}, {z})")]
    HeightUnknown { x: i32, z: i32 },
    #[error("world write failed: {0}")]
    World(#[from] WorldError),
    #[error("{0}")]
    Rejected(String),
}

/// An error that escapes a stage and aborts the run.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("feature source unavailable: {0}")]
    Source(#[from] StoreError),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("world error: {0}")]
    World(#[from] WorldError),
    #[error("stage panicked: {0}")]
    Panicked(String),
    #[error("{0}")]
    Other(String),
}
