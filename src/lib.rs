//! Geographic feature ingestion and voxel placement.
//!
//! Tagged map features (nodes, ways, relations) and an elevation grid are
//! projected into block space and stamped onto a world through a small set of
//! shared building blocks: projection, height resolution, feature sources,
//! deduplication, geometry reduction, line rasterization and a fault-isolating
//! placement executor. Placement stages are thin policy layers on top.

pub mod classify;
pub mod config;
pub mod data;
pub mod dedup;
pub mod error;
pub mod geometry;
pub mod orchestrator;
pub mod payload;
pub mod placement;
pub mod progress;
pub mod projection;
pub mod raster;
pub mod source;
pub mod stages;
pub mod store;
pub mod terrain;
pub mod world;

pub use data::{BlockCoordinate, Feature, FeatureKind, GeoPoint};
pub use orchestrator::{GenerationOrchestrator, RunReport, RunState};
pub use projection::{ProjectionFrame, Region};
