//! Ground height lookup for block columns
//!
//! Heights come from precomputed rasters when available and from the live
//! world otherwise. Nothing here ever invents a height.

pub mod grid;
pub mod resolver;

pub use grid::TerrainGrid;
pub use resolver::{HeightSample, HeightSource, TerrainHeightResolver, DEFAULT_HINT_WINDOW};
