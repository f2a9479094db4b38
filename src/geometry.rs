use crate::data::{BlockCoordinate, Feature, FeatureKind, GeoPoint};
use crate::projection::{round_half_up, ProjectionFrame};
use std::borrow::Cow;

/// Reduces feature geometry to block-space placement coordinates.
#[derive(Debug, Clone, Copy)]
pub struct GeometryReducer<'a> {
    frame: &'a ProjectionFrame,
}

impl<'a> GeometryReducer<'a> {
    pub fn new(frame: &'a ProjectionFrame) -> Self {
        Self { frame }
    }

    /// Vertices of a feature; relations without root geometry use their
    /// members' geometry concatenated in member order.
    pub fn vertices<'f>(&self, feature: &'f Feature) -> Cow<'f, [GeoPoint]> {
        if feature.kind == FeatureKind::Relation && feature.geometry.is_empty() {
            let joined: Vec<GeoPoint> = feature
                .members
                .iter()
                .flat_map(|m| m.geometry.iter().copied())
                .collect();
            return Cow::Owned(joined);
        }
        Cow::Borrowed(&feature.geometry)
    }

    /// Single representative coordinate of a feature.
    pub fn point(&self, feature: &Feature) -> Option<BlockCoordinate> {
        match feature.kind {
            FeatureKind::Node => feature
                .position
                .or_else(|| feature.geometry.first().copied())
                .map(|p| self.frame.project_point(&p)),
            FeatureKind::Way | FeatureKind::Relation => self.centroid(&self.vertices(feature)),
        }
    }

    /// Mean of the unrounded projected vertices, rounded once.
    pub fn centroid(&self, vertices: &[GeoPoint]) -> Option<BlockCoordinate> {
        if vertices.is_empty() {
            return None;
        }
        let (sx, sz) = vertices.iter().fold((0.0, 0.0), |(sx, sz), p| {
            let (x, z) = self.frame.project_exact(p.lat, p.lon);
            (sx + x, sz + z)
        });
        let n = vertices.len() as f64;
        Some(BlockCoordinate::new(round_half_up(sx / n), round_half_up(sz / n)))
    }

    /// Ordered block path with consecutive duplicates removed. `None` when
    /// fewer than two vertices are available.
    pub fn path(&self, feature: &Feature) -> Option<Vec<BlockCoordinate>> {
        let vertices = self.vertices(feature);
        if vertices.len() < 2 {
            return None;
        }
        let mut path: Vec<BlockCoordinate> = vertices
            .iter()
            .map(|p| self.frame.project_point(p))
            .collect();
        path.dedup();
        Some(path)
    }
}
