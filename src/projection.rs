//! Geographic to block-space mapping.
//!
//! A local equirectangular approximation: longitude and latitude are scaled
//! linearly against the bounding box so that the box spans `size_meters`
//! blocks, one metre per block. No meridian convergence correction is applied,
//! which keeps the mapping exact-affine but only valid for small extents.

use crate::data::{BlockCoordinate, GeoPoint};
use crate::error::FrameError;
use crate::payload::{BoundingBox, InputPayload};
use serde::{Deserialize, Serialize};

/// Rounds half-up (`floor(v + 0.5)`), so `-0.5` goes to `0` and `2.5` to `3`.
pub fn round_half_up(v: f64) -> i32 {
    (v + 0.5).floor() as i32
}

/// Everything needed to map geographic points to blocks for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionFrame {
    /// Geographic point that lands on `origin`
    pub center: GeoPoint,
    /// Blocks spanned by the bounding box along each axis
    pub size_meters: f64,
    /// Geographic extent of the generated area
    pub bbox: BoundingBox,
    /// Block the center projects to, usually the player position
    pub origin: BlockCoordinate,
}

impl ProjectionFrame {
    pub fn new(
        center: GeoPoint,
        size_meters: f64,
        bbox: BoundingBox,
        origin: BlockCoordinate,
    ) -> Result<Self, FrameError> {
        if !(bbox.east - bbox.west).is_normal() {
            return Err(FrameError::DegenerateBbox("east equals west"));
        }
        if !(bbox.south - bbox.north).is_normal() {
            return Err(FrameError::DegenerateBbox("north equals south"));
        }
        if !size_meters.is_finite() || size_meters <= 0.0 {
            return Err(FrameError::MissingInput("sizeMeters"));
        }
        Ok(Self {
            center,
            size_meters,
            bbox,
            origin,
        })
    }

    /// Builds the frame of a run. The player position, when present, is the
    /// block the center projects to.
    pub fn from_payload(payload: &InputPayload) -> Result<Self, FrameError> {
        let center = payload.center.ok_or(FrameError::MissingInput("center"))?;
        let bbox = payload.bbox.ok_or(FrameError::MissingInput("bbox"))?;
        let size = payload
            .size_meters
            .ok_or(FrameError::MissingInput("sizeMeters"))?;
        let player = payload.player.unwrap_or_default();
        let origin = BlockCoordinate::new(round_half_up(player.x), round_half_up(player.z));
        Self::new(center, size, bbox, origin)
    }

    /// Unrounded block-space position of a geographic point.
    pub fn project_exact(&self, lat: f64, lng: f64) -> (f64, f64) {
        let dx = (lng - self.center.lon) / (self.bbox.east - self.bbox.west) * self.size_meters;
        let dz = (lat - self.center.lat) / (self.bbox.south - self.bbox.north) * self.size_meters;
        (self.origin.x as f64 + dx, self.origin.z as f64 + dz)
    }

    pub fn project(&self, lat: f64, lng: f64) -> BlockCoordinate {
        let (x, z) = self.project_exact(lat, lng);
        BlockCoordinate::new(round_half_up(x), round_half_up(z))
    }

    pub fn project_point(&self, p: &GeoPoint) -> BlockCoordinate {
        self.project(p.lat, p.lon)
    }

    /// Inverse of [`project_exact`](Self::project_exact) for a block position.
    pub fn unproject(&self, x: i32, z: i32) -> GeoPoint {
        let dx = (x - self.origin.x) as f64;
        let dz = (z - self.origin.z) as f64;
        let lon = self.center.lon + dx / self.size_meters * (self.bbox.east - self.bbox.west);
        let lat = self.center.lat + dz / self.size_meters * (self.bbox.south - self.bbox.north);
        GeoPoint::new(lat, lon)
    }

    pub fn region(&self) -> Region {
        let a = self.project(self.bbox.south, self.bbox.west);
        let b = self.project(self.bbox.north, self.bbox.east);
        Region {
            min_x: a.x.min(b.x),
            max_x: a.x.max(b.x),
            min_z: a.z.min(b.z),
            max_z: a.z.max(b.z),
        }
    }
}

/// Inclusive block-space rectangle covered by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Westmost column
    pub min_x: i32,
    /// Eastmost column
    pub max_x: i32,
    /// Northmost row
    pub min_z: i32,
    /// Southmost row
    pub max_z: i32,
}

impl Region {
    pub fn contains(&self, c: BlockCoordinate) -> bool {
        c.x >= self.min_x && c.x <= self.max_x && c.z >= self.min_z && c.z <= self.max_z
    }

    pub fn width(&self) -> usize {
        span(self.min_x, self.max_x)
    }

    pub fn depth(&self) -> usize {
        span(self.min_z, self.max_z)
    }

    pub fn area(&self) -> usize {
        self.width().saturating_mul(self.depth())
    }

    /// Every cell, row by row along z.
    pub fn cells(&self) -> impl Iterator<Item = BlockCoordinate> + '_ {
        (self.min_z..=self.max_z)
            .flat_map(move |z| (self.min_x..=self.max_x).map(move |x| BlockCoordinate::new(x, z)))
    }
}

fn span(min: i32, max: i32) -> usize {
    (i64::from(max) - i64::from(min) + 1).max(0) as usize
}
