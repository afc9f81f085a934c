//! Rays for scene queries

use super::bbox::BBox;
use super::vec3::Vec3;

/// A 3D ray with origin and direction
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,  // Normalized
}

impl Ray {
    /// Create a new ray, normalizing the direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize()
        }
    }

    /// Ray from `origin` aimed at `target`, plus the distance between them
    pub fn toward(origin: Vec3, target: Vec3) -> (Self, f32) {
        let delta = target - origin;
        (Self::new(origin, delta), delta.len())
    }

    /// Get point at distance t along ray
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// A zero direction cannot hit anything
    pub fn is_degenerate(&self) -> bool {
        self.direction == Vec3::ZERO
    }

    /// Entry distance into `bbox` in world units
    pub fn intersect(&self, bbox: &BBox) -> Option<f32> {
        if self.is_degenerate() {
            return None;
        }
        bbox.ray_intersect(self.origin, self.direction)
    }
}
