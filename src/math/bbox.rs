//! Axis-aligned bounding boxes
//!
//! Entities carry a box in local space (relative to their position);
//! brushes carry one in world space. All tests treat the box as closed,
//! so boxes that share a face overlap and a point on a face is inside.

use serde::{Serialize, Deserialize};
use super::vec3::Vec3;

/// Below this magnitude a ray direction component counts as parallel to the slab
const PARALLEL_EPSILON: f32 = 1e-6;

/// An axis-aligned box given by its minimum and maximum corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BBox {
    /// Unit box, +-1 on every axis
    pub const ONE: BBox = BBox::new(Vec3::splat(-1.0), Vec3::splat(1.0));
    pub const SMALL_TOOL: BBox = BBox::new(Vec3::splat(-8.0), Vec3::splat(8.0));
    pub const MEDIUM_TOOL: BBox = BBox::new(Vec3::splat(-16.0), Vec3::splat(16.0));
    pub const LARGE_TOOL: BBox = BBox::new(Vec3::splat(-32.0), Vec3::splat(32.0));
    /// Entity boxes stand on their origin: z runs from 0 upwards
    pub const SMALL_ENTITY: BBox = BBox::new(Vec3::new(-8.0, -8.0, 0.0), Vec3::new(8.0, 8.0, 16.0));
    pub const MEDIUM_ENTITY: BBox = BBox::new(Vec3::new(-16.0, -16.0, 0.0), Vec3::new(16.0, 16.0, 32.0));
    pub const LARGE_ENTITY: BBox = BBox::new(Vec3::new(-32.0, -32.0, 0.0), Vec3::new(32.0, 32.0, 64.0));
    /// Degenerate box for point entities
    pub const POINT: BBox = BBox::new(Vec3::ZERO, Vec3::ZERO);

    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Build a box from two arbitrary corners, ordering the components
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    /// `min <= max` on every axis and no NaN/infinite components
    pub fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.min.x <= self.max.x
            && self.min.y <= self.max.y
            && self.min.z <= self.max.z
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// The same box moved by `offset` (local -> world for entity boxes)
    pub fn translated(&self, offset: Vec3) -> BBox {
        BBox::new(self.min + offset, self.max + offset)
    }

    /// Interval overlap on all three axes. Touching faces count.
    pub fn overlaps(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Slab test. Returns the parametric entry distance along `direction`,
    /// clamped to 0 when `origin` is already inside the box.
    ///
    /// Distances are measured in multiples of `direction`, so pass a
    /// normalized direction to get world units back.
    pub fn ray_intersect(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let o = origin.axis(axis);
            let d = direction.axis(axis);
            let lo = self.min.axis(axis);
            let hi = self.max.axis(axis);

            if d.abs() < PARALLEL_EPSILON {
                // Parallel to this slab: the origin has to be inside it already
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let mut t1 = (lo - o) / d;
            let mut t2 = (hi - o) / d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }

        if t_max < 0.0 {
            return None;
        }
        Some(t_min.max(0.0))
    }
}

impl Default for BBox {
    fn default() -> Self {
        BBox::POINT
    }
}

impl std::fmt::Display for BBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}, {}}}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(center: Vec3, half: f32) -> BBox {
        BBox::new(center - Vec3::splat(half), center + Vec3::splat(half))
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let boxes = [
            cube(Vec3::ZERO, 1.0),
            cube(Vec3::new(2.0, 0.0, 0.0), 1.0),
            cube(Vec3::new(2.5, 0.0, 0.0), 1.0),
            cube(Vec3::new(0.0, 0.0, 10.0), 3.0),
            BBox::POINT,
            BBox::LARGE_ENTITY,
        ];
        for a in &boxes {
            for b in &boxes {
                assert_eq!(a.overlaps(b), b.overlaps(a), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_touching_faces_overlap() {
        let a = cube(Vec3::ZERO, 1.0);
        let b = cube(Vec3::new(2.0, 0.0, 0.0), 1.0);
        let c = cube(Vec3::new(2.01, 0.0, 0.0), 1.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_contains_point_on_face() {
        let a = cube(Vec3::ZERO, 1.0);
        assert!(a.contains_point(Vec3::new(1.0, 0.0, 0.0)));
        assert!(!a.contains_point(Vec3::new(1.0, 1.5, 0.0)));
    }

    #[test]
    fn test_ray_hits_entry_distance() {
        let a = cube(Vec3::new(10.0, 0.0, 0.0), 1.0);
        let t = a.ray_intersect(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(t, Some(9.0));
    }

    #[test]
    fn test_ray_behind_origin_misses() {
        let a = cube(Vec3::new(-10.0, 0.0, 0.0), 1.0);
        assert_eq!(a.ray_intersect(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)), None);
    }

    #[test]
    fn test_ray_from_inside_clamps_to_zero() {
        let a = cube(Vec3::ZERO, 5.0);
        assert_eq!(a.ray_intersect(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0)), Some(0.0));
    }

    #[test]
    fn test_parallel_ray_outside_slab_misses() {
        let a = cube(Vec3::new(10.0, 0.0, 0.0), 1.0);
        // Runs along x but 5 units above the box
        assert_eq!(a.ray_intersect(Vec3::new(0.0, 5.0, 0.0), Vec3::new(1.0, 0.0, 0.0)), None);
        // Same ray inside the y/z slabs hits
        assert!(a.ray_intersect(Vec3::new(0.0, 0.5, 0.0), Vec3::new(1.0, 0.0, 0.0)).is_some());
    }

    #[test]
    fn test_from_corners_orders_components() {
        let b = BBox::from_corners(Vec3::new(5.0, -1.0, 2.0), Vec3::new(1.0, 3.0, -2.0));
        assert!(b.is_valid());
        assert_eq!(b.min, Vec3::new(1.0, -1.0, -2.0));
        assert_eq!(b.max, Vec3::new(5.0, 3.0, 2.0));
        assert!(!BBox::new(Vec3::ONE, Vec3::ZERO).is_valid());
    }
}
