//! Geometry primitives
//!
//! Small value types shared by every other module: vectors, boxes and rays.

mod bbox;
mod ray;
mod vec3;

pub use bbox::BBox;
pub use ray::Ray;
pub use vec3::Vec3;
