//! Nearest-hit ray queries
//!
//! Entities are tested first (insertion order, tools skipped), then brushes
//! (list order). The closest non-negative entry distance within the ray
//! length wins; on a tie the earlier candidate is kept.

use log::debug;

use crate::math::{BBox, Ray, Vec3};
use super::{Handle, Scene};

/// Whole categories to leave out of a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IgnoreMask {
    #[default]
    None,
    Entities,
    Brushes,
}

/// Something a ray can hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitObject {
    Entity(Handle),
    /// Index into [`Scene::brushes`]
    Brush(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHit {
    pub object: HitObject,
    pub distance: f32,
    pub point: Vec3,
}

#[derive(Debug, Clone)]
pub struct TraceQuery {
    pub ray: Ray,
    /// `None` uses the scene's ray length
    pub max_distance: Option<f32>,
    pub mask: IgnoreMask,
    pub ignore: Vec<HitObject>,
}

impl TraceQuery {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            ray: Ray::new(origin, direction),
            max_distance: None,
            mask: IgnoreMask::None,
            ignore: Vec::new(),
        }
    }

    /// Trace from `origin` to `point`; nothing beyond the point can be hit
    pub fn toward(origin: Vec3, point: Vec3) -> Self {
        let (ray, distance) = Ray::toward(origin, point);
        Self {
            ray,
            max_distance: Some(distance),
            mask: IgnoreMask::None,
            ignore: Vec::new(),
        }
    }

    /// Trace from the center of an entity's box, ignoring the entity itself
    pub fn from_entity(scene: &Scene, handle: Handle, direction: Vec3) -> Option<Self> {
        let entity = scene.entity(handle)?;
        Some(Self::new(entity.world_bbox().center(), direction).ignoring(HitObject::Entity(handle)))
    }

    pub fn with_mask(mut self, mask: IgnoreMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn ignoring(mut self, object: HitObject) -> Self {
        self.ignore.push(object);
        self
    }

    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.max_distance = Some(max_distance);
        self
    }
}

impl Scene {
    /// Nearest hit along the query ray, or `None` when nothing is hit
    pub fn trace(&self, query: &TraceQuery) -> Option<TraceHit> {
        if query.ray.is_degenerate() {
            return None;
        }
        let max_distance = query.max_distance.unwrap_or(self.ray_length());

        let entities = self
            .entities()
            .filter(|_| query.mask != IgnoreMask::Entities)
            .filter(|(_, e)| !e.is_tool())
            .map(|(h, e)| (HitObject::Entity(h), e.world_bbox()));
        let brushes = self
            .brushes()
            .iter()
            .enumerate()
            .filter(|_| query.mask != IgnoreMask::Brushes)
            .map(|(i, b)| (HitObject::Brush(i), b.bbox));

        let mut best: Option<TraceHit> = None;
        for (object, bbox) in entities.chain(brushes) {
            if query.ignore.contains(&object) {
                continue;
            }
            if let Some(t) = hit_distance(&query.ray, &bbox) {
                if t <= max_distance {
                    let is_closer = best.as_ref().map_or(true, |b| t < b.distance);
                    if is_closer {
                        best = Some(TraceHit {
                            object,
                            distance: t,
                            point: query.ray.at(t),
                        });
                    }
                }
            }
        }

        debug!("trace from {}: {:?}", query.ray.origin, best);
        best
    }
}

fn hit_distance(ray: &Ray, bbox: &BBox) -> Option<f32> {
    ray.intersect(bbox).filter(|t| *t >= 0.0)
}
