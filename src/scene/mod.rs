//! Live scene
//!
//! The runtime registry of instantiated entities. Entities live in
//! generational slots; a string-id index gives O(1) lookup by the ids
//! triggers and console commands refer to, and an order list keeps
//! iteration in insertion order.

mod dispatch;
mod event;
mod handle;
mod storage;
mod trace;

pub use event::{DispatchedEvent, EventQueue};
pub use handle::{Handle, HandleAllocator};
pub use trace::{HitObject, IgnoreMask, TraceHit, TraceQuery};

use std::collections::HashMap;
use std::path::PathBuf;

use log::{info, warn};

use crate::entity::{Entity, EntityTag, SpawnError};
use crate::level::{ids, Brush, LevelFile};
use storage::Slots;

/// Default ray length for traces without an explicit limit
pub const DEFAULT_RAY_LENGTH: f32 = 5000.0;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("id \"{0}\" is already taken")]
    DuplicateId(String),
    #[error("no entity with id \"{0}\"")]
    NotFound(String),
}

pub struct Scene {
    handles: HandleAllocator,
    entities: Slots<Entity>,
    /// Live handles in insertion order
    order: Vec<Handle>,
    ids: HashMap<String, Handle>,
    brushes: Vec<Brush>,
    events: EventQueue<DispatchedEvent>,
    ray_length: f32,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            handles: HandleAllocator::new(),
            entities: Slots::new(),
            order: Vec::new(),
            ids: HashMap::new(),
            brushes: Vec::new(),
            events: EventQueue::new(),
            ray_length: DEFAULT_RAY_LENGTH,
        }
    }

    /// Instantiate every record of `level`. Missing ids are filled in
    /// exactly as the saver would, so every authored id is reserved before
    /// any is generated. Records whose id is already taken are dropped with
    /// a warning.
    pub fn from_level(level: &LevelFile) -> Self {
        let mut named = level.clone();
        named.assign_missing_ids();

        let mut scene = Scene::new();
        for entity in named.entities {
            let name = entity.to_string();
            if let Err(e) = scene.add(entity) {
                warn!("{}: dropping {}: {}", level.path.display(), name, e);
            }
        }
        for brush in named.brushes {
            if let Err(e) = scene.add_brush(brush) {
                warn!("{}: dropping brush: {}", level.path.display(), e);
            }
        }
        scene
    }

    pub fn with_ray_length(mut self, ray_length: f32) -> Self {
        self.ray_length = ray_length;
        self
    }

    pub fn ray_length(&self) -> f32 {
        self.ray_length
    }

    /// Register an entity, assigning an id if it has none.
    pub fn add(&mut self, mut entity: Entity) -> Result<Handle, SceneError> {
        let id = match entity.id.take() {
            Some(id) if self.ids.contains_key(&id) => {
                return Err(SceneError::DuplicateId(id));
            }
            Some(id) => id,
            None => ids::entity_id(entity.tag(), self.order.len(), |c| self.ids.contains_key(c)),
        };

        entity.id = Some(id.clone());
        entity.spawn();

        let handle = self.handles.allocate();
        self.entities.insert(handle, entity);
        self.ids.insert(id, handle);
        self.order.push(handle);
        Ok(handle)
    }

    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        let handle = self.ids.remove(id)?;
        self.order.retain(|h| *h != handle);
        self.handles.free(handle);
        self.entities.remove(handle)
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entity(*self.ids.get(id)?)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Entity> {
        let handle = *self.ids.get(id)?;
        self.entities.get_mut(handle)
    }

    pub fn handle(&self, id: &str) -> Option<Handle> {
        self.ids.get(id).copied()
    }

    pub fn entity(&self, handle: Handle) -> Option<&Entity> {
        self.entities.get(handle)
    }

    pub fn entity_mut(&mut self, handle: Handle) -> Option<&mut Entity> {
        self.entities.get_mut(handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.handles.is_alive(handle)
    }

    /// Entities in insertion order, with their handles
    pub fn entities(&self) -> impl Iterator<Item = (Handle, &Entity)> + '_ {
        self.order
            .iter()
            .filter_map(move |&h| self.entities.get(h).map(|e| (h, e)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// First player in insertion order
    pub fn player(&self) -> Option<&Entity> {
        self.entities()
            .map(|(_, e)| e)
            .find(|e| e.tag() == EntityTag::Player)
    }

    pub fn brushes(&self) -> &[Brush] {
        &self.brushes
    }

    /// Add a brush, naming it if needed. Returns its index.
    pub fn add_brush(&mut self, mut brush: Brush) -> Result<usize, SceneError> {
        let brushes = &self.brushes;
        let is_taken = |c: &str| brushes.iter().any(|b| b.id.as_deref() == Some(c));
        match brush.id.as_deref() {
            Some(id) if is_taken(id) => return Err(SceneError::DuplicateId(id.to_string())),
            Some(_) => {}
            None => brush.id = Some(ids::brush_id(brushes.len(), is_taken)),
        }
        self.brushes.push(brush);
        Ok(self.brushes.len() - 1)
    }

    /// Events fired since the last drain
    pub fn events_mut(&mut self) -> &mut EventQueue<DispatchedEvent> {
        &mut self.events
    }

    /// Ask the spawner `spawner_id` to produce its entity
    pub fn spawn_from(&mut self, spawner_id: &str) -> Result<Handle, SpawnError> {
        let spawner = self
            .get(spawner_id)
            .ok_or_else(|| SpawnError::NotFound(spawner_id.to_string()))?;
        let product = spawner
            .spawner()
            .ok_or_else(|| SpawnError::NotASpawner(spawner_id.to_string()))?
            .build(spawner.position)?;

        let handle = self.add(product)?;
        if let Some(entity) = self.entity(handle) {
            info!("{} spawned {}", spawner_id, entity);
        }
        Ok(handle)
    }

    /// Snapshot the live scene as a level file.
    ///
    /// Only authored data is written: dead entities are saved like live
    /// ones and triggers lose their Used state and fire counts, so a
    /// reloaded snapshot starts fresh.
    pub fn to_level(&self, path: impl Into<PathBuf>) -> LevelFile {
        LevelFile {
            path: path.into(),
            entities: self.entities().map(|(_, e)| e.clone()).collect(),
            brushes: self.brushes.clone(),
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
