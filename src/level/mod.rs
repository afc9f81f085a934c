//! Level file model
//!
//! A `LevelFile` is what lives on disk: an ordered list of entities and an
//! ordered list of world-space brushes. It is edited directly by tools and
//! instantiated into a [`Scene`](crate::scene::Scene) to be played.

pub mod ids;
mod io;
mod record;

pub use io::{compress, limits, load_level, load_level_from_str, save_level, serialize_level, LevelError};
pub use record::RecordError;

use std::collections::HashSet;
use std::path::PathBuf;

use crate::entity::{Entity, EntityTag};
use crate::math::BBox;

/// Static level geometry. The box is in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    pub id: Option<String>,
    pub bbox: BBox,
}

impl Brush {
    pub fn new(bbox: BBox) -> Self {
        Self { id: None, bbox }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct LevelFile {
    /// Where the level was loaded from or last saved to
    pub path: PathBuf,
    pub entities: Vec<Entity>,
    pub brushes: Vec<Brush>,
}

impl LevelFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    pub fn find_entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id.as_deref() == Some(id))
    }

    pub fn find_entity_mut(&mut self, id: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id.as_deref() == Some(id))
    }

    /// First player in the file
    pub fn player(&self) -> Option<&Entity> {
        self.entities.iter().find(|e| e.tag() == EntityTag::Player)
    }

    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    pub fn remove_entity(&mut self, id: &str) -> Option<Entity> {
        let index = self.entities.iter().position(|e| e.id.as_deref() == Some(id))?;
        Some(self.entities.remove(index))
    }

    pub fn add_brush(&mut self, brush: Brush) {
        self.brushes.push(brush);
    }

    pub fn remove_brush(&mut self, id: &str) -> Option<Brush> {
        let index = self.brushes.iter().position(|b| b.id.as_deref() == Some(id))?;
        Some(self.brushes.remove(index))
    }

    /// Give every entity and brush without an id one, in list order.
    /// Existing ids are left alone.
    pub fn assign_missing_ids(&mut self) {
        let mut taken: HashSet<String> = self.entities.iter().filter_map(|e| e.id.clone()).collect();
        for (index, entity) in self.entities.iter_mut().enumerate() {
            if entity.id.is_none() {
                let id = ids::entity_id(entity.tag(), index, |c| taken.contains(c));
                taken.insert(id.clone());
                entity.id = Some(id);
            }
        }

        let mut taken: HashSet<String> = self.brushes.iter().filter_map(|b| b.id.clone()).collect();
        for (index, brush) in self.brushes.iter_mut().enumerate() {
            if brush.id.is_none() {
                let id = ids::brush_id(index, |c| taken.contains(c));
                taken.insert(id.clone());
                brush.id = Some(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    #[test]
    fn test_editing_helpers() {
        let mut level = LevelFile::new("maps/test.map");
        level.add_entity(EntityTag::Npc.instantiate(Vec3::ZERO).with_id("a"));
        level.add_entity(EntityTag::Player.instantiate(Vec3::ONE).with_id("hero"));
        level.add_brush(Brush::new(BBox::ONE).with_id("floor"));

        assert_eq!(level.player().and_then(|p| p.id.as_deref()), Some("hero"));
        assert!(level.find_entity("a").is_some());
        assert!(level.remove_entity("a").is_some());
        assert!(level.find_entity("a").is_none());
        assert!(level.remove_brush("floor").is_some());
        assert!(level.brushes.is_empty());
    }

    #[test]
    fn test_second_player_gets_numbered_id() {
        let mut level = LevelFile::default();
        level.add_entity(EntityTag::Player.instantiate(Vec3::ZERO));
        level.add_entity(EntityTag::Player.instantiate(Vec3::ZERO));
        level.assign_missing_ids();
        assert_eq!(level.entities[0].id.as_deref(), Some("player"));
        assert_eq!(level.entities[1].id.as_deref(), Some("entity 1"));
    }
}
