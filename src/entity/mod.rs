//! Entity model
//!
//! Every object placed in a level is an [`Entity`]: identity, transform and
//! a local bounding box shared by all variants, plus an [`EntityKind`]
//! carrying variant data. Behavior is a closed set, so per-variant logic is
//! a `match` in [`Entity::update`] and [`Entity::handle_event`].

mod components;
mod event;
mod tool;
pub mod trigger;

pub use components::{integrate, DamageResult, Health, GIB_HEALTH, MAX_VELOCITY};
pub use event::{EntityEvent, EventOutcome, EventPayload, UnknownName};
pub use tool::{AudioBackend, NullAudio, SoundEmitter, SoundHandle, SpawnError, Spawner};
pub use trigger::{Trigger, TriggerBy, TriggerOn, TriggerState, TriggerType};

#[cfg(test)]
pub(crate) use tool::tests::RecordingAudio;

use std::fmt;
use std::str::FromStr;

use log::{debug, info, warn};

use crate::math::{BBox, Vec3};

/// On-disk discriminator of an entity record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityTag {
    Entity,
    Player,
    Npc,
    TestNpc,
    Brush,
    DamageableBrush,
    Trigger,
    Spawner,
    Sound,
}

/// Coarse grouping used by trigger filters and ray traces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityClass {
    Generic,
    Player,
    Npc,
    Brush,
    Tool,
}

impl EntityTag {
    pub const ALL: [EntityTag; 9] = [
        EntityTag::Entity,
        EntityTag::Player,
        EntityTag::Npc,
        EntityTag::TestNpc,
        EntityTag::Brush,
        EntityTag::DamageableBrush,
        EntityTag::Trigger,
        EntityTag::Spawner,
        EntityTag::Sound,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityTag::Entity => "entity",
            EntityTag::Player => "player",
            EntityTag::Npc => "npc",
            EntityTag::TestNpc => "test_npc",
            EntityTag::Brush => "brush",
            EntityTag::DamageableBrush => "damageable_brush",
            EntityTag::Trigger => "trigger",
            EntityTag::Spawner => "spawner",
            EntityTag::Sound => "sound",
        }
    }

    pub fn class(self) -> EntityClass {
        match self {
            EntityTag::Entity | EntityTag::Trigger => EntityClass::Generic,
            EntityTag::Player => EntityClass::Player,
            EntityTag::Npc | EntityTag::TestNpc => EntityClass::Npc,
            EntityTag::Brush | EntityTag::DamageableBrush => EntityClass::Brush,
            EntityTag::Spawner | EntityTag::Sound => EntityClass::Tool,
        }
    }

    pub fn is_tool(self) -> bool {
        self.class() == EntityClass::Tool
    }

    /// Construct this kind at `position` with its per-variant defaults
    pub fn instantiate(self, position: Vec3) -> Entity {
        let kind = match self {
            EntityTag::Entity => EntityKind::Generic,
            EntityTag::Player => EntityKind::Player,
            EntityTag::Npc => EntityKind::Npc,
            EntityTag::TestNpc => EntityKind::TestNpc,
            EntityTag::Brush => EntityKind::Brush,
            EntityTag::DamageableBrush => EntityKind::DamageableBrush,
            EntityTag::Trigger => EntityKind::Trigger(Trigger::new("", EntityEvent::None)),
            EntityTag::Spawner => EntityKind::Spawner(Spawner::default()),
            EntityTag::Sound => EntityKind::Sound(SoundEmitter::default()),
        };

        let mut entity = Entity::new(kind, position);
        match self {
            EntityTag::Player | EntityTag::TestNpc => {
                entity.bbox = BBox::LARGE_ENTITY;
                entity.health = Some(Health::new(100.0));
                entity.velocity = Some(Vec3::ZERO);
            }
            EntityTag::Npc => {
                entity.bbox = BBox::MEDIUM_ENTITY;
                entity.velocity = Some(Vec3::ZERO);
            }
            EntityTag::DamageableBrush => {
                entity.health = Some(Health::new(100.0));
            }
            EntityTag::Trigger => entity.bbox = BBox::MEDIUM_TOOL,
            EntityTag::Spawner | EntityTag::Sound => entity.bbox = BBox::SMALL_TOOL,
            EntityTag::Entity | EntityTag::Brush => {}
        }
        entity
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityTag {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.name() == s)
            .ok_or_else(|| UnknownName::new("entity type", s))
    }
}

/// Variant data
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Generic,
    Player,
    Npc,
    TestNpc,
    Brush,
    DamageableBrush,
    Trigger(Trigger),
    Spawner(Spawner),
    Sound(SoundEmitter),
}

impl EntityKind {
    pub fn tag(&self) -> EntityTag {
        match self {
            EntityKind::Generic => EntityTag::Entity,
            EntityKind::Player => EntityTag::Player,
            EntityKind::Npc => EntityTag::Npc,
            EntityKind::TestNpc => EntityTag::TestNpc,
            EntityKind::Brush => EntityTag::Brush,
            EntityKind::DamageableBrush => EntityTag::DamageableBrush,
            EntityKind::Trigger(_) => EntityTag::Trigger,
            EntityKind::Spawner(_) => EntityTag::Spawner,
            EntityKind::Sound(_) => EntityTag::Sound,
        }
    }
}

/// An object in the level
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Unique within a scene. `None` until spawned or saved.
    pub id: Option<String>,
    pub position: Vec3,
    /// Euler angles in degrees
    pub rotation: Vec3,
    /// Local box, relative to `position`
    pub bbox: BBox,
    /// Present on movable variants
    pub velocity: Option<Vec3>,
    /// Present on damageable variants
    pub health: Option<Health>,
    pub kind: EntityKind,

    // Runtime only, never saved
    alive: bool,
    last_attacker: Option<String>,
}

impl Entity {
    pub fn new(kind: EntityKind, position: Vec3) -> Self {
        Self {
            id: None,
            position,
            rotation: Vec3::ZERO,
            bbox: BBox::POINT,
            velocity: None,
            health: None,
            kind,
            alive: true,
            last_attacker: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_bbox(mut self, bbox: BBox) -> Self {
        self.bbox = bbox;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn tag(&self) -> EntityTag {
        self.kind.tag()
    }

    pub fn class(&self) -> EntityClass {
        self.tag().class()
    }

    pub fn is_tool(&self) -> bool {
        self.class() == EntityClass::Tool
    }

    /// Box in world space
    pub fn world_bbox(&self) -> BBox {
        self.bbox.translated(self.position)
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Id of whoever last damaged this entity
    pub fn last_attacker(&self) -> Option<&str> {
        self.last_attacker.as_deref()
    }

    pub fn trigger(&self) -> Option<&Trigger> {
        match &self.kind {
            EntityKind::Trigger(trigger) => Some(trigger),
            _ => None,
        }
    }

    pub fn trigger_mut(&mut self) -> Option<&mut Trigger> {
        match &mut self.kind {
            EntityKind::Trigger(trigger) => Some(trigger),
            _ => None,
        }
    }

    pub fn spawner(&self) -> Option<&Spawner> {
        match &self.kind {
            EntityKind::Spawner(spawner) => Some(spawner),
            _ => None,
        }
    }

    pub fn sound(&self) -> Option<&SoundEmitter> {
        match &self.kind {
            EntityKind::Sound(sound) => Some(sound),
            _ => None,
        }
    }

    /// Put the entity into its initial runtime state when it enters a scene
    pub(crate) fn spawn(&mut self) {
        self.alive = true;
        self.last_attacker = None;
        if let EntityKind::Trigger(trigger) = &mut self.kind {
            trigger.reset();
        }
    }

    /// Per-tick behavior. Triggers are evaluated by the scene, not here.
    pub fn update(&mut self, dt: f32, audio: &mut dyn AudioBackend) {
        if let Some(velocity) = self.velocity.as_mut() {
            integrate(&mut self.position, velocity, dt);
        }
        if let EntityKind::Sound(sound) = &mut self.kind {
            sound.poll(audio);
        }
    }

    /// Apply a named event. Unsupported events are logged and ignored.
    pub fn handle_event(
        &mut self,
        event: EntityEvent,
        payload: &EventPayload,
        audio: &mut dyn AudioBackend,
    ) -> EventOutcome {
        match event {
            EntityEvent::None => EventOutcome::Handled,
            EntityEvent::Kill => {
                self.die(false);
                EventOutcome::Handled
            }
            EntityEvent::Delete => {
                self.alive = false;
                EventOutcome::Remove
            }
            EntityEvent::SetHealth => match self.health.as_mut() {
                Some(health) => {
                    let result = health.set(payload.value);
                    self.apply_damage_result(result);
                    EventOutcome::Handled
                }
                None => self.unsupported(event),
            },
            EntityEvent::TakeDamage => {
                self.take_damage(payload.value, payload.source.as_deref())
            }
            EntityEvent::SetPosition => match payload.vector {
                Some(position) => {
                    self.position = position;
                    EventOutcome::Handled
                }
                None => {
                    warn!("{}: set_position without a vector value", self);
                    EventOutcome::Ignored
                }
            },
            EntityEvent::SpawnEntity => match self.kind {
                EntityKind::Spawner(_) => EventOutcome::Spawn,
                _ => self.unsupported(event),
            },
            EntityEvent::PlaySound | EntityEvent::StopSound => match &mut self.kind {
                EntityKind::Sound(sound) => {
                    if event == EntityEvent::PlaySound {
                        sound.play(audio);
                    } else {
                        sound.stop(audio);
                    }
                    EventOutcome::Handled
                }
                _ => self.unsupported(event),
            },
        }
    }

    /// Damage from `source`. Entities without health ignore it.
    pub fn take_damage(&mut self, amount: f32, source: Option<&str>) -> EventOutcome {
        if !self.alive {
            debug!("{}: ignoring damage, already dead", self);
            return EventOutcome::Ignored;
        }
        let Some(health) = self.health.as_mut() else {
            return self.unsupported(EntityEvent::TakeDamage);
        };

        let result = health.damage(amount);
        self.last_attacker = source.map(str::to_string);
        self.apply_damage_result(result);
        EventOutcome::Handled
    }

    fn apply_damage_result(&mut self, result: DamageResult) {
        match result {
            DamageResult::Survived => {}
            DamageResult::Died => self.die(false),
            DamageResult::Gibbed => self.die(true),
        }
    }

    fn die(&mut self, gibbed: bool) {
        if !self.alive {
            return;
        }
        self.alive = false;
        if let Some(velocity) = self.velocity.as_mut() {
            *velocity = Vec3::ZERO;
        }
        match (&self.last_attacker, gibbed) {
            (Some(attacker), true) => info!("{} was gibbed by {}", self, attacker),
            (Some(attacker), false) => info!("{} was killed by {}", self, attacker),
            (None, true) => info!("{} was gibbed", self),
            (None, false) => info!("{} died", self),
        }
    }

    fn unsupported(&self, event: EntityEvent) -> EventOutcome {
        warn!("{} does not handle event {}", self, event);
        EventOutcome::Ignored
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} (\"{}\")", self.tag(), id),
            None => write!(f, "{} (unnamed)", self.tag()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_parse_and_classify() {
        assert_eq!("damageable_brush".parse::<EntityTag>(), Ok(EntityTag::DamageableBrush));
        assert!("monster".parse::<EntityTag>().is_err());
        assert_eq!(EntityTag::TestNpc.class(), EntityClass::Npc);
        assert!(EntityTag::Sound.is_tool());
        assert!(!EntityTag::Trigger.is_tool());
    }

    #[test]
    fn test_factory_defaults() {
        let player = EntityTag::Player.instantiate(Vec3::ZERO);
        assert_eq!(player.bbox, BBox::LARGE_ENTITY);
        assert_eq!(player.health, Some(Health::new(100.0)));
        assert_eq!(player.velocity, Some(Vec3::ZERO));

        let wall = EntityTag::DamageableBrush.instantiate(Vec3::ZERO);
        assert_eq!(wall.health.map(|h| h.current), Some(100.0));
        assert_eq!(wall.velocity, None);

        let spawner = EntityTag::Spawner.instantiate(Vec3::ZERO);
        assert_eq!(spawner.bbox, BBox::SMALL_TOOL);
        assert_eq!(spawner.health, None);
    }

    #[test]
    fn test_update_moves_with_velocity() {
        let mut npc = EntityTag::TestNpc
            .instantiate(Vec3::ZERO)
            .with_velocity(Vec3::new(10.0, 0.0, 0.0));
        npc.update(0.5, &mut NullAudio);
        assert_eq!(npc.position, Vec3::new(5.0, 0.0, 0.0));

        // No velocity, no movement
        let mut crate_box = EntityTag::Entity.instantiate(Vec3::ONE);
        crate_box.update(1.0, &mut NullAudio);
        assert_eq!(crate_box.position, Vec3::ONE);
    }

    #[test]
    fn test_take_damage_kills_and_gibs() {
        let mut audio = NullAudio;
        let mut npc = EntityTag::TestNpc.instantiate(Vec3::ZERO).with_id("grunt");

        let hit = EventPayload::value(60.0).from_source("trap");
        assert_eq!(npc.handle_event(EntityEvent::TakeDamage, &hit, &mut audio), EventOutcome::Handled);
        assert!(npc.is_alive());
        npc.handle_event(EntityEvent::TakeDamage, &hit, &mut audio);
        assert!(!npc.is_alive());
        assert_eq!(npc.last_attacker(), Some("trap"));

        let mut other = EntityTag::Player.instantiate(Vec3::ZERO);
        other.take_damage(130.0, None);
        assert!(!other.is_alive());
        assert!(other.health.is_some_and(|h| h.current <= GIB_HEALTH));
    }

    #[test]
    fn test_damage_without_health_is_ignored() {
        let mut plain = EntityTag::Entity.instantiate(Vec3::ZERO);
        let outcome = plain.handle_event(EntityEvent::TakeDamage, &EventPayload::value(10.0), &mut NullAudio);
        assert_eq!(outcome, EventOutcome::Ignored);
        assert!(plain.is_alive());
    }

    #[test]
    fn test_event_outcomes() {
        let mut audio = NullAudio;
        let none = EventPayload::default();

        let mut e = EntityTag::Entity.instantiate(Vec3::ZERO);
        assert_eq!(e.handle_event(EntityEvent::Delete, &none, &mut audio), EventOutcome::Remove);
        assert_eq!(e.handle_event(EntityEvent::SpawnEntity, &none, &mut audio), EventOutcome::Ignored);

        let mut s = EntityTag::Spawner.instantiate(Vec3::ZERO);
        assert_eq!(s.handle_event(EntityEvent::SpawnEntity, &none, &mut audio), EventOutcome::Spawn);

        let moved = EventPayload::default().with_vector(Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(e.handle_event(EntityEvent::SetPosition, &moved, &mut audio), EventOutcome::Handled);
        assert_eq!(e.position, Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_sound_events_reach_backend() {
        let mut audio = RecordingAudio::default();
        let mut sound = EntityTag::Sound.instantiate(Vec3::ZERO);
        if let EntityKind::Sound(emitter) = &mut sound.kind {
            emitter.audio_path = "sfx/bell.wav".to_string();
        }
        sound.handle_event(EntityEvent::PlaySound, &EventPayload::default(), &mut audio);
        assert_eq!(audio.started, vec!["sfx/bell.wav".to_string()]);
        sound.handle_event(EntityEvent::StopSound, &EventPayload::default(), &mut audio);
        assert_eq!(audio.stopped.len(), 1);
    }
}
