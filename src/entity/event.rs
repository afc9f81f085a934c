//! Named actions that triggers (and the console) deliver to entities

use std::fmt;
use std::str::FromStr;

use crate::math::Vec3;

/// A named action an entity may respond to.
///
/// The lowercase names are what level files and console commands use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityEvent {
    #[default]
    None,
    Kill,
    Delete,
    SetHealth,
    TakeDamage,
    SetPosition,
    SpawnEntity,
    PlaySound,
    StopSound,
}

impl EntityEvent {
    pub const ALL: [EntityEvent; 9] = [
        EntityEvent::None,
        EntityEvent::Kill,
        EntityEvent::Delete,
        EntityEvent::SetHealth,
        EntityEvent::TakeDamage,
        EntityEvent::SetPosition,
        EntityEvent::SpawnEntity,
        EntityEvent::PlaySound,
        EntityEvent::StopSound,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityEvent::None => "none",
            EntityEvent::Kill => "kill",
            EntityEvent::Delete => "delete",
            EntityEvent::SetHealth => "set_health",
            EntityEvent::TakeDamage => "take_damage",
            EntityEvent::SetPosition => "set_position",
            EntityEvent::SpawnEntity => "spawn_entity",
            EntityEvent::PlaySound => "play_sound",
            EntityEvent::StopSound => "stop_sound",
        }
    }
}

impl fmt::Display for EntityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A name that is not one of the known tags or events
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what} \"{name}\"")]
pub struct UnknownName {
    pub what: &'static str,
    pub name: String,
}

impl UnknownName {
    pub fn new(what: &'static str, name: &str) -> Self {
        Self { what, name: name.to_string() }
    }
}

impl FromStr for EntityEvent {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityEvent::ALL
            .iter()
            .copied()
            .find(|event| event.name() == s)
            .ok_or_else(|| UnknownName::new("event", s))
    }
}

/// Arguments that travel with an event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPayload {
    /// Numeric argument (damage, health)
    pub value: f32,
    /// Vector argument (position)
    pub vector: Option<Vec3>,
    /// Id of whoever sent the event
    pub source: Option<String>,
}

impl EventPayload {
    pub fn value(value: f32) -> Self {
        Self { value, ..Default::default() }
    }

    pub fn with_vector(mut self, vector: Vec3) -> Self {
        self.vector = Some(vector);
        self
    }

    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// What the scene must do after an entity handled an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Handled,
    /// The entity does not respond to this event
    Ignored,
    /// Remove the entity from the scene
    Remove,
    /// The entity is a spawner and asked the scene to spawn its product
    Spawn,
}
