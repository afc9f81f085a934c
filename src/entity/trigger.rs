//! Trigger volumes
//!
//! A trigger watches its own box for overlapping entities and, on the
//! configured transition, fires a named event at another entity looked up
//! by id when it fires. This module only holds the per-trigger state
//! machine; gathering overlaps and delivering the event is the scene's job
//! (see `scene::dispatch`).
//!
//! ```text
//!   Armed --fire--> Armed   (Multiple, or Count below its limit)
//!   Armed --fire--> Used    (Once, or the last Count fire)
//! ```

use std::fmt;
use std::str::FromStr;

use crate::math::Vec3;
use crate::scene::Handle;
use super::event::{EntityEvent, EventPayload, UnknownName};
use super::EntityClass;

/// How many times a trigger may fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerType {
    #[default]
    Once,
    /// Fires at most `n` times
    Count(u32),
    Multiple,
}

impl TriggerType {
    pub fn name(self) -> &'static str {
        match self {
            TriggerType::Once => "once",
            TriggerType::Count(_) => "count",
            TriggerType::Multiple => "multiple",
        }
    }

    /// Build from the on-disk name plus the separate fire limit used by `count`
    pub fn from_name(name: &str, count: Option<u32>) -> Result<Self, UnknownName> {
        match name {
            "once" => Ok(TriggerType::Once),
            "multiple" => Ok(TriggerType::Multiple),
            "count" => Ok(TriggerType::Count(count.unwrap_or(1))),
            _ => Err(UnknownName::new("trigger type", name)),
        }
    }

    /// Fire limit, if the type has one
    pub fn limit(self) -> Option<u32> {
        match self {
            TriggerType::Once => Some(1),
            TriggerType::Count(n) => Some(n),
            TriggerType::Multiple => None,
        }
    }
}

/// Which entities can activate a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerBy {
    #[default]
    All,
    Player,
    Npcs,
}

impl TriggerBy {
    pub fn name(self) -> &'static str {
        match self {
            TriggerBy::All => "all",
            TriggerBy::Player => "player",
            TriggerBy::Npcs => "npcs",
        }
    }

    /// Tools never activate triggers, whatever the filter says
    pub fn accepts(self, class: EntityClass) -> bool {
        match (self, class) {
            (_, EntityClass::Tool) => false,
            (TriggerBy::All, _) => true,
            (TriggerBy::Player, EntityClass::Player) => true,
            (TriggerBy::Npcs, EntityClass::Npc) => true,
            _ => false,
        }
    }
}

impl FromStr for TriggerBy {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(TriggerBy::All),
            "player" => Ok(TriggerBy::Player),
            "npcs" => Ok(TriggerBy::Npcs),
            _ => Err(UnknownName::new("trigger filter", s)),
        }
    }
}

/// Which overlap transition fires a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerOn {
    /// Entity overlaps now but did not last tick
    #[default]
    Enter,
    /// Entity overlaps now
    Stay,
    /// Entity overlapped last tick but does not now
    Exit,
}

impl TriggerOn {
    pub fn name(self) -> &'static str {
        match self {
            TriggerOn::Enter => "enter",
            TriggerOn::Stay => "stay",
            TriggerOn::Exit => "exit",
        }
    }
}

impl FromStr for TriggerOn {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enter" => Ok(TriggerOn::Enter),
            "stay" => Ok(TriggerOn::Stay),
            "exit" => Ok(TriggerOn::Exit),
            _ => Err(UnknownName::new("trigger transition", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerState {
    #[default]
    Armed,
    /// Terminal
    Used,
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerState::Armed => f.write_str("armed"),
            TriggerState::Used => f.write_str("used"),
        }
    }
}

/// Data of the trigger variant
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub trigger_type: TriggerType,
    pub trigger_by: TriggerBy,
    pub trigger_on: TriggerOn,
    /// Id of the entity that receives the event; resolved on every fire
    pub target_entity: String,
    pub target_event: EntityEvent,
    pub f_value: f32,
    pub v_value: Option<Vec3>,

    // Runtime only
    state: TriggerState,
    fire_count: u32,
    /// Entities that overlapped on the previous evaluation
    occupants: Vec<Handle>,
}

impl Trigger {
    pub fn new(target_entity: impl Into<String>, target_event: EntityEvent) -> Self {
        Self {
            trigger_type: TriggerType::Once,
            trigger_by: TriggerBy::All,
            trigger_on: TriggerOn::Enter,
            target_entity: target_entity.into(),
            target_event,
            f_value: 0.0,
            v_value: None,
            state: TriggerState::Armed,
            fire_count: 0,
            occupants: Vec::new(),
        }
    }

    pub fn with_type(mut self, trigger_type: TriggerType) -> Self {
        self.trigger_type = trigger_type;
        self
    }

    pub fn with_filter(mut self, trigger_by: TriggerBy) -> Self {
        self.trigger_by = trigger_by;
        self
    }

    pub fn with_transition(mut self, trigger_on: TriggerOn) -> Self {
        self.trigger_on = trigger_on;
        self
    }

    pub fn with_value(mut self, value: f32) -> Self {
        self.f_value = value;
        self
    }

    pub fn with_vector(mut self, vector: Vec3) -> Self {
        self.v_value = Some(vector);
        self
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == TriggerState::Armed
    }

    pub fn fire_count(&self) -> u32 {
        self.fire_count
    }

    pub fn occupants(&self) -> &[Handle] {
        &self.occupants
    }

    /// Payload delivered with `target_event`
    pub fn payload(&self, source: Option<&str>) -> EventPayload {
        EventPayload {
            value: self.f_value,
            vector: self.v_value,
            source: source.map(str::to_string),
        }
    }

    /// Record this tick's overlapping entities (in registry order) and
    /// return the entity that should activate the trigger, if any.
    ///
    /// Occupancy is refreshed even when nothing qualifies, so an Enter
    /// trigger needs the entity to leave before it can re-enter.
    pub fn observe(&mut self, overlapping: Vec<Handle>) -> Option<Handle> {
        let previous = std::mem::replace(&mut self.occupants, overlapping);
        if !self.is_armed() {
            return None;
        }

        match self.trigger_on {
            TriggerOn::Enter => self
                .occupants
                .iter()
                .copied()
                .find(|h| !previous.contains(h)),
            TriggerOn::Stay => self.occupants.first().copied(),
            TriggerOn::Exit => previous
                .iter()
                .copied()
                .find(|h| !self.occupants.contains(h)),
        }
    }

    /// Called after the event reached its target
    pub fn record_fire(&mut self) {
        self.fire_count += 1;
        if let Some(limit) = self.trigger_type.limit() {
            if self.fire_count >= limit {
                self.state = TriggerState::Used;
            }
        }
    }

    /// Back to a freshly spawned trigger
    pub fn reset(&mut self) {
        self.state = if self.trigger_type.limit() == Some(0) {
            TriggerState::Used
        } else {
            TriggerState::Armed
        };
        self.fire_count = 0;
        self.occupants.clear();
    }
}
