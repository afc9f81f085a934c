//! Shared entity data: health and movement
//!
//! Variants opt into these by carrying `Some(..)` in the matching
//! [`Entity`](super::Entity) field. An entity without health cannot take
//! damage; an entity without velocity never moves on its own.

use serde::{Serialize, Deserialize};
use crate::math::Vec3;

// =============================================================================
// Combat
// =============================================================================

/// Health at or below this value dies with a gib
pub const GIB_HEALTH: f32 = -25.0;

/// Health component for damageable entities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

/// What a hit did to the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageResult {
    Survived,
    Died,
    /// Died badly enough to fall apart
    Gibbed,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Subtract `amount`. Health is not clamped at zero, so overkill can gib.
    pub fn damage(&mut self, amount: f32) -> DamageResult {
        self.current -= amount;
        self.result()
    }

    /// Overwrite current health, reporting death the same way damage does
    pub fn set(&mut self, value: f32) -> DamageResult {
        self.current = value;
        self.result()
    }

    pub fn heal(&mut self, amount: f32) {
        self.current = (self.current + amount).min(self.max);
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    fn result(&self) -> DamageResult {
        if self.current <= GIB_HEALTH {
            DamageResult::Gibbed
        } else if self.is_dead() {
            DamageResult::Died
        } else {
            DamageResult::Survived
        }
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

// =============================================================================
// Movement
// =============================================================================

/// Per-axis speed cap, units per second
pub const MAX_VELOCITY: f32 = 225.0;
/// Fraction of velocity lost per second
pub const DRAG: f32 = 0.75;
/// Below this speed an entity comes to rest
pub const REST_SPEED: f32 = 0.01;

/// Advance `position` by `velocity` over `dt` seconds, then apply drag.
pub fn integrate(position: &mut Vec3, velocity: &mut Vec3, dt: f32) {
    *velocity = velocity.clamp(-MAX_VELOCITY, MAX_VELOCITY);
    *position += *velocity * dt;

    let damping = (1.0 - DRAG * dt).max(0.0);
    *velocity = *velocity * damping;
    if velocity.len() <= REST_SPEED {
        *velocity = Vec3::ZERO;
    }
}
