//! Dispatched event log
//!
//! Every successful trigger fire is recorded here during the update pass.
//! The runtime drains the queue after each tick so collaborators (audio,
//! UI, logging) can react without the dispatcher knowing about them.

use crate::entity::EntityEvent;

/// A queue for events of a single type.
/// Events are collected during the tick and drained at specific points.
#[derive(Debug)]
pub struct EventQueue<T> {
    events: Vec<T>,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Send an event (add to queue)
    pub fn send(&mut self, event: T) {
        self.events.push(event);
    }

    /// Drain all events (returns iterator and clears queue)
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.events.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A trigger delivered its event to a resolved target
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedEvent {
    /// Id of the trigger that fired
    pub trigger: String,
    /// Id of the entity that received the event
    pub target: String,
    /// Entity whose overlap transition caused the fire
    pub activator: Option<String>,
    pub event: EntityEvent,
    pub value: f32,
}
