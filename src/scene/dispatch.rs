//! The update pass and trigger dispatch
//!
//! One pass over live entities in insertion order: movement and sound
//! polling through [`Entity::update`], then, for armed triggers, overlap
//! gathering and firing. Targets are looked up by id on every fire, so a
//! trigger may point at an entity that is spawned later or never exists.

use log::{debug, error, trace};

use crate::entity::{AudioBackend, Entity, EntityEvent, EventOutcome, EventPayload};
use super::{DispatchedEvent, Handle, Scene, SceneError};

impl Scene {
    /// Advance every live entity by `dt` seconds
    pub fn tick(&mut self, dt: f32, audio: &mut dyn AudioBackend) {
        // Entities removed or spawned during the pass are handled by the
        // slot lookups; newcomers wait for the next tick.
        let order = self.order.clone();
        for handle in order {
            let armed_trigger = match self.entities.get_mut(handle) {
                Some(entity) if entity.is_alive() => {
                    entity.update(dt, audio);
                    entity.trigger().is_some_and(|t| t.is_armed())
                }
                _ => continue,
            };
            if armed_trigger {
                self.evaluate_trigger(handle, audio);
            }
        }
    }

    /// Live, non-tool entities other than `trigger` that pass its filter
    /// and overlap its box, in registry order
    fn overlapping(&self, trigger: Handle) -> Vec<Handle> {
        let Some(entity) = self.entity(trigger) else {
            return Vec::new();
        };
        let Some(filter) = entity.trigger().map(|t| t.trigger_by) else {
            return Vec::new();
        };
        let zone = entity.world_bbox();

        self.entities()
            .filter(|(h, _)| *h != trigger)
            .filter(|(_, e)| e.is_alive() && filter.accepts(e.class()))
            .filter(|(_, e)| zone.overlaps(&e.world_bbox()))
            .map(|(h, _)| h)
            .collect()
    }

    fn evaluate_trigger(&mut self, handle: Handle, audio: &mut dyn AudioBackend) {
        let overlapping = self.overlapping(handle);
        let activator = match self.entities.get_mut(handle).and_then(Entity::trigger_mut) {
            Some(trigger) => trigger.observe(overlapping),
            None => return,
        };
        let Some(activator) = activator else {
            return;
        };

        if self.fire(handle, activator, audio) {
            // The target may have been the trigger itself and be gone now
            if let Some(trigger) = self.entities.get_mut(handle).and_then(Entity::trigger_mut) {
                trigger.record_fire();
            }
        }
    }

    /// Deliver the trigger's event to its target. Returns false when the
    /// target id does not resolve.
    fn fire(&mut self, handle: Handle, activator: Handle, audio: &mut dyn AudioBackend) -> bool {
        let Some(entity) = self.entity(handle) else {
            return false;
        };
        let Some(trigger) = entity.trigger() else {
            return false;
        };
        let trigger_id = entity.id.clone().unwrap_or_default();
        let target_id = trigger.target_entity.clone();
        let event = trigger.target_event;
        let payload = trigger.payload(Some(&trigger_id));

        let Some(target) = self.handle(&target_id) else {
            error!("trigger \"{}\" could not find target entity \"{}\"", trigger_id, target_id);
            return false;
        };

        let activator_id = self.entity(activator).and_then(|e| e.id.clone());
        debug!(
            "trigger \"{}\" fired {} at \"{}\" (activated by {:?})",
            trigger_id, event, target_id, activator_id
        );
        self.deliver(target, event, &payload, audio);

        self.events.send(DispatchedEvent {
            trigger: trigger_id,
            target: target_id,
            activator: activator_id,
            event,
            value: payload.value,
        });
        true
    }

    /// Hand an event to one entity and apply the outcome to the scene
    pub fn deliver(
        &mut self,
        target: Handle,
        event: EntityEvent,
        payload: &EventPayload,
        audio: &mut dyn AudioBackend,
    ) -> EventOutcome {
        let Some(entity) = self.entities.get_mut(target) else {
            return EventOutcome::Ignored;
        };
        let outcome = entity.handle_event(event, payload, audio);
        let id = entity.id.clone().unwrap_or_default();

        match outcome {
            EventOutcome::Remove => {
                self.remove(&id);
                trace!("removed \"{}\"", id);
            }
            EventOutcome::Spawn => {
                if let Err(e) = self.spawn_from(&id) {
                    error!("spawner \"{}\" failed: {}", id, e);
                }
            }
            EventOutcome::Handled | EventOutcome::Ignored => {}
        }
        outcome
    }

    /// Deliver an event to the entity named `id`
    pub fn send_event(
        &mut self,
        id: &str,
        event: EntityEvent,
        payload: &EventPayload,
        audio: &mut dyn AudioBackend,
    ) -> Result<EventOutcome, SceneError> {
        let target = self
            .handle(id)
            .ok_or_else(|| SceneError::NotFound(id.to_string()))?;
        Ok(self.deliver(target, event, payload, audio))
    }
}
