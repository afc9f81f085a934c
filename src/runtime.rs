//! Engine context and main loop
//!
//! [`Engine`] owns everything a running game needs: configuration, the
//! level file it came from, the live scene and the audio backend. It is
//! passed around by reference; nothing here is global.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{debug, info, trace};

use crate::config::{EngineConfig, TickRate};
use crate::entity::{AudioBackend, EntityEvent, EventOutcome, EventPayload, NullAudio};
use crate::level::{load_level, save_level, LevelError, LevelFile};
use crate::scene::{Scene, SceneError};

/// Fixed-rate pacing for the main loop
pub struct TickClock {
    budget: Option<Duration>,
    last: Instant,
}

impl TickClock {
    pub fn new(rate: TickRate) -> Self {
        Self {
            budget: rate.tick_time(),
            last: Instant::now(),
        }
    }

    /// Seconds since the previous call (or since creation)
    pub fn delta(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last);
        self.last = now;
        dt.as_secs_f32()
    }

    /// Sleep out whatever is left of this tick's budget. An overrun is
    /// not made up for on later ticks.
    pub fn wait(&self, tick_start: Instant) {
        if let Some(budget) = self.budget {
            let spent = tick_start.elapsed();
            if spent < budget {
                std::thread::sleep(budget - spent);
            }
        }
    }
}

pub struct Engine {
    pub config: EngineConfig,
    /// Level the scene was built from
    pub level: Option<LevelFile>,
    pub scene: Scene,
    audio: Box<dyn AudioBackend>,
    running: bool,
    ticks: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_audio(config, Box::new(NullAudio))
    }

    pub fn with_audio(config: EngineConfig, audio: Box<dyn AudioBackend>) -> Self {
        let scene = Scene::new().with_ray_length(config.ray_length);
        Self {
            config,
            level: None,
            scene,
            audio,
            running: false,
            ticks: 0,
        }
    }

    /// Load a map by name or path and rebuild the scene from it
    pub fn load_map(&mut self, name: &str) -> Result<(), LevelError> {
        let path = self.config.map_path(name);
        let level = load_level(&path)?;
        self.scene = Scene::from_level(&level).with_ray_length(self.config.ray_length);
        self.level = Some(level);
        self.ticks = 0;
        Ok(())
    }

    /// Save the live scene. Without a name, saves over the loaded map.
    pub fn save_map(&mut self, name: Option<&str>) -> Result<PathBuf, LevelError> {
        let path = match (name, &self.level) {
            (Some(name), _) => self.config.map_path(name),
            (None, Some(level)) => level.path.clone(),
            (None, None) => {
                return Err(LevelError::Validation("no map loaded and no path given".to_string()));
            }
        };

        let mut level = self.scene.to_level(&path);
        save_level(&mut level, &path, self.config.compress_saves)?;
        self.level = Some(level);
        Ok(path)
    }

    pub fn audio_mut(&mut self) -> &mut dyn AudioBackend {
        self.audio.as_mut()
    }

    /// Deliver an event to the entity named `id` outside of trigger dispatch
    pub fn send_event(&mut self, id: &str, event: EntityEvent, payload: &EventPayload) -> Result<EventOutcome, SceneError> {
        self.scene.send_event(id, event, payload, self.audio.as_mut())
    }

    /// Run one update pass and report what the triggers did
    pub fn tick(&mut self, dt: f32) {
        self.scene.tick(dt, self.audio.as_mut());
        self.ticks += 1;
        let events = self.scene.events_mut();
        if !events.is_empty() {
            debug!("tick {}: {} trigger fires", self.ticks, events.len());
        }
        for event in events.drain() {
            info!(
                "{} -> {}: {} ({})",
                event.trigger, event.target, event.event, event.value
            );
        }
        trace!("tick {} ({:.4}s)", self.ticks, dt);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Mark the engine running for a loop driven from outside
    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Fixed-rate loop. Runs until [`stop`](Self::stop) or `max_ticks`.
    pub fn run(&mut self, max_ticks: Option<u64>) {
        let mut clock = TickClock::new(self.config.tick_rate);
        let mut remaining = max_ticks;
        self.start();
        info!("running at {} ticks per second", self.config.tick_rate.label());

        while self.running && remaining != Some(0) {
            let tick_start = Instant::now();
            let dt = clock.delta(tick_start);
            self.tick(dt);
            clock.wait(tick_start);
            remaining = remaining.map(|n| n - 1);
        }
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityTag;
    use crate::math::Vec3;

    fn test_config(dir: &std::path::Path) -> EngineConfig {
        EngineConfig {
            maps_dir: dir.to_path_buf(),
            tick_rate: TickRate::Unlocked,
            ..Default::default()
        }
    }

    #[test]
    fn test_save_then_load_map() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = Engine::new(test_config(dir.path()));
        engine.scene.add(EntityTag::Player.instantiate(Vec3::ZERO)).unwrap();
        engine.scene.add(EntityTag::Npc.instantiate(Vec3::ONE)).unwrap();

        let path = engine.save_map(Some("start")).unwrap();
        assert_eq!(path, dir.path().join("start.map"));

        let mut other = Engine::new(test_config(dir.path()));
        other.load_map("start").unwrap();
        assert_eq!(other.scene.len(), 2);
        assert!(other.scene.get("player").is_some());
        assert!(other.scene.get("entity 1").is_some());

        // Saving without a name goes back to the loaded file
        assert_eq!(other.save_map(None).unwrap(), path);
    }

    #[test]
    fn test_save_without_map_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = Engine::new(test_config(dir.path()));
        assert!(engine.save_map(None).is_err());
    }

    #[test]
    fn test_run_stops_after_max_ticks() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = Engine::new(test_config(dir.path()));
        engine.scene.add(EntityTag::TestNpc.instantiate(Vec3::ZERO).with_velocity(Vec3::new(10.0, 0.0, 0.0))).unwrap();
        engine.run(Some(3));
        assert_eq!(engine.ticks(), 3);
        assert!(!engine.is_running());
    }

    #[test]
    fn test_clock_delta_is_non_negative() {
        let mut clock = TickClock::new(TickRate::Unlocked);
        let now = Instant::now();
        assert!(clock.delta(now) >= 0.0);
        assert_eq!(clock.delta(now), 0.0);
    }
}
