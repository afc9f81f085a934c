//! Tool entities: spawners and sound emitters
//!
//! Tools are editor-placed helpers. They never block rays and never
//! activate triggers, but they can be trigger targets.

use log::{debug, warn};

use crate::math::Vec3;
use crate::scene::SceneError;
use super::{Entity, EntityTag};

// =============================================================================
// Spawner
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("no entity with id \"{0}\"")]
    NotFound(String),
    #[error("\"{0}\" is not a spawner")]
    NotASpawner(String),
    #[error("spawners cannot create tool entities ({0})")]
    ToolKind(EntityTag),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Factory for one entity kind, placed in the level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawner {
    pub spawn: EntityTag,
}

impl Spawner {
    pub fn new(spawn: EntityTag) -> Self {
        Self { spawn }
    }

    /// Build the product at `position`. Tool kinds are refused.
    pub fn build(&self, position: Vec3) -> Result<Entity, SpawnError> {
        if self.spawn.is_tool() {
            return Err(SpawnError::ToolKind(self.spawn));
        }
        Ok(self.spawn.instantiate(position))
    }
}

impl Default for Spawner {
    fn default() -> Self {
        Self::new(EntityTag::Entity)
    }
}

// =============================================================================
// Sound
// =============================================================================

/// Opaque id of a playing sound, issued by the audio backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundHandle(pub u32);

/// The audio collaborator. Playback itself lives outside this crate.
pub trait AudioBackend {
    /// Start playing; `None` when the backend could not start the sound
    fn play(&mut self, path: &str, volume: f32, repeats: bool) -> Option<SoundHandle>;
    fn is_playing(&self, handle: SoundHandle) -> bool;
    fn stop(&mut self, handle: SoundHandle);
}

/// Backend for headless runs: logs requests, plays nothing
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioBackend for NullAudio {
    fn play(&mut self, path: &str, volume: f32, repeats: bool) -> Option<SoundHandle> {
        debug!("audio: play {} (volume {}, repeats {})", path, volume, repeats);
        None
    }

    fn is_playing(&self, _handle: SoundHandle) -> bool {
        false
    }

    fn stop(&mut self, handle: SoundHandle) {
        debug!("audio: stop {:?}", handle);
    }
}

/// Data of the sound variant
#[derive(Debug, Clone, PartialEq)]
pub struct SoundEmitter {
    pub audio_path: String,
    pub volume: f32,
    pub repeats: bool,
    playing: Option<SoundHandle>,
}

impl SoundEmitter {
    pub fn new(audio_path: impl Into<String>) -> Self {
        Self {
            audio_path: audio_path.into(),
            volume: 1.0,
            repeats: false,
            playing: None,
        }
    }

    pub fn playing(&self) -> Option<SoundHandle> {
        self.playing
    }

    pub fn play(&mut self, audio: &mut dyn AudioBackend) {
        if self.playing.is_some() {
            warn!("sound \"{}\" is already playing", self.audio_path);
            return;
        }
        self.playing = audio.play(&self.audio_path, self.volume, self.repeats);
    }

    pub fn stop(&mut self, audio: &mut dyn AudioBackend) {
        if let Some(handle) = self.playing.take() {
            audio.stop(handle);
        }
    }

    /// Forget the handle once the backend reports the sound finished
    pub fn poll(&mut self, audio: &dyn AudioBackend) {
        if let Some(handle) = self.playing {
            if !audio.is_playing(handle) {
                self.playing = None;
            }
        }
    }
}

impl Default for SoundEmitter {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Backend that remembers what it was asked to do
    #[derive(Default)]
    pub(crate) struct RecordingAudio {
        pub started: Vec<String>,
        pub stopped: Vec<SoundHandle>,
        pub active: Vec<SoundHandle>,
        next: u32,
    }

    impl AudioBackend for RecordingAudio {
        fn play(&mut self, path: &str, _volume: f32, _repeats: bool) -> Option<SoundHandle> {
            self.next += 1;
            let handle = SoundHandle(self.next);
            self.started.push(path.to_string());
            self.active.push(handle);
            Some(handle)
        }

        fn is_playing(&self, handle: SoundHandle) -> bool {
            self.active.contains(&handle)
        }

        fn stop(&mut self, handle: SoundHandle) {
            self.active.retain(|h| *h != handle);
            self.stopped.push(handle);
        }
    }

    #[test]
    fn test_spawner_refuses_tools() {
        for tag in [EntityTag::Spawner, EntityTag::Sound] {
            assert!(matches!(Spawner::new(tag).build(Vec3::ZERO), Err(SpawnError::ToolKind(_))));
        }
        let npc = Spawner::new(EntityTag::TestNpc).build(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(npc.tag(), EntityTag::TestNpc);
        assert_eq!(npc.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_sound_plays_once_until_finished() {
        let mut audio = RecordingAudio::default();
        let mut sound = SoundEmitter::new("sfx/door.wav");

        sound.play(&mut audio);
        sound.play(&mut audio);
        assert_eq!(audio.started.len(), 1);

        // Backend finishes the clip
        audio.active.clear();
        sound.poll(&audio);
        assert_eq!(sound.playing(), None);

        sound.play(&mut audio);
        assert_eq!(audio.started.len(), 2);
        sound.stop(&mut audio);
        assert_eq!(audio.stopped.len(), 1);
    }

    #[test]
    fn test_null_audio_never_plays() {
        let mut audio = NullAudio;
        let mut sound = SoundEmitter::new("sfx/none.wav");
        sound.play(&mut audio);
        assert_eq!(sound.playing(), None);
    }
}
