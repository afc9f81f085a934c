//! brushworks: level persistence and spatial interaction for a brush-based
//! 3D engine
//!
//! - [`math`]: vectors, axis-aligned boxes and rays
//! - [`entity`]: the entity variants, their per-tick behavior and event handling
//! - [`level`]: the on-disk level model and its RON loader/saver
//! - [`scene`]: the live entity registry, ray traces and trigger dispatch
//! - [`runtime`]: the engine context and fixed-rate main loop
//! - [`command`]: console commands over the engine

pub mod command;
pub mod config;
pub mod entity;
pub mod level;
pub mod logging;
pub mod math;
pub mod runtime;
pub mod scene;

pub use config::EngineConfig;
pub use entity::{Entity, EntityEvent, EntityTag};
pub use level::{load_level, save_level, LevelError, LevelFile};
pub use runtime::Engine;
pub use scene::{Scene, SceneError, TraceHit, TraceQuery};

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
