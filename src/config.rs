//! Engine configuration
//!
//! Read from a RON file next to the binary. Every field has a default, so
//! a partial file (or none at all) is fine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::{Serialize, Deserialize};

use crate::scene::DEFAULT_RAY_LENGTH;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid config {path}: {source}")]
    Parse { path: PathBuf, source: ron::error::SpannedError },
}

/// Update rate of the main loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TickRate {
    Tps30,
    #[default]
    Tps60,
    /// As fast as possible
    Unlocked,
}

impl TickRate {
    /// Target time per tick (None = unlocked)
    pub fn tick_time(&self) -> Option<Duration> {
        match self {
            TickRate::Tps30 => Some(Duration::from_secs_f64(1.0 / 30.0)),
            TickRate::Tps60 => Some(Duration::from_secs_f64(1.0 / 60.0)),
            TickRate::Unlocked => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TickRate::Tps30 => "30",
            TickRate::Tps60 => "60",
            TickRate::Unlocked => "Unlocked",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory bare map names are looked up in
    pub maps_dir: PathBuf,
    /// Extension appended to bare map names
    pub map_extension: String,
    pub tick_rate: TickRate,
    /// Trace length when a query gives none
    pub ray_length: f32,
    /// Brotli-compress saved maps
    pub compress_saves: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            maps_dir: PathBuf::from("maps"),
            map_extension: "map".to_string(),
            tick_rate: TickRate::default(),
            ray_length: DEFAULT_RAY_LENGTH,
            compress_saves: false,
        }
    }
}

impl EngineConfig {
    /// Load from `path`. A missing file gives the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Where the map called `name` lives. Bare names go under `maps_dir`
    /// and get the map extension; anything with a directory or extension
    /// is used as given.
    pub fn map_path(&self, name: &str) -> PathBuf {
        let given = Path::new(name);
        if given.components().count() > 1 || given.extension().is_some() {
            return given.to_path_buf();
        }
        self.maps_dir.join(name).with_extension(&self.map_extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(dir.path().join("engine.ron")).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.ray_length, 5000.0);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.ron");
        fs::write(&path, "(tick_rate: Tps30, compress_saves: true)").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.tick_rate, TickRate::Tps30);
        assert!(config.compress_saves);
        assert_eq!(config.map_extension, "map");
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.ron");
        fs::write(&path, "(tick_rate: Tps1000)").unwrap();
        assert!(matches!(EngineConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_map_path() {
        let config = EngineConfig::default();
        assert_eq!(config.map_path("e1m1"), PathBuf::from("maps/e1m1.map"));
        assert_eq!(config.map_path("other/e1m1.map"), PathBuf::from("other/e1m1.map"));
        assert_eq!(config.map_path("e1m1.ron"), PathBuf::from("e1m1.ron"));
    }

    #[test]
    fn test_tick_time() {
        assert_eq!(TickRate::Unlocked.tick_time(), None);
        let t = TickRate::Tps60.tick_time().unwrap();
        assert!((t.as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
    }
}
