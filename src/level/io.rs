//! Level loading and saving
//!
//! Uses RON (Rusty Object Notation) for human-readable level files.
//! Supports both compressed (brotli) and uncompressed RON files.
//! - Reading: Auto-detects format by checking for valid RON start
//! - Writing: Plain RON unless compression is requested
//!
//! Records are decoded one at a time, so a single bad entity or brush is
//! skipped with a warning instead of failing the whole level.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use log::{error, info, warn};
use serde::{Serialize, Deserialize};

use super::record::{decode_brush, decode_entity, BrushRecord, EntityRecord};
use super::LevelFile;

/// Validation limits to prevent resource exhaustion from malicious files
pub mod limits {
    /// Maximum number of entity records in a level
    pub const MAX_ENTITIES: usize = 4096;
    /// Maximum number of brush records in a level
    pub const MAX_BRUSHES: usize = 16384;
    /// Maximum string length for ids and paths
    pub const MAX_STRING_LEN: usize = 256;
    /// Maximum coordinate value (prevents overflow issues)
    pub const MAX_COORD: f32 = 1_000_000.0;
}

/// Error type for level loading and saving
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top level of a document as read: records stay raw until decoded one by one
#[derive(Deserialize)]
struct RawLevel {
    #[serde(default)]
    entities: Vec<ron::Value>,
    #[serde(default)]
    brushes: Vec<ron::Value>,
}

#[derive(Serialize)]
struct LevelDocument {
    entities: Vec<EntityRecord>,
    brushes: Vec<BrushRecord>,
}

fn validate_counts(raw: &RawLevel) -> Result<(), LevelError> {
    if raw.entities.len() > limits::MAX_ENTITIES {
        return Err(LevelError::Validation(format!(
            "too many entities ({} > {})", raw.entities.len(), limits::MAX_ENTITIES
        )));
    }
    if raw.brushes.len() > limits::MAX_BRUSHES {
        return Err(LevelError::Validation(format!(
            "too many brushes ({} > {})", raw.brushes.len(), limits::MAX_BRUSHES
        )));
    }
    Ok(())
}

/// Turn file bytes into RON text, decompressing when needed
fn decode_bytes(bytes: Vec<u8>) -> Result<String, LevelError> {
    // Detect format: RON files start with '(' or whitespace (or a comment), brotli is binary
    let is_plain_ron = bytes
        .first()
        .map(|&b| matches!(b, b'(' | b' ' | b'\n' | b'\r' | b'\t' | b'/'))
        .unwrap_or(false);

    let bytes = if is_plain_ron {
        bytes
    } else {
        let mut decompressed = Vec::new();
        brotli::BrotliDecompress(&mut Cursor::new(&bytes), &mut decompressed)
            .map_err(|e| LevelError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("brotli decompression failed: {}", e)
            )))?;
        decompressed
    };

    String::from_utf8(bytes).map_err(|e| LevelError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("invalid UTF-8: {}", e)
    )))
}

/// Log a parse error with the offending line
fn report_parse_error(source: &str, contents: &str, e: &ron::error::SpannedError) {
    error!("RON parse error in {}: {}", source, e);
    let pos = e.position;
    let lines: Vec<&str> = contents.lines().collect();
    let line_idx = pos.line.saturating_sub(1);
    if let Some(line) = lines.get(line_idx) {
        error!("  Line {}: {}", pos.line, line);
    }
}

fn parse_level(contents: &str, source: &str) -> Result<LevelFile, LevelError> {
    let raw: RawLevel = match ron::from_str(contents) {
        Ok(raw) => raw,
        Err(e) => {
            report_parse_error(source, contents, &e);
            return Err(e.into());
        }
    };
    validate_counts(&raw)?;

    let mut level = LevelFile::default();
    for (index, value) in raw.entities.into_iter().enumerate() {
        match decode_entity(value) {
            Ok(entity) => level.entities.push(entity),
            Err(e) => warn!("{}: skipping entity record {}: {}", source, index, e),
        }
    }
    for (index, value) in raw.brushes.into_iter().enumerate() {
        match decode_brush(value) {
            Ok(brush) => level.brushes.push(brush),
            Err(e) => warn!("{}: skipping brush record {}: {}", source, index, e),
        }
    }
    Ok(level)
}

/// Load a level from a RON file (supports both compressed and uncompressed)
pub fn load_level<P: AsRef<Path>>(path: P) -> Result<LevelFile, LevelError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let contents = decode_bytes(bytes)?;

    let mut level = parse_level(&contents, &path.display().to_string())?;
    level.path = path.to_path_buf();
    info!(
        "loaded {} ({} entities, {} brushes)",
        path.display(), level.entities.len(), level.brushes.len()
    );
    Ok(level)
}

/// Load a level from a RON string (for embedded levels or testing)
pub fn load_level_from_str(s: &str) -> Result<LevelFile, LevelError> {
    parse_level(s, "<string>")
}

/// Serialize a level to RON text. Ids missing on the level are filled in
/// on the written records only.
pub fn serialize_level(level: &LevelFile) -> Result<String, LevelError> {
    let mut level = level.clone();
    level.assign_missing_ids();
    write_document(&level)
}

fn write_document(level: &LevelFile) -> Result<String, LevelError> {
    let document = LevelDocument {
        entities: level.entities.iter().map(EntityRecord::from_entity).collect(),
        brushes: level.brushes.iter().map(BrushRecord::from_brush).collect(),
    };
    let config = ron::ser::PrettyConfig::new()
        .depth_limit(3)
        .indentor("  ".to_string());
    Ok(ron::ser::to_string_pretty(&document, config)?)
}

/// Brotli-compress RON text
pub fn compress(ron_string: &str) -> Result<Vec<u8>, LevelError> {
    // Compress with brotli (quality 6, window 22 - good balance of speed/ratio)
    let mut compressed = Vec::new();
    brotli::BrotliCompress(&mut Cursor::new(ron_string.as_bytes()), &mut compressed, &brotli::enc::BrotliEncoderParams {
        quality: 6,
        lgwin: 22,
        ..Default::default()
    }).map_err(|e| LevelError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("brotli compression failed: {}", e)
    )))?;
    Ok(compressed)
}

/// Save a level to `path`, assigning ids to records that lack one.
/// The level remembers `path` afterwards.
pub fn save_level<P: AsRef<Path>>(level: &mut LevelFile, path: P, compressed: bool) -> Result<(), LevelError> {
    let path = path.as_ref();
    level.assign_missing_ids();
    let ron_string = write_document(level)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    if compressed {
        fs::write(path, compress(&ron_string)?)?;
    } else {
        fs::write(path, ron_string)?;
    }

    level.path = path.to_path_buf();
    info!("saved {} ({} entities, {} brushes)", path.display(), level.entities.len(), level.brushes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityEvent, EntityTag, Trigger, TriggerType};
    use crate::level::Brush;
    use crate::math::{BBox, Vec3};

    fn sample_level() -> LevelFile {
        let mut level = LevelFile::default();
        level.entities.push(EntityTag::Player.instantiate(Vec3::new(0.0, 0.0, 16.0)));
        level.entities.push(EntityTag::TestNpc.instantiate(Vec3::new(128.0, 0.5, 0.0)).with_id("grunt"));
        let mut trigger = EntityTag::Trigger.instantiate(Vec3::new(64.0, 0.0, 0.0));
        if let Some(t) = trigger.trigger_mut() {
            *t = Trigger::new("grunt", EntityEvent::TakeDamage)
                .with_type(TriggerType::Count(2))
                .with_value(0.1);
        }
        level.entities.push(trigger);
        level.entities.push(EntityTag::Sound.instantiate(Vec3::ONE));
        level.brushes.push(Brush::new(BBox::new(Vec3::new(-512.0, -512.0, -16.0), Vec3::new(512.0, 512.0, 0.0))));
        level.brushes.push(Brush::new(BBox::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(8.0, 8.0, 8.0))).with_id("pillar"));
        level
    }

    #[test]
    fn test_round_trip_is_stable() {
        let first = serialize_level(&sample_level()).unwrap();
        let reloaded = load_level_from_str(&first).unwrap();
        let second = serialize_level(&reloaded).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ids_assigned_on_save() {
        let text = serialize_level(&sample_level()).unwrap();
        let level = load_level_from_str(&text).unwrap();
        let ids: Vec<_> = level.entities.iter().map(|e| e.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["player", "grunt", "entity 2", "entity 3"]);
        assert_eq!(level.brushes[0].id.as_deref(), Some("brush 0"));
        assert_eq!(level.brushes[1].id.as_deref(), Some("pillar"));
    }

    #[test]
    fn test_existing_ids_are_never_renumbered() {
        let mut level = LevelFile::default();
        level.entities.push(EntityTag::Entity.instantiate(Vec3::ZERO));
        level.entities.push(EntityTag::Entity.instantiate(Vec3::ZERO).with_id("entity 0"));
        let text = serialize_level(&level).unwrap();
        let back = load_level_from_str(&text).unwrap();
        assert_eq!(back.entities[0].id.as_deref(), Some("entity 1"));
        assert_eq!(back.entities[1].id.as_deref(), Some("entity 0"));
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let text = r#"(
            entities: [
                (type: "player", id: "player"),
                (type: "wizard", id: "w"),
                (type: "npc", position: "not a vector"),
                (type: "sound", id: "bell", audio_path: "sfx/bell.wav"),
            ],
            brushes: [
                (min: (x: 0.0, y: 0.0, z: 0.0), max: (x: 1.0, y: 1.0, z: 1.0)),
                (min: (x: 2.0, y: 0.0, z: 0.0), max: (x: 1.0, y: 1.0, z: 1.0)),
            ],
            skybox: "clouds",
        )"#;
        let level = load_level_from_str(text).unwrap();
        let ids: Vec<_> = level.entities.iter().filter_map(|e| e.id.as_deref()).collect();
        assert_eq!(ids, vec!["player", "bell"]);
        assert_eq!(level.brushes.len(), 1);
    }

    #[test]
    fn test_hand_written_optionals_load() {
        let text = r#"(
            entities: [
                (type: "test_npc", id: "boxed", bbox: (min: (x: -4.0, y: -4.0, z: 0.0), max: (x: 4.0, y: 4.0, z: 8.0))),
                (type: "npc", id: "moving", velocity: (x: 1.0, y: 0.0, z: 0.0)),
                (type: "trigger", id: "gate", trigger_on: "stay", target_entity: "moving", target_event: "kill"),
            ],
        )"#;
        let level = load_level_from_str(text).unwrap();
        assert_eq!(level.entities.len(), 3);
        assert_eq!(
            level.find_entity("boxed").map(|e| e.bbox),
            Some(BBox::new(Vec3::new(-4.0, -4.0, 0.0), Vec3::new(4.0, 4.0, 8.0)))
        );
        assert_eq!(level.find_entity("moving").and_then(|e| e.velocity), Some(Vec3::new(1.0, 0.0, 0.0)));
        let gate = level.find_entity("gate").and_then(|e| e.trigger()).unwrap();
        assert_eq!(gate.target_event, EntityEvent::Kill);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_level(dir.path().join("nope.map"));
        assert!(matches!(result, Err(LevelError::Io(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps").join("test.map");

        let mut level = sample_level();
        save_level(&mut level, &path, false).unwrap();
        assert_eq!(level.path, path);
        assert_eq!(level.entities[0].id.as_deref(), Some("player"));

        let loaded = load_level(&path).unwrap();
        assert_eq!(loaded.entities.len(), 4);
        assert_eq!(loaded.path, path);
        assert_eq!(serialize_level(&loaded).unwrap(), serialize_level(&level).unwrap());
    }

    #[test]
    fn test_compressed_save_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packed.map");

        let mut level = sample_level();
        save_level(&mut level, &path, true).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_ne!(bytes.first(), Some(&b'('));

        let loaded = load_level(&path).unwrap();
        assert_eq!(loaded.brushes.len(), 2);
    }

    #[test]
    fn test_too_many_records_fails() {
        let mut text = String::from("(entities: [");
        for _ in 0..=limits::MAX_ENTITIES {
            text.push_str("(type: \"entity\"),");
        }
        text.push_str("])");
        assert!(matches!(load_level_from_str(&text), Err(LevelError::Validation(_))));
    }
}
