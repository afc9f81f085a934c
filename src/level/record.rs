//! On-disk records
//!
//! Entity records are flat: the shared fields plus every variant field as
//! an optional. Decoding first reads only `type` from the raw RON value,
//! then decodes the whole record and builds the variant from the tag's
//! factory defaults, overriding whatever the record specifies.
//!
//! Optional fields are written bare (`bbox: (min: .., max: ..)`) and read
//! either bare or wrapped in `Some(..)`.

use serde::{Serialize, Deserialize};

use crate::entity::{
    Entity, EntityEvent, EntityKind, EntityTag, Health, SoundEmitter, Spawner, Trigger,
    TriggerType, UnknownName,
};
use crate::math::{BBox, Vec3};
use super::io::limits;
use super::Brush;

/// Why a single record was skipped
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("record has no readable \"type\" field: {0}")]
    MissingType(ron::Error),
    #[error(transparent)]
    UnknownName(#[from] UnknownName),
    #[error("malformed record: {0}")]
    Malformed(#[from] ron::Error),
    #[error("invalid record: {0}")]
    Invalid(String),
}

mod bare {
    use serde::de::{Deserialize, DeserializeOwned, Deserializer, Error};
    use serde::ser::{Serialize, Serializer};

    pub fn serialize<T: Serialize, S: Serializer>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: DeserializeOwned,
        D: Deserializer<'de>,
    {
        let value = match ron::Value::deserialize(deserializer)? {
            ron::Value::Option(None) => return Ok(None),
            ron::Value::Option(Some(inner)) => *inner,
            other => other,
        };
        value.into_rust().map(Some).map_err(D::Error::custom)
    }
}

#[derive(Deserialize)]
struct TypeProbe {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct EntityRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    id: String,
    #[serde(default)]
    position: Vec3,
    #[serde(default)]
    rotation: Vec3,
    #[serde(default, with = "bare", skip_serializing_if = "Option::is_none")]
    bbox: Option<BBox>,
    #[serde(default, with = "bare", skip_serializing_if = "Option::is_none")]
    velocity: Option<Vec3>,
    #[serde(default, with = "bare", skip_serializing_if = "Option::is_none")]
    health: Option<Health>,

    // trigger
    #[serde(default, with = "bare", skip_serializing_if = "Option::is_none")]
    trigger_type: Option<String>,
    #[serde(default, with = "bare", skip_serializing_if = "Option::is_none")]
    trigger_count: Option<u32>,
    #[serde(default, with = "bare", skip_serializing_if = "Option::is_none")]
    trigger_by: Option<String>,
    #[serde(default, with = "bare", skip_serializing_if = "Option::is_none")]
    trigger_on: Option<String>,
    #[serde(default, with = "bare", skip_serializing_if = "Option::is_none")]
    target_entity: Option<String>,
    #[serde(default, with = "bare", skip_serializing_if = "Option::is_none")]
    target_event: Option<String>,
    #[serde(default, with = "bare", skip_serializing_if = "Option::is_none")]
    f_value: Option<f32>,
    #[serde(default, with = "bare", skip_serializing_if = "Option::is_none")]
    v_value: Option<Vec3>,

    // spawner
    #[serde(default, with = "bare", skip_serializing_if = "Option::is_none")]
    spawn: Option<String>,

    // sound
    #[serde(default, with = "bare", skip_serializing_if = "Option::is_none")]
    audio_path: Option<String>,
    #[serde(default, with = "bare", skip_serializing_if = "Option::is_none")]
    volume: Option<f32>,
    #[serde(default, with = "bare", skip_serializing_if = "Option::is_none")]
    repeats: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct BrushRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    id: String,
    min: Vec3,
    max: Vec3,
}

fn is_valid_float(f: f32) -> bool {
    f.is_finite() && f.abs() <= limits::MAX_COORD
}

fn validate_vec3(v: Vec3, what: &str) -> Result<(), RecordError> {
    if is_valid_float(v.x) && is_valid_float(v.y) && is_valid_float(v.z) {
        Ok(())
    } else {
        Err(RecordError::Invalid(format!("{} {} out of range", what, v)))
    }
}

fn validate_bbox(b: &BBox, what: &str) -> Result<(), RecordError> {
    validate_vec3(b.min, what)?;
    validate_vec3(b.max, what)?;
    if !b.is_valid() {
        return Err(RecordError::Invalid(format!("{} {} has min > max", what, b)));
    }
    Ok(())
}

fn validate_str(s: &str, what: &str) -> Result<(), RecordError> {
    if s.len() > limits::MAX_STRING_LEN {
        return Err(RecordError::Invalid(format!(
            "{} too long ({} > {})", what, s.len(), limits::MAX_STRING_LEN
        )));
    }
    Ok(())
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// Decode one raw entity record into an entity of the variant named by `type`
pub(crate) fn decode_entity(value: ron::Value) -> Result<Entity, RecordError> {
    let probe: TypeProbe = value.clone().into_rust().map_err(RecordError::MissingType)?;
    let tag: EntityTag = probe.kind.parse()?;
    let record: EntityRecord = value.into_rust()?;
    record.into_entity(tag)
}

pub(crate) fn decode_brush(value: ron::Value) -> Result<Brush, RecordError> {
    let record: BrushRecord = value.into_rust()?;
    record.into_brush()
}

impl EntityRecord {
    fn into_entity(self, tag: EntityTag) -> Result<Entity, RecordError> {
        validate_str(&self.id, "id")?;
        validate_vec3(self.position, "position")?;
        validate_vec3(self.rotation, "rotation")?;

        let mut entity = tag.instantiate(self.position);
        entity.id = non_empty(self.id);
        entity.rotation = self.rotation;
        if let Some(bbox) = self.bbox {
            validate_bbox(&bbox, "bbox")?;
            entity.bbox = bbox;
        }
        if let Some(velocity) = self.velocity {
            validate_vec3(velocity, "velocity")?;
            entity.velocity = Some(velocity);
        }
        if let Some(health) = self.health {
            if !health.current.is_finite() || !health.max.is_finite() {
                return Err(RecordError::Invalid("health is not finite".to_string()));
            }
            entity.health = Some(health);
        }

        match &mut entity.kind {
            EntityKind::Trigger(trigger) => {
                let target = self.target_entity.unwrap_or_default();
                validate_str(&target, "target_entity")?;
                let event = match self.target_event {
                    Some(name) => name.parse::<EntityEvent>()?,
                    None => EntityEvent::None,
                };
                let mut built = Trigger::new(target, event)
                    .with_value(self.f_value.unwrap_or(0.0));
                if let Some(name) = self.trigger_type {
                    built = built.with_type(TriggerType::from_name(&name, self.trigger_count)?);
                }
                if let Some(name) = self.trigger_by {
                    built = built.with_filter(name.parse()?);
                }
                if let Some(name) = self.trigger_on {
                    built = built.with_transition(name.parse()?);
                }
                if let Some(vector) = self.v_value {
                    validate_vec3(vector, "v_value")?;
                    built = built.with_vector(vector);
                }
                *trigger = built;
            }
            EntityKind::Spawner(spawner) => {
                if let Some(name) = self.spawn {
                    *spawner = Spawner::new(name.parse()?);
                }
            }
            EntityKind::Sound(sound) => {
                let path = self.audio_path.unwrap_or_default();
                validate_str(&path, "audio_path")?;
                let mut built = SoundEmitter::new(path);
                if let Some(volume) = self.volume {
                    built.volume = volume;
                }
                if let Some(repeats) = self.repeats {
                    built.repeats = repeats;
                }
                *sound = built;
            }
            _ => {}
        }

        Ok(entity)
    }

    pub(crate) fn from_entity(entity: &Entity) -> Self {
        let mut record = EntityRecord {
            kind: entity.tag().name().to_string(),
            id: entity.id.clone().unwrap_or_default(),
            position: entity.position,
            rotation: entity.rotation,
            bbox: Some(entity.bbox),
            velocity: entity.velocity,
            health: entity.health,
            ..Default::default()
        };

        match &entity.kind {
            EntityKind::Trigger(trigger) => {
                record.trigger_type = Some(trigger.trigger_type.name().to_string());
                if let TriggerType::Count(n) = trigger.trigger_type {
                    record.trigger_count = Some(n);
                }
                record.trigger_by = Some(trigger.trigger_by.name().to_string());
                record.trigger_on = Some(trigger.trigger_on.name().to_string());
                record.target_entity = Some(trigger.target_entity.clone());
                record.target_event = Some(trigger.target_event.name().to_string());
                record.f_value = Some(trigger.f_value);
                record.v_value = trigger.v_value;
            }
            EntityKind::Spawner(spawner) => {
                record.spawn = Some(spawner.spawn.name().to_string());
            }
            EntityKind::Sound(sound) => {
                record.audio_path = Some(sound.audio_path.clone());
                record.volume = Some(sound.volume);
                record.repeats = Some(sound.repeats);
            }
            _ => {}
        }

        record
    }
}

impl BrushRecord {
    fn into_brush(self) -> Result<Brush, RecordError> {
        validate_str(&self.id, "id")?;
        let bbox = BBox::new(self.min, self.max);
        validate_bbox(&bbox, "brush")?;
        Ok(Brush { id: non_empty(self.id), bbox })
    }

    pub(crate) fn from_brush(brush: &Brush) -> Self {
        BrushRecord {
            id: brush.id.clone().unwrap_or_default(),
            min: brush.bbox.min,
            max: brush.bbox.max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{TriggerBy, TriggerOn};

    fn value(src: &str) -> ron::Value {
        ron::from_str(src).unwrap()
    }

    #[test]
    fn test_decode_selects_variant_by_type() {
        let e = decode_entity(value(r#"(type: "test_npc", id: "grunt", position: (x: 1.0, y: 2.0, z: 3.0))"#)).unwrap();
        assert_eq!(e.tag(), EntityTag::TestNpc);
        assert_eq!(e.id.as_deref(), Some("grunt"));
        assert_eq!(e.position, Vec3::new(1.0, 2.0, 3.0));
        // Missing fields fall back to factory defaults
        assert_eq!(e.bbox, BBox::LARGE_ENTITY);
        assert_eq!(e.health, Some(Health::new(100.0)));
    }

    #[test]
    fn test_decode_trigger_fields() {
        let e = decode_entity(value(
            r#"(
                type: "trigger",
                trigger_type: "count",
                trigger_count: 3,
                trigger_by: "npcs",
                trigger_on: "exit",
                target_entity: "door",
                target_event: "take_damage",
                f_value: 12.5,
                some_future_field: 7,
            )"#,
        ))
        .unwrap();
        let trigger = e.trigger().unwrap();
        assert_eq!(trigger.trigger_type, TriggerType::Count(3));
        assert_eq!(trigger.trigger_by, TriggerBy::Npcs);
        assert_eq!(trigger.trigger_on, TriggerOn::Exit);
        assert_eq!(trigger.target_entity, "door");
        assert_eq!(trigger.target_event, EntityEvent::TakeDamage);
        assert_eq!(trigger.f_value, 12.5);
    }

    #[test]
    fn test_bare_and_wrapped_optionals() {
        let bare = decode_entity(value(
            r#"(
                type: "npc",
                bbox: (min: (x: -1.0, y: -1.0, z: 0.0), max: (x: 1.0, y: 1.0, z: 2.0)),
                velocity: (x: 1.0, y: 0.0, z: 0.0),
                health: (current: 40.0, max: 50.0),
            )"#,
        ))
        .unwrap();
        assert_eq!(bare.bbox, BBox::new(Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 2.0)));
        assert_eq!(bare.velocity, Some(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(bare.health.map(|h| h.current), Some(40.0));

        let wrapped = decode_entity(value(
            r#"(type: "trigger", trigger_type: Some("multiple"), v_value: Some((x: 0.0, y: 0.0, z: 5.0)), f_value: None)"#,
        ))
        .unwrap();
        let trigger = wrapped.trigger().unwrap();
        assert_eq!(trigger.trigger_type, TriggerType::Multiple);
        assert_eq!(trigger.v_value, Some(Vec3::new(0.0, 0.0, 5.0)));
        assert_eq!(trigger.f_value, 0.0);
    }

    #[test]
    fn test_optionals_are_written_bare() {
        let entity = EntityTag::Npc.instantiate(Vec3::ZERO).with_velocity(Vec3::ONE);
        let text = ron::to_string(&EntityRecord::from_entity(&entity)).unwrap();
        assert!(!text.contains("Some("), "{}", text);
        let back = decode_entity(value(&text)).unwrap();
        assert_eq!(back.velocity, Some(Vec3::ONE));
        assert_eq!(back.bbox, entity.bbox);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = decode_entity(value(r#"(type: "dragon")"#)).unwrap_err();
        assert!(matches!(err, RecordError::UnknownName(_)));
        let err = decode_entity(value(r#"(id: "nameless")"#)).unwrap_err();
        assert!(matches!(err, RecordError::MissingType(_)));
    }

    #[test]
    fn test_invalid_geometry_is_rejected() {
        let err = decode_brush(value(r#"(min: (x: 1.0, y: 0.0, z: 0.0), max: (x: 0.0, y: 1.0, z: 1.0))"#)).unwrap_err();
        assert!(matches!(err, RecordError::Invalid(_)));
        let err = decode_entity(value(r#"(type: "entity", position: (x: 1e9, y: 0.0, z: 0.0))"#)).unwrap_err();
        assert!(matches!(err, RecordError::Invalid(_)));
    }
}
