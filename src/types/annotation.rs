//! Annotation records attached to media samples
//!
//! An annotation is a typed inference result. On the wire the kind tag and
//! the value payload travel separately, so a peer can send a tag that
//! disagrees with the payload, leave the tag unspecified, or omit the
//! payload entirely. [`normalize`](crate::normalize::normalize) resolves
//! all three cases before an annotation reaches the engine or leaves it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared annotation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    /// Left generic by the producer; repaired from the payload
    #[default]
    Unspecified,
    Classification,
    Motion,
    Entity,
    Text,
    Event,
    Other,
}

/// Annotation record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Annotation {
    /// Declared kind; must agree with `value` after normalization
    #[serde(default)]
    pub kind: AnnotationKind,

    /// Free-form producer-defined subtype (e.g. "colorIntensity")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    /// Value payload; exactly one variant populated
    #[serde(default)]
    pub value: Option<AnnotationValue>,
}

impl Annotation {
    /// Annotation with its kind derived from the payload
    pub fn new(value: AnnotationValue) -> Self {
        let kind = value.kind().unwrap_or_default();
        Self { kind, subtype: None, value: Some(value) }
    }

    /// Classification annotation with a single tag
    pub fn classification(value: impl Into<String>, confidence: f32) -> Self {
        Self::new(AnnotationValue::Classification(Classification {
            tag: Tag::new(value, confidence),
            attributes: Vec::new(),
        }))
    }

    /// Detected entity with an optional bounding box
    pub fn entity(value: impl Into<String>, confidence: f32, bounding_box: Option<BoundingBox>) -> Self {
        Self::new(AnnotationValue::Entity(Entity {
            tag: Tag::new(value, confidence),
            bounding_box,
            attributes: Vec::new(),
            id: None,
        }))
    }

    /// Plain text annotation
    pub fn text(value: impl Into<String>) -> Self {
        Self::new(AnnotationValue::Text(TextValue {
            value: value.into(),
            language: None,
            start_timestamp: None,
            end_timestamp: None,
        }))
    }

    /// Attach a subtype
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    /// Confidence of the primary tag, when the payload carries one
    pub fn confidence(&self) -> Option<f32> {
        match self.value.as_ref()? {
            AnnotationValue::Classification(c) => Some(c.tag.confidence),
            AnnotationValue::Entity(e) => Some(e.tag.confidence),
            _ => None,
        }
    }
}

/// Annotation value payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnnotationValue {
    Classification(Classification),
    Motion(Motion),
    Entity(Entity),
    Text(TextValue),
    Event(Event),
    Other(OtherValue),

    /// Payload type outside the closed set
    #[serde(other)]
    Unrecognized,
}

impl AnnotationValue {
    /// Kind matching this payload, `None` for unrecognized payloads
    pub fn kind(&self) -> Option<AnnotationKind> {
        match self {
            AnnotationValue::Classification(_) => Some(AnnotationKind::Classification),
            AnnotationValue::Motion(_) => Some(AnnotationKind::Motion),
            AnnotationValue::Entity(_) => Some(AnnotationKind::Entity),
            AnnotationValue::Text(_) => Some(AnnotationKind::Text),
            AnnotationValue::Event(_) => Some(AnnotationKind::Event),
            AnnotationValue::Other(_) => Some(AnnotationKind::Other),
            AnnotationValue::Unrecognized => None,
        }
    }
}

/// Label with a confidence score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub value: String,
    pub confidence: f32,
}

impl Tag {
    pub fn new(value: impl Into<String>, confidence: f32) -> Self {
        Self { value: value.into(), confidence }
    }
}

/// Extra named label attached to a classification or entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub confidence: f32,
}

/// Box in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Whole-frame classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub tag: Tag,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// Motion detected in a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    #[serde(default)]
    pub region: Option<BoundingBox>,
}

/// Detected entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub tag: Tag,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Recognized text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextValue {
    pub value: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub start_timestamp: Option<u64>,
    #[serde(default)]
    pub end_timestamp: Option<u64>,
}

/// Named event with properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Opaque producer-defined content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherValue {
    pub content_type: String,
    #[serde(default)]
    pub content_bytes: Vec<u8>,
}
