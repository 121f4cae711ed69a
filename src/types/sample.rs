//! Media samples exchanged after the handshake

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::Annotation;

/// One unit of media content plus annotations
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaSample {
    /// Presentation timestamp in descriptor timescale ticks
    #[serde(default)]
    pub timestamp: u64,

    /// Sample bytes, inline or by reference. Responses carry no content.
    #[serde(default)]
    pub content: Option<Content>,

    /// Annotations from an upstream filter (inbound) or the engine (outbound)
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl MediaSample {
    /// Sample with inline bytes
    pub fn inline(data: impl Into<Bytes>) -> Self {
        Self { content: Some(Content::Inline(data.into())), ..Self::default() }
    }

    /// Sample referencing a range of the session's shared region
    pub fn reference(offset: u64, length: u64) -> Self {
        Self { content: Some(Content::Reference(ContentReference { offset, length })), ..Self::default() }
    }

    /// Response sample carrying only annotations
    pub fn annotations(annotations: Vec<Annotation>) -> Self {
        Self { annotations, ..Self::default() }
    }

    pub fn with_annotations(mut self, annotations: Vec<Annotation>) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether this sample is a pure acknowledgement
    pub fn is_ack_only(&self) -> bool {
        self.content.is_none() && self.annotations.is_empty()
    }
}

/// Content locator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Content {
    /// Bytes embedded in the message
    Inline(Bytes),
    /// Range inside the attached shared region
    Reference(ContentReference),
}

/// Offset and length into the session's shared region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentReference {
    pub offset: u64,
    pub length: u64,
}
