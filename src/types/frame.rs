//! Frames handed to the inference engine

use bytes::Bytes;

use super::Annotation;

/// Decoded media frame awaiting inference
///
/// Frames own their bytes. Shared memory views never outlive the message
/// that referenced them, so content resolved from a region is copied here
/// exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Inbound sequence number of the sample that produced this frame
    pub sequence_number: u64,

    /// Frame bytes (cheap to clone)
    pub data: Bytes,

    /// Normalized upstream annotations
    pub annotations: Vec<Annotation>,
}

impl Frame {
    pub fn new(sequence_number: u64, data: Bytes, annotations: Vec<Annotation>) -> Self {
        Self { sequence_number, data, annotations }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
