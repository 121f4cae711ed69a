//! Shared helpers for unit tests, integration tests and benchmarks

#![cfg(any(test, feature = "benchmark"))]

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::inference::InferenceEngine;
use crate::types::{
    Annotation, Encoding, Frame, MediaDescriptor, MediaSample, PixelFormat, StreamDescriptor,
    StreamMessage, VideoFrameFormat,
};
use crate::{ExtensionError, Result};

/// Raw RGB24 video at 90 kHz
pub fn video_media() -> MediaDescriptor {
    MediaDescriptor::video(
        90_000,
        VideoFrameFormat { encoding: Encoding::Raw, pixel_format: PixelFormat::Rgb24, dimensions: None },
    )
}

/// Handshake for embedded transfer
pub fn embedded_handshake(sequence_number: u64) -> StreamMessage {
    StreamMessage::descriptor(sequence_number, StreamDescriptor::embedded(video_media()))
}

/// Handshake for shared memory transfer
pub fn shared_memory_handshake(sequence_number: u64, name: &str, length_bytes: u64) -> StreamMessage {
    StreamMessage::descriptor(
        sequence_number,
        StreamDescriptor::shared_memory(video_media(), name, length_bytes),
    )
}

/// Sample with `len` inline bytes of value `fill`
pub fn inline_sample(sequence_number: u64, fill: u8, len: usize) -> StreamMessage {
    StreamMessage::sample(sequence_number, MediaSample::inline(vec![fill; len]))
}

/// Sample referencing `[offset, offset + length)` of the shared region
pub fn reference_sample(sequence_number: u64, offset: u64, length: u64) -> StreamMessage {
    StreamMessage::sample(sequence_number, MediaSample::reference(offset, length))
}

/// Engine that records every batch and labels each frame with its
/// sequence number and size
#[derive(Debug, Default)]
pub struct RecordingEngine {
    batches: Mutex<Vec<Vec<Frame>>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches seen so far, in call order
    pub fn batches(&self) -> Vec<Vec<Frame>> {
        self.batches.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Label produced for a frame
    pub fn label(frame: &Frame) -> String {
        format!("frame-{}-{}b", frame.sequence_number, frame.len())
    }
}

#[async_trait]
impl InferenceEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    async fn check_format(&self, _media: &MediaDescriptor) -> Result<()> {
        Ok(())
    }

    async fn infer(&self, frames: &[Frame]) -> Result<Vec<Annotation>> {
        self.batches.lock().unwrap_or_else(|e| e.into_inner()).push(frames.to_vec());
        Ok(frames.iter().map(|f| Annotation::classification(Self::label(f), 0.9)).collect())
    }
}

/// Which call a [`FailingEngine`] fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// Reject every media format at handshake
    Handshake,
    /// Fail every inference call
    Inference,
    /// Return an annotation without a value
    InvalidOutput,
}

/// Engine that fails at a chosen point
#[derive(Debug)]
pub struct FailingEngine {
    point: FailurePoint,
    calls: AtomicUsize,
}

impl FailingEngine {
    pub fn new(point: FailurePoint) -> Self {
        Self { point, calls: AtomicUsize::new(0) }
    }

    /// Number of `infer` calls received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceEngine for FailingEngine {
    fn name(&self) -> &str {
        "failing"
    }

    async fn check_format(&self, _media: &MediaDescriptor) -> Result<()> {
        match self.point {
            FailurePoint::Handshake => Err(ExtensionError::inference_failed("format rejected")),
            _ => Ok(()),
        }
    }

    async fn infer(&self, _frames: &[Frame]) -> Result<Vec<Annotation>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.point {
            FailurePoint::InvalidOutput => Ok(vec![Annotation::default()]),
            _ => Err(ExtensionError::inference_failed("model unavailable")),
        }
    }
}
