//! Helpers shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use framelink::types::{
    Annotation, AnnotationValue, Frame, MediaDescriptor, MediaSample, StreamDescriptor,
    StreamMessage, VideoFrameFormat,
};
use framelink::{InferenceEngine, Result};
use std::sync::Mutex;

pub fn video_media() -> MediaDescriptor {
    MediaDescriptor::video(90_000, VideoFrameFormat::default())
}

pub fn embedded_handshake(sequence_number: u64) -> StreamMessage {
    StreamMessage::descriptor(sequence_number, StreamDescriptor::embedded(video_media()))
}

pub fn shared_memory_handshake(sequence_number: u64, name: &str, length_bytes: u64) -> StreamMessage {
    StreamMessage::descriptor(
        sequence_number,
        StreamDescriptor::shared_memory(video_media(), name, length_bytes),
    )
}

pub fn inline_sample(sequence_number: u64, fill: u8, len: usize) -> StreamMessage {
    StreamMessage::sample(sequence_number, MediaSample::inline(vec![fill; len]))
}

pub fn reference_sample(sequence_number: u64, offset: u64, length: u64) -> StreamMessage {
    StreamMessage::sample(sequence_number, MediaSample::reference(offset, length))
}

/// Labels each frame "frame-<sequence>-<bytes>b" and keeps every batch
#[derive(Debug, Default)]
pub struct LabelingEngine {
    batches: Mutex<Vec<Vec<Frame>>>,
}

impl LabelingEngine {
    pub fn batches(&self) -> Vec<Vec<Frame>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceEngine for LabelingEngine {
    fn name(&self) -> &str {
        "labeling"
    }

    async fn check_format(&self, _media: &MediaDescriptor) -> Result<()> {
        Ok(())
    }

    async fn infer(&self, frames: &[Frame]) -> Result<Vec<Annotation>> {
        self.batches.lock().unwrap().push(frames.to_vec());
        Ok(frames
            .iter()
            .map(|f| Annotation::classification(format!("frame-{}-{}b", f.sequence_number, f.len()), 0.9))
            .collect())
    }
}

/// Classification labels carried by a response
pub fn tag_values(message: &StreamMessage) -> Vec<String> {
    message
        .as_sample()
        .expect("sample response")
        .annotations
        .iter()
        .map(|a| match &a.value {
            Some(AnnotationValue::Classification(c)) => c.tag.value.clone(),
            other => panic!("unexpected payload {other:?}"),
        })
        .collect()
}
