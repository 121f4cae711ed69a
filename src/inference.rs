//! Frame inference collaborator
//!
//! The session core never interprets frame bytes itself. It hands full
//! batches to an [`InferenceEngine`] and forwards whatever annotations come
//! back, after normalizing them.
//!
//! One engine instance may be shared by every session of a server, so
//! implementations must be safe under concurrent calls.

use async_trait::async_trait;
use tracing::debug;

use crate::types::{Annotation, Frame, MediaDescriptor, SampleFormat};
use crate::{ExtensionError, Result};

/// Subtype attached by [`IntensityClassifier`]
pub const COLOR_INTENSITY_SUBTYPE: &str = "colorIntensity";

/// Average byte value below which a frame is classified "dark"
pub const DARK_THRESHOLD: u64 = 127;

/// Inference collaborator
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Accept or reject the client's media format during the handshake
    ///
    /// An error here aborts the session before any sample is processed.
    async fn check_format(&self, media: &MediaDescriptor) -> Result<()>;

    /// Run inference over a complete batch in submission order
    ///
    /// An error here is logged and answered with an ack-only response; the
    /// session keeps streaming.
    async fn infer(&self, frames: &[Frame]) -> Result<Vec<Annotation>>;
}

/// Classifies each frame as "dark" or "light" from its average byte value
#[derive(Debug, Clone, Copy, Default)]
pub struct IntensityClassifier;

impl IntensityClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classification label for a single frame's bytes
    pub fn classify(data: &[u8]) -> &'static str {
        if data.is_empty() {
            return "dark";
        }
        let total: u64 = data.iter().map(|b| u64::from(*b)).sum();
        let average = total / data.len() as u64;
        if average < DARK_THRESHOLD { "dark" } else { "light" }
    }
}

#[async_trait]
impl InferenceEngine for IntensityClassifier {
    fn name(&self) -> &str {
        "intensity-classifier"
    }

    async fn check_format(&self, media: &MediaDescriptor) -> Result<()> {
        match &media.sample_format {
            Some(SampleFormat::VideoFrame(format)) => {
                if let Some(dimensions) = format.dimensions {
                    if dimensions.width == 0 || dimensions.height == 0 {
                        return Err(ExtensionError::inference_failed(format!(
                            "frame dimensions {}x{} are empty",
                            dimensions.width, dimensions.height
                        )));
                    }
                }
                debug!(
                    encoding = ?format.encoding,
                    pixel_format = ?format.pixel_format,
                    frame_bytes = ?format.raw_frame_len(),
                    "Accepted video format"
                );
                Ok(())
            }
            Some(SampleFormat::Unrecognized) => {
                Err(ExtensionError::inference_failed("unsupported sample format"))
            }
            None => Err(ExtensionError::inference_failed("sample format not declared")),
        }
    }

    async fn infer(&self, frames: &[Frame]) -> Result<Vec<Annotation>> {
        let annotations = frames
            .iter()
            .map(|frame| {
                let label = Self::classify(&frame.data);
                debug!(sequence = frame.sequence_number, bytes = frame.len(), label, "Classified frame");
                Annotation::classification(label, 1.0).with_subtype(COLOR_INTENSITY_SUBTYPE)
            })
            .collect();
        Ok(annotations)
    }
}
