//! Batch accumulation

use std::num::NonZeroUsize;
use tracing::trace;

use crate::types::Frame;

/// Result of submitting a frame
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Batch not yet full; the caller answers with an ack-only response
    Pending {
        /// 1-based position of the submitted frame in the current batch
        position: usize,
        batch_size: usize,
    },
    /// Batch exactly full; frames in submission order
    Ready(Vec<Frame>),
}

impl BatchOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, BatchOutcome::Ready(_))
    }
}

/// Collects frames until the configured batch size is reached
///
/// The accumulator is cleared every time it hands out a full batch, so it
/// never holds more than `batch_size - 1` frames between submissions.
#[derive(Debug)]
pub struct BatchAccumulator {
    batch_size: NonZeroUsize,
    frames: Vec<Frame>,
}

impl BatchAccumulator {
    pub fn new(batch_size: NonZeroUsize) -> Self {
        Self { batch_size, frames: Vec::with_capacity(batch_size.get()) }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    /// Frames waiting for the batch to complete
    pub fn pending(&self) -> usize {
        self.frames.len()
    }

    pub fn submit(&mut self, frame: Frame) -> BatchOutcome {
        self.frames.push(frame);
        let position = self.frames.len();

        if position < self.batch_size.get() {
            trace!(position, batch_size = self.batch_size.get(), "Frame queued");
            return BatchOutcome::Pending { position, batch_size: self.batch_size.get() };
        }

        let frames =
            std::mem::replace(&mut self.frames, Vec::with_capacity(self.batch_size.get()));
        trace!(frames = frames.len(), "Batch complete");
        BatchOutcome::Ready(frames)
    }

    /// Drop any partial batch
    pub fn clear(&mut self) -> usize {
        let dropped = self.frames.len();
        self.frames.clear();
        dropped
    }
}
