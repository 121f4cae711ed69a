//! Per-session protocol state

use bytes::Bytes;
use std::fmt;
use std::num::NonZeroUsize;
use tracing::{debug, info, trace, warn};

use crate::batch::{BatchAccumulator, BatchOutcome};
use crate::config::ExtensionConfig;
use crate::inference::InferenceEngine;
use crate::normalize::normalize_all;
use crate::shm::{BufferManager, RegionHandle};
use crate::types::{
    Annotation, Content, DataTransfer, Frame, MediaSample, Payload, StreamDescriptor,
    StreamMessage,
};
use crate::{ExtensionError, Result};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Waiting for the client's stream descriptor
    AwaitingDescriptor,
    /// Handshake done; samples flow
    Streaming,
    /// Inbound stream ended cleanly
    Closed,
    /// Ended by a fatal error
    Aborted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Aborted)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::AwaitingDescriptor => "awaiting_descriptor",
            SessionState::Streaming => "streaming",
            SessionState::Closed => "closed",
            SessionState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Everything one session owns: state, negotiated descriptor, attached
/// region, partial batch and the outbound sequence counter
///
/// The context is driven one message at a time through
/// [`handle_message`](Self::handle_message) and needs no channel, which
/// keeps it testable on its own.
pub struct Session {
    id: u64,
    state: SessionState,
    buffers: BufferManager,
    descriptor: Option<StreamDescriptor>,
    region: Option<RegionHandle>,
    batch: BatchAccumulator,
    next_sequence: u64,
}

impl Session {
    pub fn new(id: u64, batch_size: NonZeroUsize, buffers: BufferManager) -> Self {
        Self {
            id,
            state: SessionState::AwaitingDescriptor,
            buffers,
            descriptor: None,
            region: None,
            batch: BatchAccumulator::new(batch_size),
            next_sequence: 1,
        }
    }

    pub fn from_config(id: u64, config: &ExtensionConfig) -> Result<Self> {
        Ok(Self::new(id, config.batch_size()?, BufferManager::new(config.shared_memory.clone())))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Descriptor accepted at handshake
    pub fn descriptor(&self) -> Option<&StreamDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn region(&self) -> Option<&RegionHandle> {
        self.region.as_ref()
    }

    /// Frames waiting for the current batch to fill
    pub fn pending_frames(&self) -> usize {
        self.batch.pending()
    }

    /// Consume one inbound message and produce exactly one response
    ///
    /// Any error other than a failed inference call aborts the session and
    /// releases its region before returning.
    pub async fn handle_message(
        &mut self,
        message: StreamMessage,
        engine: &dyn InferenceEngine,
    ) -> Result<StreamMessage> {
        let result = match self.state {
            SessionState::Closed | SessionState::Aborted => {
                Err(ExtensionError::protocol_violation(format!("session is {}", self.state)))
            }
            _ => self.dispatch(message, engine).await,
        };

        if let Err(e) = &result {
            self.abort(e);
        }
        result
    }

    async fn dispatch(
        &mut self,
        message: StreamMessage,
        engine: &dyn InferenceEngine,
    ) -> Result<StreamMessage> {
        let sequence = message.sequence_number;
        match (self.state, message.payload) {
            (SessionState::AwaitingDescriptor, Payload::Descriptor(descriptor)) => {
                self.accept_descriptor(sequence, descriptor, engine).await
            }
            (SessionState::AwaitingDescriptor, Payload::Sample(_)) => Err(
                ExtensionError::protocol_violation("expected a stream descriptor as the first message"),
            ),
            (SessionState::Streaming, Payload::Sample(sample)) => {
                self.process_sample(sequence, sample, engine).await
            }
            (SessionState::Streaming, Payload::Descriptor(_)) => Err(
                ExtensionError::protocol_violation("stream descriptor received after the handshake"),
            ),
            (state, _) => {
                Err(ExtensionError::protocol_violation(format!("session is {state}")))
            }
        }
    }

    async fn accept_descriptor(
        &mut self,
        sequence: u64,
        descriptor: StreamDescriptor,
        engine: &dyn InferenceEngine,
    ) -> Result<StreamMessage> {
        info!(
            session = self.id,
            sequence,
            timescale = descriptor.media.timescale,
            "Received stream descriptor"
        );

        let region = match &descriptor.data_transfer {
            DataTransfer::Embedded => {
                info!(session = self.id, "Using embedded frame transfer");
                None
            }
            DataTransfer::SharedMemory(transfer) => {
                info!(
                    session = self.id,
                    handle = %transfer.handle_name,
                    size = transfer.length_bytes,
                    "Using shared memory transfer"
                );
                Some(self.buffers.attach(&transfer.handle_name, transfer.length_bytes)?)
            }
            DataTransfer::Unsupported => {
                return Err(ExtensionError::protocol_violation("unsupported data transfer mode"));
            }
        };
        self.region = region;

        engine.check_format(&descriptor.media).await?;

        let reply = StreamDescriptor::embedded(descriptor.media.negotiated_reply());
        self.descriptor = Some(descriptor);
        self.state = SessionState::Streaming;

        debug!(session = self.id, engine = engine.name(), "Handshake complete");
        Ok(StreamMessage::descriptor(0, reply).with_ack(sequence))
    }

    async fn process_sample(
        &mut self,
        sequence: u64,
        sample: MediaSample,
        engine: &dyn InferenceEngine,
    ) -> Result<StreamMessage> {
        trace!(session = self.id, sequence, "Received media sample");

        let data = self.resolve_content(sample.content)?;
        let annotations = normalize_all(sample.annotations)?;
        let frame = Frame::new(sequence, data, annotations);

        let response = match self.batch.submit(frame) {
            BatchOutcome::Pending { position, batch_size } => {
                debug!(session = self.id, sequence, position, batch_size, "Acknowledging sample");
                MediaSample::default()
            }
            BatchOutcome::Ready(frames) => match run_inference(engine, &frames).await {
                Ok(annotations) => {
                    debug!(
                        session = self.id,
                        sequence,
                        frames = frames.len(),
                        annotations = annotations.len(),
                        "Batch inferred"
                    );
                    MediaSample::annotations(annotations)
                }
                Err(e) => {
                    warn!(session = self.id, sequence, error = %e, "Inference failed, acknowledging only");
                    MediaSample::default()
                }
            },
        };

        let response_sequence = self.next_sequence;
        self.next_sequence += 1;
        Ok(StreamMessage::sample(response_sequence, response.with_timestamp(sample.timestamp))
            .with_ack(sequence))
    }

    fn resolve_content(&self, content: Option<Content>) -> Result<Bytes> {
        match content {
            None => Err(ExtensionError::protocol_violation("media sample has no content")),
            Some(Content::Inline(bytes)) => Ok(bytes),
            Some(Content::Reference(reference)) => {
                let region = self.region.as_ref().ok_or_else(|| {
                    ExtensionError::protocol_violation(
                        "content reference on a stream without shared memory transfer",
                    )
                })?;
                let view = region.slice(reference.offset, reference.length)?;
                Ok(Bytes::copy_from_slice(view))
            }
        }
    }

    /// Inbound stream ended cleanly
    pub fn close(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        let dropped = self.batch.clear();
        if dropped > 0 {
            debug!(session = self.id, dropped, "Discarding partial batch at close");
        }
        self.release_region();
        self.state = SessionState::Closed;
        info!(session = self.id, "Session closed");
    }

    /// Fatal error; safe to call in any state
    pub fn abort(&mut self, error: &ExtensionError) {
        if self.state.is_terminal() {
            return;
        }
        warn!(session = self.id, state = %self.state, error = %error, "Session aborted");
        self.batch.clear();
        self.release_region();
        self.state = SessionState::Aborted;
    }

    fn release_region(&mut self) {
        if let Some(mut region) = self.region.take() {
            region.release();
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("region", &self.region)
            .field("pending_frames", &self.batch.pending())
            .field("next_sequence", &self.next_sequence)
            .finish()
    }
}

/// Run the engine and normalize what it returns
///
/// Every failure comes back as [`ExtensionError::Inference`], including
/// invalid engine output, so the caller can answer with an ack-only response.
async fn run_inference(engine: &dyn InferenceEngine, frames: &[Frame]) -> Result<Vec<Annotation>> {
    let annotations = engine.infer(frames).await.map_err(|e| match e {
        ExtensionError::Inference { .. } => e,
        other => ExtensionError::inference_failed_with_source(
            format!("{} failed", engine.name()),
            Box::new(other),
        ),
    })?;
    normalize_all(annotations).map_err(|e| {
        ExtensionError::inference_failed_with_source(
            format!("{} returned an invalid annotation", engine.name()),
            Box::new(e),
        )
    })
}
