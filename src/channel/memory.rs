//! In-process channel pair

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::trace;

use super::MessageChannel;
use crate::types::{SessionStatus, StreamMessage};
use crate::{ExtensionError, Result};

/// What the peer observes on the outbound direction
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    Message(StreamMessage),
    Finished(SessionStatus),
}

/// Engine side of an in-process session
#[derive(Debug)]
pub struct MemoryChannel {
    inbound: mpsc::Receiver<StreamMessage>,
    outbound: mpsc::Sender<PeerEvent>,
}

/// Client side of an in-process session
#[derive(Debug)]
pub struct PeerHandle {
    requests: Option<mpsc::Sender<StreamMessage>>,
    events: mpsc::Receiver<PeerEvent>,
}

impl MemoryChannel {
    /// Create a connected pair; each direction buffers up to `capacity` items
    pub fn pair(capacity: usize) -> (MemoryChannel, PeerHandle) {
        let capacity = capacity.max(1);
        let (request_tx, request_rx) = mpsc::channel(capacity);
        let (event_tx, event_rx) = mpsc::channel(capacity);

        let channel = MemoryChannel { inbound: request_rx, outbound: event_tx };
        let peer = PeerHandle { requests: Some(request_tx), events: event_rx };
        (channel, peer)
    }
}

#[async_trait::async_trait]
impl MessageChannel for MemoryChannel {
    async fn recv(&mut self) -> Result<Option<StreamMessage>> {
        Ok(self.inbound.recv().await)
    }

    async fn send(&mut self, message: StreamMessage) -> Result<()> {
        trace!(sequence = message.sequence_number, ack = message.ack_sequence_number, "Sending");
        self.outbound
            .send(PeerEvent::Message(message))
            .await
            .map_err(|_| ExtensionError::channel_failed("peer disconnected"))
    }

    async fn finish(&mut self, status: SessionStatus) -> Result<()> {
        self.outbound
            .send(PeerEvent::Finished(status))
            .await
            .map_err(|_| ExtensionError::channel_failed("peer disconnected"))
    }
}

impl PeerHandle {
    /// Send a request to the session
    pub async fn send(&self, message: StreamMessage) -> Result<()> {
        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| ExtensionError::channel_failed("request stream already closed"))?;
        requests
            .send(message)
            .await
            .map_err(|_| ExtensionError::channel_failed("session stopped reading"))
    }

    /// End the request stream; the session then closes cleanly
    pub fn close(&mut self) {
        self.requests = None;
    }

    /// Next outbound event, `None` once the session dropped its channel
    pub async fn next_event(&mut self) -> Option<PeerEvent> {
        self.events.recv().await
    }

    /// Close the request stream and expose the remaining events as a `Stream`
    pub fn into_events(mut self) -> ReceiverStream<PeerEvent> {
        self.close();
        ReceiverStream::new(self.events)
    }
}
