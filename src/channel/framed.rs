//! Length-delimited JSON frames over any byte stream
//!
//! Each frame is a 4-byte big-endian length followed by one JSON-encoded
//! [`WireFrame`]. The same type serves both ends of a connection: the
//! engine receives `Message` frames and answers with `Message` frames
//! followed by exactly one `Status` frame.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, trace};

use super::MessageChannel;
use crate::types::{SessionStatus, StreamMessage};
use crate::{ExtensionError, Result};

/// Largest accepted frame; embedded samples carry whole images
pub const MAX_FRAME_LENGTH: usize = 64 * 1024 * 1024;

/// One frame on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFrame {
    Message(StreamMessage),
    Status(SessionStatus),
}

/// Message channel over an `AsyncRead + AsyncWrite` transport
pub struct FramedChannel<T> {
    framed: Framed<T, LengthDelimitedCodec>,
}

impl<T> FramedChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(io: T) -> Self {
        let codec = LengthDelimitedCodec::builder().max_frame_length(MAX_FRAME_LENGTH).new_codec();
        Self { framed: Framed::new(io, codec) }
    }

    /// Encode and send one frame
    pub async fn send_frame(&mut self, frame: &WireFrame) -> Result<()> {
        let encoded = serde_json::to_vec(frame).map_err(|e| {
            ExtensionError::channel_failed_with_source("failed to encode frame", Box::new(e))
        })?;
        trace!(bytes = encoded.len(), "Writing frame");
        self.framed.send(Bytes::from(encoded)).await?;
        Ok(())
    }

    /// Receive and decode one frame, `None` at end of stream
    pub async fn next_frame(&mut self) -> Result<Option<WireFrame>> {
        let Some(read) = self.framed.next().await else {
            return Ok(None);
        };
        let bytes = read?;
        let frame = serde_json::from_slice(&bytes).map_err(|e| {
            ExtensionError::protocol_violation(format!("malformed frame: {e}"))
        })?;
        Ok(Some(frame))
    }

    /// Send a message frame
    pub async fn send_message(&mut self, message: StreamMessage) -> Result<()> {
        self.send_frame(&WireFrame::Message(message)).await
    }

    /// Flush and shut down the write half; reading remains possible
    pub async fn close(&mut self) -> Result<()> {
        SinkExt::<Bytes>::close(&mut self.framed).await?;
        Ok(())
    }

    pub fn into_inner(self) -> T {
        self.framed.into_inner()
    }
}

#[async_trait::async_trait]
impl<T> MessageChannel for FramedChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn recv(&mut self) -> Result<Option<StreamMessage>> {
        match self.next_frame().await? {
            Some(WireFrame::Message(message)) => Ok(Some(message)),
            Some(WireFrame::Status(status)) => {
                debug!(%status, "Peer ended its stream with a status");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn send(&mut self, message: StreamMessage) -> Result<()> {
        self.send_message(message).await
    }

    async fn finish(&mut self, status: SessionStatus) -> Result<()> {
        self.send_frame(&WireFrame::Status(status)).await?;
        self.close().await
    }
}

impl<T> std::fmt::Debug for FramedChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedChannel").finish_non_exhaustive()
    }
}
