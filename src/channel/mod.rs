//! Bidirectional message channels
//!
//! A session talks to its peer through a [`MessageChannel`]. The trait hides
//! whether messages travel in-process ([`MemoryChannel`]) or over a byte
//! stream ([`FramedChannel`]), so the session driver only ever suspends on
//! `recv` and `send`.

mod framed;
mod memory;

pub use framed::{FramedChannel, MAX_FRAME_LENGTH, WireFrame};
pub use memory::{MemoryChannel, PeerEvent, PeerHandle};

use crate::Result;
use crate::types::{SessionStatus, StreamMessage};

/// Engine side of a streaming session
#[async_trait::async_trait]
pub trait MessageChannel: Send + 'static {
    /// Receive the next inbound message
    ///
    /// Returns:
    /// - `Ok(Some(message))` - next message in delivery order
    /// - `Ok(None)` - the peer ended its stream cleanly
    /// - `Err(e)` - transport failure
    async fn recv(&mut self) -> Result<Option<StreamMessage>>;

    /// Send one outbound message
    async fn send(&mut self, message: StreamMessage) -> Result<()>;

    /// Report the terminal status and close the outbound direction
    async fn finish(&mut self, status: SessionStatus) -> Result<()>;
}
