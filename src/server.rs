//! Extension server
//!
//! Sessions run as independent tokio tasks. They share the configuration,
//! the buffer manager settings and one inference engine; nothing else.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use crate::channel::{FramedChannel, MessageChannel};
use crate::config::ExtensionConfig;
use crate::inference::InferenceEngine;
use crate::session::{Session, SessionDriver, SessionReport};
use crate::shm::BufferManager;
use crate::Result;

/// Accepts streams and runs one session per stream
pub struct ExtensionServer {
    config: ExtensionConfig,
    batch_size: NonZeroUsize,
    buffers: BufferManager,
    engine: Arc<dyn InferenceEngine>,
    cancel: CancellationToken,
    next_session_id: AtomicU64,
}

impl ExtensionServer {
    pub fn new(config: ExtensionConfig, engine: Arc<dyn InferenceEngine>) -> Result<Self> {
        config.validate()?;
        let batch_size = config.batch_size()?;
        let buffers = BufferManager::new(config.shared_memory.clone());

        info!(batch_size = batch_size.get(), engine = engine.name(), "Extension server created");
        Ok(Self {
            config,
            batch_size,
            buffers,
            engine,
            cancel: CancellationToken::new(),
            next_session_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    /// Token cancelled by [`shutdown`](Self::shutdown)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run a session over `channel` on its own task
    pub fn spawn_session<C>(&self, channel: C) -> JoinHandle<SessionReport>
    where
        C: MessageChannel,
    {
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let session = Session::new(id, self.batch_size, self.buffers.clone());
        let engine = Arc::clone(&self.engine);
        let cancel = self.cancel.child_token();

        tokio::spawn(
            async move { SessionDriver::run(session, channel, engine.as_ref(), cancel).await }
                .instrument(info_span!("session", id)),
        )
    }

    /// Accept TCP connections until shutdown
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let address = listener.local_addr()?;
        info!(%address, "Listening for streams");

        loop {
            let accepted = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Server shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!(%peer, error = %e, "Failed to disable Nagle");
                    }
                    info!(%peer, "Accepted stream");
                    // Reports are logged by the driver itself
                    drop(self.spawn_session(FramedChannel::new(stream)));
                }
                Err(e) => warn!(error = %e, "Failed to accept connection"),
            }
        }
    }

    /// Cancel the accept loop and every running session
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ExtensionServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionServer")
            .field("batch_size", &self.batch_size)
            .field("engine", &self.engine.name())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
