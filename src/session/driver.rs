//! Per-session worker loop

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{Session, SessionState};
use crate::channel::MessageChannel;
use crate::inference::InferenceEngine;
use crate::types::SessionStatus;
use crate::{ExtensionError, Result};

/// Outcome of a finished session
#[derive(Debug)]
pub struct SessionReport {
    pub session_id: u64,
    /// `Closed` or `Aborted`
    pub state: SessionState,
    pub messages_received: u64,
    pub messages_sent: u64,
    /// The error that aborted the session, if any
    pub error: Option<ExtensionError>,
}

impl SessionReport {
    /// Terminal status as reported to the peer
    pub fn status(&self) -> SessionStatus {
        match &self.error {
            Some(error) => error.status(),
            None => SessionStatus::ok(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.state == SessionState::Closed && self.error.is_none()
    }
}

/// Drives a [`Session`] over a [`MessageChannel`]
///
/// The worker suspends only while waiting for the next inbound message and
/// while a response is being sent. Both waits end early when `cancel` fires.
pub struct SessionDriver;

impl SessionDriver {
    pub async fn run<C>(
        mut session: Session,
        mut channel: C,
        engine: &dyn InferenceEngine,
        cancel: CancellationToken,
    ) -> SessionReport
    where
        C: MessageChannel,
    {
        info!(session = session.id(), engine = engine.name(), "Session started");
        let mut received = 0u64;
        let mut sent = 0u64;

        let outcome: Result<()> = loop {
            let inbound = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(session = session.id(), "Cancelled while waiting for a message");
                    break Err(ExtensionError::Cancelled);
                }
                inbound = channel.recv() => inbound,
            };

            let message = match inbound {
                Ok(Some(message)) => message,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };
            received += 1;

            let response = match session.handle_message(message, engine).await {
                Ok(response) => response,
                Err(e) => break Err(e),
            };

            trace!(
                session = session.id(),
                sequence = response.sequence_number,
                ack = response.ack_sequence_number,
                "Sending response"
            );
            let delivered = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(session = session.id(), "Cancelled while sending");
                    Err(ExtensionError::Cancelled)
                }
                delivered = channel.send(response) => delivered,
            };
            if let Err(e) = delivered {
                break Err(e);
            }
            sent += 1;
        };

        let error = match outcome {
            Ok(()) => {
                session.close();
                Self::deliver_status(&session, &mut channel, SessionStatus::ok(), &cancel).await;
                None
            }
            Err(e) => {
                session.abort(&e);
                // A broken channel cannot carry the status
                if !matches!(e, ExtensionError::Channel { .. }) {
                    Self::deliver_status(&session, &mut channel, e.status(), &cancel).await;
                }
                Some(e)
            }
        };

        info!(
            session = session.id(),
            state = %session.state(),
            received,
            sent,
            "Session ended"
        );

        SessionReport {
            session_id: session.id(),
            state: session.state(),
            messages_received: received,
            messages_sent: sent,
            error,
        }
    }

    /// Send the terminal status; once `cancel` has fired the send is attempted
    /// without waiting on a peer that stopped reading
    async fn deliver_status<C>(
        session: &Session,
        channel: &mut C,
        status: SessionStatus,
        cancel: &CancellationToken,
    ) where
        C: MessageChannel,
    {
        let delivered = tokio::select! {
            biased;
            delivered = channel.finish(status) => delivered,
            _ = cancel.cancelled() => {
                debug!(session = session.id(), "Terminal status dropped after cancellation");
                return;
            }
        };
        if let Err(e) = delivered {
            warn!(session = session.id(), error = %e, "Failed to report terminal status");
        }
    }
}
