//! Error types for the media stream extension engine.
//!
//! Every failure the engine can observe is represented by [`ExtensionError`].
//! Errors carry structured context and know how they are surfaced to the peer
//! through [`ExtensionError::status`].
//!
//! ## Error Categories
//!
//! - **Protocol Errors**: malformed handshake, out-of-order messages, invalid annotations
//! - **Memory Errors**: shared-memory attach failures and out-of-bounds references
//! - **Collaborator Errors**: failures raised by the inference engine
//! - **Channel Errors**: send/receive failures of the underlying stream
//! - **Configuration Errors**: invalid or unreadable configuration
//!
//! ## Fatal vs Recoverable
//!
//! Only collaborator failures during steady-state sample processing are
//! recoverable. Everything else terminates the session:
//!
//! ```rust
//! use framelink::ExtensionError;
//!
//! let error = ExtensionError::protocol_violation("missing annotation value");
//! assert!(!error.is_recoverable());
//!
//! let error = ExtensionError::inference_failed("model returned NaN");
//! assert!(error.is_recoverable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use thiserror::Error;

use crate::types::{SessionStatus, StatusCode};

#[cfg(windows)]
use windows_core as core;

/// Result type alias for engine operations.
pub type Result<T, E = ExtensionError> = std::result::Result<T, E>;

/// Main error type for the extension engine.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ExtensionError {
    #[error("Protocol violation: {reason}")]
    ProtocolViolation { reason: String },

    #[error("Reference [{offset}, {offset}+{length}) exceeds shared region of {size} bytes")]
    OutOfBounds { offset: u64, length: u64, size: usize },

    #[error("Shared memory region '{name}' unavailable: {reason}")]
    ResourceUnavailable {
        name: String,
        reason: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Shared memory region '{name}' is {actual} bytes, expected {expected}")]
    SizeMismatch { name: String, expected: u64, actual: u64 },

    #[error("Inference engine failed: {reason}")]
    Inference {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Channel failure: {reason}")]
    Channel {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Session cancelled")]
    Cancelled,

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Windows API error: {operation}")]
    #[cfg(windows)]
    WindowsApi {
        operation: String,
        #[source]
        source: core::Error,
    },
}

impl ExtensionError {
    /// Returns whether the session may continue after this error.
    ///
    /// A failed inference call produces an ack-only response instead of
    /// terminating an otherwise healthy stream.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ExtensionError::Inference { .. } => true,
            ExtensionError::ProtocolViolation { .. } => false,
            ExtensionError::OutOfBounds { .. } => false,
            ExtensionError::ResourceUnavailable { .. } => false,
            ExtensionError::SizeMismatch { .. } => false,
            ExtensionError::Channel { .. } => false,
            ExtensionError::Cancelled => false,
            ExtensionError::Config { .. } => false,
            #[cfg(windows)]
            ExtensionError::WindowsApi { .. } => false,
        }
    }

    /// Terminal status reported to the peer when this error ends a session.
    pub fn status(&self) -> SessionStatus {
        let code = match self {
            ExtensionError::ProtocolViolation { .. } => StatusCode::InvalidArgument,
            ExtensionError::OutOfBounds { .. } => StatusCode::OutOfRange,
            ExtensionError::ResourceUnavailable { .. } => StatusCode::InvalidArgument,
            ExtensionError::SizeMismatch { .. } => StatusCode::InvalidArgument,
            ExtensionError::Inference { .. } => StatusCode::Internal,
            ExtensionError::Channel { .. } => StatusCode::Unavailable,
            ExtensionError::Cancelled => StatusCode::Cancelled,
            ExtensionError::Config { .. } => StatusCode::FailedPrecondition,
            #[cfg(windows)]
            ExtensionError::WindowsApi { .. } => StatusCode::InvalidArgument,
        };
        SessionStatus::new(code, self.to_string())
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ExtensionError::ProtocolViolation { .. } => vec![
                "Send a stream descriptor as the first message",
                "Populate exactly one value on every annotation",
                "Use a supported data transfer mode",
            ],
            ExtensionError::OutOfBounds { .. } => vec![
                "Keep content references inside the negotiated region size",
                "Verify the length announced in the stream descriptor",
            ],
            ExtensionError::ResourceUnavailable { .. } => vec![
                "Create the shared memory region before opening the stream",
                "Check the configured shared memory directory",
                "Enable create-if-missing if the extension should own the region",
            ],
            ExtensionError::SizeMismatch { .. } => vec![
                "Announce the exact size of the existing region",
                "Recreate the region with the expected size",
            ],
            ExtensionError::Inference { .. } => vec![
                "Check the inference engine logs",
                "Verify the frames match the negotiated media format",
            ],
            ExtensionError::Channel { .. } => vec![
                "Check network connectivity to the peer",
                "Reopen the stream",
            ],
            ExtensionError::Cancelled => vec!["Reopen the stream once the extension is running"],
            ExtensionError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Ensure batch_size is at least 1",
            ],
            #[cfg(windows)]
            ExtensionError::WindowsApi { .. } => vec![
                "Check that the named mapping exists in the Local namespace",
                "Verify the process has access to the mapping",
            ],
        }
    }

    /// Helper constructor for protocol violations.
    pub fn protocol_violation(reason: impl Into<String>) -> Self {
        ExtensionError::ProtocolViolation { reason: reason.into() }
    }

    /// Helper constructor for out-of-bounds shared memory references.
    pub fn out_of_bounds(offset: u64, length: u64, size: usize) -> Self {
        ExtensionError::OutOfBounds { offset, length, size }
    }

    /// Helper constructor for unavailable shared memory regions.
    pub fn resource_unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ExtensionError::ResourceUnavailable { name: name.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for unavailable shared memory regions with an I/O source.
    pub fn resource_unavailable_with_source(
        name: impl Into<String>,
        reason: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        ExtensionError::ResourceUnavailable {
            name: name.into(),
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Helper constructor for collaborator failures.
    pub fn inference_failed(reason: impl Into<String>) -> Self {
        ExtensionError::Inference { reason: reason.into(), source: None }
    }

    /// Helper constructor for collaborator failures with source.
    pub fn inference_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        ExtensionError::Inference { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for channel failures.
    pub fn channel_failed(reason: impl Into<String>) -> Self {
        ExtensionError::Channel { reason: reason.into(), source: None }
    }

    /// Helper constructor for channel failures with source.
    pub fn channel_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        ExtensionError::Channel { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        ExtensionError::Config { context: context.into(), details: details.into() }
    }

    /// Helper constructor for Windows API errors.
    #[cfg(windows)]
    pub fn windows_api_error(operation: impl Into<String>, source: core::Error) -> Self {
        ExtensionError::WindowsApi { operation: operation.into(), source }
    }
}

impl From<std::io::Error> for ExtensionError {
    fn from(err: std::io::Error) -> Self {
        ExtensionError::Channel { reason: err.to_string(), source: Some(Box::new(err)) }
    }
}

#[cfg(windows)]
impl From<core::Error> for ExtensionError {
    fn from(err: core::Error) -> Self {
        ExtensionError::WindowsApi {
            operation: "Unknown Windows operation".to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            reason in ".*",
            name in "[a-z0-9_]{1,16}",
            offset in 0u64..0x10000u64,
            length in 0u64..0x10000u64,
            size in 0usize..0x10000usize,
          ) {
            let violation = ExtensionError::protocol_violation(reason.clone());
            prop_assert!(violation.to_string().contains(&reason));

            let bounds = ExtensionError::out_of_bounds(offset, length, size);
            let msg = bounds.to_string();
            prop_assert!(msg.contains(&offset.to_string()));
            prop_assert!(msg.contains(&size.to_string()));

            let missing = ExtensionError::resource_unavailable(name.clone(), reason.clone());
            prop_assert!(missing.to_string().contains(&name));
          }

          #[test]
          fn only_inference_failures_are_recoverable(reason in ".*") {
            let fatal = [
                ExtensionError::protocol_violation(reason.clone()),
                ExtensionError::out_of_bounds(1, 2, 3),
                ExtensionError::resource_unavailable("buf", reason.clone()),
                ExtensionError::SizeMismatch { name: "buf".into(), expected: 1, actual: 2 },
                ExtensionError::channel_failed(reason.clone()),
                ExtensionError::Cancelled,
                ExtensionError::config_error("batch_size", reason.clone()),
            ];
            for error in &fatal {
                prop_assert!(!error.is_recoverable());
            }
            prop_assert!(ExtensionError::inference_failed(reason).is_recoverable());
          }
        }
    }

    #[test]
    fn status_mapping_matches_peer_contract() {
        assert_eq!(
            ExtensionError::protocol_violation("x").status().code,
            StatusCode::InvalidArgument
        );
        assert_eq!(ExtensionError::out_of_bounds(1000, 100, 1024).status().code, StatusCode::OutOfRange);
        assert_eq!(
            ExtensionError::resource_unavailable("buf0", "missing").status().code,
            StatusCode::InvalidArgument
        );
        assert_eq!(ExtensionError::channel_failed("reset").status().code, StatusCode::Unavailable);
        assert_eq!(ExtensionError::Cancelled.status().code, StatusCode::Cancelled);
        assert_eq!(ExtensionError::inference_failed("boom").status().code, StatusCode::Internal);
    }

    #[test]
    fn status_message_is_the_display_text() {
        let error = ExtensionError::out_of_bounds(1000, 100, 1024);
        assert_eq!(error.status().message, error.to_string());
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<ExtensionError>();

        let error = ExtensionError::channel_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn io_errors_become_channel_failures() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer gone");
        let error: ExtensionError = io_err.into();

        match &error {
            ExtensionError::Channel { reason, source } => {
                assert_eq!(reason, "peer gone");
                assert!(source.is_some());
            }
            other => panic!("Expected Channel error, got {other:?}"),
        }
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn recovery_suggestions_are_descriptive() {
        for error in [
            ExtensionError::protocol_violation("x"),
            ExtensionError::out_of_bounds(0, 1, 0),
            ExtensionError::inference_failed("x"),
        ] {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }
}
