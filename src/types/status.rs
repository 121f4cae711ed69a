//! Terminal session status reported to the peer

use serde::{Deserialize, Serialize};

/// Status code carried by the final frame of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    /// Inbound stream ended cleanly
    Ok,
    /// Session was cancelled by the host or the peer
    Cancelled,
    /// Peer broke the protocol contract
    InvalidArgument,
    /// Content reference resolved outside the attached region
    OutOfRange,
    /// Extension is not in a state that can serve the session
    FailedPrecondition,
    /// Transport failed
    Unavailable,
    /// Collaborator failed where the failure cannot be absorbed
    Internal,
}

impl StatusCode {
    /// Whether this code reports a successful session
    pub fn is_ok(self) -> bool {
        matches!(self, StatusCode::Ok)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StatusCode::Ok => "OK",
            StatusCode::Cancelled => "CANCELLED",
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::OutOfRange => "OUT_OF_RANGE",
            StatusCode::FailedPrecondition => "FAILED_PRECONDITION",
            StatusCode::Unavailable => "UNAVAILABLE",
            StatusCode::Internal => "INTERNAL",
        };
        f.write_str(name)
    }
}

/// Terminal status of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub code: StatusCode,
    pub message: String,
}

impl SessionStatus {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Status for a cleanly closed session
    pub fn ok() -> Self {
        Self::new(StatusCode::Ok, "")
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}
