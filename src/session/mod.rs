//! Stream sessions
//!
//! A [`Session`] is the state machine for one client stream:
//!
//! ```text
//! AwaitingDescriptor ──descriptor──▶ Streaming ──end of stream──▶ Closed
//!         │                              │
//!         └──────── fatal error ─────────┴──────────────────────▶ Aborted
//! ```
//!
//! [`SessionDriver`] runs a session against a
//! [`MessageChannel`](crate::channel::MessageChannel) and reports how it ended.

mod driver;
mod state;

pub use driver::{SessionDriver, SessionReport};
pub use state::{Session, SessionState};
