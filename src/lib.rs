//! Streaming media-inference extension engine.
//!
//! Framelink accepts video-analytics streams from a host, batches the frames
//! and runs them through a pluggable inference engine, answering every
//! sample with an acknowledgement or a set of annotations.
//!
//! # Features
//!
//! - **Session protocol**: descriptor handshake, per-sample responses with
//!   acknowledgement and sequence metadata, explicit terminal status
//! - **Zero-copy transfer**: sample bytes read from named shared memory
//!   regions through a single bounds-checked choke point
//! - **Batching**: configurable batch size, one inference call per batch
//! - **Transports**: in-process channels and length-delimited JSON over TCP
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use framelink::{ExtensionConfig, ExtensionServer, IntensityClassifier};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> framelink::Result<()> {
//!     let config = ExtensionConfig::load("extension.yaml")?;
//!     framelink::logging::init(&config.logging)?;
//!
//!     let server = ExtensionServer::new(config, Arc::new(IntensityClassifier::new()))?;
//!     let listener = TcpListener::bind("0.0.0.0:5001").await?;
//!     server.serve(listener).await
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Ambient configuration
pub mod config;
pub mod logging;

// Protocol engine
pub mod batch;
pub mod inference;
pub mod normalize;
pub mod session;
pub mod shm;

// Transport and hosting
pub mod channel;
pub mod server;

// Core exports
pub use error::*;
pub use types::*;

pub use batch::{BatchAccumulator, BatchOutcome};
pub use channel::{FramedChannel, MemoryChannel, MessageChannel, PeerEvent, PeerHandle};
pub use config::{AccessMode, AttachPolicy, ExtensionConfig, LoggingConfig, SharedMemoryConfig};
pub use inference::{InferenceEngine, IntensityClassifier};
pub use normalize::normalize;
pub use server::ExtensionServer;
pub use session::{Session, SessionDriver, SessionReport, SessionState};
pub use shm::{BufferManager, RegionHandle};
