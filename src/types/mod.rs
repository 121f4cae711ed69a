//! Core types for the media stream extension protocol.
//!
//! This module provides the data model exchanged between a video-analytics
//! host and an inference extension.
//!
//! ## Architecture
//!
//! - [`StreamMessage`] is the envelope for every message, carrying a sender
//!   sequence number, an acknowledgement field and a [`Payload`]
//! - [`StreamDescriptor`] opens each direction of a session and fixes the
//!   [`DataTransfer`] mode
//! - [`MediaSample`] carries one sample's [`Content`] and its [`Annotation`]s
//! - [`Frame`] is the owned unit passed to the inference engine
//! - [`SessionStatus`] is the terminal status reported when a session ends
//!
//! ## Usage Example
//!
//! ```rust
//! use framelink::types::{
//!     Encoding, MediaDescriptor, MediaSample, PixelFormat, StreamDescriptor, StreamMessage,
//!     VideoFrameFormat,
//! };
//!
//! let media = MediaDescriptor::video(
//!     90_000,
//!     VideoFrameFormat { encoding: Encoding::Raw, pixel_format: PixelFormat::Rgb24, dimensions: None },
//! );
//!
//! let handshake = StreamMessage::descriptor(1, StreamDescriptor::shared_memory(media, "buf0", 1024));
//! let sample = StreamMessage::sample(2, MediaSample::reference(0, 100));
//!
//! assert!(handshake.as_descriptor().is_some());
//! assert!(sample.as_sample().is_some());
//! ```

mod annotation;
mod descriptor;
mod frame;
mod message;
mod sample;
mod status;

pub use annotation::{
    Annotation, AnnotationKind, AnnotationValue, Attribute, BoundingBox, Classification, Entity,
    Event, Motion, OtherValue, Tag, TextValue,
};
pub use descriptor::{
    DataTransfer, Dimensions, Encoding, MediaDescriptor, PixelFormat, SampleFormat,
    SharedMemoryTransfer, StreamDescriptor, VideoFrameFormat,
};
pub use frame::Frame;
pub use message::{Payload, StreamMessage};
pub use sample::{Content, ContentReference, MediaSample};
pub use status::{SessionStatus, StatusCode};
