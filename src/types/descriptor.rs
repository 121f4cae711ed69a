//! Stream descriptor exchanged during the handshake

use serde::{Deserialize, Serialize};

/// Handshake payload: sample shape plus the data transfer mode
///
/// Exactly one descriptor opens each direction of a session. The data
/// transfer mode is fixed by the client's descriptor and never changes
/// for the rest of the stream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Shape of the samples that follow
    pub media: MediaDescriptor,

    /// How sample bytes travel from client to extension
    #[serde(default)]
    pub data_transfer: DataTransfer,
}

impl StreamDescriptor {
    /// Descriptor for samples embedded in the messages themselves
    pub fn embedded(media: MediaDescriptor) -> Self {
        Self { media, data_transfer: DataTransfer::Embedded }
    }

    /// Descriptor for samples referenced inside a named shared memory region
    pub fn shared_memory(
        media: MediaDescriptor,
        handle_name: impl Into<String>,
        length_bytes: u64,
    ) -> Self {
        Self {
            media,
            data_transfer: DataTransfer::SharedMemory(SharedMemoryTransfer {
                handle_name: handle_name.into(),
                length_bytes,
            }),
        }
    }
}

/// Media sample shape
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaDescriptor {
    /// Ticks per second used by sample timestamps
    #[serde(default)]
    pub timescale: u32,

    /// Sample format family, absent when the client did not declare one
    #[serde(default)]
    pub sample_format: Option<SampleFormat>,
}

impl MediaDescriptor {
    /// Descriptor for video frames
    pub fn video(timescale: u32, format: VideoFrameFormat) -> Self {
        Self { timescale, sample_format: Some(SampleFormat::VideoFrame(format)) }
    }

    /// The reply the extension sends back: only negotiated fields are echoed
    pub fn negotiated_reply(&self) -> Self {
        Self { timescale: self.timescale, sample_format: None }
    }

    /// Video frame format if this descriptor declares one
    pub fn video_format(&self) -> Option<&VideoFrameFormat> {
        match &self.sample_format {
            Some(SampleFormat::VideoFrame(format)) => Some(format),
            _ => None,
        }
    }
}

/// Sample format family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum SampleFormat {
    /// Individual video frames
    VideoFrame(VideoFrameFormat),

    /// Any format family this engine does not know
    #[serde(other)]
    Unrecognized,
}

/// Video frame encoding, pixel layout and dimensions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoFrameFormat {
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default)]
    pub pixel_format: PixelFormat,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
}

impl VideoFrameFormat {
    /// Size in bytes of one raw packed frame, when dimensions are declared
    pub fn raw_frame_len(&self) -> Option<usize> {
        if self.encoding != Encoding::Raw {
            return None;
        }
        let dimensions = self.dimensions?;
        let bytes_per_pixel = self.pixel_format.bytes_per_pixel()?;
        (dimensions.width as usize)
            .checked_mul(dimensions.height as usize)?
            .checked_mul(bytes_per_pixel)
    }
}

/// Frame encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    #[default]
    Raw,
    Jpg,
    Bmp,
    Png,
}

/// Pixel layout of raw frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    #[default]
    None,
    Yuv420p,
    Rgb565be,
    Rgb565le,
    Rgb555be,
    Rgb555le,
    Rgb24,
    Bgr24,
    Argb,
    Rgba,
    Abgr,
    Bgra,
}

impl PixelFormat {
    /// Bytes per pixel for packed formats, `None` for planar or unspecified layouts
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            PixelFormat::None | PixelFormat::Yuv420p => None,
            PixelFormat::Rgb565be
            | PixelFormat::Rgb565le
            | PixelFormat::Rgb555be
            | PixelFormat::Rgb555le => Some(2),
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => Some(3),
            PixelFormat::Argb | PixelFormat::Rgba | PixelFormat::Abgr | PixelFormat::Bgra => {
                Some(4)
            }
        }
    }
}

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Data transfer property of a stream
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DataTransfer {
    /// Sample bytes travel inside each message
    #[default]
    Embedded,

    /// Sample bytes live in a named shared memory region
    SharedMemory(SharedMemoryTransfer),

    /// A mode this engine does not implement
    #[serde(other)]
    Unsupported,
}

impl DataTransfer {
    pub fn is_shared_memory(&self) -> bool {
        matches!(self, DataTransfer::SharedMemory(_))
    }
}

/// Shared memory transfer properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedMemoryTransfer {
    /// Region name, resolved per platform by the buffer manager
    pub handle_name: String,
    /// Exact region size in bytes
    pub length_bytes: u64,
}
