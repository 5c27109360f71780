//! Safe Rust wrappers for FFmpeg codec operations
//!
//! This module provides RAII wrappers around FFmpeg's C structures,
//! ensuring proper resource cleanup and memory safety. Every wrapper keeps
//! the loaded library alive through an `Arc<AvLibrary>`.

pub mod context;
pub mod demuxer;
pub mod frame;
pub mod io;
pub mod muxer;
pub mod packet;
pub mod resampler;
pub mod scaler;

pub use context::{CodecContext, CodecType};
pub use demuxer::{Demuxer, MediaType, StreamInfo};
pub use frame::{Frame, Plane};
pub use io::MediaSource;
pub use muxer::Muxer;
pub use packet::Packet;
pub use resampler::Resampler;
pub use scaler::{ScaleAlgorithm, Scaler};

use crate::ffi::{FFmpegError, LoadError, PixelFormat};
use std::os::raw::c_int;

/// Encoder configuration
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Video width in pixels
    pub width: u32,
    /// Video height in pixels
    pub height: u32,
    /// Frames per second
    pub frame_rate: u32,
    /// Pixel format the encoder consumes
    pub pixel_format: PixelFormat,
    /// Put codec headers in extradata (the container asks for it)
    pub global_header: bool,
    /// Codec private options, applied in order
    pub options: Vec<(&'static str, String)>,
}

impl EncoderConfig {
    /// Configuration with no private options and YUV420P input
    pub fn new(width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            width,
            height,
            frame_rate,
            pixel_format: PixelFormat::Yuv420p,
            global_header: false,
            options: Vec::new(),
        }
    }
}

/// Codec error type
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] FFmpegError),

    #[error("FFmpeg not available: {0}")]
    Load(#[from] LoadError),

    #[error("Codec not found: {0}")]
    CodecNotFound(String),

    #[error("Decoder not found for codec id {0}")]
    DecoderNotFound(c_int),

    #[error("Failed to allocate {0}")]
    AllocationFailed(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Codec not configured")]
    NotConfigured,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("An encode session is already open")]
    SessionActive,

    #[error("Encoding is not supported by the loaded FFmpeg")]
    Unsupported,

    #[error("No {0} stream in input")]
    StreamNotFound(MediaType),

    #[error("Unsupported pixel format: {0}")]
    UnsupportedPixelFormat(c_int),
}

pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::StreamNotFound(MediaType::Audio);
        assert_eq!(err.to_string(), "No audio stream in input");

        let err: CodecError = FFmpegError::new(-22, "Invalid argument").into();
        assert!(matches!(err, CodecError::Ffmpeg(ref e) if e.code == -22));
    }

    #[test]
    fn test_encoder_config_defaults() {
        let config = EncoderConfig::new(320, 240, 30);
        assert_eq!(config.pixel_format, PixelFormat::Yuv420p);
        assert!(!config.global_header);
        assert!(config.options.is_empty());
    }
}
