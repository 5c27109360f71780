//! Incremental decoding
//!
//! - [`StreamReader`] - one decoded frame per call for a single stream
//! - [`AudioStream`] - 16-bit stereo PCM in caller-sized chunks
//! - [`VideoPlayer`] - clock-driven, double-buffered YUV420P presentation

pub mod audio;
pub mod reader;
pub mod video;

pub use audio::AudioStream;
pub use reader::StreamReader;
pub use video::{
  DoubleBuffer, FfmpegVideoSource, PlaybackClock, VideoFrame, VideoPlayer, VideoSource,
};
