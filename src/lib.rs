#![deny(clippy::all)]

//! Runtime-loaded FFmpeg media pipelines
//!
//! FFmpeg is opened at runtime rather than linked. On top of it the crate offers:
//!
//! - RGBA frame encoding into a container ([`Encoder`])
//! - whole-file audio decoding with tags and cover art ([`Binding::load_audio_file`])
//! - streaming audio and clock-synchronized video playback ([`stream`])
//!
//! Everything starts from a [`Binding`], usually the shared one:
//!
//! ```no_run
//! let Some(binding) = avbridge::Binding::shared() else {
//!   return;
//! };
//! let info = binding.load_audio_file("song.flac").unwrap();
//! println!("{} samples at {} Hz", info.sample_count(), info.sample_rate);
//! ```

// FFmpeg C bindings (hand-written, no bindgen)
pub mod ffi;

// Safe codec wrappers (RAII)
pub mod codec;

pub mod audio;
pub mod binding;
pub mod capability;
pub mod config;
pub mod encode;
pub mod stream;

pub use audio::{load_audio_file, CoverArt, MediaInfo};
pub use binding::{is_supported, Binding};
pub use capability::Capabilities;
pub use codec::{CodecError, CodecResult, MediaSource, MediaType};
pub use config::{BindingConfig, LogLevel, PlaybackConfig};
pub use encode::{EncodeSession, Encoder};
pub use ffi::LoadError;
pub use stream::{AudioStream, StreamReader, VideoFrame, VideoPlayer};
