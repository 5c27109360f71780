//! Loaded FFmpeg plus what it can do
//!
//! A [`Binding`] is the entry point for every pipeline. Most callers use the
//! process-wide one from [`Binding::shared`], configured from the environment;
//! [`Binding::load`] builds an independent one from an explicit config.

use crate::audio::{self, MediaInfo};
use crate::capability::Capabilities;
use crate::codec::{CodecResult, MediaSource, MediaType};
use crate::config::{BindingConfig, PlaybackConfig};
use crate::encode::Encoder;
use crate::ffi::{AvLibrary, LoadError, Module};
use crate::stream::{AudioStream, FfmpegVideoSource, StreamReader, VideoPlayer};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

pub struct Binding {
  lib: Arc<AvLibrary>,
  capabilities: Capabilities,
  config: BindingConfig,
}

impl Binding {
  /// Load FFmpeg and negotiate capabilities
  pub fn load(config: BindingConfig) -> Result<Self, LoadError> {
    let lib = AvLibrary::load_from(&config.search_dirs)?;
    lib.set_log_level(config.ffmpeg_log_level.as_raw());

    let capabilities = Capabilities::negotiate(&lib, &config);
    debug!(
      target: "avbridge",
      log_level = ?config.ffmpeg_log_level,
      supported = capabilities.is_supported(),
      "binding ready"
    );

    Ok(Self {
      lib: Arc::new(lib),
      capabilities,
      config,
    })
  }

  /// Process-wide binding configured by [`BindingConfig::from_env`]
  ///
  /// Loaded on first call; None if FFmpeg could not be loaded.
  pub fn shared() -> Option<&'static Binding> {
    static SHARED: OnceLock<Option<Binding>> = OnceLock::new();
    SHARED
      .get_or_init(|| match Self::load(BindingConfig::from_env()) {
        Ok(binding) => Some(binding),
        Err(e) => {
          warn!(target: "avbridge", error = %e, "FFmpeg unavailable");
          None
        }
      })
      .as_ref()
  }

  pub fn library(&self) -> &Arc<AvLibrary> {
    &self.lib
  }

  pub fn capabilities(&self) -> &Capabilities {
    &self.capabilities
  }

  pub fn config(&self) -> &BindingConfig {
    &self.config
  }

  /// Empty encode slot using the negotiated encoder
  pub fn encoder(&self) -> Encoder {
    Encoder::new(Arc::clone(&self.lib), self.capabilities.clone())
  }

  /// Decode the first audio stream of `source` into memory
  pub fn load_audio_file(&self, source: impl Into<MediaSource>) -> CodecResult<MediaInfo> {
    audio::load_audio_file(&self.lib, &source.into())
  }

  /// Frame-by-frame decoder for the first stream of `media_type`
  pub fn open_stream(
    &self,
    source: impl Into<MediaSource>,
    media_type: MediaType,
  ) -> CodecResult<StreamReader> {
    StreamReader::open(&self.lib, &source.into(), media_type)
  }

  /// Streaming 16-bit stereo decoder for the first audio stream
  pub fn open_audio(&self, source: impl Into<MediaSource>) -> CodecResult<AudioStream> {
    AudioStream::open(&self.lib, &source.into())
  }

  /// Player for the first video stream with default thresholds
  pub fn open_video(
    &self,
    source: impl Into<MediaSource>,
  ) -> CodecResult<VideoPlayer<FfmpegVideoSource>> {
    self.open_video_with(source, PlaybackConfig::default())
  }

  pub fn open_video_with(
    &self,
    source: impl Into<MediaSource>,
    config: PlaybackConfig,
  ) -> CodecResult<VideoPlayer<FfmpegVideoSource>> {
    let video = FfmpegVideoSource::open(&self.lib, &source.into())?;
    Ok(VideoPlayer::new(video, config))
  }
}

impl std::fmt::Debug for Binding {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Binding")
      .field("avformat", &self.lib.version(Module::Avformat))
      .field("capabilities", &self.capabilities)
      .field("config", &self.config)
      .finish()
  }
}

/// Whether the shared binding loaded and can encode
pub fn is_supported() -> bool {
  Binding::shared().is_some_and(|binding| binding.capabilities.is_supported())
}
