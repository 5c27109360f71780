//! Capability negotiation
//!
//! Decides whether the loaded FFmpeg can encode at all: the configured container
//! must be allocatable and at least one encoder from the preference list must be
//! known to libavcodec.

use crate::codec::Muxer;
use crate::config::BindingConfig;
use crate::ffi::{AvLibrary, PixelFormat};
use std::ffi::CString;
use tracing::{info, warn};

/// Encoders tried in order: lossless RGB, lossless YUV, lossless VP9, still images, legacy
pub const DEFAULT_ENCODER_PREFERENCE: &[&str] =
  &["libx264rgb", "libx264", "libvpx-vp9", "png", "mpeg4"];

/// First name in `preference` that `is_known` accepts
pub fn select_encoder<'a, S: AsRef<str>>(
  preference: &'a [S],
  mut is_known: impl FnMut(&str) -> bool,
) -> Option<&'a str> {
  preference
    .iter()
    .map(AsRef::as_ref)
    .find(|name| is_known(name))
}

/// Pixel format and private options used with a given encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderTuning {
  pub pixel_format: PixelFormat,
  pub options: Vec<(&'static str, String)>,
}

impl EncoderTuning {
  /// Lossless settings for the encoders we know, plain YUV420P for anything else
  pub fn for_encoder(name: &str) -> Self {
    let (pixel_format, options): (PixelFormat, &[(&'static str, &str)]) = match name {
      "libx264rgb" => (PixelFormat::Bgr0, &[("crf", "0"), ("preset", "slow")]),
      "libx264" => (PixelFormat::Yuv444p, &[("crf", "0"), ("preset", "slow")]),
      "libvpx-vp9" => (PixelFormat::Gbrp, &[("lossless", "1")]),
      "png" => (PixelFormat::Rgb24, &[]),
      _ => (PixelFormat::Yuv420p, &[]),
    };

    Self {
      pixel_format,
      options: options
        .iter()
        .map(|(key, value)| (*key, value.to_string()))
        .collect(),
    }
  }
}

/// Result of negotiation, computed once per [`Binding`](crate::Binding)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Capabilities {
  encoder: Option<String>,
  muxer: bool,
}

impl Capabilities {
  /// Probe the container and pick an encoder
  pub fn negotiate(lib: &AvLibrary, config: &BindingConfig) -> Self {
    let muxer = Muxer::probe(lib, &config.container);
    if !muxer {
      warn!(target: "avbridge", container = %config.container, "container not available, encoding disabled");
    }

    let encoder = select_encoder(&config.encoder_preference, |name| {
      let Ok(c_name) = CString::new(name) else {
        return false;
      };
      !unsafe { (lib.api.avcodec_find_encoder_by_name)(c_name.as_ptr()) }.is_null()
    })
    .map(str::to_string);

    match &encoder {
      Some(name) => info!(target: "avbridge", encoder = %name, "selected video encoder"),
      None => warn!(
        target: "avbridge",
        tried = ?config.encoder_preference,
        "no usable video encoder, encoding disabled"
      ),
    }

    Self { encoder, muxer }
  }

  /// Build a result directly (used when FFmpeg is absent, and by tests)
  pub fn new(encoder: Option<String>, muxer: bool) -> Self {
    Self { encoder, muxer }
  }

  /// Whether an encode session can be started
  pub fn is_supported(&self) -> bool {
    self.muxer && self.encoder.is_some()
  }

  /// Chosen encoder name
  pub fn encoder(&self) -> Option<&str> {
    self.encoder.as_deref()
  }

  /// Whether the container probe succeeded
  pub fn has_muxer(&self) -> bool {
    self.muxer
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_first_known_encoder_wins() {
    let chosen = select_encoder(DEFAULT_ENCODER_PREFERENCE, |_| true);
    assert_eq!(chosen, Some("libx264rgb"));
  }

  #[test]
  fn test_fallback_encoder() {
    let available = ["png", "mpeg4"];
    let chosen = select_encoder(DEFAULT_ENCODER_PREFERENCE, |n| available.contains(&n));
    assert_eq!(chosen, Some("png"));

    let caps = Capabilities::new(chosen.map(str::to_string), true);
    assert!(caps.is_supported());
    assert_eq!(caps.encoder(), Some("png"));
  }

  #[test]
  fn test_no_known_encoder() {
    let mut asked = Vec::new();
    let chosen = select_encoder(DEFAULT_ENCODER_PREFERENCE, |n| {
      asked.push(n.to_string());
      false
    });
    assert_eq!(chosen, None);
    assert_eq!(asked, DEFAULT_ENCODER_PREFERENCE);
    assert!(!Capabilities::new(None, true).is_supported());
  }

  #[test]
  fn test_missing_muxer_is_unsupported() {
    let caps = Capabilities::new(Some("mpeg4".into()), false);
    assert!(!caps.is_supported());
    assert!(!caps.has_muxer());
  }

  #[test]
  fn test_tuning() {
    let rgb = EncoderTuning::for_encoder("libx264rgb");
    assert_eq!(rgb.pixel_format, PixelFormat::Bgr0);
    assert_eq!(
      rgb.options,
      vec![("crf", "0".to_string()), ("preset", "slow".to_string())]
    );

    assert_eq!(
      EncoderTuning::for_encoder("libx264").pixel_format,
      PixelFormat::Yuv444p
    );

    let vp9 = EncoderTuning::for_encoder("libvpx-vp9");
    assert_eq!(vp9.pixel_format, PixelFormat::Gbrp);
    assert_eq!(vp9.options, vec![("lossless", "1".to_string())]);

    assert_eq!(EncoderTuning::for_encoder("png").pixel_format, PixelFormat::Rgb24);
    assert!(EncoderTuning::for_encoder("png").options.is_empty());

    let fallback = EncoderTuning::for_encoder("mpeg4");
    assert_eq!(fallback.pixel_format, PixelFormat::Yuv420p);
    assert!(fallback.options.is_empty());
  }
}
