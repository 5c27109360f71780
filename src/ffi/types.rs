//! Core FFmpeg type definitions
//!
//! All FFmpeg structs are opaque (zero-sized) to avoid version-specific layout dependencies.
//! Field access is done via the thin C accessor library in accessors.c. The few structs
//! declared here with fields are part of FFmpeg's stable public ABI.

use std::marker::{PhantomData, PhantomPinned};
use std::os::raw::{c_char, c_int, c_void};

// ============================================================================
// Rational Number
// ============================================================================

/// Rational number for time bases and frame rates
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AVRational {
  /// Numerator
  pub num: c_int,
  /// Denominator
  pub den: c_int,
}

impl AVRational {
  pub const fn new(num: c_int, den: c_int) -> Self {
    Self { num, den }
  }

  pub fn as_f64(&self) -> f64 {
    if self.den == 0 {
      0.0
    } else {
      self.num as f64 / self.den as f64
    }
  }
}

// ============================================================================
// Channel Layout / Dictionary
// ============================================================================

/// `AVChannelLayout` (FFmpeg 5.1+)
///
/// The layout is public API; only `order` and `nb_channels` are read from Rust.
#[repr(C)]
pub struct AVChannelLayout {
  pub order: c_int,
  pub nb_channels: c_int,
  /// Union of `uint64_t mask` and `AVChannelCustom *map`
  pub u: u64,
  pub opaque: *mut c_void,
}

impl AVChannelLayout {
  /// `AV_CHANNEL_ORDER_UNSPEC`
  pub const ORDER_UNSPEC: c_int = 0;

  /// An empty layout, ready to be filled by `av_channel_layout_default`/`copy`
  pub fn empty() -> Self {
    Self {
      order: Self::ORDER_UNSPEC,
      nb_channels: 0,
      u: 0,
      opaque: std::ptr::null_mut(),
    }
  }

  /// Whether the layout carries no channel information beyond a count
  pub fn is_unspecified(&self) -> bool {
    self.order == Self::ORDER_UNSPEC
  }
}

/// `AVDictionaryEntry`
#[repr(C)]
pub struct AVDictionaryEntry {
  pub key: *mut c_char,
  pub value: *mut c_char,
}

// ============================================================================
// Pixel / Sample Formats
// ============================================================================

/// Pixel formats this crate produces or consumes
///
/// Numeric values come from the headers through the accessor library, since
/// several of them are not stable across FFmpeg releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
  Yuv420p,
  Yuv444p,
  Rgb24,
  Rgba,
  Bgr0,
  Gbrp,
}

impl PixelFormat {
  /// FFmpeg `AVPixelFormat` value
  pub fn as_raw(self) -> c_int {
    let kind = match self {
      PixelFormat::Yuv420p => 0,
      PixelFormat::Yuv444p => 1,
      PixelFormat::Rgb24 => 2,
      PixelFormat::Rgba => 3,
      PixelFormat::Bgr0 => 4,
      PixelFormat::Gbrp => 5,
    };
    unsafe { super::accessors::ffpixfmt_value(kind) }
  }

  /// Map a raw `AVPixelFormat` back, if it is one of ours
  pub fn from_raw(raw: c_int) -> Option<Self> {
    [
      PixelFormat::Yuv420p,
      PixelFormat::Yuv444p,
      PixelFormat::Rgb24,
      PixelFormat::Rgba,
      PixelFormat::Bgr0,
      PixelFormat::Gbrp,
    ]
    .into_iter()
    .find(|fmt| fmt.as_raw() == raw)
  }
}

/// `AVSampleFormat` values (stable across releases)
pub mod sample_format {
  use std::os::raw::c_int;

  pub const S16: c_int = 1;
}

/// `AVMediaType` values
pub mod media_type {
  use std::os::raw::c_int;

  pub const UNKNOWN: c_int = -1;
  pub const VIDEO: c_int = 0;
  pub const AUDIO: c_int = 1;
  pub const DATA: c_int = 2;
  pub const SUBTITLE: c_int = 3;
}

// ============================================================================
// Flags
// ============================================================================

/// `AVOutputFormat.flags`
pub mod format_flag {
  use std::os::raw::c_int;

  /// Format does not need a file handle (`AVFMT_NOFILE`)
  pub const NOFILE: c_int = 0x0001;
  /// Format wants global headers (`AVFMT_GLOBALHEADER`)
  pub const GLOBALHEADER: c_int = 0x0040;
}

/// `AVFormatContext.flags`
pub mod format_context_flag {
  use std::os::raw::c_int;

  /// Caller-supplied AVIO context (`AVFMT_FLAG_CUSTOM_IO`)
  pub const CUSTOM_IO: c_int = 0x0080;
}

/// `AVCodecContext.flags`
pub mod codec_flag {
  use std::os::raw::c_int;

  /// Place global headers in extradata instead of every keyframe
  pub const GLOBAL_HEADER: c_int = 1 << 22;
}

/// `avio_open` flags
pub mod avio_flag {
  use std::os::raw::c_int;

  pub const WRITE: c_int = 2;
}

/// `av_seek_frame` flags and AVIO seek `whence` extensions
pub mod seek_flag {
  use std::os::raw::c_int;

  pub const BACKWARD: c_int = 1;
  /// Passed as `whence` to ask the seek callback for the stream size
  pub const AVSEEK_SIZE: c_int = 0x10000;
  /// OR'ed into `whence`; the callback may ignore it
  pub const AVSEEK_FORCE: c_int = 0x20000;
}

/// `AVDiscard` values
pub mod discard {
  use std::os::raw::c_int;

  pub const DEFAULT: c_int = 0;
  pub const ALL: c_int = 48;
}

/// `av_dict_get` flags
pub mod dict_flag {
  use std::os::raw::c_int;

  pub const IGNORE_SUFFIX: c_int = 2;
}

/// `sws_getContext` flags
pub mod sws_flag {
  use std::os::raw::c_int;

  pub const FAST_BILINEAR: c_int = 1;
  pub const BILINEAR: c_int = 2;
  pub const BICUBIC: c_int = 4;
}

/// `av_log_set_level` levels
pub mod log_level {
  use std::os::raw::c_int;

  pub const QUIET: c_int = -8;
  pub const PANIC: c_int = 0;
  pub const FATAL: c_int = 8;
  pub const ERROR: c_int = 16;
  pub const WARNING: c_int = 24;
  pub const INFO: c_int = 32;
  pub const VERBOSE: c_int = 40;
  pub const DEBUG: c_int = 48;
  pub const TRACE: c_int = 56;
}

/// No presentation timestamp
pub const AV_NOPTS_VALUE: i64 = i64::MIN;

/// Build an `AV_VERSION_INT`
pub const fn av_version_int(major: u32, minor: u32, micro: u32) -> u32 {
  (major << 16) | (minor << 8) | micro
}

/// Major component of an `AV_VERSION_INT`
pub const fn av_version_major(version: u32) -> u32 {
  version >> 16
}

// ============================================================================
// Opaque Types
// ============================================================================

macro_rules! opaque_types {
  ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
    $(
      $(#[$meta])*
      #[repr(C)]
      pub struct $name {
        _opaque: [u8; 0],
        _marker: PhantomData<(*mut u8, PhantomPinned)>,
      }
    )*
  };
}

opaque_types!(
  /// Codec descriptor
  AVCodec,
  /// Codec context
  AVCodecContext,
  /// Codec parameters attached to a stream
  AVCodecParameters,
  /// Decoded audio/video frame
  AVFrame,
  /// Compressed packet
  AVPacket,
  /// Container context (input or output)
  AVFormatContext,
  /// Output container format
  AVOutputFormat,
  /// Input container format
  AVInputFormat,
  /// Container stream
  AVStream,
  /// Byte I/O context
  AVIOContext,
  /// Key/value dictionary
  AVDictionary,
  /// Scaler context
  SwsContext,
  /// Resampler context
  SwrContext,
  /// Scaler filter (always passed as null)
  SwsFilter,
);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rational() {
    let tb = AVRational::new(1, 30);
    assert!((tb.as_f64() - 1.0 / 30.0).abs() < 1e-12);
    assert_eq!(AVRational::new(1, 0).as_f64(), 0.0);
  }

  #[test]
  fn test_version_int() {
    let v = av_version_int(60, 31, 102);
    assert_eq!(av_version_major(v), 60);
    assert!(v > av_version_int(59, 255, 255));
  }

  #[test]
  fn test_channel_layout_size() {
    // Matches the C layout on 64-bit targets: enum, int, union(u64), pointer
    #[cfg(target_pointer_width = "64")]
    assert_eq!(std::mem::size_of::<AVChannelLayout>(), 24);
    assert!(AVChannelLayout::empty().is_unspecified());
  }
}
