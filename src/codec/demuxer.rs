//! Demuxer context wrapper for FFmpeg libavformat
//!
//! Provides RAII wrapper around AVFormatContext for demuxing operations.

use super::io::{MediaSource, MemoryInput};
use super::{CodecError, CodecResult, Packet};
use crate::ffi::accessors::{
  ffcodecpar_get_codec_id, ffcodecpar_get_codec_type, ffcodecpar_get_height, ffcodecpar_get_width,
  fffmt_get_flags, fffmt_get_metadata, fffmt_get_nb_streams, fffmt_get_stream, fffmt_set_flags,
  fffmt_set_pb, ffstream_get_codecpar, ffstream_get_duration, ffstream_get_index,
  ffstream_get_time_base, ffstream_set_discard,
};
use crate::ffi::{
  dict_flag, discard, error::AVERROR_EOF, format_context_flag, media_type, seek_flag,
  AVCodecParameters, AVFormatContext, AVRational, AvLibrary, AV_NOPTS_VALUE,
};
use std::ffi::{CStr, CString};
use std::os::raw::c_int;
use std::ptr::{self, NonNull};
use std::sync::Arc;

/// Media type for stream identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
  /// Video stream
  Video,
  /// Audio stream
  Audio,
  /// Subtitle stream
  Subtitle,
  /// Data stream
  Data,
}

impl MediaType {
  /// Convert from FFmpeg media type constant
  fn from_ffmpeg(value: c_int) -> Option<Self> {
    match value {
      x if x == media_type::VIDEO => Some(MediaType::Video),
      x if x == media_type::AUDIO => Some(MediaType::Audio),
      x if x == media_type::SUBTITLE => Some(MediaType::Subtitle),
      x if x == media_type::DATA => Some(MediaType::Data),
      _ => None,
    }
  }
}

impl std::fmt::Display for MediaType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      MediaType::Video => "video",
      MediaType::Audio => "audio",
      MediaType::Subtitle => "subtitle",
      MediaType::Data => "data",
    };
    f.write_str(name)
  }
}

/// Information about a stream in the container
#[derive(Debug, Clone)]
pub struct StreamInfo {
  /// Stream index
  pub index: i32,
  /// Media type (Video, Audio, etc.)
  pub media_type: MediaType,
  /// Raw `AVCodecID`
  pub codec_id: c_int,
  /// Video width (if video)
  pub width: Option<u32>,
  /// Video height (if video)
  pub height: Option<u32>,
  /// Stream time base
  pub time_base: AVRational,
  /// Stream duration in time_base units
  pub duration: Option<i64>,
}

impl StreamInfo {
  /// Convert a timestamp in this stream's time base to seconds
  pub fn to_seconds(&self, timestamp: i64) -> f64 {
    timestamp as f64 * self.time_base.as_f64()
  }

  /// Convert seconds to a timestamp in this stream's time base
  pub fn from_seconds(&self, seconds: f64) -> i64 {
    let unit = self.time_base.as_f64();
    if unit <= 0.0 {
      return 0;
    }
    (seconds / unit).round() as i64
  }

  /// Stream duration in seconds (0 if the container doesn't declare one)
  pub fn duration_seconds(&self) -> f64 {
    self.duration.map(|d| self.to_seconds(d)).unwrap_or(0.0)
  }
}

/// Demuxer context wrapper
///
/// Provides RAII wrapper around AVFormatContext for demuxing operations.
pub struct Demuxer {
  /// Pointer to AVFormatContext
  ptr: NonNull<AVFormatContext>,
  lib: Arc<AvLibrary>,
  /// Custom I/O context (for in-memory input); must outlive the format context
  input: Option<MemoryInput>,
  /// Cached stream information
  streams: Vec<StreamInfo>,
}

impl Demuxer {
  /// Open a container for demuxing and probe its streams
  pub fn open(lib: &Arc<AvLibrary>, source: &MediaSource) -> CodecResult<Self> {
    match source {
      MediaSource::Path(path) => Self::open_file(lib, &path.to_string_lossy()),
      MediaSource::Memory(data) => Self::open_memory(lib, Arc::clone(data)),
    }
  }

  fn open_file(lib: &Arc<AvLibrary>, path: &str) -> CodecResult<Self> {
    let c_path =
      CString::new(path).map_err(|_| CodecError::InvalidConfig("Invalid path".to_string()))?;

    let mut ctx_ptr: *mut AVFormatContext = ptr::null_mut();
    let ret = unsafe {
      (lib.api.avformat_open_input)(&mut ctx_ptr, c_path.as_ptr(), ptr::null(), ptr::null_mut())
    };
    lib.check(ret)?;

    let ptr = NonNull::new(ctx_ptr).ok_or(CodecError::AllocationFailed("AVFormatContext"))?;
    let mut ctx = Self {
      ptr,
      lib: Arc::clone(lib),
      input: None,
      streams: Vec::new(),
    };

    ctx.find_stream_info()?;
    Ok(ctx)
  }

  fn open_memory(lib: &Arc<AvLibrary>, data: Arc<[u8]>) -> CodecResult<Self> {
    let input = MemoryInput::new(lib, data)?;

    let mut ctx_ptr = unsafe { (lib.api.avformat_alloc_context)() };
    if ctx_ptr.is_null() {
      return Err(CodecError::AllocationFailed("AVFormatContext"));
    }

    unsafe {
      fffmt_set_pb(ctx_ptr, input.as_ptr());
      fffmt_set_flags(ctx_ptr, fffmt_get_flags(ctx_ptr) | format_context_flag::CUSTOM_IO);
    }

    // On failure avformat_open_input frees the context, but never our AVIO context
    let ret = unsafe {
      (lib.api.avformat_open_input)(&mut ctx_ptr, ptr::null(), ptr::null(), ptr::null_mut())
    };
    lib.check(ret)?;

    let ptr = NonNull::new(ctx_ptr).ok_or(CodecError::AllocationFailed("AVFormatContext"))?;
    let mut ctx = Self {
      ptr,
      lib: Arc::clone(lib),
      input: Some(input),
      streams: Vec::new(),
    };

    ctx.find_stream_info()?;
    Ok(ctx)
  }

  /// Find and parse stream information
  fn find_stream_info(&mut self) -> CodecResult<()> {
    let ret = unsafe { (self.lib.api.avformat_find_stream_info)(self.ptr.as_ptr(), ptr::null_mut()) };
    self.lib.check(ret)?;

    self.parse_streams();
    Ok(())
  }

  /// Parse stream information from format context
  fn parse_streams(&mut self) {
    let nb_streams = unsafe { fffmt_get_nb_streams(self.ptr.as_ptr()) };

    self.streams.clear();
    self.streams.reserve(nb_streams as usize);

    for i in 0..nb_streams {
      let stream = unsafe { fffmt_get_stream(self.ptr.as_ptr(), i) };
      if stream.is_null() {
        continue;
      }

      let codecpar = unsafe { ffstream_get_codecpar(stream) };
      if codecpar.is_null() {
        continue;
      }

      let media_type = match MediaType::from_ffmpeg(unsafe { ffcodecpar_get_codec_type(codecpar) }) {
        Some(t) => t,
        None => continue, // Skip unknown stream types
      };

      let mut time_base = AVRational::default();
      unsafe { ffstream_get_time_base(stream, &mut time_base.num, &mut time_base.den) };

      let duration_raw = unsafe { ffstream_get_duration(stream) };
      let duration = if duration_raw > 0 && duration_raw != AV_NOPTS_VALUE {
        Some(duration_raw)
      } else {
        None
      };

      let (width, height) = if media_type == MediaType::Video {
        unsafe {
          (
            Some(ffcodecpar_get_width(codecpar).max(0) as u32),
            Some(ffcodecpar_get_height(codecpar).max(0) as u32),
          )
        }
      } else {
        (None, None)
      };

      self.streams.push(StreamInfo {
        index: unsafe { ffstream_get_index(stream) },
        media_type,
        codec_id: unsafe { ffcodecpar_get_codec_id(codecpar) },
        width,
        height,
        time_base,
        duration,
      });
    }
  }

  /// Get all streams
  pub fn streams(&self) -> &[StreamInfo] {
    &self.streams
  }

  /// Get stream info by index
  pub fn stream(&self, index: i32) -> Option<&StreamInfo> {
    self.streams.iter().find(|s| s.index == index)
  }

  /// First stream of the given type, in container order
  pub fn find_first(&self, media_type: MediaType) -> Option<&StreamInfo> {
    self.streams.iter().find(|s| s.media_type == media_type)
  }

  /// Codec parameters of a stream, for building its decoder
  pub fn codec_parameters(&self, index: i32) -> CodecResult<*const AVCodecParameters> {
    let stream = unsafe { fffmt_get_stream(self.ptr.as_ptr(), index.max(0) as u32) };
    if index < 0 || stream.is_null() {
      return Err(CodecError::InvalidState(format!("No stream with index {index}")));
    }
    Ok(unsafe { ffstream_get_codecpar(stream) })
  }

  /// Have the demuxer drop packets of every stream except `index`
  pub fn discard_all_except(&mut self, index: i32) {
    let nb_streams = unsafe { fffmt_get_nb_streams(self.ptr.as_ptr()) };
    for i in 0..nb_streams {
      let stream = unsafe { fffmt_get_stream(self.ptr.as_ptr(), i) };
      if stream.is_null() {
        continue;
      }
      let value = if i as i32 == index {
        discard::DEFAULT
      } else {
        discard::ALL
      };
      unsafe { ffstream_set_discard(stream, value) };
    }
  }

  /// Read the next packet from the container into `packet`
  ///
  /// Returns `Ok(false)` at end of file.
  pub fn read_packet(&mut self, packet: &mut Packet) -> CodecResult<bool> {
    packet.unref();
    let ret = unsafe { (self.lib.api.av_read_frame)(self.ptr.as_ptr(), packet.as_mut_ptr()) };

    if ret == AVERROR_EOF {
      return Ok(false);
    }
    self.lib.check(ret)?;
    Ok(true)
  }

  /// Seek to a timestamp in the stream
  ///
  /// # Arguments
  /// * `stream_index` - Stream index to seek (-1 for default)
  /// * `timestamp` - Timestamp in stream time base units
  /// * `backward` - If true, seek to keyframe before timestamp
  pub fn seek(&mut self, stream_index: i32, timestamp: i64, backward: bool) -> CodecResult<()> {
    let flags = if backward { seek_flag::BACKWARD } else { 0 };

    let ret =
      unsafe { (self.lib.api.av_seek_frame)(self.ptr.as_ptr(), stream_index, timestamp, flags) };
    self.lib.check(ret)?;
    Ok(())
  }

  /// Container-level metadata tags, in dictionary order
  pub fn metadata(&self) -> Vec<(String, String)> {
    let dict = unsafe { fffmt_get_metadata(self.ptr.as_ptr()) };
    if dict.is_null() {
      return Vec::new();
    }

    let count = unsafe { (self.lib.api.av_dict_count)(dict) };
    let mut tags = Vec::with_capacity(count.max(0) as usize);

    let empty = c"";
    let mut entry = ptr::null();
    loop {
      entry = unsafe {
        (self.lib.api.av_dict_get)(dict, empty.as_ptr(), entry, dict_flag::IGNORE_SUFFIX)
      };
      if entry.is_null() {
        break;
      }
      let (key, value) = unsafe {
        let e = &*entry;
        (
          CStr::from_ptr(e.key).to_string_lossy().into_owned(),
          CStr::from_ptr(e.value).to_string_lossy().into_owned(),
        )
      };
      tags.push((key, value));
    }

    tags
  }
}

impl Drop for Demuxer {
  fn drop(&mut self) {
    // With AVFMT_FLAG_CUSTOM_IO set, close_input leaves our AVIO context alone
    let mut ptr = self.ptr.as_ptr();
    unsafe {
      (self.lib.api.avformat_close_input)(&mut ptr);
    }

    // MemoryInput is dropped after the format context, freeing the AVIO context and buffer
    self.input.take();
  }
}

impl std::fmt::Debug for Demuxer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Demuxer")
      .field("streams", &self.streams)
      .field("memory", &self.input.is_some())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_media_type_conversion() {
    assert_eq!(
      MediaType::from_ffmpeg(media_type::VIDEO),
      Some(MediaType::Video)
    );
    assert_eq!(
      MediaType::from_ffmpeg(media_type::AUDIO),
      Some(MediaType::Audio)
    );
    assert_eq!(
      MediaType::from_ffmpeg(media_type::SUBTITLE),
      Some(MediaType::Subtitle)
    );
    assert_eq!(MediaType::from_ffmpeg(media_type::UNKNOWN), None);
  }

  #[test]
  fn test_stream_time_conversion() {
    let info = StreamInfo {
      index: 0,
      media_type: MediaType::Audio,
      codec_id: 0,
      width: None,
      height: None,
      time_base: AVRational::new(1, 44100),
      duration: Some(88200),
    };
    assert!((info.duration_seconds() - 2.0).abs() < 1e-9);
    assert_eq!(info.from_seconds(1.5), 66150);
    assert!((info.to_seconds(22050) - 0.5).abs() < 1e-9);

    let unknown = StreamInfo {
      time_base: AVRational::new(0, 0),
      duration: None,
      ..info
    };
    assert_eq!(unknown.from_seconds(3.0), 0);
    assert_eq!(unknown.duration_seconds(), 0.0);
  }
}
