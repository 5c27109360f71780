//! Muxer context wrapper for FFmpeg libavformat
//!
//! Provides RAII wrapper around AVFormatContext for muxing operations.

use super::{CodecContext, CodecError, CodecResult, Packet};
use crate::ffi::accessors::{
  fffmt_get_oformat_flags, fffmt_get_pb_ptr, fffmt_get_stream, ffstream_get_codecpar,
  ffstream_get_index, ffstream_get_time_base, ffstream_set_avg_frame_rate, ffstream_set_time_base,
};
use crate::ffi::{avio_flag, format_flag, AVFormatContext, AVRational, AVStream, AvLibrary};
use std::ffi::CString;
use std::os::raw::c_int;
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::Arc;

/// Muxer context wrapper
///
/// Provides RAII wrapper around AVFormatContext for muxing operations.
pub struct Muxer {
  /// Pointer to AVFormatContext
  ptr: NonNull<AVFormatContext>,
  lib: Arc<AvLibrary>,
  /// Whether we opened `pb` ourselves and must close it
  file_opened: bool,
  /// Video stream index
  video_stream_index: Option<i32>,
  /// Whether header has been written
  header_written: bool,
  /// Whether trailer has been written (finalized)
  finalized: bool,
}

impl Muxer {
  /// Create a muxer writing to `path`, guessing the container from its extension
  ///
  /// Opens the output file unless the container writes no file of its own.
  pub fn create(lib: &Arc<AvLibrary>, path: &Path) -> CodecResult<Self> {
    let c_path = CString::new(path.to_string_lossy().as_bytes())
      .map_err(|_| CodecError::InvalidConfig("Invalid output path".to_string()))?;

    let mut ctx_ptr: *mut AVFormatContext = ptr::null_mut();
    let ret = unsafe {
      (lib.api.avformat_alloc_output_context2)(&mut ctx_ptr, ptr::null(), ptr::null(), c_path.as_ptr())
    };
    lib.check(ret)?;

    let ptr = NonNull::new(ctx_ptr).ok_or(CodecError::AllocationFailed("AVFormatContext"))?;

    // From here on Drop releases the format context
    let mut muxer = Self {
      ptr,
      lib: Arc::clone(lib),
      file_opened: false,
      video_stream_index: None,
      header_written: false,
      finalized: false,
    };

    let flags = unsafe { fffmt_get_oformat_flags(muxer.ptr.as_ptr()) };
    if flags & format_flag::NOFILE == 0 {
      let ret = unsafe {
        (lib.api.avio_open)(
          fffmt_get_pb_ptr(muxer.ptr.as_ptr()),
          c_path.as_ptr(),
          avio_flag::WRITE,
        )
      };
      lib.check(ret)?;
      muxer.file_opened = true;
    }

    Ok(muxer)
  }

  /// Check that an output context for the named container can be allocated
  pub fn probe(lib: &AvLibrary, format_name: &str) -> bool {
    let Ok(c_name) = CString::new(format_name) else {
      return false;
    };

    let mut ctx_ptr: *mut AVFormatContext = ptr::null_mut();
    let ret = unsafe {
      (lib.api.avformat_alloc_output_context2)(&mut ctx_ptr, ptr::null(), c_name.as_ptr(), ptr::null())
    };

    if ctx_ptr.is_null() {
      return false;
    }
    unsafe { (lib.api.avformat_free_context)(ctx_ptr) };
    ret >= 0
  }

  /// Add a video stream ticking once per frame at `frame_rate`
  ///
  /// Must be called before `write_header`. Codec parameters are attached later with
  /// [`set_stream_parameters`](Self::set_stream_parameters), once the encoder is open.
  pub fn add_video_stream(&mut self, frame_rate: u32) -> CodecResult<i32> {
    if self.header_written {
      return Err(CodecError::InvalidState(
        "Cannot add stream after header is written".to_string(),
      ));
    }

    let stream = unsafe { (self.lib.api.avformat_new_stream)(self.ptr.as_ptr(), ptr::null()) };
    if stream.is_null() {
      return Err(CodecError::AllocationFailed("AVStream"));
    }

    unsafe {
      ffstream_set_time_base(stream, 1, frame_rate as c_int);
      ffstream_set_avg_frame_rate(stream, frame_rate as c_int, 1);
    }

    let index = unsafe { ffstream_get_index(stream) };
    self.video_stream_index = Some(index);
    Ok(index)
  }

  fn stream(&self, index: i32) -> CodecResult<*mut AVStream> {
    let stream = unsafe { fffmt_get_stream(self.ptr.as_ptr(), index.max(0) as u32) };
    if index < 0 || stream.is_null() {
      return Err(CodecError::InvalidState(format!("No stream with index {index}")));
    }
    Ok(stream)
  }

  /// Copy an opened encoder's parameters onto a stream
  pub fn set_stream_parameters(&mut self, index: i32, encoder: &CodecContext) -> CodecResult<()> {
    let stream = self.stream(index)?;
    let codecpar = unsafe { ffstream_get_codecpar(stream) };
    if codecpar.is_null() {
      return Err(CodecError::AllocationFailed("AVCodecParameters"));
    }
    encoder.copy_parameters_to(codecpar)
  }

  /// Stream time base (the container may replace the requested one in `write_header`)
  pub fn stream_time_base(&self, index: i32) -> CodecResult<AVRational> {
    let stream = self.stream(index)?;
    let mut tb = AVRational::default();
    unsafe { ffstream_get_time_base(stream, &mut tb.num, &mut tb.den) };
    Ok(tb)
  }

  /// Check if format needs global header
  pub fn needs_global_header(&self) -> bool {
    let flags = unsafe { fffmt_get_oformat_flags(self.ptr.as_ptr()) };
    (flags & format_flag::GLOBALHEADER) != 0
  }

  /// Write the container header
  ///
  /// Must be called after adding streams and before writing packets.
  pub fn write_header(&mut self) -> CodecResult<()> {
    if self.header_written {
      return Err(CodecError::InvalidState(
        "Header already written".to_string(),
      ));
    }

    if self.video_stream_index.is_none() {
      return Err(CodecError::InvalidConfig("No streams added".to_string()));
    }

    let ret = unsafe { (self.lib.api.avformat_write_header)(self.ptr.as_ptr(), ptr::null_mut()) };
    self.lib.check(ret)?;

    self.header_written = true;
    Ok(())
  }

  /// Write a packet to the muxer
  ///
  /// The packet's stream_index must match a stream added to this muxer.
  pub fn write_packet(&mut self, packet: &mut Packet) -> CodecResult<()> {
    if !self.header_written {
      return Err(CodecError::InvalidState("Header not written".to_string()));
    }

    if self.finalized {
      return Err(CodecError::InvalidState(
        "Muxer already finalized".to_string(),
      ));
    }

    let ret =
      unsafe { (self.lib.api.av_interleaved_write_frame)(self.ptr.as_ptr(), packet.as_mut_ptr()) };
    self.lib.check(ret)?;
    Ok(())
  }

  /// Flush any buffered packets
  pub fn flush(&mut self) -> CodecResult<()> {
    if !self.header_written || self.finalized {
      return Ok(());
    }

    // Flush interleaver by passing NULL packet
    let ret =
      unsafe { (self.lib.api.av_interleaved_write_frame)(self.ptr.as_ptr(), ptr::null_mut()) };
    self.lib.check(ret)?;
    Ok(())
  }

  /// Finalize the muxer (write trailer)
  ///
  /// Must be called after all packets have been written.
  pub fn write_trailer(&mut self) -> CodecResult<()> {
    if !self.header_written {
      return Err(CodecError::InvalidState("Header not written".to_string()));
    }

    if self.finalized {
      return Ok(());
    }

    let ret = unsafe { (self.lib.api.av_write_trailer)(self.ptr.as_ptr()) };
    self.lib.check(ret)?;

    self.finalized = true;
    Ok(())
  }

  /// Print the container layout through FFmpeg's logger
  pub fn dump_format(&self, url: &str) {
    let Ok(c_url) = CString::new(url) else {
      return;
    };
    unsafe { (self.lib.api.av_dump_format)(self.ptr.as_ptr(), 0, c_url.as_ptr(), 1) };
  }
}

impl Drop for Muxer {
  fn drop(&mut self) {
    unsafe {
      if self.file_opened {
        (self.lib.api.avio_closep)(fffmt_get_pb_ptr(self.ptr.as_ptr()));
      }
      (self.lib.api.avformat_free_context)(self.ptr.as_ptr());
    }
  }
}

impl std::fmt::Debug for Muxer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Muxer")
      .field("video_stream_index", &self.video_stream_index)
      .field("header_written", &self.header_written)
      .field("finalized", &self.finalized)
      .finish()
  }
}
