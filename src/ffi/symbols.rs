//! Runtime-resolved FFmpeg entry points
//!
//! Every FFmpeg function the crate calls is looked up by name in the module that
//! exports it and stored as a typed function pointer in [`AvFunctions`]. The
//! signatures match the public FFmpeg 5.1+ headers.

use super::loader::{LoadError, Modules};
use super::types::*;
use libloading::Library;
use std::os::raw::{c_char, c_int, c_uint, c_void};

/// Read callback for custom I/O
///
/// Returns number of bytes read, or AVERROR_EOF.
pub type ReadPacketFn =
  unsafe extern "C" fn(opaque: *mut c_void, buf: *mut u8, buf_size: c_int) -> c_int;

/// Write callback for custom I/O
pub type WritePacketFn =
  unsafe extern "C" fn(opaque: *mut c_void, buf: *const u8, buf_size: c_int) -> c_int;

/// Seek callback for custom I/O
///
/// `whence` may carry `AVSEEK_SIZE` to request the total size.
pub type SeekFn = unsafe extern "C" fn(opaque: *mut c_void, offset: i64, whence: c_int) -> i64;

/// Copy a function pointer out of a loaded module
///
/// # Safety
/// `T` must be the exact function pointer type of the exported symbol.
unsafe fn resolve<T: Copy>(lib: &Library, name: &'static str) -> Result<T, LoadError> {
  let symbol = unsafe { lib.get::<T>(name.as_bytes()) }.map_err(|e| LoadError::SymbolNotFound {
    symbol: name,
    reason: e.to_string(),
  })?;
  Ok(*symbol)
}

macro_rules! function_table {
  ($(
    $module:ident {
      $( fn $name:ident($($arg:ty),* $(,)?) $(-> $ret:ty)?; )*
    }
  )*) => {
    /// Typed table of every FFmpeg function used by the crate
    #[allow(non_snake_case)]
    pub struct AvFunctions {
      $($( pub $name: unsafe extern "C" fn($($arg),*) $(-> $ret)?, )*)*
    }

    impl AvFunctions {
      /// Resolve all entry points, failing on the first missing one
      pub(crate) fn resolve(modules: &Modules) -> Result<Self, LoadError> {
        Ok(Self {
          $($( $name: unsafe { resolve(&modules.$module, stringify!($name))? }, )*)*
        })
      }

      /// Number of entry points in the table
      pub const COUNT: usize = [$($(stringify!($name),)*)*].len();
    }
  };
}

function_table! {
  avutil {
    fn avutil_version() -> c_uint;
    fn av_frame_alloc() -> *mut AVFrame;
    fn av_frame_free(*mut *mut AVFrame);
    fn av_frame_unref(*mut AVFrame);
    fn av_frame_get_buffer(*mut AVFrame, c_int) -> c_int;
    fn av_frame_make_writable(*mut AVFrame) -> c_int;
    fn av_opt_set(*mut c_void, *const c_char, *const c_char, c_int) -> c_int;
    fn av_dict_get(
      *const AVDictionary,
      *const c_char,
      *const AVDictionaryEntry,
      c_int,
    ) -> *mut AVDictionaryEntry;
    fn av_dict_count(*const AVDictionary) -> c_int;
    fn av_malloc(usize) -> *mut c_void;
    fn av_free(*mut c_void);
    fn av_strerror(c_int, *mut c_char, usize) -> c_int;
    fn av_log_set_level(c_int);
    fn av_channel_layout_default(*mut AVChannelLayout, c_int);
    fn av_channel_layout_copy(*mut AVChannelLayout, *const AVChannelLayout) -> c_int;
    fn av_channel_layout_uninit(*mut AVChannelLayout);
  }

  swresample {
    fn swresample_version() -> c_uint;
    fn swr_alloc_set_opts2(
      *mut *mut SwrContext,
      *const AVChannelLayout,
      c_int,
      c_int,
      *const AVChannelLayout,
      c_int,
      c_int,
      c_int,
      *mut c_void,
    ) -> c_int;
    fn swr_init(*mut SwrContext) -> c_int;
    fn swr_free(*mut *mut SwrContext);
    fn swr_convert(*mut SwrContext, *const *mut u8, c_int, *const *const u8, c_int) -> c_int;
    fn swr_convert_frame(*mut SwrContext, *mut AVFrame, *const AVFrame) -> c_int;
    fn swr_get_delay(*mut SwrContext, i64) -> i64;
    fn swr_get_out_samples(*mut SwrContext, c_int) -> c_int;
  }

  avcodec {
    fn avcodec_version() -> c_uint;
    fn avcodec_find_encoder_by_name(*const c_char) -> *const AVCodec;
    fn avcodec_find_decoder(c_int) -> *const AVCodec;
    fn avcodec_alloc_context3(*const AVCodec) -> *mut AVCodecContext;
    fn avcodec_free_context(*mut *mut AVCodecContext);
    fn avcodec_open2(*mut AVCodecContext, *const AVCodec, *mut *mut AVDictionary) -> c_int;
    fn avcodec_parameters_from_context(*mut AVCodecParameters, *const AVCodecContext) -> c_int;
    fn avcodec_parameters_to_context(*mut AVCodecContext, *const AVCodecParameters) -> c_int;
    fn avcodec_send_frame(*mut AVCodecContext, *const AVFrame) -> c_int;
    fn avcodec_receive_packet(*mut AVCodecContext, *mut AVPacket) -> c_int;
    fn avcodec_send_packet(*mut AVCodecContext, *const AVPacket) -> c_int;
    fn avcodec_receive_frame(*mut AVCodecContext, *mut AVFrame) -> c_int;
    fn avcodec_flush_buffers(*mut AVCodecContext);
    fn av_packet_alloc() -> *mut AVPacket;
    fn av_packet_free(*mut *mut AVPacket);
    fn av_packet_unref(*mut AVPacket);
    fn av_packet_rescale_ts(*mut AVPacket, AVRational, AVRational);
  }

  avformat {
    fn avformat_version() -> c_uint;
    fn avformat_alloc_context() -> *mut AVFormatContext;
    fn avformat_alloc_output_context2(
      *mut *mut AVFormatContext,
      *const AVOutputFormat,
      *const c_char,
      *const c_char,
    ) -> c_int;
    fn avformat_free_context(*mut AVFormatContext);
    fn avformat_open_input(
      *mut *mut AVFormatContext,
      *const c_char,
      *const AVInputFormat,
      *mut *mut AVDictionary,
    ) -> c_int;
    fn avformat_close_input(*mut *mut AVFormatContext);
    fn avformat_find_stream_info(*mut AVFormatContext, *mut *mut AVDictionary) -> c_int;
    fn avformat_new_stream(*mut AVFormatContext, *const AVCodec) -> *mut AVStream;
    fn avformat_write_header(*mut AVFormatContext, *mut *mut AVDictionary) -> c_int;
    fn av_read_frame(*mut AVFormatContext, *mut AVPacket) -> c_int;
    fn av_seek_frame(*mut AVFormatContext, c_int, i64, c_int) -> c_int;
    fn av_interleaved_write_frame(*mut AVFormatContext, *mut AVPacket) -> c_int;
    fn av_write_trailer(*mut AVFormatContext) -> c_int;
    fn av_dump_format(*mut AVFormatContext, c_int, *const c_char, c_int);
    fn avio_open(*mut *mut AVIOContext, *const c_char, c_int) -> c_int;
    fn avio_closep(*mut *mut AVIOContext) -> c_int;
    fn avio_alloc_context(
      *mut u8,
      c_int,
      c_int,
      *mut c_void,
      Option<ReadPacketFn>,
      Option<WritePacketFn>,
      Option<SeekFn>,
    ) -> *mut AVIOContext;
    fn avio_context_free(*mut *mut AVIOContext);
  }

  swscale {
    fn swscale_version() -> c_uint;
    fn sws_getContext(
      c_int,
      c_int,
      c_int,
      c_int,
      c_int,
      c_int,
      c_int,
      *mut SwsFilter,
      *mut SwsFilter,
      *const f64,
    ) -> *mut SwsContext;
    fn sws_scale(
      *mut SwsContext,
      *const *const u8,
      *const c_int,
      c_int,
      c_int,
      *const *mut u8,
      *const c_int,
    ) -> c_int;
    fn sws_freeContext(*mut SwsContext);
  }
}

impl std::fmt::Debug for AvFunctions {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AvFunctions")
      .field("entry_points", &Self::COUNT)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_table_size() {
    assert_eq!(AvFunctions::COUNT, 63);
  }
}
