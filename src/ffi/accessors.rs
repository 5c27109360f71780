//! Rust declarations for C accessor functions
//!
//! These functions provide access to FFmpeg struct fields via the thin C accessor library.
//! They are linked statically from `accessors.c`; none of them call into FFmpeg.

use super::types::*;
use std::os::raw::{c_int, c_uint, c_void};

unsafe extern "C" {
  // ========================================================================
  // Header Versions
  // ========================================================================

  pub fn ffver_avutil() -> c_uint;
  pub fn ffver_swresample() -> c_uint;
  pub fn ffver_avcodec() -> c_uint;
  pub fn ffver_avformat() -> c_uint;
  pub fn ffver_swscale() -> c_uint;

  /// Map a `PixelFormat` kind to the header's `AVPixelFormat` value
  pub fn ffpixfmt_value(kind: c_int) -> c_int;

  // ========================================================================
  // AVCodecContext
  // ========================================================================

  pub fn ffctx_set_width(ctx: *mut AVCodecContext, width: c_int);
  pub fn ffctx_set_height(ctx: *mut AVCodecContext, height: c_int);
  pub fn ffctx_get_width(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_height(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_set_pix_fmt(ctx: *mut AVCodecContext, pix_fmt: c_int);
  pub fn ffctx_set_time_base(ctx: *mut AVCodecContext, num: c_int, den: c_int);
  pub fn ffctx_get_time_base(ctx: *const AVCodecContext, num: *mut c_int, den: *mut c_int);
  pub fn ffctx_set_framerate(ctx: *mut AVCodecContext, num: c_int, den: c_int);
  pub fn ffctx_get_flags(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_set_flags(ctx: *mut AVCodecContext, flags: c_int);
  pub fn ffctx_get_priv_data(ctx: *mut AVCodecContext) -> *mut c_void;
  pub fn ffctx_get_sample_rate(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_sample_fmt(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_ch_layout(ctx: *mut AVCodecContext) -> *mut AVChannelLayout;

  // ========================================================================
  // AVFrame
  // ========================================================================

  pub fn ffframe_get_width(frame: *const AVFrame) -> c_int;
  pub fn ffframe_get_height(frame: *const AVFrame) -> c_int;
  pub fn ffframe_get_format(frame: *const AVFrame) -> c_int;
  pub fn ffframe_set_width(frame: *mut AVFrame, width: c_int);
  pub fn ffframe_set_height(frame: *mut AVFrame, height: c_int);
  pub fn ffframe_set_format(frame: *mut AVFrame, format: c_int);
  pub fn ffframe_get_pts(frame: *const AVFrame) -> i64;
  pub fn ffframe_set_pts(frame: *mut AVFrame, pts: i64);
  pub fn ffframe_get_best_effort_timestamp(frame: *const AVFrame) -> i64;
  pub fn ffframe_get_duration(frame: *const AVFrame) -> i64;
  pub fn ffframe_get_nb_samples(frame: *const AVFrame) -> c_int;
  pub fn ffframe_set_nb_samples(frame: *mut AVFrame, nb_samples: c_int);
  pub fn ffframe_get_sample_rate(frame: *const AVFrame) -> c_int;
  pub fn ffframe_set_sample_rate(frame: *mut AVFrame, sample_rate: c_int);
  pub fn ffframe_get_ch_layout(frame: *mut AVFrame) -> *mut AVChannelLayout;
  pub fn ffframe_data(frame: *const AVFrame, plane: c_int) -> *mut u8;
  pub fn ffframe_linesize(frame: *const AVFrame, plane: c_int) -> c_int;

  // ========================================================================
  // AVPacket
  // ========================================================================

  pub fn ffpkt_get_stream_index(pkt: *const AVPacket) -> c_int;
  pub fn ffpkt_set_stream_index(pkt: *mut AVPacket, index: c_int);
  pub fn ffpkt_get_pts(pkt: *const AVPacket) -> i64;

  // ========================================================================
  // AVFormatContext
  // ========================================================================

  pub fn fffmt_get_nb_streams(ctx: *const AVFormatContext) -> c_uint;
  pub fn fffmt_get_stream(ctx: *const AVFormatContext, index: c_uint) -> *mut AVStream;
  pub fn fffmt_get_metadata(ctx: *const AVFormatContext) -> *mut AVDictionary;
  pub fn fffmt_get_oformat_flags(ctx: *const AVFormatContext) -> c_int;
  pub fn fffmt_get_pb_ptr(ctx: *mut AVFormatContext) -> *mut *mut AVIOContext;
  pub fn fffmt_set_pb(ctx: *mut AVFormatContext, pb: *mut AVIOContext);
  pub fn fffmt_get_flags(ctx: *const AVFormatContext) -> c_int;
  pub fn fffmt_set_flags(ctx: *mut AVFormatContext, flags: c_int);

  // ========================================================================
  // AVStream / AVCodecParameters
  // ========================================================================

  pub fn ffstream_get_index(st: *const AVStream) -> c_int;
  pub fn ffstream_get_codecpar(st: *mut AVStream) -> *mut AVCodecParameters;
  pub fn ffstream_get_time_base(st: *const AVStream, num: *mut c_int, den: *mut c_int);
  pub fn ffstream_set_time_base(st: *mut AVStream, num: c_int, den: c_int);
  pub fn ffstream_set_avg_frame_rate(st: *mut AVStream, num: c_int, den: c_int);
  pub fn ffstream_get_duration(st: *const AVStream) -> i64;
  pub fn ffstream_set_discard(st: *mut AVStream, discard: c_int);

  pub fn ffcodecpar_get_codec_type(par: *const AVCodecParameters) -> c_int;
  pub fn ffcodecpar_get_codec_id(par: *const AVCodecParameters) -> c_int;
  pub fn ffcodecpar_get_width(par: *const AVCodecParameters) -> c_int;
  pub fn ffcodecpar_get_height(par: *const AVCodecParameters) -> c_int;

  // ========================================================================
  // AVIOContext
  // ========================================================================

  pub fn ffavio_get_buffer_ptr(ctx: *mut AVIOContext) -> *mut *mut u8;
}
