//! Safe wrapper around FFmpeg AVCodecContext
//!
//! Provides encoding and decoding functionality with RAII cleanup.

use crate::ffi::{
    accessors::{
        ffcodecpar_get_codec_id, ffctx_get_ch_layout, ffctx_get_flags, ffctx_get_height,
        ffctx_get_priv_data, ffctx_get_sample_fmt, ffctx_get_sample_rate,
        ffctx_get_time_base, ffctx_get_width, ffctx_set_flags, ffctx_set_framerate,
        ffctx_set_height, ffctx_set_pix_fmt, ffctx_set_time_base, ffctx_set_width,
    },
    codec_flag,
    error::{AVERROR_EAGAIN, AVERROR_EOF},
    AVChannelLayout, AVCodec, AVCodecContext, AVCodecParameters, AVRational, AvLibrary,
};
use std::ffi::CString;
use std::os::raw::c_int;
use std::ptr::NonNull;
use std::sync::Arc;

use super::{CodecError, CodecResult, EncoderConfig, Frame, Packet};

/// Type of codec (encoder or decoder)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecType {
    Encoder,
    Decoder,
}

/// Safe wrapper around AVCodecContext
pub struct CodecContext {
    ptr: NonNull<AVCodecContext>,
    codec: *const AVCodec,
    codec_type: CodecType,
    lib: Arc<AvLibrary>,
}

impl CodecContext {
    // ========================================================================
    // Creation
    // ========================================================================

    /// Create a new encoder context by codec name (e.g., "libx264", "png")
    pub fn new_encoder_by_name(lib: &Arc<AvLibrary>, name: &str) -> CodecResult<Self> {
        let c_name =
            CString::new(name).map_err(|_| CodecError::InvalidConfig("Invalid codec name".into()))?;
        let codec = unsafe { (lib.api.avcodec_find_encoder_by_name)(c_name.as_ptr()) };
        if codec.is_null() {
            return Err(CodecError::CodecNotFound(name.to_string()));
        }
        Self::from_codec(lib, codec, CodecType::Encoder)
    }

    /// Create a decoder for a container stream and copy its parameters in
    ///
    /// The returned context is already opened.
    pub fn new_decoder_for(
        lib: &Arc<AvLibrary>,
        params: *const AVCodecParameters,
    ) -> CodecResult<Self> {
        let codec_id = unsafe { ffcodecpar_get_codec_id(params) };
        let codec = unsafe { (lib.api.avcodec_find_decoder)(codec_id) };
        if codec.is_null() {
            return Err(CodecError::DecoderNotFound(codec_id));
        }

        let mut ctx = Self::from_codec(lib, codec, CodecType::Decoder)?;
        let ret = unsafe { (lib.api.avcodec_parameters_to_context)(ctx.as_mut_ptr(), params) };
        lib.check(ret)?;
        ctx.open()?;
        Ok(ctx)
    }

    fn from_codec(
        lib: &Arc<AvLibrary>,
        codec: *const AVCodec,
        codec_type: CodecType,
    ) -> CodecResult<Self> {
        let ptr = unsafe { (lib.api.avcodec_alloc_context3)(codec) };
        NonNull::new(ptr)
            .map(|ptr| Self {
                ptr,
                codec,
                codec_type,
                lib: Arc::clone(lib),
            })
            .ok_or(CodecError::AllocationFailed("AVCodecContext"))
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Configure the encoder with the given settings
    pub fn configure_encoder(&mut self, config: &EncoderConfig) -> CodecResult<()> {
        if self.codec_type != CodecType::Encoder {
            return Err(CodecError::InvalidState("Not an encoder context".into()));
        }

        unsafe {
            let ctx = self.ptr.as_ptr();

            // Video dimensions
            ffctx_set_width(ctx, config.width as c_int);
            ffctx_set_height(ctx, config.height as c_int);

            // Pixel format
            ffctx_set_pix_fmt(ctx, config.pixel_format.as_raw());

            // One tick per frame
            ffctx_set_time_base(ctx, 1, config.frame_rate as c_int);
            ffctx_set_framerate(ctx, config.frame_rate as c_int, 1);

            if config.global_header {
                ffctx_set_flags(ctx, ffctx_get_flags(ctx) | codec_flag::GLOBAL_HEADER);
            }
        }

        for (key, value) in &config.options {
            self.set_option(key, value)?;
        }

        Ok(())
    }

    /// Set a codec private option (e.g. `preset`, `crf`, `lossless`)
    pub fn set_option(&mut self, key: &str, value: &str) -> CodecResult<()> {
        let c_key =
            CString::new(key).map_err(|_| CodecError::InvalidConfig("Invalid option name".into()))?;
        let c_value = CString::new(value)
            .map_err(|_| CodecError::InvalidConfig("Invalid option value".into()))?;

        let ret = unsafe {
            let priv_data = ffctx_get_priv_data(self.ptr.as_ptr());
            if priv_data.is_null() {
                return Err(CodecError::InvalidConfig(format!(
                    "codec has no private options (setting {key})"
                )));
            }
            (self.lib.api.av_opt_set)(priv_data, c_key.as_ptr(), c_value.as_ptr(), 0)
        };
        self.lib.check(ret)?;
        Ok(())
    }

    /// Open the codec (must be called after configuration)
    pub fn open(&mut self) -> CodecResult<()> {
        let ret = unsafe {
            (self.lib.api.avcodec_open2)(self.ptr.as_ptr(), self.codec, std::ptr::null_mut())
        };
        self.lib.check(ret)?;
        Ok(())
    }

    /// Copy the opened encoder's parameters to a container stream
    pub fn copy_parameters_to(&self, params: *mut AVCodecParameters) -> CodecResult<()> {
        let ret = unsafe { (self.lib.api.avcodec_parameters_from_context)(params, self.as_ptr()) };
        self.lib.check(ret)?;
        Ok(())
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Send a frame to the encoder (`None` signals end of stream)
    ///
    /// Returns Ok(true) if frame was accepted, Ok(false) if encoder needs output drained first
    pub fn send_frame(&mut self, frame: Option<&Frame>) -> CodecResult<bool> {
        let frame_ptr = frame.map(|f| f.as_ptr()).unwrap_or(std::ptr::null());
        let ret = unsafe { (self.lib.api.avcodec_send_frame)(self.ptr.as_ptr(), frame_ptr) };

        if ret == AVERROR_EAGAIN {
            return Ok(false);
        }
        self.lib.check(ret)?;
        Ok(true)
    }

    /// Receive an encoded packet into `packet`
    ///
    /// Returns Ok(true) if a packet was produced, Ok(false) if more input is needed
    /// or the encoder is fully drained
    pub fn receive_packet(&mut self, packet: &mut Packet) -> CodecResult<bool> {
        let ret =
            unsafe { (self.lib.api.avcodec_receive_packet)(self.ptr.as_ptr(), packet.as_mut_ptr()) };

        if ret == AVERROR_EAGAIN || ret == AVERROR_EOF {
            return Ok(false);
        }
        self.lib.check(ret)?;
        Ok(true)
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// Send a packet to the decoder (`None` enters draining mode)
    ///
    /// Returns Ok(true) if packet was accepted, Ok(false) if decoder needs output drained first
    pub fn send_packet(&mut self, packet: Option<&Packet>) -> CodecResult<bool> {
        let pkt_ptr = packet.map(|p| p.as_ptr()).unwrap_or(std::ptr::null());
        let ret = unsafe { (self.lib.api.avcodec_send_packet)(self.ptr.as_ptr(), pkt_ptr) };

        if ret == AVERROR_EAGAIN {
            return Ok(false);
        }
        self.lib.check(ret)?;
        Ok(true)
    }

    /// Receive a decoded frame into `frame`
    ///
    /// Returns Ok(true) if a frame was produced, Ok(false) if more input is needed
    /// or the decoder is fully drained
    pub fn receive_frame(&mut self, frame: &mut Frame) -> CodecResult<bool> {
        let ret =
            unsafe { (self.lib.api.avcodec_receive_frame)(self.ptr.as_ptr(), frame.as_mut_ptr()) };

        if ret == AVERROR_EAGAIN || ret == AVERROR_EOF {
            return Ok(false);
        }
        self.lib.check(ret)?;
        Ok(true)
    }

    // ========================================================================
    // Utility
    // ========================================================================

    /// Flush internal codec buffers
    pub fn flush(&mut self) {
        unsafe { (self.lib.api.avcodec_flush_buffers)(self.ptr.as_ptr()) }
    }

    /// Get raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_ptr(&self) -> *const AVCodecContext {
        self.ptr.as_ptr()
    }

    /// Get mutable raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut AVCodecContext {
        self.ptr.as_ptr()
    }

    /// Get codec type
    pub fn codec_type(&self) -> CodecType {
        self.codec_type
    }

    /// Get video width
    pub fn width(&self) -> u32 {
        unsafe { ffctx_get_width(self.as_ptr()) as u32 }
    }

    /// Get video height
    pub fn height(&self) -> u32 {
        unsafe { ffctx_get_height(self.as_ptr()) as u32 }
    }

    /// Codec time base
    pub fn time_base(&self) -> AVRational {
        let mut tb = AVRational::default();
        unsafe { ffctx_get_time_base(self.as_ptr(), &mut tb.num, &mut tb.den) };
        tb
    }

    /// Audio sample rate
    pub fn sample_rate(&self) -> u32 {
        unsafe { ffctx_get_sample_rate(self.as_ptr()).max(0) as u32 }
    }

    /// Raw `AVSampleFormat` of the context
    pub fn raw_sample_format(&self) -> c_int {
        unsafe { ffctx_get_sample_fmt(self.as_ptr()) }
    }

    /// Audio channel layout
    pub fn channel_layout(&self) -> &AVChannelLayout {
        unsafe { &*ffctx_get_ch_layout(self.ptr.as_ptr()) }
    }
}

impl Drop for CodecContext {
    fn drop(&mut self) {
        unsafe {
            let mut ptr = self.ptr.as_ptr();
            (self.lib.api.avcodec_free_context)(&mut ptr);
        }
    }
}

impl std::fmt::Debug for CodecContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecContext")
            .field("type", &self.codec_type)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("sample_rate", &self.sample_rate())
            .finish()
    }
}
