//! Safe wrapper around FFmpeg SwrContext
//!
//! Provides audio resampling and format conversion functionality. Every
//! pipeline in this crate resamples to the same target: interleaved signed
//! 16-bit stereo at the source sample rate.

use crate::ffi::{sample_format, AVChannelLayout, AvLibrary, SwrContext};
use std::os::raw::c_int;
use std::ptr::NonNull;
use std::sync::Arc;

use super::{CodecContext, CodecError, CodecResult, Frame};

/// Channel count of all PCM produced by the crate
pub const OUTPUT_CHANNELS: u32 = 2;

/// Bytes per interleaved output sample (one channel)
pub const OUTPUT_SAMPLE_BYTES: usize = 2;

/// Safe wrapper around SwrContext for audio resampling and format conversion
pub struct Resampler {
    ptr: NonNull<SwrContext>,
    lib: Arc<AvLibrary>,
    dst_layout: AVChannelLayout,
    dst_sample_rate: u32,
    dst_format: c_int,
}

impl Resampler {
    /// Create a new resampler for the given conversion
    ///
    /// A source layout with unspecified channel order is replaced by the
    /// default layout for its channel count.
    pub fn new(
        lib: &Arc<AvLibrary>,
        src_layout: &AVChannelLayout,
        src_format: c_int,
        src_sample_rate: u32,
        dst_channels: u32,
        dst_format: c_int,
        dst_sample_rate: u32,
    ) -> CodecResult<Self> {
        let mut src_ch_layout = AVChannelLayout::empty();
        let mut dst_ch_layout = AVChannelLayout::empty();

        unsafe {
            if src_layout.is_unspecified() {
                (lib.api.av_channel_layout_default)(&mut src_ch_layout, src_layout.nb_channels);
            } else {
                let ret = (lib.api.av_channel_layout_copy)(&mut src_ch_layout, src_layout);
                lib.check(ret)?;
            }
            (lib.api.av_channel_layout_default)(&mut dst_ch_layout, dst_channels as c_int);
        }

        // Allocate and configure resampler context using swr_alloc_set_opts2
        let mut ctx: *mut SwrContext = std::ptr::null_mut();

        let ret = unsafe {
            (lib.api.swr_alloc_set_opts2)(
                &mut ctx,
                &dst_ch_layout,
                dst_format,
                dst_sample_rate as c_int,
                &src_ch_layout,
                src_format,
                src_sample_rate as c_int,
                0,
                std::ptr::null_mut(),
            )
        };

        // The source layout has been copied by FFmpeg
        unsafe { (lib.api.av_channel_layout_uninit)(&mut src_ch_layout) };

        if ret < 0 {
            unsafe { (lib.api.av_channel_layout_uninit)(&mut dst_ch_layout) };
            return Err(lib.error(ret).into());
        }

        let Some(ptr) = NonNull::new(ctx) else {
            unsafe { (lib.api.av_channel_layout_uninit)(&mut dst_ch_layout) };
            return Err(CodecError::AllocationFailed("SwrContext"));
        };

        // From here on Drop releases the context and the destination layout
        let resampler = Self {
            ptr,
            lib: Arc::clone(lib),
            dst_layout: dst_ch_layout,
            dst_sample_rate,
            dst_format,
        };

        let ret = unsafe { (lib.api.swr_init)(resampler.ptr.as_ptr()) };
        lib.check(ret)?;

        Ok(resampler)
    }

    /// Resampler from a decoder's output to interleaved S16 stereo at the same rate
    pub fn to_stereo_s16(lib: &Arc<AvLibrary>, decoder: &CodecContext) -> CodecResult<Self> {
        Self::new(
            lib,
            decoder.channel_layout(),
            decoder.raw_sample_format(),
            decoder.sample_rate(),
            OUTPUT_CHANNELS,
            sample_format::S16,
            decoder.sample_rate(),
        )
    }

    /// Convert a decoded frame into a freshly allocated output frame
    pub fn convert_frame(&mut self, src: &Frame) -> CodecResult<Frame> {
        let mut dst = Frame::new_audio(
            &self.lib,
            self.dst_sample_rate,
            &self.dst_layout,
            self.dst_format,
        )?;

        let ret =
            unsafe { (self.lib.api.swr_convert_frame)(self.ptr.as_ptr(), dst.as_mut_ptr(), src.as_ptr()) };
        self.lib.check(ret)?;

        Ok(dst)
    }

    /// Samples (at `base` rate) buffered inside the resampler
    pub fn delay(&self, base: u32) -> i64 {
        unsafe { (self.lib.api.swr_get_delay)(self.ptr.as_ptr(), base as i64) }
    }

    /// Upper bound of output samples for `in_samples` more input samples
    pub fn out_samples(&self, in_samples: usize) -> usize {
        let n = unsafe { (self.lib.api.swr_get_out_samples)(self.ptr.as_ptr(), in_samples as c_int) };
        n.max(0) as usize
    }

    /// Flush all samples still buffered in the resampler into one frame
    ///
    /// Returns None when nothing was buffered.
    pub fn drain(&mut self) -> CodecResult<Option<Frame>> {
        let delay = self.delay(self.dst_sample_rate).max(0) as usize;
        let capacity = delay.max(self.out_samples(0));
        if capacity == 0 {
            return Ok(None);
        }

        let mut dst = Frame::new_audio(
            &self.lib,
            self.dst_sample_rate,
            &self.dst_layout,
            self.dst_format,
        )?;
        dst.alloc_samples(capacity)?;

        let dst_data: [*mut u8; 1] = [dst.data_mut(0)];
        let flushed = unsafe {
            (self.lib.api.swr_convert)(
                self.ptr.as_ptr(),
                dst_data.as_ptr(),
                capacity as c_int,
                std::ptr::null(),
                0,
            )
        };
        self.lib.check(flushed)?;

        if flushed == 0 {
            return Ok(None);
        }
        dst.set_nb_samples(flushed as usize);
        Ok(Some(dst))
    }

    /// Output channel count
    pub fn channels(&self) -> u32 {
        self.dst_layout.nb_channels.max(0) as u32
    }

    /// Output sample rate
    pub fn sample_rate(&self) -> u32 {
        self.dst_sample_rate
    }
}

impl Drop for Resampler {
    fn drop(&mut self) {
        unsafe {
            let mut ptr = self.ptr.as_ptr();
            (self.lib.api.swr_free)(&mut ptr);
            (self.lib.api.av_channel_layout_uninit)(&mut self.dst_layout);
        }
    }
}

impl std::fmt::Debug for Resampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resampler")
            .field("channels", &self.channels())
            .field("sample_rate", &self.dst_sample_rate)
            .field("format", &self.dst_format)
            .finish()
    }
}
