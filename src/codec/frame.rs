//! Safe wrapper around FFmpeg AVFrame
//!
//! Provides RAII-based memory management and safe access to frame data.

use crate::ffi::{
    accessors::{
        ffframe_data, ffframe_get_best_effort_timestamp, ffframe_get_ch_layout,
        ffframe_get_duration, ffframe_get_format, ffframe_get_height, ffframe_get_nb_samples,
        ffframe_get_pts, ffframe_get_sample_rate, ffframe_get_width, ffframe_linesize,
        ffframe_set_format, ffframe_set_height, ffframe_set_nb_samples, ffframe_set_pts,
        ffframe_set_sample_rate, ffframe_set_width,
    },
    AVChannelLayout, AVFrame, AvLibrary, PixelFormat, AV_NOPTS_VALUE,
};
use std::os::raw::c_int;
use std::ptr::NonNull;
use std::sync::Arc;

use super::{CodecError, CodecResult};

/// One plane of a frame, borrowed together with its stride
///
/// `stride` is the distance in bytes between the starts of consecutive rows and
/// may exceed the logical row width.
#[derive(Clone, Copy, Debug)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    pub stride: usize,
}

impl Plane<'_> {
    /// Copy `rows` rows of `row_bytes` each into a tightly packed `dst`
    ///
    /// Rows missing from the source, or not fitting in `dst`, are left untouched.
    pub fn copy_rows(&self, row_bytes: usize, rows: usize, dst: &mut [u8]) {
        if row_bytes == 0 {
            return;
        }
        let width = row_bytes.min(self.stride);
        for (row, out) in dst.chunks_exact_mut(row_bytes).take(rows).enumerate() {
            let start = row * self.stride;
            let Some(src) = self.data.get(start..start + width) else {
                break;
            };
            out[..width].copy_from_slice(src);
        }
    }

    /// Packed copy of `rows` rows of `row_bytes` each
    pub fn to_packed(&self, row_bytes: usize, rows: usize) -> Vec<u8> {
        let mut out = vec![0u8; row_bytes * rows];
        self.copy_rows(row_bytes, rows, &mut out);
        out
    }
}

/// Safe wrapper around AVFrame with RAII cleanup
pub struct Frame {
    ptr: NonNull<AVFrame>,
    lib: Arc<AvLibrary>,
}

impl Frame {
    /// Allocate a new empty frame
    pub fn new(lib: &Arc<AvLibrary>) -> CodecResult<Self> {
        let ptr = unsafe { (lib.api.av_frame_alloc)() };
        NonNull::new(ptr)
            .map(|ptr| Self {
                ptr,
                lib: Arc::clone(lib),
            })
            .ok_or(CodecError::AllocationFailed("AVFrame"))
    }

    /// Allocate a frame with buffer for the given format and dimensions
    pub fn new_video(
        lib: &Arc<AvLibrary>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> CodecResult<Self> {
        let mut frame = Self::new(lib)?;

        unsafe {
            ffframe_set_width(frame.as_mut_ptr(), width as c_int);
            ffframe_set_height(frame.as_mut_ptr(), height as c_int);
            ffframe_set_format(frame.as_mut_ptr(), format.as_raw());
        }

        // Allocate buffer with 32-byte alignment for SIMD
        let ret = unsafe { (lib.api.av_frame_get_buffer)(frame.as_mut_ptr(), 32) };
        lib.check(ret)?;

        Ok(frame)
    }

    /// Allocate an audio frame description without sample buffers
    ///
    /// `swr_convert_frame` allocates the buffers when converting into it.
    pub fn new_audio(
        lib: &Arc<AvLibrary>,
        sample_rate: u32,
        layout: &AVChannelLayout,
        sample_format: c_int,
    ) -> CodecResult<Self> {
        let mut frame = Self::new(lib)?;

        unsafe {
            ffframe_set_sample_rate(frame.as_mut_ptr(), sample_rate as c_int);
            ffframe_set_format(frame.as_mut_ptr(), sample_format);
            let ret = (lib.api.av_channel_layout_copy)(
                ffframe_get_ch_layout(frame.as_mut_ptr()),
                layout,
            );
            lib.check(ret)?;
        }

        Ok(frame)
    }

    /// Allocate sample buffers for `nb_samples` samples (audio frames only)
    pub fn alloc_samples(&mut self, nb_samples: usize) -> CodecResult<()> {
        unsafe {
            ffframe_set_nb_samples(self.as_mut_ptr(), nb_samples as c_int);
            let ret = (self.lib.api.av_frame_get_buffer)(self.as_mut_ptr(), 0);
            self.lib.check(ret)?;
        }
        Ok(())
    }

    /// Get the raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_ptr(&self) -> *const AVFrame {
        self.ptr.as_ptr()
    }

    /// Get the mutable raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut AVFrame {
        self.ptr.as_ptr()
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Get frame width
    #[inline]
    pub fn width(&self) -> u32 {
        unsafe { ffframe_get_width(self.as_ptr()) as u32 }
    }

    /// Get frame height
    #[inline]
    pub fn height(&self) -> u32 {
        unsafe { ffframe_get_height(self.as_ptr()) as u32 }
    }

    /// Raw `AVPixelFormat` / `AVSampleFormat` value
    #[inline]
    pub fn raw_format(&self) -> c_int {
        unsafe { ffframe_get_format(self.as_ptr()) }
    }

    /// Pixel format, when it is one this crate knows
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        PixelFormat::from_raw(self.raw_format())
    }

    /// Get presentation timestamp
    #[inline]
    pub fn pts(&self) -> i64 {
        unsafe { ffframe_get_pts(self.as_ptr()) }
    }

    /// Set presentation timestamp
    #[inline]
    pub fn set_pts(&mut self, pts: i64) {
        unsafe { ffframe_set_pts(self.as_mut_ptr(), pts) }
    }

    /// Presentation timestamp, falling back to the decoder's best estimate
    pub fn timestamp(&self) -> i64 {
        let pts = self.pts();
        if pts != AV_NOPTS_VALUE {
            return pts;
        }
        let estimate = unsafe { ffframe_get_best_effort_timestamp(self.as_ptr()) };
        if estimate == AV_NOPTS_VALUE {
            0
        } else {
            estimate
        }
    }

    /// Get frame duration in stream time base units (0 if unknown)
    #[inline]
    pub fn duration(&self) -> i64 {
        unsafe { ffframe_get_duration(self.as_ptr()) }
    }

    /// Number of audio samples per channel
    #[inline]
    pub fn nb_samples(&self) -> usize {
        unsafe { ffframe_get_nb_samples(self.as_ptr()).max(0) as usize }
    }

    /// Shrink the sample count after a partial conversion
    #[inline]
    pub fn set_nb_samples(&mut self, nb_samples: usize) {
        unsafe { ffframe_set_nb_samples(self.as_mut_ptr(), nb_samples as c_int) }
    }

    /// Audio sample rate
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        unsafe { ffframe_get_sample_rate(self.as_ptr()).max(0) as u32 }
    }

    /// Audio channel layout
    pub fn channel_layout(&self) -> &AVChannelLayout {
        unsafe { &*ffframe_get_ch_layout(self.ptr.as_ptr()) }
    }

    /// Number of audio channels
    #[inline]
    pub fn channels(&self) -> u32 {
        self.channel_layout().nb_channels.max(0) as u32
    }

    // ========================================================================
    // Data Access
    // ========================================================================

    /// Get pointer to plane data
    pub fn data(&self, plane: usize) -> *const u8 {
        unsafe { ffframe_data(self.ptr.as_ptr(), plane as c_int) as *const u8 }
    }

    /// Get mutable pointer to plane data
    pub fn data_mut(&mut self, plane: usize) -> *mut u8 {
        unsafe { ffframe_data(self.as_mut_ptr(), plane as c_int) }
    }

    /// Get line size (stride) for a plane
    #[inline]
    pub fn linesize(&self, plane: usize) -> i32 {
        unsafe { ffframe_linesize(self.as_ptr(), plane as c_int) }
    }

    /// Borrow `rows` rows of a video plane
    ///
    /// Returns None if the plane doesn't exist or has no data.
    pub fn plane(&self, plane: usize, rows: usize) -> Option<Plane<'_>> {
        let ptr = self.data(plane);
        let linesize = self.linesize(plane);
        if ptr.is_null() || linesize <= 0 {
            return None;
        }

        let stride = linesize as usize;
        Some(Plane {
            data: unsafe { std::slice::from_raw_parts(ptr, stride * rows) },
            stride,
        })
    }

    /// Packed 16-bit samples of an interleaved S16 audio frame
    pub fn samples_s16(&self) -> &[i16] {
        let ptr = self.data(0);
        if ptr.is_null() {
            return &[];
        }
        let len = self.nb_samples() * self.channels() as usize;
        // S16 buffers from av_frame_get_buffer are at least 2-byte aligned
        unsafe { std::slice::from_raw_parts(ptr as *const i16, len) }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Make sure the frame data is writable, copying it if it is shared
    pub fn make_writable(&mut self) -> CodecResult<()> {
        let ret = unsafe { (self.lib.api.av_frame_make_writable)(self.as_mut_ptr()) };
        self.lib.check(ret)?;
        Ok(())
    }

    /// Unreference the frame data (but keep the frame structure)
    pub fn unref(&mut self) {
        unsafe { (self.lib.api.av_frame_unref)(self.as_mut_ptr()) }
    }

    /// Whether the frame currently references data
    pub fn is_empty(&self) -> bool {
        self.data(0).is_null()
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        unsafe {
            let mut ptr = self.ptr.as_ptr();
            (self.lib.api.av_frame_free)(&mut ptr);
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.raw_format())
            .field("pts", &self.pts())
            .field("nb_samples", &self.nb_samples())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_rows_skips_stride_padding() {
        // 3 rows of 4 visible bytes, stride 6
        let data: Vec<u8> = (0..18).collect();
        let plane = Plane {
            data: &data,
            stride: 6,
        };
        assert_eq!(
            plane.to_packed(4, 3),
            vec![0, 1, 2, 3, 6, 7, 8, 9, 12, 13, 14, 15]
        );
    }

    #[test]
    fn test_copy_rows_short_source() {
        let data = [1u8, 2, 3, 4, 5];
        let plane = Plane {
            data: &data,
            stride: 4,
        };
        let mut out = [0u8; 8];
        plane.copy_rows(4, 2, &mut out);
        assert_eq!(out, [1, 2, 3, 4, 0, 0, 0, 0]);
    }

    #[test]
    fn test_copy_rows_zero_width() {
        let plane = Plane {
            data: &[],
            stride: 0,
        };
        assert!(plane.to_packed(0, 4).is_empty());
    }
}
