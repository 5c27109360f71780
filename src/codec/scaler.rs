//! Safe wrapper around FFmpeg SwsContext
//!
//! Provides pixel format conversion and image scaling functionality.

use crate::ffi::{sws_flag, AvLibrary, PixelFormat, SwsContext};
use std::os::raw::c_int;
use std::ptr::NonNull;
use std::sync::Arc;

use super::{CodecError, CodecResult, Frame};

/// Scaling algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleAlgorithm {
  /// Fast bilinear (fastest, lower quality)
  FastBilinear,
  /// Bilinear (good balance)
  #[default]
  Bilinear,
  /// Bicubic (higher quality, slower)
  Bicubic,
}

impl ScaleAlgorithm {
  fn to_sws_flags(self) -> c_int {
    match self {
      ScaleAlgorithm::FastBilinear => sws_flag::FAST_BILINEAR,
      ScaleAlgorithm::Bilinear => sws_flag::BILINEAR,
      ScaleAlgorithm::Bicubic => sws_flag::BICUBIC,
    }
  }
}

/// Safe wrapper around SwsContext for pixel format conversion and scaling
pub struct Scaler {
  ptr: NonNull<SwsContext>,
  lib: Arc<AvLibrary>,
  src_width: u32,
  src_height: u32,
  dst_width: u32,
  dst_height: u32,
  dst_format: PixelFormat,
}

impl Scaler {
  /// Create a new scaler for the given conversion
  ///
  /// `src_format` is a raw `AVPixelFormat` so decoder output in any format can be converted.
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    lib: &Arc<AvLibrary>,
    src_width: u32,
    src_height: u32,
    src_format: c_int,
    dst_width: u32,
    dst_height: u32,
    dst_format: PixelFormat,
    algorithm: ScaleAlgorithm,
  ) -> CodecResult<Self> {
    let ptr = unsafe {
      (lib.api.sws_getContext)(
        src_width as c_int,
        src_height as c_int,
        src_format,
        dst_width as c_int,
        dst_height as c_int,
        dst_format.as_raw(),
        algorithm.to_sws_flags(),
        std::ptr::null_mut(),
        std::ptr::null_mut(),
        std::ptr::null(),
      )
    };

    NonNull::new(ptr)
      .map(|ptr| Self {
        ptr,
        lib: Arc::clone(lib),
        src_width,
        src_height,
        dst_width,
        dst_height,
        dst_format,
      })
      .ok_or(CodecError::InvalidConfig(format!(
        "Cannot create scaler from format {} {}x{} to {:?} {}x{}",
        src_format, src_width, src_height, dst_format, dst_width, dst_height
      )))
  }

  /// Create a scaler for format conversion only (no scaling)
  pub fn new_converter(
    lib: &Arc<AvLibrary>,
    width: u32,
    height: u32,
    src_format: c_int,
    dst_format: PixelFormat,
  ) -> CodecResult<Self> {
    Self::new(
      lib,
      width,
      height,
      src_format,
      width,
      height,
      dst_format,
      ScaleAlgorithm::Bilinear,
    )
  }

  /// Scale/convert a frame
  ///
  /// The destination frame must already have buffers allocated with the correct format/dimensions
  pub fn scale(&self, src: &Frame, dst: &mut Frame) -> CodecResult<()> {
    if src.width() != self.src_width || src.height() != self.src_height {
      return Err(CodecError::InvalidConfig(
        "Frame dimensions don't match scaler configuration".into(),
      ));
    }

    let src_data: [*const u8; 4] = [src.data(0), src.data(1), src.data(2), src.data(3)];
    let src_linesize: [c_int; 4] = [
      src.linesize(0),
      src.linesize(1),
      src.linesize(2),
      src.linesize(3),
    ];

    self.scale_raw(&src_data, &src_linesize, dst)?;
    dst.set_pts(src.pts());
    Ok(())
  }

  /// Convert one packed image (single plane, e.g. RGBA) into `dst`
  pub fn scale_packed(&self, src: &[u8], src_stride: usize, dst: &mut Frame) -> CodecResult<()> {
    if src.len() < src_stride * self.src_height as usize {
      return Err(CodecError::InvalidConfig(format!(
        "Input buffer holds {} bytes, need {}",
        src.len(),
        src_stride * self.src_height as usize
      )));
    }

    let src_data: [*const u8; 4] = [src.as_ptr(), std::ptr::null(), std::ptr::null(), std::ptr::null()];
    let src_linesize: [c_int; 4] = [src_stride as c_int, 0, 0, 0];
    self.scale_raw(&src_data, &src_linesize, dst)
  }

  fn scale_raw(
    &self,
    src_data: &[*const u8; 4],
    src_linesize: &[c_int; 4],
    dst: &mut Frame,
  ) -> CodecResult<()> {
    if dst.width() != self.dst_width || dst.height() != self.dst_height {
      return Err(CodecError::InvalidConfig(
        "Frame dimensions don't match scaler configuration".into(),
      ));
    }

    let dst_data: [*mut u8; 4] = [
      dst.data_mut(0),
      dst.data_mut(1),
      dst.data_mut(2),
      dst.data_mut(3),
    ];
    let dst_linesize: [c_int; 4] = [
      dst.linesize(0),
      dst.linesize(1),
      dst.linesize(2),
      dst.linesize(3),
    ];

    let result = unsafe {
      (self.lib.api.sws_scale)(
        self.ptr.as_ptr(),
        src_data.as_ptr(),
        src_linesize.as_ptr(),
        0,
        self.src_height as c_int,
        dst_data.as_ptr(),
        dst_linesize.as_ptr(),
      )
    };

    if result < 0 {
      return Err(self.lib.error(result).into());
    }
    if result != self.dst_height as c_int {
      return Err(CodecError::InvalidState(format!(
        "Scaling produced {} rows instead of {}",
        result, self.dst_height
      )));
    }

    Ok(())
  }

  /// Scale/convert a frame, allocating a new destination frame
  pub fn scale_alloc(&self, src: &Frame) -> CodecResult<Frame> {
    let mut dst = Frame::new_video(&self.lib, self.dst_width, self.dst_height, self.dst_format)?;
    self.scale(src, &mut dst)?;
    Ok(dst)
  }

  /// Get destination pixel format
  pub fn dst_format(&self) -> PixelFormat {
    self.dst_format
  }
}

impl Drop for Scaler {
  fn drop(&mut self) {
    unsafe { (self.lib.api.sws_freeContext)(self.ptr.as_ptr()) }
  }
}

impl std::fmt::Debug for Scaler {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Scaler")
      .field("src", &(self.src_width, self.src_height))
      .field("dst", &(self.dst_width, self.dst_height))
      .field("dst_format", &self.dst_format)
      .finish()
  }
}
