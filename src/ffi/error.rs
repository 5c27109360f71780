//! FFmpeg return codes
//!
//! Negative return values are turned into [`FFmpegError`], carrying the text
//! `av_strerror` gives for the code.

use super::symbols::AvFunctions;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use thiserror::Error;

/// `FFERRTAG`: negated little-endian four-character code
const fn fferrtag(tag: &[u8; 4]) -> c_int {
  -(i32::from_le_bytes(*tag))
}

/// End of stream, also returned by drained codecs
pub const AVERROR_EOF: c_int = fferrtag(b"EOF ");

/// `AVERROR(EAGAIN)`: output must be consumed before more input is accepted
#[cfg(target_os = "macos")]
pub const AVERROR_EAGAIN: c_int = -35;

#[cfg(not(target_os = "macos"))]
pub const AVERROR_EAGAIN: c_int = -11;

/// A failed FFmpeg call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("FFmpeg error {code}: {message}")]
pub struct FFmpegError {
  /// Negative return code
  pub code: c_int,
  pub message: String,
}

impl FFmpegError {
  /// Describe `code` with `av_strerror`
  pub fn from_code(api: &AvFunctions, code: c_int) -> Self {
    let mut buf = [0 as c_char; 128];
    let described = unsafe { (api.av_strerror)(code, buf.as_mut_ptr(), buf.len()) } >= 0;
    if !described {
      return Self::new(code, format!("unknown error {code}"));
    }
    let message = unsafe { CStr::from_ptr(buf.as_ptr()) }
      .to_string_lossy()
      .into_owned();
    Self { code, message }
  }

  pub fn new(code: c_int, message: impl Into<String>) -> Self {
    Self {
      code,
      message: message.into(),
    }
  }

  /// The codec wants the caller to read output first
  pub fn is_eagain(&self) -> bool {
    self.code == AVERROR_EAGAIN
  }

  pub fn is_eof(&self) -> bool {
    self.code == AVERROR_EOF
  }
}

pub type FFmpegResult<T> = Result<T, FFmpegError>;

impl AvFunctions {
  /// Pass non-negative return values through, describe negative ones
  #[inline]
  pub fn check(&self, ret: c_int) -> FFmpegResult<c_int> {
    if ret < 0 {
      Err(FFmpegError::from_code(self, ret))
    } else {
      Ok(ret)
    }
  }
}
