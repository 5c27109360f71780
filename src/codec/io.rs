//! Custom I/O context for demuxing from memory
//!
//! Lets a [`Demuxer`](super::Demuxer) read a container that is already held in
//! memory (an embedded asset, a file read through some virtual filesystem) instead
//! of opening a path.

use crate::ffi::{
  accessors::ffavio_get_buffer_ptr, error::AVERROR_EOF, seek_flag, AVIOContext, AvLibrary,
};
use std::io::{Read, Seek, SeekFrom};
use std::os::raw::{c_int, c_void};
use std::path::PathBuf;
use std::ptr::NonNull;
use std::sync::Arc;

use super::{CodecError, CodecResult};

/// Buffer size handed to FFmpeg for custom I/O (32KB)
const IO_BUFFER_SIZE: usize = 32 * 1024;

/// Where a demuxer reads its container from
#[derive(Debug, Clone)]
pub enum MediaSource {
  /// A file path, opened by FFmpeg's own file protocol
  Path(PathBuf),
  /// An in-memory copy of the whole container
  Memory(Arc<[u8]>),
}

impl From<PathBuf> for MediaSource {
  fn from(path: PathBuf) -> Self {
    MediaSource::Path(path)
  }
}

impl From<&std::path::Path> for MediaSource {
  fn from(path: &std::path::Path) -> Self {
    MediaSource::Path(path.to_path_buf())
  }
}

impl From<&str> for MediaSource {
  fn from(path: &str) -> Self {
    MediaSource::Path(PathBuf::from(path))
  }
}

impl From<Vec<u8>> for MediaSource {
  fn from(data: Vec<u8>) -> Self {
    MediaSource::Memory(data.into())
  }
}

impl From<Arc<[u8]>> for MediaSource {
  fn from(data: Arc<[u8]>) -> Self {
    MediaSource::Memory(data)
  }
}

/// Read cursor over shared bytes
struct MemoryReader {
  data: Arc<[u8]>,
  position: usize,
}

impl Read for MemoryReader {
  fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
    let remaining = &self.data[self.position.min(self.data.len())..];
    let n = remaining.len().min(buf.len());
    buf[..n].copy_from_slice(&remaining[..n]);
    self.position += n;
    Ok(n)
  }
}

impl Seek for MemoryReader {
  fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
    let target = match pos {
      SeekFrom::Start(offset) => Some(offset as i64),
      SeekFrom::Current(offset) => (self.position as i64).checked_add(offset),
      SeekFrom::End(offset) => (self.data.len() as i64).checked_add(offset),
    };
    match target {
      Some(t) if t >= 0 => {
        self.position = t as usize;
        Ok(self.position as u64)
      }
      _ => Err(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        "seek before start of buffer",
      )),
    }
  }
}

/// Read-only AVIO context over an in-memory container
pub struct MemoryInput {
  ptr: NonNull<AVIOContext>,
  lib: Arc<AvLibrary>,
  /// Owned by the AVIO callbacks through the opaque pointer
  reader: *mut MemoryReader,
}

impl MemoryInput {
  /// Create a new custom I/O context reading from `data`
  pub fn new(lib: &Arc<AvLibrary>, data: Arc<[u8]>) -> CodecResult<Self> {
    let buffer = unsafe { (lib.api.av_malloc)(IO_BUFFER_SIZE) } as *mut u8;
    if buffer.is_null() {
      return Err(CodecError::AllocationFailed("AVIO buffer"));
    }

    let reader = Box::into_raw(Box::new(MemoryReader { data, position: 0 }));

    let ptr = unsafe {
      (lib.api.avio_alloc_context)(
        buffer,
        IO_BUFFER_SIZE as c_int,
        0, // write_flag = 0 for reading
        reader as *mut c_void,
        Some(read_callback),
        None,
        Some(seek_callback),
      )
    };

    let Some(ptr) = NonNull::new(ptr) else {
      unsafe {
        (lib.api.av_free)(buffer as *mut c_void);
        drop(Box::from_raw(reader));
      }
      return Err(CodecError::AllocationFailed("AVIOContext"));
    };

    Ok(Self {
      ptr,
      lib: Arc::clone(lib),
      reader,
    })
  }

  /// Get the raw AVIOContext pointer
  pub fn as_ptr(&self) -> *mut AVIOContext {
    self.ptr.as_ptr()
  }
}

impl Drop for MemoryInput {
  fn drop(&mut self) {
    unsafe {
      // The context may have swapped in a different buffer; free whatever it holds now
      let buffer = ffavio_get_buffer_ptr(self.ptr.as_ptr());
      (self.lib.api.av_free)(*buffer as *mut c_void);
      *buffer = std::ptr::null_mut();

      let mut ptr = self.ptr.as_ptr();
      (self.lib.api.avio_context_free)(&mut ptr);

      drop(Box::from_raw(self.reader));
    }
  }
}

// ============================================================================
// FFmpeg Callbacks
// ============================================================================

unsafe extern "C" fn read_callback(opaque: *mut c_void, buf: *mut u8, buf_size: c_int) -> c_int {
  if opaque.is_null() || buf.is_null() || buf_size <= 0 {
    return AVERROR_EOF;
  }

  // SAFETY: opaque is the MemoryReader installed in MemoryInput::new
  let reader = unsafe { &mut *(opaque as *mut MemoryReader) };
  let data = unsafe { std::slice::from_raw_parts_mut(buf, buf_size as usize) };

  match reader.read(data) {
    Ok(0) | Err(_) => AVERROR_EOF,
    Ok(n) => n as c_int,
  }
}

unsafe extern "C" fn seek_callback(opaque: *mut c_void, offset: i64, whence: c_int) -> i64 {
  if opaque.is_null() {
    return -1;
  }

  // SAFETY: opaque is the MemoryReader installed in MemoryInput::new
  let reader = unsafe { &mut *(opaque as *mut MemoryReader) };

  let whence = whence & !seek_flag::AVSEEK_FORCE;
  if whence == seek_flag::AVSEEK_SIZE {
    return reader.data.len() as i64;
  }

  let seek_from = match whence {
    0 => SeekFrom::Start(offset.max(0) as u64), // SEEK_SET
    1 => SeekFrom::Current(offset),             // SEEK_CUR
    2 => SeekFrom::End(offset),                 // SEEK_END
    _ => return -1,
  };

  match reader.seek(seek_from) {
    Ok(pos) => pos as i64,
    Err(_) => -1,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn reader(bytes: &[u8]) -> MemoryReader {
    MemoryReader {
      data: Arc::from(bytes),
      position: 0,
    }
  }

  #[test]
  fn test_read_past_end_returns_zero() {
    let mut r = reader(b"abcdef");
    let mut buf = [0u8; 4];
    assert_eq!(r.read(&mut buf).unwrap(), 4);
    assert_eq!(&buf, b"abcd");
    assert_eq!(r.read(&mut buf).unwrap(), 2);
    assert_eq!(&buf[..2], b"ef");
    assert_eq!(r.read(&mut buf).unwrap(), 0);
  }

  #[test]
  fn test_seek_variants() {
    let mut r = reader(b"0123456789");
    assert_eq!(r.seek(SeekFrom::End(-3)).unwrap(), 7);
    assert_eq!(r.seek(SeekFrom::Current(-2)).unwrap(), 5);
    assert_eq!(r.seek(SeekFrom::Start(1)).unwrap(), 1);
    assert!(r.seek(SeekFrom::Current(-5)).is_err());
  }

  #[test]
  fn test_seek_callback_reports_size() {
    let mut r = reader(b"0123456789");
    let opaque = &mut r as *mut MemoryReader as *mut c_void;
    let size = unsafe { seek_callback(opaque, 0, seek_flag::AVSEEK_SIZE) };
    assert_eq!(size, 10);
    let pos = unsafe { seek_callback(opaque, 4, 0) };
    assert_eq!(pos, 4);

    let mut buf = [0u8; 3];
    let n = unsafe { read_callback(opaque, buf.as_mut_ptr(), 3) };
    assert_eq!(n, 3);
    assert_eq!(&buf, b"456");
  }

  #[test]
  fn test_read_callback_eof() {
    let mut r = reader(b"");
    let opaque = &mut r as *mut MemoryReader as *mut c_void;
    let mut buf = [0u8; 8];
    let n = unsafe { read_callback(opaque, buf.as_mut_ptr(), 8) };
    assert_eq!(n, AVERROR_EOF);
  }
}
