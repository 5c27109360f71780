//! Safe wrapper around FFmpeg AVPacket
//!
//! Provides RAII-based memory management for compressed stream data.

use crate::ffi::{
    accessors::{ffpkt_get_pts, ffpkt_get_stream_index, ffpkt_set_stream_index},
    AVPacket, AVRational, AvLibrary,
};
use std::ptr::NonNull;
use std::sync::Arc;

use super::{CodecError, CodecResult};

/// Safe wrapper around AVPacket with RAII cleanup
pub struct Packet {
    ptr: NonNull<AVPacket>,
    lib: Arc<AvLibrary>,
}

impl Packet {
    /// Allocate a new empty packet
    pub fn new(lib: &Arc<AvLibrary>) -> CodecResult<Self> {
        let ptr = unsafe { (lib.api.av_packet_alloc)() };
        NonNull::new(ptr)
            .map(|ptr| Self {
                ptr,
                lib: Arc::clone(lib),
            })
            .ok_or(CodecError::AllocationFailed("AVPacket"))
    }

    /// Get the raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_ptr(&self) -> *const AVPacket {
        self.ptr.as_ptr()
    }

    /// Get the mutable raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut AVPacket {
        self.ptr.as_ptr()
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Index of the container stream this packet belongs to
    #[inline]
    pub fn stream_index(&self) -> i32 {
        unsafe { ffpkt_get_stream_index(self.as_ptr()) }
    }

    /// Assign the packet to a container stream
    #[inline]
    pub fn set_stream_index(&mut self, index: i32) {
        unsafe { ffpkt_set_stream_index(self.as_mut_ptr(), index) }
    }

    /// Get presentation timestamp
    #[inline]
    pub fn pts(&self) -> i64 {
        unsafe { ffpkt_get_pts(self.as_ptr()) }
    }

    /// Convert pts/dts/duration from one time base to another
    pub fn rescale_ts(&mut self, from: AVRational, to: AVRational) {
        unsafe { (self.lib.api.av_packet_rescale_ts)(self.as_mut_ptr(), from, to) }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Unreference the packet data (but keep the packet structure)
    pub fn unref(&mut self) {
        unsafe { (self.lib.api.av_packet_unref)(self.as_mut_ptr()) }
    }
}

impl Drop for Packet {
    fn drop(&mut self) {
        unsafe {
            let mut ptr = self.ptr.as_ptr();
            (self.lib.api.av_packet_free)(&mut ptr);
        }
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("stream_index", &self.stream_index())
            .field("pts", &self.pts())
            .finish()
    }
}
