//! Streaming audio decoder
//!
//! Produces interleaved 16-bit stereo PCM in caller-sized chunks. A decoded
//! frame that doesn't fit the caller's buffer is handed out over several calls.

use super::reader::StreamReader;
use crate::codec::resampler::{OUTPUT_CHANNELS, OUTPUT_SAMPLE_BYTES};
use crate::codec::{CodecResult, MediaSource, MediaType, Resampler};
use crate::ffi::AvLibrary;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct AudioStream {
  lib: Arc<AvLibrary>,
  reader: StreamReader,
  resampler: Resampler,
  /// Converted interleaved samples not handed out yet
  buffered: VecDeque<i16>,
  /// The reader holds a decoded frame that hasn't been converted yet
  pending: bool,
  /// The decoder and resampler have nothing left
  exhausted: bool,
}

impl AudioStream {
  /// Open the first audio stream of `source` and decode its first frame
  pub fn open(lib: &Arc<AvLibrary>, source: &MediaSource) -> CodecResult<Self> {
    let mut reader = StreamReader::open(lib, source, MediaType::Audio)?;
    let resampler = Resampler::to_stereo_s16(lib, reader.decoder())?;
    let pending = reader.read_frame()?;

    Ok(Self {
      lib: Arc::clone(lib),
      reader,
      resampler,
      buffered: VecDeque::new(),
      pending,
      exhausted: !pending,
    })
  }

  /// Fill `out` with the next PCM
  ///
  /// Samples left over from the previous call are returned first; a new frame
  /// is decoded only once they are used up. Writes at most `out.len()` bytes,
  /// rounded down to whole stereo samples. Returns 0 at end of stream; decode
  /// errors end the stream.
  pub fn decode(&mut self, out: &mut [u8]) -> usize {
    let frame_bytes = OUTPUT_SAMPLE_BYTES * OUTPUT_CHANNELS as usize;
    let capacity = out.len() / frame_bytes * OUTPUT_CHANNELS as usize;
    if capacity == 0 {
      return 0;
    }

    while self.buffered.is_empty() && !self.exhausted {
      if let Err(e) = self.refill() {
        warn!(target: "avbridge::stream", error = %e, "audio decode failed, treating as end of stream");
        self.exhausted = true;
      }
    }

    let count = capacity.min(self.buffered.len());
    for (bytes, sample) in out
      .chunks_exact_mut(OUTPUT_SAMPLE_BYTES)
      .zip(self.buffered.drain(..count))
    {
      bytes.copy_from_slice(&sample.to_ne_bytes());
    }
    count * OUTPUT_SAMPLE_BYTES
  }

  /// Convert the next decoded frame, or the resampler's tail at end of input
  fn refill(&mut self) -> CodecResult<()> {
    if !self.pending && !self.reader.read_frame()? {
      if let Some(tail) = self.resampler.drain()? {
        self.buffered.extend(tail.samples_s16());
      }
      self.exhausted = true;
      return Ok(());
    }
    self.pending = false;

    if let Some(frame) = self.reader.frame() {
      let converted = self.resampler.convert_frame(frame)?;
      self.buffered.extend(converted.samples_s16());
    }
    Ok(())
  }

  /// Continue from the frame containing `seconds`
  ///
  /// Samples converted before the seek are discarded, including any the
  /// resampler still holds.
  pub fn seek(&mut self, seconds: f64) -> CodecResult<()> {
    self.reader.seek(seconds)?;
    self.buffered.clear();
    self.resampler = Resampler::to_stereo_s16(&self.lib, self.reader.decoder())?;
    debug!(target: "avbridge::stream", seconds, "audio seek");

    self.pending = self.reader.skip_to(seconds)?;
    self.exhausted = !self.pending;
    Ok(())
  }

  /// Restart from the beginning
  pub fn rewind(&mut self) -> CodecResult<()> {
    self.seek(0.0)
  }

  /// No samples are left to return
  pub fn is_eof(&self) -> bool {
    self.exhausted && self.buffered.is_empty()
  }

  pub fn sample_rate(&self) -> u32 {
    self.resampler.sample_rate()
  }

  pub fn channels(&self) -> u32 {
    OUTPUT_CHANNELS
  }

  pub fn bit_depth(&self) -> u32 {
    (OUTPUT_SAMPLE_BYTES * 8) as u32
  }

  /// Declared duration in seconds (0 if unknown)
  pub fn duration(&self) -> f64 {
    self.reader.duration()
  }
}

impl std::fmt::Debug for AudioStream {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AudioStream")
      .field("sample_rate", &self.sample_rate())
      .field("buffered", &self.buffered.len())
      .field("pending", &self.pending)
      .field("eof", &self.is_eof())
      .finish()
  }
}
