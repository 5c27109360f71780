//! Pull-based single-stream decoder
//!
//! A [`StreamReader`] owns a demuxer and a decoder for one stream of a
//! container. Each [`read_frame`](StreamReader::read_frame) call yields the next
//! decoded frame; [`seek`](StreamReader::seek) jumps to the keyframe at or before
//! a position.

use crate::codec::{
  CodecContext, CodecError, CodecResult, Demuxer, Frame, MediaSource, MediaType, Packet, StreamInfo,
};
use crate::ffi::{AVRational, AvLibrary};
use std::sync::Arc;
use tracing::debug;

pub struct StreamReader {
  demuxer: Demuxer,
  decoder: CodecContext,
  packet: Packet,
  frame: Frame,
  stream: StreamInfo,
  /// `frame` holds the last decoded frame
  has_frame: bool,
  /// `packet` was refused by the decoder and must be sent again
  packet_pending: bool,
  /// End of container reached, decoder is being drained
  draining: bool,
}

impl StreamReader {
  /// Open the first stream of `media_type` in `source`
  ///
  /// Packets of every other stream are discarded by the demuxer.
  pub fn open(lib: &Arc<AvLibrary>, source: &MediaSource, media_type: MediaType) -> CodecResult<Self> {
    let mut demuxer = Demuxer::open(lib, source)?;
    let stream = demuxer
      .find_first(media_type)
      .cloned()
      .ok_or(CodecError::StreamNotFound(media_type))?;
    demuxer.discard_all_except(stream.index);

    let decoder = CodecContext::new_decoder_for(lib, demuxer.codec_parameters(stream.index)?)?;

    debug!(
      target: "avbridge::stream",
      %media_type,
      index = stream.index,
      time_base = ?stream.time_base,
      "stream opened"
    );

    Ok(Self {
      demuxer,
      decoder,
      packet: Packet::new(lib)?,
      frame: Frame::new(lib)?,
      stream,
      has_frame: false,
      packet_pending: false,
      draining: false,
    })
  }

  /// Decode the next frame of the stream
  ///
  /// Returns `Ok(false)` once the stream is exhausted, including frames the
  /// decoder held back until end of input.
  pub fn read_frame(&mut self) -> CodecResult<bool> {
    self.frame.unref();
    self.has_frame = false;

    loop {
      if self.decoder.receive_frame(&mut self.frame)? {
        self.has_frame = true;
        return Ok(true);
      }
      if self.draining {
        return Ok(false);
      }

      if !self.packet_pending {
        if !self.demuxer.read_packet(&mut self.packet)? {
          self.decoder.send_packet(None)?;
          self.draining = true;
          continue;
        }
        if self.packet.stream_index() != self.stream.index {
          continue;
        }
      }

      self.packet_pending = !self.decoder.send_packet(Some(&self.packet))?;
    }
  }

  /// Jump to the keyframe at or before `seconds`
  ///
  /// Decoder state is flushed; frames decoded afterwards may start before the
  /// target, see [`skip_to`](Self::skip_to).
  pub fn seek(&mut self, seconds: f64) -> CodecResult<()> {
    let timestamp = self.stream.from_seconds(seconds.max(0.0));

    self.decoder.flush();
    self.packet.unref();
    self.frame.unref();
    self.has_frame = false;
    self.packet_pending = false;
    self.draining = false;

    self.demuxer.seek(self.stream.index, timestamp, true)
  }

  /// Decode forward until the current frame ends at or after `seconds`
  ///
  /// Returns `Ok(false)` if the stream ends first.
  pub fn skip_to(&mut self, seconds: f64) -> CodecResult<bool> {
    loop {
      if let Some((_, end)) = self.frame_span() {
        if end >= seconds {
          return Ok(true);
        }
      }
      if !self.read_frame()? {
        return Ok(false);
      }
    }
  }

  /// The frame returned by the last successful `read_frame`
  pub fn frame(&self) -> Option<&Frame> {
    self.has_frame.then_some(&self.frame)
  }

  /// Start and end of the current frame, in seconds
  pub fn frame_span(&self) -> Option<(f64, f64)> {
    self.frame().map(|frame| {
      let start = self.translate_timestamp(frame.timestamp());
      let end = self.translate_timestamp(frame.timestamp() + frame.duration().max(0));
      (start, end)
    })
  }

  /// Convert a timestamp in the stream time base to seconds
  pub fn translate_timestamp(&self, timestamp: i64) -> f64 {
    self.stream.to_seconds(timestamp)
  }

  /// Declared stream duration in seconds (0 if unknown)
  pub fn duration(&self) -> f64 {
    self.stream.duration_seconds()
  }

  pub fn time_base(&self) -> AVRational {
    self.stream.time_base
  }

  pub fn stream_index(&self) -> i32 {
    self.stream.index
  }

  pub fn stream_info(&self) -> &StreamInfo {
    &self.stream
  }

  /// Decoder, for building resamplers and scalers matching its output
  pub fn decoder(&self) -> &CodecContext {
    &self.decoder
  }
}

impl std::fmt::Debug for StreamReader {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StreamReader")
      .field("stream", &self.stream)
      .field("has_frame", &self.has_frame)
      .field("draining", &self.draining)
      .finish()
  }
}
