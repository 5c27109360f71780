//! Whole-file audio decoding
//!
//! [`load_audio_file`] decodes the first audio stream of a container into one
//! interleaved 16-bit stereo buffer at the source sample rate. The first frame of
//! the first video stream, if any, is kept as cover art.

use crate::codec::{
  CodecContext, CodecError, CodecResult, Demuxer, Frame, MediaSource, MediaType, Packet, Resampler,
  Scaler, StreamInfo,
};
use crate::codec::resampler::OUTPUT_CHANNELS;
use crate::ffi::{AvLibrary, PixelFormat};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cover image, packed RGBA
#[derive(Clone, PartialEq, Eq)]
pub struct CoverArt {
  pub width: u32,
  pub height: u32,
  pub rgba: Vec<u8>,
}

impl std::fmt::Debug for CoverArt {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CoverArt")
      .field("width", &self.width)
      .field("height", &self.height)
      .field("bytes", &self.rgba.len())
      .finish()
  }
}

/// Decoded audio plus container tags
#[derive(Clone)]
pub struct MediaInfo {
  pub sample_rate: u32,
  /// Always 2
  pub channels: u32,
  /// Interleaved samples, `channels` per frame
  pub pcm: Vec<i16>,
  /// Container tags in dictionary order
  pub metadata: Vec<(String, String)>,
  pub cover_art: Option<CoverArt>,
}

impl MediaInfo {
  /// Number of sample frames (samples per channel)
  pub fn sample_count(&self) -> usize {
    self.pcm.len() / self.channels.max(1) as usize
  }

  /// Playing time of the decoded audio
  pub fn duration(&self) -> Duration {
    if self.sample_rate == 0 {
      return Duration::ZERO;
    }
    Duration::from_secs_f64(self.sample_count() as f64 / self.sample_rate as f64)
  }

  /// First tag value whose key matches case-insensitively
  pub fn tag(&self, key: &str) -> Option<&str> {
    self
      .metadata
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(key))
      .map(|(_, v)| v.as_str())
  }
}

impl std::fmt::Debug for MediaInfo {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MediaInfo")
      .field("sample_rate", &self.sample_rate)
      .field("channels", &self.channels)
      .field("samples", &self.sample_count())
      .field("metadata", &self.metadata)
      .field("cover_art", &self.cover_art)
      .finish()
  }
}

/// Decoder for the cover-art stream; dropped after the first picture
struct CoverArtDecoder {
  stream: StreamInfo,
  decoder: CodecContext,
}

impl CoverArtDecoder {
  fn open(lib: &Arc<AvLibrary>, demuxer: &Demuxer, stream: StreamInfo) -> Option<Self> {
    let decoder = demuxer
      .codec_parameters(stream.index)
      .and_then(|params| CodecContext::new_decoder_for(lib, params));

    match decoder {
      Ok(decoder) => Some(Self { stream, decoder }),
      Err(e) => {
        warn!(target: "avbridge", error = %e, "cover art stream cannot be decoded, skipping it");
        None
      }
    }
  }

  fn capture(lib: &Arc<AvLibrary>, frame: &Frame) -> CodecResult<CoverArt> {
    let (width, height) = (frame.width(), frame.height());
    let scaler = Scaler::new_converter(lib, width, height, frame.raw_format(), PixelFormat::Rgba)?;
    let rgba = scaler.scale_alloc(frame)?;

    let plane = rgba
      .plane(0, height as usize)
      .ok_or_else(|| CodecError::InvalidState("Scaled cover art has no data".into()))?;

    Ok(CoverArt {
      width,
      height,
      rgba: plane.to_packed(width as usize * 4, height as usize),
    })
  }
}

/// Send one packet and hand every frame it yields to `on_frame`
fn decode_packet(
  decoder: &mut CodecContext,
  packet: Option<&Packet>,
  frame: &mut Frame,
  mut on_frame: impl FnMut(&Frame) -> CodecResult<bool>,
) -> CodecResult<()> {
  loop {
    let accepted = decoder.send_packet(packet)?;
    let mut received = false;
    while decoder.receive_frame(frame)? {
      received = true;
      if !on_frame(frame)? {
        return Ok(());
      }
    }
    if accepted {
      return Ok(());
    }
    if !received {
      return Err(CodecError::InvalidState(
        "Decoder neither accepts input nor produces output".into(),
      ));
    }
  }
}

/// Decode a whole file into memory
///
/// Fails with [`CodecError::StreamNotFound`] when the container has no audio
/// stream. Frames are concatenated in decode order.
pub fn load_audio_file(lib: &Arc<AvLibrary>, source: &MediaSource) -> CodecResult<MediaInfo> {
  let mut demuxer = Demuxer::open(lib, source)?;
  let metadata = demuxer.metadata();

  let audio_stream = demuxer
    .find_first(MediaType::Audio)
    .cloned()
    .ok_or(CodecError::StreamNotFound(MediaType::Audio))?;

  let mut audio = CodecContext::new_decoder_for(lib, demuxer.codec_parameters(audio_stream.index)?)?;
  let mut resampler = Resampler::to_stereo_s16(lib, &audio)?;
  let sample_rate = audio.sample_rate();

  let mut cover = demuxer
    .find_first(MediaType::Video)
    .cloned()
    .and_then(|stream| CoverArtDecoder::open(lib, &demuxer, stream));
  let mut cover_art = None;

  let mut packet = Packet::new(lib)?;
  let mut frame = Frame::new(lib)?;
  let mut pcm: Vec<i16> = Vec::new();

  let mut push_audio = |resampler: &mut Resampler, frame: &Frame| -> CodecResult<bool> {
    let out = resampler.convert_frame(frame)?;
    pcm.extend_from_slice(out.samples_s16());
    Ok(true)
  };

  while demuxer.read_packet(&mut packet)? {
    let index = packet.stream_index();

    if index == audio_stream.index {
      decode_packet(&mut audio, Some(&packet), &mut frame, |f| push_audio(&mut resampler, f))?;
    } else if let Some(video) = cover.as_mut().filter(|v| v.stream.index == index) {
      let mut picture = None;
      decode_packet(&mut video.decoder, Some(&packet), &mut frame, |f| {
        picture = Some(CoverArtDecoder::capture(lib, f)?);
        Ok(false)
      })?;
      if picture.is_some() {
        cover_art = picture;
        cover = None;
      }
    }
  }

  // Pictures held back by a frame-threaded decoder
  if let Some(mut video) = cover.take() {
    decode_packet(&mut video.decoder, None, &mut frame, |f| {
      cover_art = Some(CoverArtDecoder::capture(lib, f)?);
      Ok(false)
    })?;
  }

  decode_packet(&mut audio, None, &mut frame, |f| push_audio(&mut resampler, f))?;

  if let Some(tail) = resampler.drain()? {
    pcm.extend_from_slice(tail.samples_s16());
  }

  debug!(
    target: "avbridge",
    sample_rate,
    samples = pcm.len() / OUTPUT_CHANNELS as usize,
    tags = metadata.len(),
    cover_art = cover_art.is_some(),
    "audio file decoded"
  );

  Ok(MediaInfo {
    sample_rate,
    channels: OUTPUT_CHANNELS,
    pcm,
    metadata,
    cover_art,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn info(frames: usize, sample_rate: u32) -> MediaInfo {
    MediaInfo {
      sample_rate,
      channels: 2,
      pcm: vec![0; frames * 2],
      metadata: vec![
        ("title".into(), "Test Tone".into()),
        ("ARTIST".into(), "avbridge".into()),
      ],
      cover_art: None,
    }
  }

  #[test]
  fn test_sample_count_and_duration() {
    let info = info(44100, 44100);
    assert_eq!(info.sample_count(), 44100);
    assert_eq!(info.duration(), Duration::from_secs(1));

    let empty = MediaInfo {
      sample_rate: 0,
      ..info
    };
    assert_eq!(empty.duration(), Duration::ZERO);
  }

  #[test]
  fn test_tag_lookup() {
    let info = info(0, 48000);
    assert_eq!(info.tag("artist"), Some("avbridge"));
    assert_eq!(info.tag("Title"), Some("Test Tone"));
    assert_eq!(info.tag("album"), None);
  }
}
