//! Video encode sessions
//!
//! An [`Encoder`] is the caller-owned slot for at most one open
//! [`EncodeSession`]. A session turns packed RGBA frames into a container with
//! a single video stream, using the encoder picked during capability negotiation.

use crate::capability::{Capabilities, EncoderTuning};
use crate::codec::{
  CodecContext, CodecError, CodecResult, EncoderConfig, Frame, Muxer, Packet, Scaler,
};
use crate::ffi::{AVRational, AvLibrary, PixelFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn, Level};

/// Bytes per packed RGBA pixel
const RGBA_BYTES: usize = 4;

/// Size of one packed RGBA frame
pub fn rgba_frame_len(width: u32, height: u32) -> usize {
  width as usize * height as usize * RGBA_BYTES
}

/// One open output file
///
/// Fields are dropped in declaration order, the reverse of how they are acquired,
/// so the muxer (and the output file) is always released last.
pub struct EncodeSession {
  packet: Packet,
  scaler: Scaler,
  frame: Frame,
  encoder: CodecContext,
  muxer: Muxer,
  stream_index: i32,
  encoder_time_base: AVRational,
  stream_time_base: AVRational,
  width: u32,
  height: u32,
  frame_rate: u32,
  frame_counter: i64,
}

impl EncodeSession {
  /// Open `path` and write the container header
  ///
  /// On failure everything acquired so far is released and the output file removed.
  pub fn open(
    lib: &Arc<AvLibrary>,
    encoder_name: &str,
    path: &Path,
    width: u32,
    height: u32,
    frame_rate: u32,
  ) -> CodecResult<Self> {
    if width == 0 || height == 0 {
      return Err(CodecError::InvalidConfig(format!(
        "Invalid frame size {width}x{height}"
      )));
    }
    if frame_rate == 0 {
      return Err(CodecError::InvalidConfig("Frame rate must be positive".into()));
    }

    let mut muxer = Muxer::create(lib, path)?;
    match Self::setup(lib, &mut muxer, encoder_name, path, width, height, frame_rate) {
      Ok(parts) => Ok(parts.into_session(muxer, width, height, frame_rate)),
      Err(e) => {
        drop(muxer);
        debug!(target: "avbridge::encode", path = %path.display(), error = %e, "session setup failed");
        if let Err(io) = std::fs::remove_file(path) {
          debug!(target: "avbridge::encode", error = %io, "could not remove partial output");
        }
        Err(e)
      }
    }
  }

  fn setup(
    lib: &Arc<AvLibrary>,
    muxer: &mut Muxer,
    encoder_name: &str,
    path: &Path,
    width: u32,
    height: u32,
    frame_rate: u32,
  ) -> CodecResult<SessionParts> {
    let stream_index = muxer.add_video_stream(frame_rate)?;

    let tuning = EncoderTuning::for_encoder(encoder_name);
    let config = EncoderConfig {
      width,
      height,
      frame_rate,
      pixel_format: tuning.pixel_format,
      global_header: muxer.needs_global_header(),
      options: tuning.options,
    };

    let mut encoder = CodecContext::new_encoder_by_name(lib, encoder_name)?;
    encoder.configure_encoder(&config)?;
    encoder.open()?;
    muxer.set_stream_parameters(stream_index, &encoder)?;

    let frame = Frame::new_video(lib, width, height, config.pixel_format)?;
    let scaler = Scaler::new_converter(
      lib,
      width,
      height,
      PixelFormat::Rgba.as_raw(),
      config.pixel_format,
    )?;
    let packet = Packet::new(lib)?;

    if tracing::enabled!(target: "avbridge::encode", Level::DEBUG) {
      muxer.dump_format(&path.to_string_lossy());
    }
    muxer.write_header()?;

    // The container may pick its own time base while writing the header
    let stream_time_base = muxer.stream_time_base(stream_index)?;

    debug!(
      target: "avbridge::encode",
      encoder = encoder_name,
      width,
      height,
      frame_rate,
      pixel_format = ?config.pixel_format,
      "encode session opened"
    );

    Ok(SessionParts {
      packet,
      scaler,
      frame,
      encoder,
      stream_index,
      stream_time_base,
    })
  }

  /// Encode one packed RGBA frame of exactly `width * height * 4` bytes
  ///
  /// Returns the number of packets written to the container.
  pub fn supply(&mut self, rgba: &[u8]) -> CodecResult<usize> {
    let expected = rgba_frame_len(self.width, self.height);
    if rgba.len() != expected {
      return Err(CodecError::InvalidConfig(format!(
        "Frame buffer holds {} bytes, expected {}",
        rgba.len(),
        expected
      )));
    }

    self.frame.make_writable()?;
    self
      .scaler
      .scale_packed(rgba, self.width as usize * RGBA_BYTES, &mut self.frame)?;
    self.frame.set_pts(self.frame_counter);

    let mut written = 0;
    if !self.encoder.send_frame(Some(&self.frame))? {
      written += self.drain()?;
      if !self.encoder.send_frame(Some(&self.frame))? {
        return Err(CodecError::InvalidState(
          "Encoder rejected frame after draining".into(),
        ));
      }
    }
    self.frame_counter += 1;

    written += self.drain()?;
    Ok(written)
  }

  /// Write every packet the encoder has ready
  fn drain(&mut self) -> CodecResult<usize> {
    let mut written = 0;
    while self.encoder.receive_packet(&mut self.packet)? {
      self.packet.set_stream_index(self.stream_index);
      self
        .packet
        .rescale_ts(self.encoder_time_base, self.stream_time_base);
      let result = self.muxer.write_packet(&mut self.packet);
      self.packet.unref();
      result?;
      written += 1;
    }
    Ok(written)
  }

  /// Flush the encoder, write the trailer and close the file
  ///
  /// Returns the number of frames supplied during the session.
  pub fn finish(mut self) -> CodecResult<u64> {
    self.encoder.send_frame(None)?;
    self.drain()?;
    self.muxer.flush()?;
    self.muxer.write_trailer()?;

    debug!(
      target: "avbridge::encode",
      frames = self.frame_counter,
      "encode session closed"
    );
    Ok(self.frame_counter as u64)
  }

  /// Number of frames supplied so far
  pub fn frames_supplied(&self) -> u64 {
    self.frame_counter as u64
  }

  /// Frame dimensions
  pub fn dimensions(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  /// Frames per second
  pub fn frame_rate(&self) -> u32 {
    self.frame_rate
  }
}

impl std::fmt::Debug for EncodeSession {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("EncodeSession")
      .field("width", &self.width)
      .field("height", &self.height)
      .field("frame_rate", &self.frame_rate)
      .field("frames", &self.frame_counter)
      .finish()
  }
}

/// Everything acquired after the muxer, handed over once setup succeeded
struct SessionParts {
  packet: Packet,
  scaler: Scaler,
  frame: Frame,
  encoder: CodecContext,
  stream_index: i32,
  stream_time_base: AVRational,
}

impl SessionParts {
  fn into_session(self, muxer: Muxer, width: u32, height: u32, frame_rate: u32) -> EncodeSession {
    EncodeSession {
      encoder_time_base: self.encoder.time_base(),
      packet: self.packet,
      scaler: self.scaler,
      frame: self.frame,
      encoder: self.encoder,
      muxer,
      stream_index: self.stream_index,
      stream_time_base: self.stream_time_base,
      width,
      height,
      frame_rate,
      frame_counter: 0,
    }
  }
}

/// Slot holding at most one encode session
pub struct Encoder {
  lib: Arc<AvLibrary>,
  capabilities: Capabilities,
  session: Option<EncodeSession>,
  output: Option<PathBuf>,
}

impl Encoder {
  pub fn new(lib: Arc<AvLibrary>, capabilities: Capabilities) -> Self {
    Self {
      lib,
      capabilities,
      session: None,
      output: None,
    }
  }

  /// Open a session writing to `path`
  ///
  /// Fails without touching an already open session.
  pub fn start(
    &mut self,
    path: impl AsRef<Path>,
    width: u32,
    height: u32,
    frame_rate: u32,
  ) -> CodecResult<()> {
    let encoder_name = match self.capabilities.encoder() {
      Some(name) if self.capabilities.is_supported() => name,
      _ => return Err(CodecError::Unsupported),
    };
    if self.session.is_some() {
      return Err(CodecError::SessionActive);
    }

    let path = path.as_ref();
    let session = EncodeSession::open(&self.lib, encoder_name, path, width, height, frame_rate)?;
    self.session = Some(session);
    self.output = Some(path.to_path_buf());
    Ok(())
  }

  /// Encode one RGBA frame into the open session
  ///
  /// An error leaves the session open; the caller is expected to `end` it.
  pub fn supply(&mut self, rgba: &[u8]) -> CodecResult<usize> {
    self
      .session
      .as_mut()
      .ok_or(CodecError::NotConfigured)?
      .supply(rgba)
  }

  /// Finish the open session; does nothing when none is open
  ///
  /// The session's resources are released even when finishing fails.
  pub fn end(&mut self) -> CodecResult<()> {
    self.output = None;
    match self.session.take() {
      Some(session) => session.finish().map(|_| ()),
      None => Ok(()),
    }
  }

  /// Whether a session is open
  pub fn is_open(&self) -> bool {
    self.session.is_some()
  }

  /// Frames supplied to the open session (0 when closed)
  pub fn frames_supplied(&self) -> u64 {
    self
      .session
      .as_ref()
      .map(EncodeSession::frames_supplied)
      .unwrap_or(0)
  }

  /// Output path of the open session
  pub fn output(&self) -> Option<&Path> {
    self.output.as_deref()
  }

  /// Negotiated capabilities this slot encodes with
  pub fn capabilities(&self) -> &Capabilities {
    &self.capabilities
  }
}

impl Drop for Encoder {
  fn drop(&mut self) {
    if let Some(session) = self.session.take() {
      if let Err(e) = session.finish() {
        warn!(target: "avbridge::encode", error = %e, "failed to finalize encode session on drop");
      }
    }
  }
}

impl std::fmt::Debug for Encoder {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Encoder")
      .field("capabilities", &self.capabilities)
      .field("session", &self.session)
      .field("output", &self.output)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rgba_frame_len() {
    assert_eq!(rgba_frame_len(2, 3), 24);
    assert_eq!(rgba_frame_len(0, 100), 0);
    assert_eq!(rgba_frame_len(1920, 1080), 1920 * 1080 * 4);
  }
}
