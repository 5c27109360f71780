//! Clock-synchronized video playback
//!
//! A [`VideoPlayer`] follows a [`PlaybackClock`] and, on each tick, copies the
//! decoded frame due at the clock position into the back half of a double buffer.
//! [`swap_buffers`](VideoPlayer::swap_buffers) hands it to the consumer.
//!
//! Decoding sits behind the [`VideoSource`] trait; [`FfmpegVideoSource`] is the
//! implementation over a [`StreamReader`].

use super::reader::StreamReader;
use crate::codec::{
  CodecError, CodecResult, Frame, MediaSource, MediaType, ScaleAlgorithm, Scaler,
};
use crate::config::PlaybackConfig;
use crate::ffi::{AvLibrary, PixelFormat};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

// ============================================================================
// Frames
// ============================================================================

/// One 4:2:0 picture as three packed planes
#[derive(Clone, PartialEq, Eq)]
pub struct VideoFrame {
  width: u32,
  height: u32,
  y: Vec<u8>,
  u: Vec<u8>,
  v: Vec<u8>,
}

impl VideoFrame {
  /// Black frame; chroma planes are half size in each dimension
  pub fn new(width: u32, height: u32) -> Self {
    let (w, h) = (width as usize, height as usize);
    let chroma = (w / 2) * (h / 2);
    Self {
      width,
      height,
      y: vec![0; w * h],
      u: vec![128; chroma],
      v: vec![128; chroma],
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  /// Luma plane, `width` bytes per row
  pub fn y(&self) -> &[u8] {
    &self.y
  }

  /// Blue-difference chroma plane, `width / 2` bytes per row
  pub fn u(&self) -> &[u8] {
    &self.u
  }

  /// Red-difference chroma plane, `width / 2` bytes per row
  pub fn v(&self) -> &[u8] {
    &self.v
  }

  /// Mutable access to all three planes
  pub fn planes_mut(&mut self) -> (&mut [u8], &mut [u8], &mut [u8]) {
    (&mut self.y, &mut self.u, &mut self.v)
  }

  /// Copy a decoded YUV420P frame in, dropping any stride padding
  pub fn copy_from(&mut self, frame: &Frame) -> CodecResult<()> {
    let (w, h) = (self.width as usize, self.height as usize);
    let planes = [(0, w, h), (1, w / 2, h / 2), (2, w / 2, h / 2)];

    for (index, row_bytes, rows) in planes {
      let plane = frame
        .plane(index, rows)
        .ok_or_else(|| CodecError::InvalidState(format!("Frame has no plane {index}")))?;
      let dst = match index {
        0 => &mut self.y,
        1 => &mut self.u,
        _ => &mut self.v,
      };
      plane.copy_rows(row_bytes, rows, dst);
    }
    Ok(())
  }
}

impl std::fmt::Debug for VideoFrame {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("VideoFrame")
      .field("width", &self.width)
      .field("height", &self.height)
      .finish()
  }
}

/// Front/back pair; only the back frame is ever written
#[derive(Debug, Clone)]
pub struct DoubleBuffer {
  front: VideoFrame,
  back: VideoFrame,
  dirty: bool,
}

impl DoubleBuffer {
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      front: VideoFrame::new(width, height),
      back: VideoFrame::new(width, height),
      dirty: false,
    }
  }

  pub fn front(&self) -> &VideoFrame {
    &self.front
  }

  /// Write the back frame with `fill`
  ///
  /// The back frame only counts as a new picture if `fill` succeeds. A failed
  /// write leaves it partially overwritten, so it is dropped until the next
  /// successful fill.
  pub fn stage<F>(&mut self, fill: F) -> CodecResult<()>
  where
    F: FnOnce(&mut VideoFrame) -> CodecResult<()>,
  {
    match fill(&mut self.back) {
      Ok(()) => {
        self.dirty = true;
        Ok(())
      }
      Err(e) => {
        self.dirty = false;
        Err(e)
      }
    }
  }

  pub fn is_dirty(&self) -> bool {
    self.dirty
  }

  /// Exchange front and back if the back frame holds a new picture
  pub fn swap(&mut self) -> bool {
    if !self.dirty {
      return false;
    }
    std::mem::swap(&mut self.front, &mut self.back);
    self.dirty = false;
    true
  }
}

// ============================================================================
// Clock
// ============================================================================

/// Logical playback position driven by wall-clock ticks
#[derive(Debug, Clone)]
pub struct PlaybackClock {
  last_tick: Option<Instant>,
  position: f64,
  last_decoded: f64,
  playing: bool,
}

impl Default for PlaybackClock {
  fn default() -> Self {
    Self {
      last_tick: None,
      position: 0.0,
      last_decoded: 0.0,
      playing: true,
    }
  }
}

impl PlaybackClock {
  /// Advance by the time elapsed since the previous tick (not while paused)
  pub fn tick(&mut self, now: Instant) {
    if let Some(last) = self.last_tick {
      if self.playing {
        self.position += now.saturating_duration_since(last).as_secs_f64();
      }
    }
    self.last_tick = Some(now);
  }

  /// Logical position in seconds
  pub fn position(&self) -> f64 {
    self.position
  }

  pub fn set_position(&mut self, seconds: f64) {
    self.position = seconds.max(0.0);
  }

  /// Timestamp of the last frame handed to the back buffer
  pub fn last_decoded(&self) -> f64 {
    self.last_decoded
  }

  pub fn set_last_decoded(&mut self, seconds: f64) {
    self.last_decoded = seconds;
  }

  pub fn is_playing(&self) -> bool {
    self.playing
  }

  /// Resuming restarts elapsed-time measurement at the next tick
  pub fn set_playing(&mut self, playing: bool) {
    if playing && !self.playing {
      self.last_tick = None;
    }
    self.playing = playing;
  }
}

// ============================================================================
// Sources
// ============================================================================

/// Decoded video the player pulls from
pub trait VideoSource {
  /// Picture size of the stream
  fn dimensions(&self) -> (u32, u32);

  /// Declared duration in seconds (0 if unknown)
  fn duration(&self) -> f64;

  /// Start and end of the current frame in seconds, None when there is no frame
  fn frame_span(&self) -> Option<(f64, f64)>;

  /// Decode the next frame; `Ok(false)` at end of stream
  fn advance(&mut self) -> CodecResult<bool>;

  /// Jump to the keyframe at or before `seconds`, leaving no current frame
  fn seek(&mut self, seconds: f64) -> CodecResult<()>;

  /// Copy the current frame into `dst`
  fn copy_current(&mut self, dst: &mut VideoFrame) -> CodecResult<()>;
}

/// [`VideoSource`] over a [`StreamReader`], converting to YUV420P when needed
pub struct FfmpegVideoSource {
  lib: Arc<AvLibrary>,
  reader: StreamReader,
  scaler: Option<(Scaler, (u32, u32, i32))>,
  width: u32,
  height: u32,
}

impl FfmpegVideoSource {
  /// Open the first video stream of `source` and decode its first frame
  pub fn open(lib: &Arc<AvLibrary>, source: &MediaSource) -> CodecResult<Self> {
    let mut reader = StreamReader::open(lib, source, MediaType::Video)?;
    let info = reader.stream_info();
    let width = info.width.unwrap_or_else(|| reader.decoder().width());
    let height = info.height.unwrap_or_else(|| reader.decoder().height());
    if width == 0 || height == 0 {
      return Err(CodecError::InvalidConfig(format!(
        "Video stream has no picture size ({width}x{height})"
      )));
    }

    reader.read_frame()?;

    Ok(Self {
      lib: Arc::clone(lib),
      reader,
      scaler: None,
      width,
      height,
    })
  }

  /// Build the scaler for the current input, rebuilt when the input changes
  fn ensure_scaler(&mut self, frame_width: u32, frame_height: u32, format: i32) -> CodecResult<()> {
    let key = (frame_width, frame_height, format);
    if matches!(&self.scaler, Some((_, k)) if *k == key) {
      return Ok(());
    }
    debug!(target: "avbridge::stream", ?key, "converting video to YUV420P");
    let scaler = Scaler::new(
      &self.lib,
      frame_width,
      frame_height,
      format,
      self.width,
      self.height,
      PixelFormat::Yuv420p,
      ScaleAlgorithm::default(),
    )?;
    self.scaler = Some((scaler, key));
    Ok(())
  }
}

impl VideoSource for FfmpegVideoSource {
  fn dimensions(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  fn duration(&self) -> f64 {
    self.reader.duration()
  }

  fn frame_span(&self) -> Option<(f64, f64)> {
    self.reader.frame_span()
  }

  fn advance(&mut self) -> CodecResult<bool> {
    self.reader.read_frame()
  }

  fn seek(&mut self, seconds: f64) -> CodecResult<()> {
    self.reader.seek(seconds)
  }

  fn copy_current(&mut self, dst: &mut VideoFrame) -> CodecResult<()> {
    let (frame_width, frame_height, format, is_native) = {
      let frame = self
        .reader
        .frame()
        .ok_or_else(|| CodecError::InvalidState("No decoded frame".into()))?;
      (
        frame.width(),
        frame.height(),
        frame.raw_format(),
        frame.pixel_format() == Some(PixelFormat::Yuv420p),
      )
    };

    if is_native && frame_width == self.width && frame_height == self.height {
      if let Some(frame) = self.reader.frame() {
        return dst.copy_from(frame);
      }
    }

    self.ensure_scaler(frame_width, frame_height, format)?;
    let (Some((scaler, _)), Some(frame)) = (&self.scaler, self.reader.frame()) else {
      return Err(CodecError::InvalidState("No decoded frame".into()));
    };
    let converted = scaler.scale_alloc(frame)?;
    dst.copy_from(&converted)
  }
}

impl std::fmt::Debug for FfmpegVideoSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FfmpegVideoSource")
      .field("width", &self.width)
      .field("height", &self.height)
      .field("converting", &self.scaler.is_some())
      .finish()
  }
}

// ============================================================================
// Player
// ============================================================================

/// Double-buffered player following a wall-clock driven position
pub struct VideoPlayer<S: VideoSource> {
  source: S,
  config: PlaybackConfig,
  clock: PlaybackClock,
  buffers: DoubleBuffer,
  eos: bool,
}

impl<S: VideoSource> VideoPlayer<S> {
  pub fn new(source: S, config: PlaybackConfig) -> Self {
    let (width, height) = source.dimensions();
    let mut clock = PlaybackClock::default();
    // Presentation starts at 0 even when the first frame is stamped later
    clock.set_last_decoded(source.frame_span().map_or(0.0, |(start, _)| start.min(0.0)));
    let eos = source.frame_span().is_none();

    Self {
      source,
      config,
      clock,
      buffers: DoubleBuffer::new(width, height),
      eos,
    }
  }

  /// Tick using the current time
  pub fn fill_back_buffer(&mut self) -> bool {
    self.fill_back_buffer_at(Instant::now())
  }

  /// Advance the clock to `now` and stage the frame due at the new position
  ///
  /// Returns true if a new frame was copied into the back buffer. Decode errors
  /// end the stream.
  pub fn fill_back_buffer_at(&mut self, now: Instant) -> bool {
    match self.tick(now) {
      Ok(staged) => staged,
      Err(e) => {
        warn!(target: "avbridge::stream", error = %e, "video decode failed, treating as end of stream");
        self.eos = true;
        false
      }
    }
  }

  fn tick(&mut self, now: Instant) -> CodecResult<bool> {
    self.clock.tick(now);
    let position = self.clock.position();

    if position < self.clock.last_decoded() {
      debug!(target: "avbridge::stream", position, "rewinding");
      self.eos = false;
      self.seek_source(position)?;
      self.clock.set_last_decoded(position);
    }

    if self.eos {
      return Ok(false);
    }

    let Some((start, _)) = self.source.frame_span() else {
      self.eos = true;
      return Ok(false);
    };
    if start > position {
      return Ok(false);
    }

    let behind = position - start;
    if behind > self.config.large_seek_threshold.as_secs_f64() {
      debug!(target: "avbridge::stream", position, behind, "seeking to catch up");
      self.seek_source(position)?;
    } else if behind > self.config.small_seek_threshold.as_secs_f64() && !self.catch_up(position)? {
      self.eos = true;
    }
    if self.eos {
      return Ok(false);
    }

    let Some((start, _)) = self.source.frame_span() else {
      self.eos = true;
      return Ok(false);
    };
    let source = &mut self.source;
    self.buffers.stage(|back| source.copy_current(back))?;
    self.clock.set_last_decoded(start);

    if !self.source.advance()? {
      self.eos = true;
    }
    Ok(true)
  }

  /// Keyframe seek followed by decoding up to `position`
  fn seek_source(&mut self, position: f64) -> CodecResult<()> {
    self.source.seek(position)?;
    if !self.catch_up(position)? {
      self.eos = true;
    }
    Ok(())
  }

  /// Decode forward until the current frame ends at or after `position`
  fn catch_up(&mut self, position: f64) -> CodecResult<bool> {
    loop {
      if let Some((_, end)) = self.source.frame_span() {
        if end >= position {
          return Ok(true);
        }
      }
      if !self.source.advance()? {
        return Ok(false);
      }
    }
  }

  /// Hand the staged frame to the consumer; false if nothing new was staged
  pub fn swap_buffers(&mut self) -> bool {
    self.buffers.swap()
  }

  /// The frame currently presented
  pub fn front(&self) -> &VideoFrame {
    self.buffers.front()
  }

  pub fn play(&mut self) {
    self.clock.set_playing(true);
  }

  pub fn pause(&mut self) {
    self.clock.set_playing(false);
  }

  pub fn is_playing(&self) -> bool {
    self.clock.is_playing()
  }

  /// Move the playback position; the next tick decodes from there
  pub fn seek(&mut self, seconds: f64) {
    self.clock.set_position(seconds);
  }

  /// Playback position in seconds
  pub fn position(&self) -> f64 {
    self.clock.position()
  }

  pub fn is_eos(&self) -> bool {
    self.eos
  }

  pub fn dimensions(&self) -> (u32, u32) {
    self.source.dimensions()
  }

  pub fn duration(&self) -> f64 {
    self.source.duration()
  }

  pub fn source(&self) -> &S {
    &self.source
  }
}

impl<S: VideoSource> std::fmt::Debug for VideoPlayer<S> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("VideoPlayer")
      .field("clock", &self.clock)
      .field("dirty", &self.buffers.is_dirty())
      .field("eos", &self.eos)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  /// Constant frame rate source whose frames are filled with their index
  struct FakeSource {
    frame_rate: f64,
    frames: usize,
    /// Timestamp of frame 0
    first_start: f64,
    current: Option<usize>,
    seeks: Vec<f64>,
    decoded: usize,
    /// Frame whose copy writes garbage and then fails
    broken: Option<usize>,
  }

  impl FakeSource {
    fn new(frame_rate: f64, frames: usize) -> Self {
      Self {
        frame_rate,
        frames,
        first_start: 0.0,
        current: Some(0),
        seeks: Vec::new(),
        decoded: 1,
        broken: None,
      }
    }

    /// Keyframe every 10 frames
    fn keyframe_before(&self, seconds: f64) -> usize {
      let index = ((seconds - self.first_start) * self.frame_rate)
        .floor()
        .max(0.0) as usize;
      (index / 10) * 10
    }
  }

  impl VideoSource for FakeSource {
    fn dimensions(&self) -> (u32, u32) {
      (4, 2)
    }

    fn duration(&self) -> f64 {
      self.frames as f64 / self.frame_rate
    }

    fn frame_span(&self) -> Option<(f64, f64)> {
      self.current.map(|i| {
        let start = self.first_start + i as f64 / self.frame_rate;
        (start, start + 1.0 / self.frame_rate)
      })
    }

    fn advance(&mut self) -> CodecResult<bool> {
      let Some(current) = self.current else {
        return Ok(false);
      };
      let next = current + 1;
      if next >= self.frames {
        self.current = None;
        return Ok(false);
      }
      self.current = Some(next);
      self.decoded += 1;
      Ok(true)
    }

    fn seek(&mut self, seconds: f64) -> CodecResult<()> {
      self.seeks.push(seconds);
      let key = self.keyframe_before(seconds);
      self.current = (key < self.frames).then_some(key);
      self.decoded += 1;
      Ok(())
    }

    fn copy_current(&mut self, dst: &mut VideoFrame) -> CodecResult<()> {
      let index = self
        .current
        .ok_or_else(|| CodecError::InvalidState("no frame".into()))?;
      let (y, _, _) = dst.planes_mut();
      if self.broken == Some(index) {
        y[..4].fill(99);
        return Err(CodecError::InvalidState("truncated frame".into()));
      }
      y.fill(index as u8);
      Ok(())
    }
  }

  fn new_player(frames: usize) -> (VideoPlayer<FakeSource>, Instant) {
    let player = VideoPlayer::new(FakeSource::new(10.0, frames), PlaybackConfig::default());
    (player, Instant::now())
  }

  fn front_index(player: &VideoPlayer<FakeSource>) -> u8 {
    player.front().y()[0]
  }

  #[test]
  fn test_plane_sizes() {
    let frame = VideoFrame::new(6, 4);
    assert_eq!(frame.y().len(), 24);
    assert_eq!(frame.u().len(), 6);
    assert_eq!(frame.v().len(), 6);
  }

  #[test]
  fn test_double_buffer_swap() {
    let mut buffers = DoubleBuffer::new(2, 2);
    assert!(!buffers.swap());

    buffers
      .stage(|back| {
        back.planes_mut().0.fill(7);
        Ok(())
      })
      .unwrap();
    assert!(buffers.is_dirty());
    assert_eq!(buffers.front().y()[0], 0);

    assert!(buffers.swap());
    assert_eq!(buffers.front().y()[0], 7);
    assert!(!buffers.swap());
    assert_eq!(buffers.front().y()[0], 7);
  }

  #[test]
  fn test_clock_pause() {
    let start = Instant::now();
    let mut clock = PlaybackClock::default();
    clock.tick(start);
    clock.tick(start + Duration::from_millis(500));
    assert!((clock.position() - 0.5).abs() < 1e-9);

    clock.set_playing(false);
    clock.tick(start + Duration::from_secs(2));
    assert!((clock.position() - 0.5).abs() < 1e-9);

    // Time spent paused without ticks is not counted either
    clock.tick(start + Duration::from_secs(5));
    clock.set_playing(true);
    clock.tick(start + Duration::from_secs(9));
    assert!((clock.position() - 0.5).abs() < 1e-9);
    clock.tick(start + Duration::from_millis(9250));
    assert!((clock.position() - 0.75).abs() < 1e-9);
  }

  #[test]
  fn test_first_tick_presents_first_frame() {
    let (mut player, t0) = new_player(50);
    assert!(player.fill_back_buffer_at(t0));
    assert!(player.swap_buffers());
    assert_eq!(front_index(&player), 0);
  }

  #[test]
  fn test_swap_without_new_frame() {
    let (mut player, t0) = new_player(50);
    player.fill_back_buffer_at(t0);
    assert!(player.swap_buffers());

    // Frame 1 starts at 0.1s; not due yet
    assert!(!player.fill_back_buffer_at(t0 + Duration::from_millis(50)));
    assert!(!player.swap_buffers());
    assert!(!player.swap_buffers());
    assert_eq!(front_index(&player), 0);
  }

  #[test]
  fn test_frames_follow_clock() {
    let (mut player, t0) = new_player(50);
    player.fill_back_buffer_at(t0);
    player.swap_buffers();

    assert!(player.fill_back_buffer_at(t0 + Duration::from_millis(150)));
    assert!(player.swap_buffers());
    assert_eq!(front_index(&player), 1);

    assert!(player.fill_back_buffer_at(t0 + Duration::from_millis(250)));
    assert!(player.swap_buffers());
    assert_eq!(front_index(&player), 2);
  }

  #[test]
  fn test_small_drift_skips_frames_without_seeking() {
    let (mut player, t0) = new_player(50);
    player.fill_back_buffer_at(t0);

    // 1.05s: more than 0.2s behind frame 1
    assert!(player.fill_back_buffer_at(t0 + Duration::from_millis(1050)));
    player.swap_buffers();
    assert_eq!(front_index(&player), 10);
    assert!(player.source().seeks.is_empty());
  }

  #[test]
  fn test_large_drift_seeks() {
    let (mut player, t0) = new_player(400);
    player.fill_back_buffer_at(t0);

    assert!(player.fill_back_buffer_at(t0 + Duration::from_millis(20_050)));
    player.swap_buffers();
    let seeks = &player.source().seeks;
    assert_eq!(seeks.len(), 1);
    assert!((seeks[0] - 20.05).abs() < 1e-9);
    assert_eq!(front_index(&player), 200);
    // Keyframe plus nothing else: the seek landed exactly on frame 200
    assert!(player.source().decoded < 10);
  }

  #[test]
  fn test_rewind_via_seek() {
    let (mut player, t0) = new_player(100);
    player.fill_back_buffer_at(t0);
    assert!(player.fill_back_buffer_at(t0 + Duration::from_millis(3550)));
    player.swap_buffers();
    assert_eq!(front_index(&player), 35);
    assert!(player.source().seeks.is_empty());

    player.seek(1.25);
    assert!(player.fill_back_buffer_at(t0 + Duration::from_millis(3550)));
    player.swap_buffers();
    assert_eq!(player.source().seeks, vec![1.25]);
    assert_eq!(front_index(&player), 12);
  }

  #[test]
  fn test_end_of_stream() {
    let (mut player, t0) = new_player(3);
    for ms in [0, 150, 250] {
      assert!(player.fill_back_buffer_at(t0 + Duration::from_millis(ms)));
    }
    assert!(player.is_eos());
    assert!(!player.fill_back_buffer_at(t0 + Duration::from_secs(1)));

    // Catch-up past the end stops instead of looping
    let (mut player, t0) = new_player(5);
    player.fill_back_buffer_at(t0);
    assert!(!player.fill_back_buffer_at(t0 + Duration::from_secs(2)));
    assert!(player.is_eos());
  }

  #[test]
  fn test_rewind_clears_end_of_stream() {
    let (mut player, t0) = new_player(3);
    for ms in [0, 150, 250] {
      player.fill_back_buffer_at(t0 + Duration::from_millis(ms));
    }
    assert!(player.is_eos());

    player.seek(0.0);
    assert!(player.fill_back_buffer_at(t0 + Duration::from_millis(250)));
    assert!(!player.is_eos());
    player.swap_buffers();
    assert_eq!(front_index(&player), 0);
  }

  #[test]
  fn test_paused_player_holds_frame() {
    let (mut player, t0) = new_player(50);
    player.fill_back_buffer_at(t0);
    player.pause();
    assert!(!player.is_playing());
    assert!(!player.fill_back_buffer_at(t0 + Duration::from_secs(3)));
    assert_eq!(player.position(), 0.0);
  }

  #[test]
  fn test_failed_copy_is_never_presented() {
    let mut source = FakeSource::new(10.0, 50);
    source.broken = Some(2);
    let mut player = VideoPlayer::new(source, PlaybackConfig::default());
    let t0 = Instant::now();

    assert!(player.fill_back_buffer_at(t0));
    assert!(player.swap_buffers());
    // Frame 1 is staged but not swapped before frame 2 fails to copy
    assert!(player.fill_back_buffer_at(t0 + Duration::from_millis(150)));

    assert!(!player.fill_back_buffer_at(t0 + Duration::from_millis(250)));
    assert!(player.is_eos());
    assert!(!player.swap_buffers());
    assert_eq!(front_index(&player), 0);
    assert!(player.front().y().iter().all(|&luma| luma == 0));
  }

  #[test]
  fn test_failed_stage_clears_pending_frame() {
    let mut buffers = DoubleBuffer::new(2, 2);
    buffers
      .stage(|back| {
        back.planes_mut().0.fill(5);
        Ok(())
      })
      .unwrap();

    let failed = buffers.stage(|back| {
      back.planes_mut().0[0] = 99;
      Err(CodecError::InvalidState("short read".into()))
    });
    assert!(failed.is_err());
    assert!(!buffers.is_dirty());
    assert!(!buffers.swap());
    assert_eq!(buffers.front().y()[0], 0);
  }

  #[test]
  fn test_late_first_frame_waits_for_clock() {
    let mut source = FakeSource::new(10.0, 50);
    source.first_start = 1.4;
    let mut player = VideoPlayer::new(source, PlaybackConfig::default());
    let t0 = Instant::now();

    assert!(!player.fill_back_buffer_at(t0));
    assert!(!player.fill_back_buffer_at(t0 + Duration::from_millis(500)));
    assert!(!player.swap_buffers());
    assert!(!player.is_eos());

    assert!(player.fill_back_buffer_at(t0 + Duration::from_millis(1450)));
    assert!(player.swap_buffers());
    assert_eq!(front_index(&player), 0);
    assert!(player.source().seeks.is_empty());
    assert_eq!(player.source().decoded, 1);
  }
}
