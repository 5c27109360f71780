//! End-to-end tests against the FFmpeg found on this machine
//!
//! FFmpeg is located the same way the crate does at runtime (platform search
//! path, plus `AVBRIDGE_LIBRARY_PATH`). When it cannot be loaded every test
//! returns early with a notice instead of failing.
//!
//! ```bash
//! RUST_LOG=avbridge=debug cargo test --test pipelines -- --nocapture
//! ```

use avbridge::codec::MediaType;
use avbridge::{Binding, BindingConfig, Capabilities, CodecError, Encoder, MediaSource};
use std::f64::consts::PI;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: u32 = 8000;
const TONE_SAMPLES: usize = SAMPLE_RATE as usize;

fn binding() -> Option<Binding> {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();

  match Binding::load(BindingConfig::from_env()) {
    Ok(binding) => Some(binding),
    Err(e) => {
      eprintln!("skipping: FFmpeg not available ({e})");
      None
    }
  }
}

/// Binding that can also encode
fn encoding_binding() -> Option<Binding> {
  let binding = binding()?;
  if !binding.capabilities().is_supported() {
    eprintln!("skipping: no usable encoder/container ({:?})", binding.capabilities());
    return None;
  }
  Some(binding)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
  let mut out = Vec::with_capacity(body.len() + 9);
  out.extend_from_slice(id);
  out.extend_from_slice(&(body.len() as u32).to_le_bytes());
  out.extend_from_slice(body);
  if body.len() % 2 == 1 {
    out.push(0);
  }
  out
}

/// One second of a 440 Hz mono tone as little-endian 16-bit samples
fn tone_pcm() -> Vec<u8> {
  (0..TONE_SAMPLES)
    .map(|i| {
      let t = i as f64 / SAMPLE_RATE as f64;
      ((2.0 * PI * 440.0 * t).sin() * 12_000.0) as i16
    })
    .flat_map(i16::to_le_bytes)
    .collect()
}

/// One second of a 440 Hz mono tone, 16-bit PCM, tagged through a LIST/INFO chunk
fn tone_wav() -> Vec<u8> {
  let mut fmt = Vec::new();
  fmt.extend_from_slice(&1u16.to_le_bytes()); // PCM
  fmt.extend_from_slice(&1u16.to_le_bytes()); // mono
  fmt.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
  fmt.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
  fmt.extend_from_slice(&2u16.to_le_bytes());
  fmt.extend_from_slice(&16u16.to_le_bytes());

  let mut info = b"INFO".to_vec();
  info.extend(chunk(b"INAM", b"Test Tone\0"));
  info.extend(chunk(b"IART", b"Synth\0"));

  let data = tone_pcm();

  let mut body = b"WAVE".to_vec();
  body.extend(chunk(b"fmt ", &fmt));
  body.extend(chunk(b"LIST", &info));
  body.extend(chunk(b"data", &data));
  chunk(b"RIFF", &body)
}

fn list(kind: &[u8; 4], chunks: &[Vec<u8>]) -> Vec<u8> {
  let mut body = kind.to_vec();
  for c in chunks {
    body.extend_from_slice(c);
  }
  chunk(b"LIST", &body)
}

fn dwords(values: &[u32]) -> Vec<u8> {
  values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// `strh` body: type, handler, flags, priority/language, initial frames,
/// scale, rate, start, length, buffer size, quality, sample size, frame rect
fn stream_header(kind: &[u8; 4], scale: u32, rate: u32, length: u32, sample_size: u32) -> Vec<u8> {
  let mut strh = kind.to_vec();
  strh.extend(dwords(&[0, 0, 0, 0, scale, rate, 0, length, 0, 0, sample_size]));
  strh.extend_from_slice(&[0; 8]);
  chunk(b"strh", &strh)
}

/// AVI holding the mono tone and one solid red 8x8 picture (uncompressed BGR)
fn tone_with_picture_avi() -> Vec<u8> {
  const SIDE: u32 = 8;
  let picture: Vec<u8> = [0u8, 0, 255].repeat((SIDE * SIDE) as usize);

  let avih = chunk(
    b"avih",
    &dwords(&[100_000, 0, 0, 0, 1, 0, 2, 0, SIDE, SIDE, 0, 0, 0, 0]),
  );

  let mut bitmap = dwords(&[40, SIDE, SIDE]);
  bitmap.extend_from_slice(&1u16.to_le_bytes());
  bitmap.extend_from_slice(&24u16.to_le_bytes());
  bitmap.extend(dwords(&[0, picture.len() as u32, 0, 0, 0, 0]));
  let video = list(
    b"strl",
    &[stream_header(b"vids", 1, 10, 1, 0), chunk(b"strf", &bitmap)],
  );

  let mut wave = Vec::new();
  wave.extend_from_slice(&1u16.to_le_bytes());
  wave.extend_from_slice(&1u16.to_le_bytes());
  wave.extend(dwords(&[SAMPLE_RATE, SAMPLE_RATE * 2]));
  wave.extend_from_slice(&2u16.to_le_bytes());
  wave.extend_from_slice(&16u16.to_le_bytes());
  let audio = list(
    b"strl",
    &[
      stream_header(b"auds", 2, SAMPLE_RATE * 2, TONE_SAMPLES as u32, 2),
      chunk(b"strf", &wave),
    ],
  );

  let header = list(b"hdrl", &[avih, video, audio]);
  let movi = list(b"movi", &[chunk(b"00db", &picture), chunk(b"01wb", &tone_pcm())]);

  let mut body = b"AVI ".to_vec();
  body.extend(header);
  body.extend(movi);
  chunk(b"RIFF", &body)
}

/// Solid frame whose colour depends on `index`
fn rgba_frame(width: u32, height: u32, index: usize) -> Vec<u8> {
  let shade = (index * 20 % 256) as u8;
  [shade, 255 - shade, 64, 255].repeat(width as usize * height as usize)
}

fn encode_clip(binding: &Binding, path: &Path, frames: usize) {
  let mut encoder = binding.encoder();
  encoder.start(path, 64, 48, 10).expect("start session");
  for i in 0..frames {
    encoder.supply(&rgba_frame(64, 48, i)).expect("supply frame");
  }
  assert_eq!(encoder.frames_supplied(), frames as u64);
  encoder.end().expect("end session");
  assert!(!encoder.is_open());
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

#[test]
fn test_encode_then_decode_frame_count() {
  let Some(binding) = encoding_binding() else {
    return;
  };
  let dir = tempdir().expect("tempdir");
  let path = dir.path().join("clip.mkv");

  encode_clip(&binding, &path, 10);
  assert!(path.metadata().expect("output written").len() > 0);

  let mut reader = binding
    .open_stream(path.as_path(), MediaType::Video)
    .expect("open encoded clip");
  let mut decoded = 0;
  while reader.read_frame().expect("decode") {
    decoded += 1;
  }
  assert_eq!(decoded, 10);
}

#[test]
fn test_second_session_is_rejected() {
  let Some(binding) = encoding_binding() else {
    return;
  };
  let dir = tempdir().expect("tempdir");

  let mut encoder = binding.encoder();
  encoder.start(dir.path().join("a.mkv"), 32, 32, 25).expect("first session");
  let second = encoder.start(dir.path().join("b.mkv"), 32, 32, 25);
  assert!(matches!(second, Err(CodecError::SessionActive)));
  assert!(!dir.path().join("b.mkv").exists());

  // The open session is untouched
  assert_eq!(encoder.output(), Some(dir.path().join("a.mkv").as_path()));
  encoder.supply(&rgba_frame(32, 32, 0)).expect("supply");
  encoder.end().expect("end");

  // Ending twice is harmless and a new session can start
  encoder.end().expect("end again");
  encoder.start(dir.path().join("b.mkv"), 32, 32, 25).expect("new session");
}

#[test]
fn test_wrong_frame_size_keeps_session_open() {
  let Some(binding) = encoding_binding() else {
    return;
  };
  let dir = tempdir().expect("tempdir");

  let mut encoder = binding.encoder();
  encoder.start(dir.path().join("c.mkv"), 16, 16, 30).expect("start");
  let result = encoder.supply(&[0u8; 10]);
  assert!(matches!(result, Err(CodecError::InvalidConfig(_))));
  assert!(encoder.is_open());
  assert_eq!(encoder.frames_supplied(), 0);
}

#[test]
fn test_supply_without_session() {
  let Some(binding) = binding() else {
    return;
  };
  let mut encoder = binding.encoder();
  assert!(matches!(encoder.supply(&[]), Err(CodecError::NotConfigured)));
  encoder.end().expect("end without session");
}

#[test]
fn test_unsupported_encoder_refuses_to_start() {
  let Some(binding) = binding() else {
    return;
  };
  let dir = tempdir().expect("tempdir");
  let path = dir.path().join("never.mkv");

  let mut encoder = Encoder::new(Arc::clone(binding.library()), Capabilities::new(None, true));
  assert!(matches!(encoder.start(&path, 16, 16, 30), Err(CodecError::Unsupported)));
  assert!(!path.exists());
}

#[test]
fn test_failed_setup_removes_output() {
  let Some(binding) = encoding_binding() else {
    return;
  };
  let dir = tempdir().expect("tempdir");
  let path = dir.path().join("zero.mkv");

  let mut encoder = binding.encoder();
  assert!(encoder.start(&path, 0, 48, 10).is_err());
  assert!(!encoder.is_open());
  assert!(!path.exists());
}

// ---------------------------------------------------------------------------
// Bulk audio decode
// ---------------------------------------------------------------------------

#[test]
fn test_load_wav_file() {
  let Some(binding) = binding() else {
    return;
  };
  let dir = tempdir().expect("tempdir");
  let path = dir.path().join("tone.wav");
  std::fs::write(&path, tone_wav()).expect("write fixture");

  let info = binding.load_audio_file(path.as_path()).expect("decode wav");
  assert_eq!(info.sample_rate, SAMPLE_RATE);
  assert_eq!(info.channels, 2);
  assert_eq!(info.sample_count(), TONE_SAMPLES);
  assert_eq!(info.tag("title"), Some("Test Tone"));
  assert_eq!(info.tag("artist"), Some("Synth"));
  assert!(info.cover_art.is_none());

  // Mono is duplicated into both channels
  let frame = &info.pcm[200..202];
  assert_eq!(frame[0], frame[1]);
}

#[test]
fn test_load_from_memory() {
  let Some(binding) = binding() else {
    return;
  };
  let source = MediaSource::from(tone_wav());

  let info = binding.load_audio_file(source).expect("decode in-memory wav");
  assert_eq!(info.sample_count(), TONE_SAMPLES);
  assert_eq!(info.tag("TITLE"), Some("Test Tone"));
}

#[test]
fn test_load_missing_file() {
  let Some(binding) = binding() else {
    return;
  };
  let dir = tempdir().expect("tempdir");
  assert!(binding.load_audio_file(dir.path().join("absent.wav").as_path()).is_err());
}

#[test]
fn test_video_only_file_has_no_audio() {
  let Some(binding) = encoding_binding() else {
    return;
  };
  let dir = tempdir().expect("tempdir");
  let path = dir.path().join("silent.mkv");
  encode_clip(&binding, &path, 3);

  let result = binding.load_audio_file(path.as_path());
  assert!(matches!(result, Err(CodecError::StreamNotFound(MediaType::Audio))));
  assert!(matches!(
    binding.open_audio(path.as_path()),
    Err(CodecError::StreamNotFound(MediaType::Audio))
  ));
}

#[test]
fn test_video_stream_becomes_cover_art() {
  let Some(binding) = binding() else {
    return;
  };
  let dir = tempdir().expect("tempdir");
  let path = dir.path().join("tone.avi");
  std::fs::write(&path, tone_with_picture_avi()).expect("write fixture");

  let info = binding.load_audio_file(path.as_path()).expect("decode avi");
  assert_eq!(info.sample_rate, SAMPLE_RATE);
  assert_eq!(info.sample_count(), TONE_SAMPLES);

  let cover = info.cover_art.expect("picture kept as cover art");
  assert_eq!((cover.width, cover.height), (8, 8));
  assert_eq!(cover.rgba.len(), 8 * 8 * 4);
  for pixel in cover.rgba.chunks_exact(4) {
    assert_eq!(pixel, [255, 0, 0, 255]);
  }
}

#[test]
fn test_bulk_decode_keeps_every_sample() {
  let Some(binding) = binding() else {
    return;
  };
  let info = binding.load_audio_file(tone_wav()).expect("decode wav");

  let mut reader = binding
    .open_stream(tone_wav(), MediaType::Audio)
    .expect("open reader");
  let mut decoded = 0;
  while reader.read_frame().expect("decode") {
    decoded += reader.frame().expect("current frame").nb_samples();
  }
  assert_eq!(info.sample_count(), decoded);

  // The streaming path hands out the very same PCM
  let mut stream = binding.open_audio(tone_wav()).expect("open stream");
  let mut streamed = Vec::new();
  let mut buf = [0u8; 1000];
  loop {
    let n = stream.decode(&mut buf);
    if n == 0 {
      break;
    }
    streamed.extend(
      buf[..n]
        .chunks_exact(2)
        .map(|b| i16::from_ne_bytes([b[0], b[1]])),
    );
  }
  assert_eq!(streamed, info.pcm);
}

#[test]
fn test_shared_binding_is_loaded_once() {
  let first = Binding::shared();
  let second = Binding::shared();
  match (first, second) {
    (Some(a), Some(b)) => {
      assert!(std::ptr::eq(a, b));
      assert!(Arc::ptr_eq(a.library(), b.library()));
    }
    (None, None) => eprintln!("skipping: FFmpeg not available"),
    _ => panic!("shared binding changed between calls"),
  }
  assert_eq!(avbridge::is_supported(), avbridge::is_supported());
  assert_eq!(
    avbridge::is_supported(),
    first.is_some_and(|b| b.capabilities().is_supported())
  );
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

fn drain(stream: &mut avbridge::AudioStream) -> usize {
  let mut buf = vec![0u8; 16 * 1024];
  let mut total = 0;
  loop {
    let n = stream.decode(&mut buf);
    if n == 0 {
      return total;
    }
    assert_eq!(n % 4, 0, "whole stereo samples only");
    total += n;
  }
}

#[test]
fn test_stream_audio_totals() {
  let Some(binding) = binding() else {
    return;
  };
  let mut stream = binding.open_audio(tone_wav()).expect("open stream");
  assert_eq!(stream.sample_rate(), SAMPLE_RATE);
  assert_eq!(stream.channels(), 2);
  assert_eq!(stream.bit_depth(), 16);
  assert!((stream.duration() - 1.0).abs() < 0.01);

  assert_eq!(drain(&mut stream), TONE_SAMPLES * 4);
  assert!(stream.is_eof());
  assert_eq!(stream.decode(&mut [0u8; 64]), 0);

  stream.rewind().expect("rewind");
  assert!(!stream.is_eof());
  assert_eq!(drain(&mut stream), TONE_SAMPLES * 4);
}

#[test]
fn test_stream_audio_seek() {
  let Some(binding) = binding() else {
    return;
  };
  let mut stream = binding.open_audio(tone_wav()).expect("open stream");

  stream.seek(0.5).expect("seek");
  let rest = drain(&mut stream);
  let half = TONE_SAMPLES * 4 / 2;
  assert!(rest >= half, "{rest} bytes after seeking to the middle");
  assert!(rest < TONE_SAMPLES * 4);

  // Seeking just short of the end still yields the final frame
  stream.seek(0.999).expect("seek near end");
  assert!(!stream.is_eof());
  let tail = drain(&mut stream);
  assert!(tail > 0 && tail <= rest);
}

#[test]
fn test_seek_discards_undelivered_samples() {
  let Some(binding) = binding() else {
    return;
  };
  let reference = binding.load_audio_file(tone_wav()).expect("decode wav").pcm;

  let mut reader = binding
    .open_stream(tone_wav(), MediaType::Audio)
    .expect("open reader");
  reader.seek(0.5).expect("seek reader");
  assert!(reader.skip_to(0.5).expect("skip"));
  let (start, _) = reader.frame_span().expect("frame at 0.5s");
  let offset = (start * SAMPLE_RATE as f64).round() as usize * 2;

  // Leave most of the first frame undelivered before seeking
  let mut stream = binding.open_audio(tone_wav()).expect("open stream");
  let mut buf = [0u8; 402];
  for _ in 0..3 {
    assert_eq!(stream.decode(&mut buf), 400);
  }

  stream.seek(0.5).expect("seek stream");
  assert_eq!(stream.decode(&mut buf), 400);
  let samples: Vec<i16> = buf[..400]
    .chunks_exact(2)
    .map(|b| i16::from_ne_bytes([b[0], b[1]]))
    .collect();
  assert_eq!(samples, reference[offset..offset + 200]);
}

#[test]
fn test_small_output_buffer() {
  let Some(binding) = binding() else {
    return;
  };
  let mut stream = binding.open_audio(tone_wav()).expect("open stream");

  let mut buf = [0u8; 402];
  let mut total = 0;
  loop {
    let n = stream.decode(&mut buf);
    if n == 0 {
      break;
    }
    assert!(n <= 400);
    total += n;
  }
  assert_eq!(total, TONE_SAMPLES * 4);
}

#[test]
fn test_video_player_presents_encoded_clip() {
  let Some(binding) = encoding_binding() else {
    return;
  };
  let dir = tempdir().expect("tempdir");
  let path = dir.path().join("play.mkv");
  encode_clip(&binding, &path, 5);

  let mut player = binding.open_video(path.as_path()).expect("open player");
  assert_eq!(player.dimensions(), (64, 48));
  assert!(player.is_playing());

  assert!(player.fill_back_buffer());
  assert!(player.swap_buffers());
  assert!(!player.swap_buffers());

  let front = player.front();
  assert_eq!(front.y().len(), 64 * 48);
  assert_eq!(front.u().len(), 32 * 24);
  assert!(front.y().iter().any(|&b| b != 0));

  // Seek past the end
  player.seek(60.0);
  assert!(!player.fill_back_buffer());
  assert!(player.is_eos());
}

#[test]
fn test_reader_seek_lands_on_keyframe_then_skips_forward() {
  let Some(binding) = encoding_binding() else {
    return;
  };
  let dir = tempdir().expect("tempdir");
  let path = dir.path().join("seek.mkv");
  encode_clip(&binding, &path, 30);

  let mut reader = binding
    .open_stream(path.as_path(), MediaType::Video)
    .expect("open encoded clip");
  let target = 1.45;

  reader.seek(target).expect("seek");
  assert!(reader.read_frame().expect("decode after seek"));
  let (keyframe, _) = reader.frame_span().expect("frame after seek");
  assert!(keyframe <= target + 1e-6, "seek landed at {keyframe}");

  assert!(reader.skip_to(target).expect("skip"));
  let (start, end) = reader.frame_span().expect("frame at target");
  assert!(end >= target, "stopped at {start}..{end}");
  assert!(start <= 1.5 + 1e-6, "skipped past the target: {start}");

  // Back to the beginning
  reader.seek(0.0).expect("seek to start");
  assert!(reader.read_frame().expect("decode first frame"));
  assert!(reader.frame_span().expect("first frame").0.abs() < 1e-6);
}
