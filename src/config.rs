//! Runtime configuration
//!
//! [`BindingConfig`] controls where FFmpeg is loaded from and how capabilities
//! are negotiated; [`PlaybackConfig`] holds the video player's seek thresholds.
//! Both have sensible defaults, and `BindingConfig` can be overridden from the
//! environment.

use crate::capability::DEFAULT_ENCODER_PREFERENCE;
use crate::ffi::{loader::split_search_path, log_level};
use std::os::raw::c_int;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Extra directories searched for the FFmpeg libraries (platform path list)
pub const ENV_LIBRARY_PATH: &str = "AVBRIDGE_LIBRARY_PATH";

/// FFmpeg's own log level (`quiet`, `error`, `info`, ...)
pub const ENV_LOG_LEVEL: &str = "AVBRIDGE_LOG_LEVEL";

/// Container probed during capability negotiation
pub const DEFAULT_CONTAINER: &str = "matroska";

/// FFmpeg log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
  Quiet,
  Panic,
  Fatal,
  #[default]
  Error,
  Warning,
  Info,
  Verbose,
  Debug,
  Trace,
}

impl LogLevel {
  /// Value passed to `av_log_set_level`
  pub fn as_raw(self) -> c_int {
    match self {
      LogLevel::Quiet => log_level::QUIET,
      LogLevel::Panic => log_level::PANIC,
      LogLevel::Fatal => log_level::FATAL,
      LogLevel::Error => log_level::ERROR,
      LogLevel::Warning => log_level::WARNING,
      LogLevel::Info => log_level::INFO,
      LogLevel::Verbose => log_level::VERBOSE,
      LogLevel::Debug => log_level::DEBUG,
      LogLevel::Trace => log_level::TRACE,
    }
  }
}

impl FromStr for LogLevel {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "quiet" => Ok(LogLevel::Quiet),
      "panic" => Ok(LogLevel::Panic),
      "fatal" => Ok(LogLevel::Fatal),
      "error" => Ok(LogLevel::Error),
      "warning" | "warn" => Ok(LogLevel::Warning),
      "info" => Ok(LogLevel::Info),
      "verbose" => Ok(LogLevel::Verbose),
      "debug" => Ok(LogLevel::Debug),
      "trace" => Ok(LogLevel::Trace),
      other => Err(format!("unknown FFmpeg log level: {other}")),
    }
  }
}

/// How the FFmpeg binding is brought up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingConfig {
  /// Directories tried before the platform library search path
  pub search_dirs: Vec<PathBuf>,
  /// Encoder names in order of preference; the first one FFmpeg knows is used
  pub encoder_preference: Vec<String>,
  /// Container format that must be available for encoding
  pub container: String,
  /// Log level applied to FFmpeg once it is loaded
  pub ffmpeg_log_level: LogLevel,
}

impl Default for BindingConfig {
  fn default() -> Self {
    Self {
      search_dirs: Vec::new(),
      encoder_preference: DEFAULT_ENCODER_PREFERENCE
        .iter()
        .map(|name| name.to_string())
        .collect(),
      container: DEFAULT_CONTAINER.to_string(),
      ffmpeg_log_level: LogLevel::default(),
    }
  }
}

impl BindingConfig {
  /// Defaults, overridden by `AVBRIDGE_LIBRARY_PATH` and `AVBRIDGE_LOG_LEVEL`
  pub fn from_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let mut config = Self::default();

    if let Some(value) = lookup(ENV_LIBRARY_PATH) {
      config.search_dirs = split_search_path(&value);
    }

    if let Some(value) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
      match value.parse() {
        Ok(level) => config.ffmpeg_log_level = level,
        Err(e) => warn!(target: "avbridge", "{e}, keeping {:?}", config.ffmpeg_log_level),
      }
    }

    config
  }

  /// Add a directory searched before the platform search path
  pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.search_dirs.push(dir.into());
    self
  }

  /// Replace the encoder preference list
  pub fn with_encoders<I, S>(mut self, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.encoder_preference = names.into_iter().map(Into::into).collect();
    self
  }
}

/// Thresholds used by the video player to decide how to catch up with its clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
  /// Drift beyond which the player seeks instead of decoding forward
  pub large_seek_threshold: Duration,
  /// Drift beyond which the player decodes forward without presenting
  pub small_seek_threshold: Duration,
}

impl Default for PlaybackConfig {
  fn default() -> Self {
    Self {
      large_seek_threshold: Duration::from_secs(15),
      small_seek_threshold: Duration::from_millis(200),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    move |key| map.get(key).cloned()
  }

  #[test]
  fn test_defaults() {
    let config = BindingConfig::default();
    assert!(config.search_dirs.is_empty());
    assert_eq!(config.container, "matroska");
    assert_eq!(config.encoder_preference[0], "libx264rgb");
    assert_eq!(config.encoder_preference.last().map(String::as_str), Some("mpeg4"));
    assert_eq!(config.ffmpeg_log_level, LogLevel::Error);
  }

  #[test]
  fn test_env_overrides() {
    #[cfg(unix)]
    let path = "/opt/ffmpeg/lib:/usr/local/lib";
    #[cfg(windows)]
    let path = "C:\\ffmpeg\\bin;D:\\libs";

    let config = BindingConfig::from_lookup(lookup(&[
      (ENV_LIBRARY_PATH, path),
      (ENV_LOG_LEVEL, "Debug"),
    ]));
    assert_eq!(config.search_dirs.len(), 2);
    assert_eq!(config.ffmpeg_log_level, LogLevel::Debug);
  }

  #[test]
  fn test_bad_log_level_keeps_default() {
    let config = BindingConfig::from_lookup(lookup(&[(ENV_LOG_LEVEL, "loud")]));
    assert_eq!(config.ffmpeg_log_level, LogLevel::Error);
    assert!(config.search_dirs.is_empty());
  }

  #[test]
  fn test_log_level_values() {
    assert_eq!(LogLevel::Quiet.as_raw(), -8);
    assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warning));
    assert!("".parse::<LogLevel>().is_err());
  }

  #[test]
  fn test_builders() {
    let config = BindingConfig::default()
      .with_search_dir("/tmp/ffmpeg")
      .with_encoders(["png"]);
    assert_eq!(config.search_dirs, vec![PathBuf::from("/tmp/ffmpeg")]);
    assert_eq!(config.encoder_preference, vec!["png".to_string()]);
  }

  #[test]
  fn test_playback_thresholds() {
    let playback = PlaybackConfig::default();
    assert_eq!(playback.large_seek_threshold.as_secs_f64(), 15.0);
    assert!((playback.small_seek_threshold.as_secs_f64() - 0.2).abs() < 1e-9);
  }
}
