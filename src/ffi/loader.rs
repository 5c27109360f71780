//! Locating and loading the FFmpeg shared libraries
//!
//! The five FFmpeg modules are opened with `libloading` in dependency order,
//! trying a fixed list of platform filename patterns for each. Once all are open,
//! the entry points are resolved into [`AvFunctions`] and each module's runtime
//! version is checked against the headers the accessor library was built with.

use super::accessors;
use super::error::{FFmpegError, FFmpegResult};
use super::symbols::AvFunctions;
use super::types::{av_version_major, av_version_int};
use libloading::Library;
use std::fmt;
use std::os::raw::c_int;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Errors
// ============================================================================

/// Failure to bring up the FFmpeg libraries
#[derive(Debug, Clone, Error)]
pub enum LoadError {
  /// None of the candidate filenames for a module could be opened
  #[error("{module}: no loadable library found ({tried} candidates tried, last error: {reason})")]
  LibraryNotFound {
    module: &'static str,
    tried: usize,
    reason: String,
  },

  /// A module was opened but does not export a required entry point
  #[error("missing FFmpeg symbol {symbol}: {reason}")]
  SymbolNotFound { symbol: &'static str, reason: String },

  /// The runtime library is older than the headers the binding was built against
  #[error("{module} {found} is older than the required {required}")]
  VersionMismatch {
    module: &'static str,
    found: Version,
    required: Version,
  },
}

// ============================================================================
// Versions / Modules
// ============================================================================

/// Decoded `AV_VERSION_INT`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(pub u32);

impl Version {
  pub const fn new(major: u32, minor: u32, micro: u32) -> Self {
    Self(av_version_int(major, minor, micro))
  }

  pub const fn major(self) -> u32 {
    av_version_major(self.0)
  }

  pub const fn minor(self) -> u32 {
    (self.0 >> 8) & 0xff
  }

  pub const fn micro(self) -> u32 {
    self.0 & 0xff
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}", self.major(), self.minor(), self.micro())
  }
}

/// One of the five FFmpeg libraries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Module {
  Avutil,
  Swresample,
  Avcodec,
  Avformat,
  Swscale,
}

impl Module {
  /// Dependency order: each module only depends on modules before it
  pub const LOAD_ORDER: [Module; 5] = [
    Module::Avutil,
    Module::Swresample,
    Module::Avcodec,
    Module::Avformat,
    Module::Swscale,
  ];

  /// Library base name, without `lib` prefix or extension
  pub fn name(self) -> &'static str {
    match self {
      Module::Avutil => "avutil",
      Module::Swresample => "swresample",
      Module::Avcodec => "avcodec",
      Module::Avformat => "avformat",
      Module::Swscale => "swscale",
    }
  }

  /// Version of the headers the accessor library was compiled against
  pub fn header_version(self) -> Version {
    let raw = unsafe {
      match self {
        Module::Avutil => accessors::ffver_avutil(),
        Module::Swresample => accessors::ffver_swresample(),
        Module::Avcodec => accessors::ffver_avcodec(),
        Module::Avformat => accessors::ffver_avformat(),
        Module::Swscale => accessors::ffver_swscale(),
      }
    };
    Version(raw)
  }

  /// Version reported by the loaded library
  pub fn runtime_version(self, api: &AvFunctions) -> Version {
    let raw = unsafe {
      match self {
        Module::Avutil => (api.avutil_version)(),
        Module::Swresample => (api.swresample_version)(),
        Module::Avcodec => (api.avcodec_version)(),
        Module::Avformat => (api.avformat_version)(),
        Module::Swscale => (api.swscale_version)(),
      }
    };
    Version(raw)
  }
}

/// Candidate filenames for a module, in the order they are tried
///
/// Covers Windows (`avcodec-60.dll`), Linux (`libavcodec.so.60`) and macOS
/// (`libavcodec.60.dylib`) naming, plus a few packaging variants.
pub fn candidate_filenames(name: &str, major: u32) -> Vec<String> {
  vec![
    format!("{name}-{major}"),
    format!("{name}.{major}"),
    format!("lib{name}-{major}.so"),
    format!("lib{name}.{major}.so"),
    format!("lib{name}.so.{major}"),
    format!("lib{name}-{major}.dylib"),
    format!("lib{name}.{major}.dylib"),
    format!("lib{name}.dylib.{major}"),
  ]
}

/// Candidate paths: every filename inside each search directory, then bare
/// filenames left to the platform loader's search path
pub fn candidate_paths(name: &str, major: u32, search_dirs: &[PathBuf]) -> Vec<PathBuf> {
  let filenames = candidate_filenames(name, major);
  let mut paths = Vec::with_capacity(filenames.len() * (search_dirs.len() + 1));
  for dir in search_dirs {
    paths.extend(filenames.iter().map(|file| dir.join(file)));
  }
  paths.extend(filenames.into_iter().map(PathBuf::from));
  paths
}

fn open_module(module: Module, search_dirs: &[PathBuf]) -> Result<Library, LoadError> {
  let major = module.header_version().major();
  let candidates = candidate_paths(module.name(), major, search_dirs);
  let mut last_error = String::from("no candidates");

  for path in &candidates {
    // SAFETY: loading an FFmpeg library runs only its (side-effect free) initializers.
    match unsafe { Library::new(path) } {
      Ok(lib) => {
        debug!(target: "avbridge", module = module.name(), path = %path.display(), "opened FFmpeg module");
        return Ok(lib);
      }
      Err(e) => last_error = e.to_string(),
    }
  }

  Err(LoadError::LibraryNotFound {
    module: module.name(),
    tried: candidates.len(),
    reason: last_error,
  })
}

// ============================================================================
// Loaded Library
// ============================================================================

/// The opened FFmpeg modules, kept alive for as long as any entry point is used
pub(crate) struct Modules {
  pub(crate) avutil: Library,
  pub(crate) swresample: Library,
  pub(crate) avcodec: Library,
  pub(crate) avformat: Library,
  pub(crate) swscale: Library,
}

impl Modules {
  fn open(search_dirs: &[PathBuf]) -> Result<Self, LoadError> {
    Ok(Self {
      avutil: open_module(Module::Avutil, search_dirs)?,
      swresample: open_module(Module::Swresample, search_dirs)?,
      avcodec: open_module(Module::Avcodec, search_dirs)?,
      avformat: open_module(Module::Avformat, search_dirs)?,
      swscale: open_module(Module::Swscale, search_dirs)?,
    })
  }
}

/// FFmpeg, loaded and version-checked
///
/// Every RAII wrapper in [`crate::codec`] holds an `Arc<AvLibrary>`, so the modules
/// outlive all objects created from them.
pub struct AvLibrary {
  /// FFmpeg function pointers
  pub api: AvFunctions,
  /// Must be dropped after `api` is no longer reachable
  _modules: Modules,
}

impl AvLibrary {
  /// Load from the platform search path only
  pub fn load() -> Result<Self, LoadError> {
    Self::load_from(&[])
  }

  /// Load, trying `search_dirs` before the platform search path
  pub fn load_from(search_dirs: &[PathBuf]) -> Result<Self, LoadError> {
    let modules = Modules::open(search_dirs)?;
    let api = AvFunctions::resolve(&modules)?;

    for module in Module::LOAD_ORDER {
      let found = module.runtime_version(&api);
      let required = module.header_version();
      if found < required {
        warn!(
          target: "avbridge",
          module = module.name(),
          %found,
          %required,
          "FFmpeg runtime is older than the build headers"
        );
        return Err(LoadError::VersionMismatch {
          module: module.name(),
          found,
          required,
        });
      }
    }

    info!(
      target: "avbridge",
      avcodec = %Module::Avcodec.runtime_version(&api),
      avformat = %Module::Avformat.runtime_version(&api),
      entry_points = AvFunctions::COUNT,
      "FFmpeg libraries loaded"
    );

    Ok(Self {
      api,
      _modules: modules,
    })
  }

  /// Runtime version of one module
  pub fn version(&self, module: Module) -> Version {
    module.runtime_version(&self.api)
  }

  /// Set FFmpeg's global log level (`av_log_set_level`)
  pub fn set_log_level(&self, level: c_int) {
    unsafe { (self.api.av_log_set_level)(level) };
  }

  /// Convert a return code into a result
  #[inline]
  pub fn check(&self, ret: c_int) -> FFmpegResult<c_int> {
    self.api.check(ret)
  }

  /// Build an error (with message) from a return code
  pub fn error(&self, code: c_int) -> FFmpegError {
    FFmpegError::from_code(&self.api, code)
  }
}

impl fmt::Debug for AvLibrary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AvLibrary")
      .field("avcodec", &self.version(Module::Avcodec).to_string())
      .field("api", &self.api)
      .finish()
  }
}

/// Split a platform path list (`:` on Unix, `;` on Windows) into directories
pub fn split_search_path(value: &str) -> Vec<PathBuf> {
  std::env::split_paths(value)
    .filter(|p| !p.as_os_str().is_empty())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_candidate_filenames_order() {
    let names = candidate_filenames("avcodec", 60);
    assert_eq!(
      names,
      vec![
        "avcodec-60",
        "avcodec.60",
        "libavcodec-60.so",
        "libavcodec.60.so",
        "libavcodec.so.60",
        "libavcodec-60.dylib",
        "libavcodec.60.dylib",
        "libavcodec.dylib.60",
      ]
    );
  }

  #[test]
  fn test_candidate_paths_prefer_search_dirs() {
    let dirs = vec![PathBuf::from("/opt/ffmpeg/lib")];
    let paths = candidate_paths("avutil", 58, &dirs);
    assert_eq!(paths.len(), 16);
    assert_eq!(paths[0], PathBuf::from("/opt/ffmpeg/lib/avutil-58"));
    assert_eq!(paths[8], PathBuf::from("avutil-58"));
    assert_eq!(paths[15], PathBuf::from("libavutil.dylib.58"));
  }

  #[test]
  fn test_version_display_and_order() {
    let v = Version::new(60, 3, 100);
    assert_eq!(v.to_string(), "60.3.100");
    assert_eq!(v.major(), 60);
    assert!(Version::new(59, 37, 100) < v);
    assert!(Version::new(60, 3, 101) > v);
  }

  #[test]
  fn test_load_order_starts_with_avutil() {
    assert_eq!(Module::LOAD_ORDER[0], Module::Avutil);
    let names: Vec<_> = Module::LOAD_ORDER.iter().map(|m| m.name()).collect();
    assert_eq!(names, ["avutil", "swresample", "avcodec", "avformat", "swscale"]);
  }

  #[test]
  fn test_split_search_path_skips_empty() {
    #[cfg(unix)]
    let dirs = split_search_path("/a::/b");
    #[cfg(windows)]
    let dirs = split_search_path("C:\\a;;C:\\b");
    assert_eq!(dirs.len(), 2);
  }
}
