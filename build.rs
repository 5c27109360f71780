//! Build script for avbridge
//!
//! Compiles the C accessor shim against the FFmpeg headers via `cc`.
//! FFmpeg itself is not linked: every entry point is resolved at runtime.

use std::env;
use std::path::PathBuf;

fn main() {
  let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

  let include_dir = get_ffmpeg_include_dir(&target_os);

  compile_accessors(&include_dir);

  println!("cargo:rerun-if-changed=src/ffi/accessors.c");
  println!("cargo:rerun-if-changed=build.rs");
  println!("cargo:rerun-if-env-changed=FFMPEG_DIR");
}

/// Get the directory containing `libavcodec/avcodec.h`
fn get_ffmpeg_include_dir(target_os: &str) -> PathBuf {
  // Check for custom FFMPEG_DIR environment variable
  if let Ok(dir) = env::var("FFMPEG_DIR") {
    return PathBuf::from(dir).join("include");
  }

  // pkg-config knows about multiarch layouts (e.g. /usr/include/x86_64-linux-gnu)
  #[cfg(unix)]
  {
    if let Ok(output) = std::process::Command::new("pkg-config")
      .args(["--variable=includedir", "libavcodec"])
      .output()
    {
      if output.status.success() {
        let dir = String::from_utf8_lossy(&output.stdout);
        let path = PathBuf::from(dir.trim());
        if path.join("libavcodec/avcodec.h").exists() {
          return path;
        }
      }
    }
  }

  // Try common installation paths
  let common_paths = match target_os {
    "macos" => vec![
      "/opt/homebrew/include", // Apple Silicon Homebrew
      "/usr/local/include",    // Intel Homebrew / manual install
      "/opt/local/include",    // MacPorts
    ],
    "linux" => vec![
      "/usr/include",
      "/usr/include/x86_64-linux-gnu",
      "/usr/include/aarch64-linux-gnu",
      "/usr/local/include",
      "/opt/ffmpeg/include",
    ],
    "windows" => vec!["C:\\ffmpeg\\include", "C:\\Program Files\\ffmpeg\\include"],
    _ => vec![],
  };

  for path in common_paths {
    let p = PathBuf::from(path);
    if p.join("libavcodec/avcodec.h").exists() {
      return p;
    }
  }

  println!(
    "cargo:warning=FFmpeg headers not found. Set FFMPEG_DIR environment variable or install the FFmpeg development headers."
  );
  PathBuf::from("/usr/local/include")
}

/// Compile the C accessor library
fn compile_accessors(include_dir: &PathBuf) {
  let mut build = cc::Build::new();
  build
    .file("src/ffi/accessors.c")
    .include(include_dir)
    .warnings(true)
    .extra_warnings(true);

  // Platform-specific flags
  #[cfg(target_os = "macos")]
  {
    build.flag("-Wno-deprecated-declarations");
  }

  build.compile("avbridge_accessors");
}
