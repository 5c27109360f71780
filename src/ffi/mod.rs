//! Hand-written FFmpeg C bindings (no bindgen)
//!
//! FFmpeg is never linked: the libraries are opened at runtime ([`loader`]) and
//! every entry point is resolved into a typed function table ([`symbols`]).
//! All FFmpeg structs are opaque - we access fields via the thin C accessor library.

pub mod accessors;
pub mod error;
pub mod loader;
pub mod symbols;
pub mod types;

pub use error::{FFmpegError, FFmpegResult};
pub use loader::{AvLibrary, LoadError, Module, Version};
pub use symbols::AvFunctions;
pub use types::*;
