//! Engine module housing the audio stack seam.
//!
//! `backend` defines the traits the playback and capture engines are written
//! against, plus the Oboe, cpal and stub implementations.

pub mod backend;

#[cfg(target_os = "android")]
pub use backend::OboeBackend;
#[cfg(not(target_os = "android"))]
pub use backend::CpalBackend;
pub use backend::{
    platform_backend, AudioBackend, StreamHandle, StubBackend, StubTimeSource, SystemTimeSource,
    TimeSource,
};
