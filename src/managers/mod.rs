// Managers Module
//
// Each manager owns one stream session lifecycle:
// - PlaybackEngine: preloaded beep buffer playback
// - CaptureEngine: mic capture with per-callback frame delivery

pub mod capture_manager;
pub mod playback_manager;
mod stream_session;

pub use capture_manager::CaptureEngine;
pub use playback_manager::PlaybackEngine;
