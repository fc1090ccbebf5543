//! Backend abstractions over the external audio streaming library.
//!
//! The engines never talk to Oboe or cpal directly. They hand a boxed
//! callback object ([`OutputRenderer`] / [`InputConsumer`]) to an
//! [`AudioBackend`], which opens the platform stream, adapts its callback
//! contract to these traits and returns an opaque [`StreamHandle`].

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::{InputStreamSpec, OutputStreamSpec};
use crate::error::AudioError;

/// What the data callback wants the stream to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Continue,
    Stop,
}

/// When an asynchronous stream error was reported relative to stream close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPhase {
    BeforeClose,
    AfterClose,
}

/// Asynchronous stream error delivered on the audio stack's thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamErrorInfo {
    pub phase: ErrorPhase,
    /// Backend-native result code (Oboe `Result` values on Android)
    pub code: i32,
}

/// Oboe's `ErrorDisconnected`, reused by backends without native codes
pub const ERROR_DISCONNECTED: i32 = -899;

/// Oboe's `ErrorInternal`, reused by backends without native codes
pub const ERROR_INTERNAL: i32 = -896;

/// Data/error callbacks of an output stream producing mono `i16` frames.
///
/// Every method runs on the real-time audio thread: no blocking, no
/// logging, no unbounded work.
pub trait OutputRenderer: Send {
    fn render(&mut self, out: &mut [i16]) -> CallbackAction;
    fn on_stream_error(&mut self, error: StreamErrorInfo);
}

/// Data/error callbacks of an input stream delivering mono `f32` frames.
///
/// Same real-time restrictions as [`OutputRenderer`].
pub trait InputConsumer: Send {
    fn consume(&mut self, input: &[f32]) -> CallbackAction;
    fn on_stream_error(&mut self, error: StreamErrorInfo);
}

/// Properties of an opened stream as negotiated by the audio stack
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub sample_rate_hz: i32,
    pub frames_per_callback: i32,
    pub latency_ms: Option<f64>,
}

/// One open hardware stream. Dropping it closes the stream.
pub trait StreamHandle: Send {
    fn start(&mut self) -> Result<(), AudioError>;
    fn stop(&mut self) -> Result<(), AudioError>;
    fn info(&mut self) -> StreamInfo;
}

/// Trait implemented by platform-specific audio backends.
pub trait AudioBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn open_output(
        &self,
        spec: &OutputStreamSpec,
        renderer: Box<dyn OutputRenderer>,
    ) -> Result<Box<dyn StreamHandle>, AudioError>;

    fn open_input(
        &self,
        spec: &InputStreamSpec,
        consumer: Box<dyn InputConsumer>,
    ) -> Result<Box<dyn StreamHandle>, AudioError>;
}

/// Wall-clock timestamp split the way the C callbacks receive it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WallTime {
    pub sec: i64,
    pub usec: i64,
}

/// Trait representing the wall clock used for playback event timestamps.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> WallTime;
}

/// Default time source backed by `SystemTime::now`.
#[derive(Default)]
pub struct SystemTimeSource {
    _unit: (),
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> WallTime {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        WallTime {
            sec: since_epoch.as_secs() as i64,
            usec: i64::from(since_epoch.subsec_micros()),
        }
    }
}

/// Backend for the platform this library was compiled for
pub fn platform_backend() -> Arc<dyn AudioBackend> {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "android")] {
            Arc::new(OboeBackend::new())
        } else {
            Arc::new(CpalBackend::new())
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "android")] {
        mod oboe;
        pub use self::oboe::{mark_android_context_ready, OboeBackend};
    } else {
        mod cpal;
        pub use self::cpal::CpalBackend;
    }
}

mod desktop_stub;
pub use desktop_stub::{StubBackend, StubTimeSource};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_source_splits_microseconds() {
        let now = SystemTimeSource::default().now();
        assert!(now.sec > 1_600_000_000);
        assert!((0..1_000_000).contains(&now.usec));
    }
}
