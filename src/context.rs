// BridgeContext: Dependency Injection Container
// Owns both engines and the backend they share; the C boundary holds one
// lazily constructed instance, tests build their own with a stub backend.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use crate::audio::capture::{CloseErrorSink, FrameSink};
use crate::audio::playback::{EventSink, SampleSource};
use crate::config::{CaptureConfig, DiagnosticsConfig};
use crate::engine::backend::{platform_backend, AudioBackend, SystemTimeSource, TimeSource};
use crate::error::{AudioError, ErrorCode};
use crate::managers::{CaptureEngine, PlaybackEngine};

/// Code reported by `last_error` before any failure
pub const NO_ERROR: i32 = 0;

/// BridgeContext: container for the playback and capture engines
///
/// Every operation records the code of a failure so callers limited to the
/// 0/1 status of the C ABI can ask what went wrong.
pub struct BridgeContext {
    backend: Arc<dyn AudioBackend>,
    playback: PlaybackEngine,
    capture: CaptureEngine,
    last_error: AtomicI32,
}

impl BridgeContext {
    /// Create a context on the platform backend with the system clock
    pub fn new() -> Self {
        Self::with_backend(platform_backend(), Arc::new(SystemTimeSource::default()))
    }

    pub fn with_backend(backend: Arc<dyn AudioBackend>, clock: Arc<dyn TimeSource>) -> Self {
        Self::with_config(backend, clock, DiagnosticsConfig::default())
    }

    pub fn with_config(
        backend: Arc<dyn AudioBackend>,
        clock: Arc<dyn TimeSource>,
        diagnostics: DiagnosticsConfig,
    ) -> Self {
        crate::logging::init_logging();
        log::info!("Audio bridge using {} backend", backend.name());
        Self {
            playback: PlaybackEngine::with_config(Arc::clone(&backend), clock, diagnostics),
            capture: CaptureEngine::with_config(Arc::clone(&backend), diagnostics),
            backend,
            last_error: AtomicI32::new(NO_ERROR),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn playback(&self) -> &PlaybackEngine {
        &self.playback
    }

    pub fn capture(&self) -> &CaptureEngine {
        &self.capture
    }

    // ========================================================================
    // PLAYBACK
    // ========================================================================

    pub fn load_samples(&self, source: SampleSource) -> Result<(), AudioError> {
        self.record(self.playback.load_samples(source))
    }

    pub fn play(&self, notifier: Option<EventSink>) -> Result<(), AudioError> {
        self.record(self.playback.play(notifier))
    }

    pub fn stop_playback(&self) -> Result<(), AudioError> {
        self.record(self.playback.stop())
    }

    // ========================================================================
    // CAPTURE
    // ========================================================================

    pub fn configure_capture(&self, config: CaptureConfig) -> Result<(), AudioError> {
        self.record(self.capture.configure(config))
    }

    pub fn start_capture(
        &self,
        on_frame: FrameSink,
        on_close_error: Option<CloseErrorSink>,
    ) -> Result<(), AudioError> {
        self.record(self.capture.start(on_frame, on_close_error))
    }

    pub fn stop_capture(&self) -> Result<(), AudioError> {
        self.record(self.capture.stop())
    }

    /// Code of the most recent failure, [`NO_ERROR`] if none happened yet
    pub fn last_error(&self) -> i32 {
        self.last_error.load(Ordering::Acquire)
    }

    /// Remember the code of a failed operation
    pub fn record<T>(&self, result: Result<T, AudioError>) -> Result<T, AudioError> {
        if let Err(err) = &result {
            self.last_error.store(err.code(), Ordering::Release);
        }
        result
    }
}

impl Default for BridgeContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::backend::{StubBackend, StubTimeSource};
    use crate::error::AudioErrorCodes;

    fn stub_context() -> BridgeContext {
        BridgeContext::with_backend(
            Arc::new(StubBackend::new()),
            Arc::new(StubTimeSource::new()),
        )
    }

    #[test]
    fn test_last_error_starts_clear() {
        let ctx = stub_context();
        assert_eq!(ctx.last_error(), NO_ERROR);
        assert_eq!(ctx.backend_name(), "stub");
    }

    #[test]
    fn test_failures_are_recorded() {
        let ctx = stub_context();
        assert!(ctx.stop_capture().is_err());
        assert_eq!(ctx.last_error(), AudioErrorCodes::NOT_RUNNING);

        ctx.play(None).unwrap();
        assert!(ctx.play(None).is_err());
        assert_eq!(ctx.last_error(), AudioErrorCodes::ALREADY_RUNNING);
    }

    #[test]
    fn test_success_keeps_previous_error() {
        let ctx = stub_context();
        assert!(ctx.stop_playback().is_err());
        ctx.configure_capture(CaptureConfig::default()).unwrap();
        assert_eq!(ctx.last_error(), AudioErrorCodes::NOT_RUNNING);
    }
}
