// CaptureEngine: mic capture lifecycle
//
// Single Responsibility: hold the capture configuration and open/start/stop
// the input stream session delivering frames to the consumer.

use std::sync::{Arc, Mutex, MutexGuard};

use log::info;

use crate::audio::capture::{CloseErrorSink, FrameForwarder, FrameSink};
use crate::audio::session::{SessionState, SessionTracker};
use crate::config::{CaptureConfig, DiagnosticsConfig};
use crate::engine::backend::AudioBackend;
use crate::error::{log_audio_error, AudioError};
use crate::telemetry::{DiagnosticsChannel, StatsSnapshot};

use super::stream_session::{self, SessionSlot, StreamSession};

const LABEL: &str = "capture";

/// Records mono `f32` frames from an input stream
///
/// # Example
/// ```ignore
/// let engine = CaptureEngine::new(backend);
/// engine.configure(CaptureConfig { sample_rate_hz: 48000, ..Default::default() })?;
/// engine.start(Box::new(|frame| consume(frame)), None)?;
/// engine.stop()?;
/// ```
pub struct CaptureEngine {
    backend: Arc<dyn AudioBackend>,
    diagnostics: DiagnosticsConfig,
    config: Mutex<CaptureConfig>,
    session: SessionSlot,
}

impl CaptureEngine {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self::with_config(backend, DiagnosticsConfig::default())
    }

    pub fn with_config(backend: Arc<dyn AudioBackend>, diagnostics: DiagnosticsConfig) -> Self {
        Self {
            backend,
            diagnostics,
            config: Mutex::new(CaptureConfig::default()),
            session: Mutex::new(None),
        }
    }

    /// Set the configuration used by the next `start`.
    ///
    /// Values are not validated; an open session is unaffected.
    pub fn configure(&self, config: CaptureConfig) -> Result<(), AudioError> {
        *self.lock_config()? = config;
        info!(
            "[{}] configured: sample_rate={} Hz, frames_per_callback={}, device_id={}",
            LABEL, config.sample_rate_hz, config.frames_per_callback, config.device_id
        );
        Ok(())
    }

    pub fn config(&self) -> Result<CaptureConfig, AudioError> {
        Ok(*self.lock_config()?)
    }

    /// Open and start an input stream with the current configuration
    ///
    /// # Errors
    /// - `AlreadyRunning` while a session is open or running
    /// - `StreamOpenFailed` / `HardwareError` from the audio stack
    /// - Lock poisoning
    pub fn start(
        &self,
        on_frame: FrameSink,
        on_close_error: Option<CloseErrorSink>,
    ) -> Result<(), AudioError> {
        let mut guard = stream_session::lock_slot(&self.session, "capture_session")?;
        stream_session::check_not_running(&guard, "start_recording")?;

        if let Some(previous) = guard.take() {
            // Already reported through on_close_error
            let _ = previous.shutdown(LABEL);
        }

        let spec = self.lock_config()?.snapshot();
        let tracker = Arc::new(SessionTracker::new());
        tracker.transition(SessionState::Idle, SessionState::Open)?;

        let (producer, consumer) = DiagnosticsChannel::new(self.diagnostics.ring_capacity);
        let stats = producer.stats();
        let forwarder = FrameForwarder::new(on_frame, on_close_error, Arc::clone(&tracker), producer);

        let stream = self
            .backend
            .open_input(&spec, Box::new(forwarder))
            .map_err(|err| {
                let _ = tracker.transition(SessionState::Open, SessionState::Idle);
                log_audio_error(&err, "start_recording");
                err
            })?;

        let session =
            StreamSession::launch(LABEL, stream, tracker, stats, consumer, self.diagnostics)?;
        info!(
            "[{}] recording at {} Hz via {}",
            LABEL,
            spec.sample_rate_hz,
            self.backend.name()
        );
        *guard = Some(session);
        Ok(())
    }

    /// Stop the current capture session
    ///
    /// # Errors
    /// - `NotRunning` without a prior successful start
    /// - `StreamFailure` when the audio stack already closed the stream
    /// - `HardwareError` if the stop request fails
    pub fn stop(&self) -> Result<(), AudioError> {
        let mut guard = stream_session::lock_slot(&self.session, "capture_session")?;
        let session = stream_session::take_session(&mut guard, "stop_recording")?;
        session.shutdown(LABEL)
    }

    pub fn state(&self) -> Result<SessionState, AudioError> {
        let guard = stream_session::lock_slot(&self.session, "capture_session")?;
        Ok(guard
            .as_ref()
            .map(StreamSession::state)
            .unwrap_or(SessionState::Idle))
    }

    pub fn stats(&self) -> Result<Option<StatsSnapshot>, AudioError> {
        let guard = stream_session::lock_slot(&self.session, "capture_session")?;
        Ok(guard.as_ref().map(StreamSession::stats))
    }

    fn lock_config(&self) -> Result<MutexGuard<'_, CaptureConfig>, AudioError> {
        self.config.lock().map_err(|_| {
            let err = AudioError::LockPoisoned {
                component: "capture_config".to_string(),
            };
            log_audio_error(&err, "lock_config");
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frame::CapturedFrame;
    use crate::engine::backend::StubBackend;

    fn engine() -> (CaptureEngine, StubBackend) {
        let backend = StubBackend::new();
        (CaptureEngine::new(Arc::new(backend.clone())), backend)
    }

    fn collecting_sink() -> (FrameSink, Arc<Mutex<Vec<Vec<f32>>>>) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&frames);
        let on_frame: FrameSink = Box::new(move |frame: CapturedFrame| {
            sink.lock().unwrap().push(frame.as_slice().to_vec());
        });
        (on_frame, frames)
    }

    #[test]
    fn test_default_config_is_used_without_configure() {
        let (engine, backend) = engine();
        let (on_frame, _) = collecting_sink();
        engine.start(on_frame, None).unwrap();

        let spec = backend.last_input_spec().unwrap();
        assert_eq!(spec.sample_rate_hz, 4000);
        assert!(spec.unprocessed);
    }

    #[test]
    fn test_configure_applies_to_next_start_only() {
        let (engine, backend) = engine();
        engine
            .configure(CaptureConfig {
                sample_rate_hz: 48_000,
                frames_per_callback: 256,
                device_id: 3,
            })
            .unwrap();
        let (on_frame, _) = collecting_sink();
        engine.start(on_frame, None).unwrap();

        engine
            .configure(CaptureConfig {
                sample_rate_hz: 16_000,
                ..CaptureConfig::default()
            })
            .unwrap();
        assert_eq!(backend.last_input_spec().unwrap().sample_rate_hz, 48_000);

        engine.stop().unwrap();
        let (on_frame, _) = collecting_sink();
        engine.start(on_frame, None).unwrap();
        assert_eq!(backend.last_input_spec().unwrap().sample_rate_hz, 16_000);
    }

    #[test]
    fn test_frames_reach_consumer() {
        let (engine, backend) = engine();
        let (on_frame, frames) = collecting_sink();
        engine.start(on_frame, None).unwrap();

        backend.push_input(&[0.5, -0.5]).unwrap();
        backend.push_input(&[0.25]).unwrap();

        assert_eq!(*frames.lock().unwrap(), vec![vec![0.5, -0.5], vec![0.25]]);
        assert_eq!(engine.stats().unwrap().unwrap().frames, 3);
    }

    #[test]
    fn test_stop_without_start_is_not_running() {
        let (engine, _) = engine();
        assert_eq!(engine.stop().unwrap_err(), AudioError::NotRunning);
    }

    #[test]
    fn test_double_start_is_rejected() {
        let (engine, backend) = engine();
        let (first, _) = collecting_sink();
        let (second, _) = collecting_sink();
        engine.start(first, None).unwrap();

        assert_eq!(engine.start(second, None).unwrap_err(), AudioError::AlreadyRunning);
        assert_eq!(backend.opened_inputs(), 1);
    }

    #[test]
    fn test_restart_after_stream_error() {
        let (engine, backend) = engine();
        let codes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&codes);
        let (on_frame, _) = collecting_sink();
        engine
            .start(
                on_frame,
                Some(Box::new(move |code: i32| sink.lock().unwrap().push(code))),
            )
            .unwrap();

        assert!(backend.raise_input_error(-899));
        assert_eq!(*codes.lock().unwrap(), vec![-899]);
        assert_eq!(engine.state().unwrap(), SessionState::Stopped);

        // A fresh start replaces the failed session
        let (on_frame, _) = collecting_sink();
        engine.start(on_frame, None).unwrap();
        assert_eq!(engine.state().unwrap(), SessionState::Running);
        assert_eq!(backend.opened_inputs(), 2);
    }
}
