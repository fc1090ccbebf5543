// PlaybackEngine: beep playback lifecycle
//
// Single Responsibility: load the caller's buffer, open/start/stop the
// output stream session that plays it.

use std::sync::{Arc, Mutex, MutexGuard};

use log::info;

use crate::audio::playback::{BeepRenderer, EventSink, SampleSource};
use crate::audio::session::{SessionState, SessionTracker};
use crate::config::{DiagnosticsConfig, OutputStreamSpec};
use crate::engine::backend::{AudioBackend, TimeSource};
use crate::error::{log_audio_error, AudioError};
use crate::telemetry::{DiagnosticsChannel, StatsSnapshot};

use super::stream_session::{self, SessionSlot, StreamSession};

const LABEL: &str = "playback";

/// Plays a preloaded mono `i16` buffer through a low-latency output stream
///
/// # Example
/// ```ignore
/// let engine = PlaybackEngine::new(backend, clock);
/// engine.load_samples(source)?;
/// engine.play(Some(Box::new(|event| println!("{:?}", event))))?;
/// engine.stop()?;
/// ```
pub struct PlaybackEngine {
    backend: Arc<dyn AudioBackend>,
    clock: Arc<dyn TimeSource>,
    output_spec: OutputStreamSpec,
    diagnostics: DiagnosticsConfig,
    source: Mutex<SampleSource>,
    session: SessionSlot,
}

impl PlaybackEngine {
    pub fn new(backend: Arc<dyn AudioBackend>, clock: Arc<dyn TimeSource>) -> Self {
        Self::with_config(backend, clock, DiagnosticsConfig::default())
    }

    pub fn with_config(
        backend: Arc<dyn AudioBackend>,
        clock: Arc<dyn TimeSource>,
        diagnostics: DiagnosticsConfig,
    ) -> Self {
        Self {
            backend,
            clock,
            output_spec: OutputStreamSpec::default(),
            diagnostics,
            source: Mutex::new(SampleSource::empty()),
            session: Mutex::new(None),
        }
    }

    /// Replace the buffer played by the next `play`
    ///
    /// # Errors
    /// - `AlreadyRunning` while a session is reading the current buffer
    /// - Lock poisoning
    pub fn load_samples(&self, source: SampleSource) -> Result<(), AudioError> {
        let guard = stream_session::lock_slot(&self.session, "playback_session")?;
        stream_session::check_not_running(&guard, "load_beep_data")?;

        *self.lock_source()? = source;
        info!("[{}] loaded {} samples", LABEL, source.len());
        Ok(())
    }

    /// Open and start an output stream playing the loaded buffer from the top
    ///
    /// A previous session that ended on its own is released first.
    ///
    /// # Errors
    /// - `AlreadyRunning` while a session is open or running
    /// - `StreamOpenFailed` / `HardwareError` from the audio stack
    /// - Lock poisoning
    pub fn play(&self, notifier: Option<EventSink>) -> Result<(), AudioError> {
        let mut guard = stream_session::lock_slot(&self.session, "playback_session")?;
        stream_session::check_not_running(&guard, "play_beep")?;

        if let Some(previous) = guard.take() {
            // Ended sessions already reported their outcome through events
            let _ = previous.shutdown(LABEL);
        }

        let source = *self.lock_source()?;
        let tracker = Arc::new(SessionTracker::new());
        tracker.transition(SessionState::Idle, SessionState::Open)?;

        let (producer, consumer) = DiagnosticsChannel::new(self.diagnostics.ring_capacity);
        let stats = producer.stats();
        let renderer = BeepRenderer::new(
            source,
            notifier,
            Arc::clone(&self.clock),
            Arc::clone(&tracker),
            producer,
        );

        let stream = self
            .backend
            .open_output(&self.output_spec, Box::new(renderer))
            .map_err(|err| {
                let _ = tracker.transition(SessionState::Open, SessionState::Idle);
                log_audio_error(&err, "play_beep");
                err
            })?;

        let session =
            StreamSession::launch(LABEL, stream, tracker, stats, consumer, self.diagnostics)?;
        info!(
            "[{}] playing {} samples via {}",
            LABEL,
            source.len(),
            self.backend.name()
        );
        *guard = Some(session);
        Ok(())
    }

    /// Stop the current playback session
    ///
    /// # Errors
    /// - `NotRunning` when no session exists
    /// - `StreamFailure` when the audio stack already closed the stream
    /// - `HardwareError` if the stop request fails
    pub fn stop(&self) -> Result<(), AudioError> {
        let mut guard = stream_session::lock_slot(&self.session, "playback_session")?;
        let session = stream_session::take_session(&mut guard, "stop_beep")?;
        session.shutdown(LABEL)
    }

    /// Current session state (`Idle` when no session exists)
    pub fn state(&self) -> Result<SessionState, AudioError> {
        let guard = stream_session::lock_slot(&self.session, "playback_session")?;
        Ok(guard
            .as_ref()
            .map(StreamSession::state)
            .unwrap_or(SessionState::Idle))
    }

    /// Callback counters of the current or last session
    pub fn stats(&self) -> Result<Option<StatsSnapshot>, AudioError> {
        let guard = stream_session::lock_slot(&self.session, "playback_session")?;
        Ok(guard.as_ref().map(StreamSession::stats))
    }

    // ========================================================================
    // PRIVATE HELPER METHODS
    // ========================================================================

    fn lock_source(&self) -> Result<MutexGuard<'_, SampleSource>, AudioError> {
        self.source.lock().map_err(|_| {
            let err = AudioError::LockPoisoned {
                component: "playback_source".to_string(),
            };
            log_audio_error(&err, "lock_source");
            err
        })
    }
}
