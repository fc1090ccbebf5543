// StreamSession: one open stream plus the state shared with its callback
//
// Both engines keep at most one of these behind their session mutex.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};

use crate::audio::session::{SessionState, SessionTracker};
use crate::config::DiagnosticsConfig;
use crate::engine::backend::StreamHandle;
use crate::error::{log_audio_error, AudioError};
use crate::telemetry::{spawn_reporter, DiagnosticsConsumer, StatsSnapshot, StreamStats};

/// An opened stream owned by an engine
pub(crate) struct StreamSession {
    stream: Box<dyn StreamHandle>,
    tracker: Arc<SessionTracker>,
    stats: Arc<StreamStats>,
}

impl StreamSession {
    /// Start `stream` and promote the session to Running.
    ///
    /// `tracker` must be Open. On failure the stream is dropped (closed) and
    /// the tracker returns to Idle.
    pub(crate) fn launch(
        label: &'static str,
        mut stream: Box<dyn StreamHandle>,
        tracker: Arc<SessionTracker>,
        stats: Arc<StreamStats>,
        diagnostics: DiagnosticsConsumer,
        config: DiagnosticsConfig,
    ) -> Result<Self, AudioError> {
        if let Err(err) = stream.start() {
            drop(stream);
            let _ = tracker.transition(SessionState::Open, SessionState::Idle);
            log_audio_error(&err, label);
            return Err(err);
        }

        if let Err(err) = tracker.transition(SessionState::Open, SessionState::Running) {
            // The callback may already have finished the session
            debug!("[{}] session not promoted to running: {}", label, err);
        }

        if let Err(e) = spawn_reporter(label, diagnostics, config) {
            warn!("[{}] diagnostics reporter not started: {}", label, e);
        }

        let stream_info = stream.info();
        info!(
            "[{}] stream started: sample_rate={} Hz, frames_per_callback={}, latency_ms={:?}",
            label, stream_info.sample_rate_hz, stream_info.frames_per_callback, stream_info.latency_ms
        );

        Ok(Self {
            stream,
            tracker,
            stats,
        })
    }

    pub(crate) fn state(&self) -> SessionState {
        self.tracker.get()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.tracker.get().is_active()
    }

    pub(crate) fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop and close the stream.
    ///
    /// An active session is asked to halt. A session that already ended on
    /// its own reports how it ended: cleanly, or with `StreamFailure` when
    /// the audio stack closed it.
    pub(crate) fn shutdown(mut self, label: &'static str) -> Result<(), AudioError> {
        if self.is_active() {
            let result = self.stream.stop();
            self.tracker.finish();
            let stats = self.stats();
            drop(self);
            info!(
                "[{}] stream stopped after {} callbacks ({} frames)",
                label, stats.callbacks, stats.frames
            );
            return result.map_err(|err| {
                log_audio_error(&err, label);
                err
            });
        }

        match self.tracker.error_code() {
            Some(code) => {
                let err = AudioError::StreamFailure {
                    reason: format!("stream closed by the audio stack (code {})", code),
                };
                log_audio_error(&err, label);
                Err(err)
            }
            None => {
                debug!("[{}] releasing finished stream", label);
                Ok(())
            }
        }
    }
}

/// Session slot guarded on the control thread
pub(crate) type SessionSlot = Mutex<Option<StreamSession>>;

/// Safely acquire lock on a session slot
pub(crate) fn lock_slot<'a>(
    slot: &'a SessionSlot,
    component: &str,
) -> Result<MutexGuard<'a, Option<StreamSession>>, AudioError> {
    slot.lock().map_err(|_| {
        let err = AudioError::LockPoisoned {
            component: component.to_string(),
        };
        log_audio_error(&err, "lock_session");
        err
    })
}

/// Reject a start while the slot holds an active session
pub(crate) fn check_not_running(
    guard: &Option<StreamSession>,
    context: &str,
) -> Result<(), AudioError> {
    if guard.as_ref().is_some_and(StreamSession::is_active) {
        let err = AudioError::AlreadyRunning;
        log_audio_error(&err, context);
        return Err(err);
    }
    Ok(())
}

/// Take the slot's session for shutdown, `NotRunning` if there is none
pub(crate) fn take_session(
    guard: &mut Option<StreamSession>,
    context: &str,
) -> Result<StreamSession, AudioError> {
    guard.take().ok_or_else(|| {
        let err = AudioError::NotRunning;
        log_audio_error(&err, context);
        err
    })
}
