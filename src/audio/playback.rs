//! Beep playback - real-time output callback state
//!
//! `BeepRenderer` walks a caller-owned `i16` buffer with a cursor and fills
//! each output callback until the buffer is exhausted.
//!
//! # Architecture
//! ```text
//! PlaybackEngine::play()
//!   └─> BeepRenderer::new()
//!       └─> AudioBackend::open_output()
//!           └─> BeepRenderer::render() [Real-time thread]
//!               ├─> first callback: PlaybackEvent::Started
//!               ├─> copy next samples, advance cursor
//!               └─> exhausted: zero-fill, PlaybackEvent::Finished, Stop
//! ```

use std::ptr;
use std::slice;
use std::sync::Arc;

use crate::engine::backend::{
    CallbackAction, ErrorPhase, OutputRenderer, StreamErrorInfo, TimeSource, WallTime,
};
use crate::error::AudioError;
use crate::telemetry::{CallbackEvent, DiagnosticsProducer};

use super::session::SessionTracker;

/// Event code reported when the first callback of a session runs
pub const EVENT_STARTED: i32 = 1;
/// Event code reported when the buffer is exhausted
pub const EVENT_FINISHED: i32 = 2;
/// Event code reported when the audio stack closed the stream on error
pub const EVENT_STREAM_ERROR: i32 = 3;

/// Playback notification delivered to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started(WallTime),
    Finished(WallTime),
    StreamError { code: i32, at: WallTime },
}

impl PlaybackEvent {
    pub fn code(&self) -> i32 {
        match self {
            PlaybackEvent::Started(_) => EVENT_STARTED,
            PlaybackEvent::Finished(_) => EVENT_FINISHED,
            PlaybackEvent::StreamError { .. } => EVENT_STREAM_ERROR,
        }
    }

    pub fn timestamp(&self) -> WallTime {
        match self {
            PlaybackEvent::Started(at) | PlaybackEvent::Finished(at) => *at,
            PlaybackEvent::StreamError { at, .. } => *at,
        }
    }
}

/// Receiver of [`PlaybackEvent`]s; runs on the audio thread
pub type EventSink = Box<dyn FnMut(PlaybackEvent) + Send>;

/// Borrowed view of the caller's preloaded samples.
///
/// The memory is never copied; the caller keeps it alive and unchanged for
/// as long as playback may read it.
#[derive(Debug, Clone, Copy)]
pub struct SampleSource {
    ptr: *const i16,
    len: usize,
}

// SAFETY: the source is a read-only view; the caller guarantees the
// underlying memory outlives every session reading it.
unsafe impl Send for SampleSource {}
unsafe impl Sync for SampleSource {}

impl SampleSource {
    pub fn empty() -> Self {
        Self {
            ptr: ptr::null(),
            len: 0,
        }
    }

    /// Wrap a caller-provided pointer and length.
    ///
    /// # Safety
    /// When `len > 0`, `ptr` must point to `len` readable `i16` values that
    /// stay valid and unmodified until the next load or the end of the
    /// process.
    pub unsafe fn from_raw(ptr: *const i16, len: i32) -> Result<Self, AudioError> {
        if len < 0 {
            return Err(AudioError::InvalidArgument {
                reason: format!("negative sample count {}", len),
            });
        }
        if len == 0 {
            return Ok(Self::empty());
        }
        if ptr.is_null() {
            return Err(AudioError::InvalidArgument {
                reason: format!("null sample buffer with length {}", len),
            });
        }
        Ok(Self {
            ptr,
            len: len as usize,
        })
    }

    pub fn from_static(samples: &'static [i16]) -> Self {
        Self {
            ptr: samples.as_ptr(),
            len: samples.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[i16] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: non-empty sources were validated in from_raw/from_static
        unsafe { slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl Default for SampleSource {
    fn default() -> Self {
        Self::empty()
    }
}

/// Output callback state for one playback session
pub struct BeepRenderer {
    source: SampleSource,
    cursor: usize,
    started: bool,
    finished: bool,
    notifier: Option<EventSink>,
    clock: Arc<dyn TimeSource>,
    session: Arc<SessionTracker>,
    diagnostics: DiagnosticsProducer,
}

impl BeepRenderer {
    pub fn new(
        source: SampleSource,
        notifier: Option<EventSink>,
        clock: Arc<dyn TimeSource>,
        session: Arc<SessionTracker>,
        diagnostics: DiagnosticsProducer,
    ) -> Self {
        Self {
            source,
            cursor: 0,
            started: false,
            finished: false,
            notifier,
            clock,
            session,
            diagnostics,
        }
    }

    fn emit(&mut self, event: PlaybackEvent) {
        if let Some(notify) = self.notifier.as_mut() {
            notify(event);
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.session.finish();
        let at = self.clock.now();
        self.emit(PlaybackEvent::Finished(at));
        self.diagnostics.push(CallbackEvent::PlaybackFinished {
            samples: self.cursor,
            timestamp: at,
        });
    }
}

impl OutputRenderer for BeepRenderer {
    fn render(&mut self, out: &mut [i16]) -> CallbackAction {
        // Real-time audio callback - NO ALLOCATIONS, LOCKS, OR LOGGING!
        self.diagnostics.record_callback(out.len());

        if self.finished {
            out.fill(0);
            return CallbackAction::Stop;
        }

        if !self.started {
            self.started = true;
            let at = self.clock.now();
            self.emit(PlaybackEvent::Started(at));
            self.diagnostics
                .push(CallbackEvent::PlaybackStarted { timestamp: at });
        }

        let samples = self.source.as_slice();
        let count = (samples.len() - self.cursor).min(out.len());
        out[..count].copy_from_slice(&samples[self.cursor..self.cursor + count]);
        self.cursor += count;

        if count < out.len() {
            out[count..].fill(0);
            self.finish();
            return CallbackAction::Stop;
        }

        CallbackAction::Continue
    }

    fn on_stream_error(&mut self, error: StreamErrorInfo) {
        self.diagnostics.record_error();
        self.diagnostics.push(CallbackEvent::StreamError {
            phase: error.phase,
            code: error.code,
        });

        if error.phase == ErrorPhase::AfterClose && !self.finished {
            self.finished = true;
            if self.session.fail(error.code) {
                let at = self.clock.now();
                self.emit(PlaybackEvent::StreamError {
                    code: error.code,
                    at,
                });
            }
        }
    }
}
