//! Mic capture - real-time input callback state
//!
//! Every non-empty input buffer is copied into a freshly allocated
//! [`CapturedFrame`] and handed to the consumer, which takes ownership.

use std::sync::Arc;

use crate::engine::backend::{CallbackAction, ErrorPhase, InputConsumer, StreamErrorInfo};
use crate::telemetry::{CallbackEvent, DiagnosticsProducer};

use super::frame::CapturedFrame;
use super::session::SessionTracker;

/// Receiver of captured frames; runs on the audio thread
pub type FrameSink = Box<dyn FnMut(CapturedFrame) + Send>;

/// Receiver of the backend error code when the stream is closed on error
pub type CloseErrorSink = Box<dyn FnMut(i32) + Send>;

/// Input callback state for one capture session
pub struct FrameForwarder {
    on_frame: FrameSink,
    on_close_error: Option<CloseErrorSink>,
    session: Arc<SessionTracker>,
    diagnostics: DiagnosticsProducer,
}

impl FrameForwarder {
    pub fn new(
        on_frame: FrameSink,
        on_close_error: Option<CloseErrorSink>,
        session: Arc<SessionTracker>,
        diagnostics: DiagnosticsProducer,
    ) -> Self {
        Self {
            on_frame,
            on_close_error,
            session,
            diagnostics,
        }
    }
}

impl InputConsumer for FrameForwarder {
    fn consume(&mut self, input: &[f32]) -> CallbackAction {
        self.diagnostics.record_callback(input.len());
        if input.is_empty() {
            return CallbackAction::Continue;
        }

        match CapturedFrame::copy_from(input) {
            Some(frame) => (self.on_frame)(frame),
            None => {
                self.diagnostics.record_dropped_frames(input.len());
                self.diagnostics.push(CallbackEvent::FrameDropped {
                    frames: input.len(),
                });
            }
        }
        CallbackAction::Continue
    }

    fn on_stream_error(&mut self, error: StreamErrorInfo) {
        self.diagnostics.record_error();
        self.diagnostics.push(CallbackEvent::StreamError {
            phase: error.phase,
            code: error.code,
        });

        if error.phase == ErrorPhase::AfterClose && self.session.fail(error.code) {
            if let Some(notify) = self.on_close_error.as_mut() {
                notify(error.code);
            }
        }
    }
}
