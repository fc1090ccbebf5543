//! Event types carried from the real-time callbacks to the reporter thread.

use serde::{Deserialize, Serialize};

use crate::engine::backend::{ErrorPhase, WallTime};

/// Library lifecycle stages reported by JNI/engine instrumentation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    LibraryLoaded,
    ContextInitialized,
    StreamDefaultsLoaded,
}

/// Something worth logging that happened on the audio thread.
///
/// `Copy` and heap-free so it can be pushed from the callback without
/// allocating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum CallbackEvent {
    PlaybackStarted {
        timestamp: WallTime,
    },
    PlaybackFinished {
        samples: usize,
        timestamp: WallTime,
    },
    FrameDropped {
        frames: usize,
    },
    StreamError {
        phase: ErrorPhase,
        code: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let event = CallbackEvent::StreamError {
            phase: ErrorPhase::AfterClose,
            code: -899,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"stream_error","payload":{"phase":"after_close","code":-899}}"#
        );
    }

    #[test]
    fn test_lifecycle_phase_names() {
        let json = serde_json::to_string(&LifecyclePhase::ContextInitialized).unwrap();
        assert_eq!(json, "\"context_initialized\"");
    }
}
