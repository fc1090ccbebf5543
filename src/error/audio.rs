// Audio error types and constants

use crate::audio::session::SessionState;
use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants exposed to the managed caller
///
/// These constants are the values returned by `audio_bridge_last_error()`
/// and are mirrored in `include/android_audio_oboe.h`.
///
/// Error code range: 1002-1012
pub struct AudioErrorCodes;

impl AudioErrorCodes {
    /// A session is already open or running
    pub const ALREADY_RUNNING: i32 = 1002;

    /// No session is open or running
    pub const NOT_RUNNING: i32 = 1003;

    /// The audio stack refused a start/stop request
    pub const HARDWARE_ERROR: i32 = 1004;

    /// Failed to open audio stream
    pub const STREAM_OPEN_FAILED: i32 = 1006;

    /// Mutex was poisoned
    pub const LOCK_POISONED: i32 = 1007;

    /// Audio stream disconnected or closed by the audio stack
    pub const STREAM_FAILURE: i32 = 1010;

    /// Caller passed a null pointer or a negative length
    pub const INVALID_ARGUMENT: i32 = 1011;

    /// Requested session transition is not allowed from the current state
    pub const INVALID_STATE: i32 = 1012;
}

/// Log an audio error with structured context
///
/// This function logs audio errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - context: The entry point where the error surfaced
/// - message: Human-readable error message
///
/// Only ever called from control threads, never from a data callback.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=AudioBridge, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover stream lifecycle operations on both engines.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// A session is already open or running
    AlreadyRunning,

    /// No session is open or running
    NotRunning,

    /// Start or stop request rejected by the audio stack
    HardwareError { details: String },

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Mutex was poisoned
    LockPoisoned { component: String },

    /// Stream closed by the audio stack (disconnect, device loss)
    StreamFailure { reason: String },

    /// Null pointer or out-of-range argument from the caller
    InvalidArgument { reason: String },

    /// Session state machine rejected the transition
    InvalidState { from: SessionState, to: SessionState },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::AlreadyRunning => AudioErrorCodes::ALREADY_RUNNING,
            AudioError::NotRunning => AudioErrorCodes::NOT_RUNNING,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
            AudioError::StreamFailure { .. } => AudioErrorCodes::STREAM_FAILURE,
            AudioError::InvalidArgument { .. } => AudioErrorCodes::INVALID_ARGUMENT,
            AudioError::InvalidState { .. } => AudioErrorCodes::INVALID_STATE,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::AlreadyRunning => {
                "Audio session already running. Call stop first.".to_string()
            }
            AudioError::NotRunning => "Audio session not running. Call start first.".to_string(),
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            AudioError::StreamFailure { reason } => {
                format!("Audio stream failed: {}", reason)
            }
            AudioError::InvalidArgument { reason } => {
                format!("Invalid argument: {}", reason)
            }
            AudioError::InvalidState { from, to } => {
                format!("Invalid session transition {:?} -> {:?}", from, to)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_codes() {
        assert_eq!(
            AudioError::AlreadyRunning.code(),
            AudioErrorCodes::ALREADY_RUNNING
        );
        assert_eq!(AudioError::NotRunning.code(), AudioErrorCodes::NOT_RUNNING);
        assert_eq!(
            AudioError::HardwareError {
                details: "test".to_string()
            }
            .code(),
            AudioErrorCodes::HARDWARE_ERROR
        );
        assert_eq!(
            AudioError::StreamOpenFailed {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::STREAM_OPEN_FAILED
        );
        assert_eq!(
            AudioError::LockPoisoned {
                component: "test".to_string()
            }
            .code(),
            AudioErrorCodes::LOCK_POISONED
        );
        assert_eq!(
            AudioError::StreamFailure {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::STREAM_FAILURE
        );
        assert_eq!(
            AudioError::InvalidArgument {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::INVALID_ARGUMENT
        );
        assert_eq!(
            AudioError::InvalidState {
                from: SessionState::Idle,
                to: SessionState::Stopped,
            }
            .code(),
            AudioErrorCodes::INVALID_STATE
        );
    }

    #[test]
    fn test_audio_error_messages() {
        let err = AudioError::AlreadyRunning;
        assert!(err.message().contains("already running"));

        let err = AudioError::NotRunning;
        assert!(err.message().contains("not running"));

        let err = AudioError::HardwareError {
            details: "test error".to_string(),
        };
        assert_eq!(err.message(), "Hardware error: test error");

        let err = AudioError::InvalidState {
            from: SessionState::Idle,
            to: SessionState::Stopped,
        };
        assert_eq!(err.message(), "Invalid session transition Idle -> Stopped");
    }

    #[test]
    fn test_audio_error_display() {
        let err = AudioError::NotRunning;
        let display = format!("{}", err);
        assert!(display.contains("AudioError"));
        assert!(display.contains(&err.code().to_string()));
    }

    #[test]
    fn test_status_collapse() {
        use crate::error::{to_status, STATUS_FAILED, STATUS_OK};

        assert_eq!(to_status::<()>(&Ok(())), STATUS_OK);
        assert_eq!(to_status::<()>(&Err(AudioError::NotRunning)), STATUS_FAILED);
    }
}
