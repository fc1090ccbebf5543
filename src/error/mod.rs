// Error types for the native audio bridge
//
// This module defines the error type shared by the playback and capture
// engines, providing structured error handling with error codes suitable
// for FFI communication.

mod audio;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the FFI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Status returned by every C entry point on success
pub const STATUS_OK: i32 = 0;

/// Status returned by every C entry point on failure
pub const STATUS_FAILED: i32 = 1;

/// Collapse a control-thread result into the 0/1 status of the C ABI
pub fn to_status<T>(result: &Result<T, AudioError>) -> i32 {
    match result {
        Ok(_) => STATUS_OK,
        Err(_) => STATUS_FAILED,
    }
}
