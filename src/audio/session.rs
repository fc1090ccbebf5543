//! Session state machine shared by the playback and capture engines.
//!
//! ```text
//! Idle ──start──> Open ──started──> Running ──stop/error/end──> Stopped
//!   ^               │                                              │
//!   └──open failed──┘<───────────────── teardown ───────────────────┘
//! ```
//!
//! The state lives in an `AtomicU8` so the real-time callback can mark a
//! session finished without taking the control-thread lock.

use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};

use crate::error::AudioError;

/// Lifecycle state of one stream session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Open = 1,
    Running = 2,
    Stopped = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Open,
            2 => SessionState::Running,
            3 => SessionState::Stopped,
            _ => SessionState::Idle,
        }
    }

    /// True while a stream handle is held open
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Open | SessionState::Running)
    }

    fn allows(self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Idle, Open) | (Open, Idle) | (Open, Running) | (Open, Stopped) | (Running, Stopped) | (Stopped, Idle)
        )
    }
}

/// Atomic holder for a [`SessionState`]
///
/// Shared via `Arc` between the engine (control thread) and the stream
/// callbacks (real-time thread).
#[derive(Debug)]
pub struct SessionTracker {
    state: AtomicU8,
    /// Backend error code that closed the session, 0 if none
    error_code: AtomicI32,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Idle as u8),
            error_code: AtomicI32::new(0),
        }
    }

    pub fn get(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`, rejecting transitions the machine does not
    /// allow and transitions raced by another thread.
    pub fn transition(&self, from: SessionState, to: SessionState) -> Result<(), AudioError> {
        if !from.allows(to) {
            return Err(AudioError::InvalidState { from, to });
        }
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| AudioError::InvalidState {
                from: SessionState::from_u8(actual),
                to,
            })
    }

    /// Mark the session finished from any active state.
    ///
    /// Lock-free and allocation-free; safe on the audio thread. Returns
    /// `true` only for the call that performed the transition.
    pub fn finish(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if !SessionState::from_u8(current).is_active() {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                SessionState::Stopped as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Mark the session finished because the stream failed with `code`.
    ///
    /// Same guarantees as [`SessionTracker::finish`].
    pub fn fail(&self, code: i32) -> bool {
        if !self.get().is_active() {
            return false;
        }
        self.error_code.store(code, Ordering::Release);
        self.finish()
    }

    /// Error code recorded by [`SessionTracker::fail`]
    pub fn error_code(&self) -> Option<i32> {
        match self.error_code.load(Ordering::Acquire) {
            0 => None,
            code => Some(code),
        }
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}
