use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::{InputStreamSpec, OutputStreamSpec};
use crate::error::AudioError;

use super::{
    AudioBackend, CallbackAction, ErrorPhase, InputConsumer, OutputRenderer, StreamErrorInfo,
    StreamHandle, StreamInfo, TimeSource, WallTime,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Output,
    Input,
}

#[derive(Default)]
struct StubState {
    output: Option<Box<dyn OutputRenderer>>,
    input: Option<Box<dyn InputConsumer>>,
    output_spec: Option<OutputStreamSpec>,
    input_spec: Option<InputStreamSpec>,
    output_started: bool,
    input_started: bool,
    output_generation: u64,
    input_generation: u64,
    opened_outputs: usize,
    opened_inputs: usize,
    stop_requests: usize,
    fail_next_open: Option<AudioError>,
    fail_next_start: Option<AudioError>,
    fail_next_stop: Option<AudioError>,
}

/// Deterministic in-process backend used by tests and the desktop harness.
///
/// Streams never touch hardware. Tests drive the registered callbacks by
/// hand with [`StubBackend::pump_output`] / [`StubBackend::push_input`],
/// exactly as the audio thread would, and can inject open/start/stop and
/// transport failures.
#[derive(Clone, Default)]
pub struct StubBackend {
    state: Arc<Mutex<StubState>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        // A panicking test thread must not cascade into unrelated assertions
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the next `open_output`/`open_input` fail with `err`
    pub fn fail_next_open(&self, err: AudioError) {
        self.lock().fail_next_open = Some(err);
    }

    /// Make the next `StreamHandle::start` fail with `err`
    pub fn fail_next_start(&self, err: AudioError) {
        self.lock().fail_next_start = Some(err);
    }

    /// Make the next `StreamHandle::stop` fail with `err`
    pub fn fail_next_stop(&self, err: AudioError) {
        self.lock().fail_next_stop = Some(err);
    }

    /// Invoke the output data callback for `frames` frames.
    ///
    /// Returns `None` when no started output stream exists.
    pub fn pump_output(&self, frames: usize) -> Option<(Vec<i16>, CallbackAction)> {
        let mut state = self.lock();
        if !state.output_started {
            return None;
        }
        let renderer = state.output.as_mut()?;
        // Poison the buffer so untouched samples are visible in assertions
        let mut buffer = vec![i16::MIN; frames];
        let action = renderer.render(&mut buffer);
        Some((buffer, action))
    }

    /// Invoke the input data callback with `samples`.
    pub fn push_input(&self, samples: &[f32]) -> Option<CallbackAction> {
        let mut state = self.lock();
        if !state.input_started {
            return None;
        }
        let consumer = state.input.as_mut()?;
        Some(consumer.consume(samples))
    }

    /// Deliver a transport error to the open output stream's callbacks
    pub fn raise_output_error(&self, code: i32) -> bool {
        let mut state = self.lock();
        match state.output.as_mut() {
            Some(renderer) => {
                for phase in [ErrorPhase::BeforeClose, ErrorPhase::AfterClose] {
                    renderer.on_stream_error(StreamErrorInfo { phase, code });
                }
                state.output_started = false;
                true
            }
            None => false,
        }
    }

    /// Deliver a transport error to the open input stream's callbacks
    pub fn raise_input_error(&self, code: i32) -> bool {
        let mut state = self.lock();
        match state.input.as_mut() {
            Some(consumer) => {
                for phase in [ErrorPhase::BeforeClose, ErrorPhase::AfterClose] {
                    consumer.on_stream_error(StreamErrorInfo { phase, code });
                }
                state.input_started = false;
                true
            }
            None => false,
        }
    }

    pub fn last_output_spec(&self) -> Option<OutputStreamSpec> {
        self.lock().output_spec
    }

    pub fn last_input_spec(&self) -> Option<InputStreamSpec> {
        self.lock().input_spec
    }

    pub fn opened_outputs(&self) -> usize {
        self.lock().opened_outputs
    }

    pub fn opened_inputs(&self) -> usize {
        self.lock().opened_inputs
    }

    pub fn stop_requests(&self) -> usize {
        self.lock().stop_requests
    }

    /// True while an output stream handle is alive (not yet dropped)
    pub fn has_output_stream(&self) -> bool {
        self.lock().output.is_some()
    }

    /// True while an input stream handle is alive (not yet dropped)
    pub fn has_input_stream(&self) -> bool {
        self.lock().input.is_some()
    }
}

impl AudioBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn open_output(
        &self,
        spec: &OutputStreamSpec,
        renderer: Box<dyn OutputRenderer>,
    ) -> Result<Box<dyn StreamHandle>, AudioError> {
        let mut state = self.lock();
        if let Some(err) = state.fail_next_open.take() {
            return Err(err);
        }
        state.output = Some(renderer);
        state.output_spec = Some(*spec);
        state.output_started = false;
        state.output_generation += 1;
        state.opened_outputs += 1;

        Ok(Box::new(StubStream {
            state: Arc::clone(&self.state),
            direction: Direction::Output,
            generation: state.output_generation,
        }))
    }

    fn open_input(
        &self,
        spec: &InputStreamSpec,
        consumer: Box<dyn InputConsumer>,
    ) -> Result<Box<dyn StreamHandle>, AudioError> {
        let mut state = self.lock();
        if let Some(err) = state.fail_next_open.take() {
            return Err(err);
        }
        state.input = Some(consumer);
        state.input_spec = Some(*spec);
        state.input_started = false;
        state.input_generation += 1;
        state.opened_inputs += 1;

        Ok(Box::new(StubStream {
            state: Arc::clone(&self.state),
            direction: Direction::Input,
            generation: state.input_generation,
        }))
    }
}

struct StubStream {
    state: Arc<Mutex<StubState>>,
    direction: Direction,
    generation: u64,
}

impl StubStream {
    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_current(&self, state: &StubState) -> bool {
        match self.direction {
            Direction::Output => state.output_generation == self.generation,
            Direction::Input => state.input_generation == self.generation,
        }
    }
}

impl StreamHandle for StubStream {
    fn start(&mut self) -> Result<(), AudioError> {
        let mut state = self.lock();
        if let Some(err) = state.fail_next_start.take() {
            return Err(err);
        }
        if self.is_current(&state) {
            match self.direction {
                Direction::Output => state.output_started = true,
                Direction::Input => state.input_started = true,
            }
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        let mut state = self.lock();
        state.stop_requests += 1;
        if let Some(err) = state.fail_next_stop.take() {
            return Err(err);
        }
        if self.is_current(&state) {
            match self.direction {
                Direction::Output => state.output_started = false,
                Direction::Input => state.input_started = false,
            }
        }
        Ok(())
    }

    fn info(&mut self) -> StreamInfo {
        let state = self.lock();
        let (sample_rate_hz, frames_per_callback) = match self.direction {
            Direction::Output => (48_000, 0),
            Direction::Input => state
                .input_spec
                .map(|spec| (spec.sample_rate_hz, spec.frames_per_callback))
                .unwrap_or((0, 0)),
        };
        StreamInfo {
            sample_rate_hz,
            frames_per_callback,
            latency_ms: None,
        }
    }
}

impl Drop for StubStream {
    fn drop(&mut self) {
        let mut state = self.lock();
        if self.is_current(&state) {
            match self.direction {
                Direction::Output => {
                    state.output = None;
                    state.output_started = false;
                }
                Direction::Input => {
                    state.input = None;
                    state.input_started = false;
                }
            }
        }
    }
}

/// Deterministic time source for tests.
///
/// Each call to `now()` advances by a fixed 10ms to guarantee strictly
/// increasing timestamps.
pub struct StubTimeSource {
    offset_us: AtomicI64,
}

impl StubTimeSource {
    pub fn new() -> Self {
        Self {
            offset_us: AtomicI64::new(0),
        }
    }
}

impl Default for StubTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for StubTimeSource {
    fn now(&self) -> WallTime {
        let us = self.offset_us.fetch_add(10_000, Ordering::SeqCst);
        WallTime {
            sec: us / 1_000_000,
            usec: us % 1_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting {
        calls: usize,
    }

    impl OutputRenderer for Counting {
        fn render(&mut self, out: &mut [i16]) -> CallbackAction {
            self.calls += 1;
            out.fill(self.calls as i16);
            CallbackAction::Continue
        }

        fn on_stream_error(&mut self, _error: StreamErrorInfo) {}
    }

    #[test]
    fn test_pump_requires_started_stream() {
        let backend = StubBackend::new();
        let mut stream = backend
            .open_output(&OutputStreamSpec::default(), Box::new(Counting { calls: 0 }))
            .unwrap();

        assert!(backend.pump_output(4).is_none());
        stream.start().unwrap();
        let (buffer, action) = backend.pump_output(4).unwrap();
        assert_eq!(buffer, vec![1; 4]);
        assert_eq!(action, CallbackAction::Continue);
    }

    #[test]
    fn test_dropping_stream_releases_callbacks() {
        let backend = StubBackend::new();
        let stream = backend
            .open_output(&OutputStreamSpec::default(), Box::new(Counting { calls: 0 }))
            .unwrap();
        assert!(backend.has_output_stream());

        drop(stream);
        assert!(!backend.has_output_stream());
    }

    #[test]
    fn test_injected_failures_fire_once() {
        let backend = StubBackend::new();
        backend.fail_next_open(AudioError::StreamOpenFailed {
            reason: "busy".to_string(),
        });

        let first = backend.open_output(&OutputStreamSpec::default(), Box::new(Counting { calls: 0 }));
        assert!(first.is_err());

        let second = backend.open_output(&OutputStreamSpec::default(), Box::new(Counting { calls: 0 }));
        assert!(second.is_ok());
        assert_eq!(backend.opened_outputs(), 1);
    }

    #[test]
    fn test_stub_time_source_advances() {
        let clock = StubTimeSource::new();
        assert_eq!(clock.now(), WallTime { sec: 0, usec: 0 });
        assert_eq!(clock.now(), WallTime { sec: 0, usec: 10_000 });
        for _ in 0..98 {
            clock.now();
        }
        assert_eq!(clock.now(), WallTime { sec: 1, usec: 0 });
    }
}
