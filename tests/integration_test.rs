//! Integration tests for BridgeContext
//!
//! These tests drive both engines end to end against the deterministic stub
//! backend, pumping the stream callbacks by hand the way the audio thread
//! would:
//! - Playback delivery order, end-of-data and event ordering
//! - Capture frame fidelity and configuration snapshots
//! - Lifecycle guards (double start, stop without start, repeated cycles)

use std::sync::{Arc, Mutex};

use android_audio_oboe::audio::playback::{
    PlaybackEvent, SampleSource, EVENT_FINISHED, EVENT_STARTED, EVENT_STREAM_ERROR,
};
use android_audio_oboe::audio::{CapturedFrame, SessionState};
use android_audio_oboe::config::CaptureConfig;
use android_audio_oboe::engine::backend::{CallbackAction, ERROR_DISCONNECTED};
use android_audio_oboe::engine::{StubBackend, StubTimeSource};
use android_audio_oboe::error::{AudioError, AudioErrorCodes};
use android_audio_oboe::BridgeContext;

static BEEP: [i16; 10] = [100, -100, 200, -200, 300, -300, 400, -400, 500, -500];

fn stub_context() -> (BridgeContext, StubBackend) {
    let backend = StubBackend::new();
    let ctx = BridgeContext::with_backend(
        Arc::new(backend.clone()),
        Arc::new(StubTimeSource::new()),
    );
    (ctx, backend)
}

type EventLog = Arc<Mutex<Vec<PlaybackEvent>>>;

fn play_logged(ctx: &BridgeContext) -> EventLog {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    ctx.play(Some(Box::new(move |event: PlaybackEvent| {
        sink.lock().unwrap().push(event)
    })))
    .unwrap();
    log
}

fn codes(log: &EventLog) -> Vec<i32> {
    log.lock().unwrap().iter().map(PlaybackEvent::code).collect()
}

/// Pump output callbacks of `frames` until the renderer asks to stop
fn drain_output(backend: &StubBackend, frames: usize) -> Vec<i16> {
    let mut played = Vec::new();
    for _ in 0..64 {
        let (buffer, action) = backend.pump_output(frames).expect("output stream running");
        played.extend_from_slice(&buffer);
        if action == CallbackAction::Stop {
            return played;
        }
    }
    panic!("playback never ended");
}

type FrameLog = Arc<Mutex<Vec<Vec<f32>>>>;

fn record_logged(ctx: &BridgeContext) -> FrameLog {
    let log: FrameLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    ctx.start_capture(
        Box::new(move |frame: CapturedFrame| sink.lock().unwrap().push(frame.as_slice().to_vec())),
        None,
    )
    .unwrap();
    log
}

// ============================================================================
// PLAYBACK
// ============================================================================

#[test]
fn test_playback_delivers_every_sample_in_order() {
    let (ctx, backend) = stub_context();
    ctx.load_samples(SampleSource::from_static(&BEEP)).unwrap();
    let log = play_logged(&ctx);

    let played = drain_output(&backend, 3);

    // 10 samples over callbacks of 3: the fourth callback ends playback
    assert_eq!(played.len(), 12);
    assert_eq!(&played[..10], &BEEP);
    assert_eq!(&played[10..], &[0, 0]);
    assert_eq!(codes(&log), vec![EVENT_STARTED, EVENT_FINISHED]);
    assert_eq!(ctx.playback().state().unwrap(), SessionState::Stopped);
}

#[test]
fn test_playback_events_are_ordered_in_time() {
    let (ctx, backend) = stub_context();
    ctx.load_samples(SampleSource::from_static(&BEEP)).unwrap();
    let log = play_logged(&ctx);
    drain_output(&backend, 4);

    let events = log.lock().unwrap();
    assert_eq!(events.len(), 2);
    let start = events[0].timestamp();
    let end = events[1].timestamp();
    assert!((end.sec, end.usec) > (start.sec, start.usec));
}

#[test]
fn test_empty_buffer_ends_on_first_callback() {
    let (ctx, backend) = stub_context();
    ctx.load_samples(SampleSource::empty()).unwrap();
    let log = play_logged(&ctx);

    let (buffer, action) = backend.pump_output(8).unwrap();
    assert_eq!(buffer, vec![0; 8]);
    assert_eq!(action, CallbackAction::Stop);
    assert_eq!(codes(&log), vec![EVENT_STARTED, EVENT_FINISHED]);
}

#[test]
fn test_repeated_playback_restarts_from_the_top() {
    let (ctx, backend) = stub_context();
    ctx.load_samples(SampleSource::from_static(&BEEP)).unwrap();

    for _ in 0..3 {
        let log = play_logged(&ctx);
        let played = drain_output(&backend, 5);
        assert_eq!(&played[..10], &BEEP);
        assert_eq!(codes(&log), vec![EVENT_STARTED, EVENT_FINISHED]);
    }
    assert_eq!(backend.opened_outputs(), 3);
}

#[test]
fn test_double_play_reports_already_running() {
    let (ctx, backend) = stub_context();
    ctx.load_samples(SampleSource::from_static(&BEEP)).unwrap();
    let _log = play_logged(&ctx);

    assert_eq!(ctx.play(None).unwrap_err(), AudioError::AlreadyRunning);
    assert_eq!(ctx.last_error(), AudioErrorCodes::ALREADY_RUNNING);
    assert_eq!(backend.opened_outputs(), 1);
}

#[test]
fn test_playback_stream_error_signals_caller() {
    let (ctx, backend) = stub_context();
    ctx.load_samples(SampleSource::from_static(&BEEP)).unwrap();
    let log = play_logged(&ctx);
    backend.pump_output(2).unwrap();

    backend.raise_output_error(ERROR_DISCONNECTED);

    assert_eq!(codes(&log), vec![EVENT_STARTED, EVENT_STREAM_ERROR]);
    assert!(matches!(
        ctx.stop_playback().unwrap_err(),
        AudioError::StreamFailure { .. }
    ));
    assert_eq!(ctx.last_error(), AudioErrorCodes::STREAM_FAILURE);

    // The engine recovers with a fresh session
    let log = play_logged(&ctx);
    drain_output(&backend, 16);
    assert_eq!(codes(&log), vec![EVENT_STARTED, EVENT_FINISHED]);
}

// ============================================================================
// CAPTURE
// ============================================================================

#[test]
fn test_capture_delivers_exact_copies() {
    let (ctx, backend) = stub_context();
    let log = record_logged(&ctx);

    let first: Vec<f32> = (0..256).map(|i| i as f32 / 256.0).collect();
    let second = vec![-0.75_f32; 64];
    backend.push_input(&first).unwrap();
    backend.push_input(&second).unwrap();

    let frames = log.lock().unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], first);
    assert_eq!(frames[1], second);
}

#[test]
fn test_configure_after_start_only_affects_next_session() {
    let (ctx, backend) = stub_context();
    ctx.configure_capture(CaptureConfig {
        sample_rate_hz: 44_100,
        frames_per_callback: 128,
        device_id: 2,
    })
    .unwrap();
    let _log = record_logged(&ctx);

    ctx.configure_capture(CaptureConfig {
        sample_rate_hz: 8_000,
        frames_per_callback: 0,
        device_id: 0,
    })
    .unwrap();
    let open_spec = backend.last_input_spec().unwrap();
    assert_eq!(open_spec.sample_rate_hz, 44_100);
    assert_eq!(open_spec.frames_per_callback, 128);
    assert_eq!(open_spec.device_id, 2);

    ctx.stop_capture().unwrap();
    let _log = record_logged(&ctx);
    assert_eq!(backend.last_input_spec().unwrap().sample_rate_hz, 8_000);
}

#[test]
fn test_stop_recording_without_start_fails() {
    let (ctx, _) = stub_context();
    assert_eq!(ctx.stop_capture().unwrap_err(), AudioError::NotRunning);
    assert_eq!(ctx.last_error(), AudioErrorCodes::NOT_RUNNING);
}

#[test]
fn test_repeated_capture_cycles_are_isolated() {
    let (ctx, backend) = stub_context();

    for cycle in 0..3 {
        let log = record_logged(&ctx);
        backend.push_input(&[cycle as f32; 4]).unwrap();
        ctx.stop_capture().unwrap();

        assert!(backend.push_input(&[9.0]).is_none());
        assert_eq!(*log.lock().unwrap(), vec![vec![cycle as f32; 4]]);
    }
    assert_eq!(ctx.capture().state().unwrap(), SessionState::Idle);
}

#[test]
fn test_double_start_recording_reports_already_running() {
    let (ctx, _) = stub_context();
    let _log = record_logged(&ctx);

    let err = ctx
        .start_capture(Box::new(|_frame: CapturedFrame| {}), None)
        .unwrap_err();
    assert_eq!(err, AudioError::AlreadyRunning);
}

#[test]
fn test_engines_are_independent() {
    let (ctx, backend) = stub_context();
    ctx.load_samples(SampleSource::from_static(&BEEP)).unwrap();
    let events = play_logged(&ctx);
    let frames = record_logged(&ctx);

    backend.push_input(&[0.5; 8]).unwrap();
    ctx.stop_capture().unwrap();
    drain_output(&backend, 10);

    assert_eq!(frames.lock().unwrap().len(), 1);
    assert_eq!(codes(&events), vec![EVENT_STARTED, EVENT_FINISHED]);
}
