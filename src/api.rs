// Public C ABI for the managed-runtime caller
// Every entry point returns 0 on success and 1 on failure; the failure code
// is available from `audio_bridge_last_error`.

use once_cell::sync::Lazy;

use crate::audio::capture::CloseErrorSink;
use crate::audio::frame::{self, CapturedFrame};
use crate::audio::playback::{EventSink, PlaybackEvent, SampleSource};
use crate::config::CaptureConfig;
use crate::context::BridgeContext;
use crate::error::{to_status, AudioError, STATUS_OK};

// Re-export error code constants for FFI exposure
pub use crate::error::AudioErrorCodes;

/// Version of the function table below, bumped on any signature change
pub const ABI_VERSION: i32 = 2;

/// Playback notification: `(event_code, timestamp_sec, timestamp_usec)`
pub type PlaybackEventCallback = extern "C" fn(i32, i64, i64);

/// Captured frame consumer: `(samples, frame_count)`; the callee owns `samples`
pub type FrameCallback = extern "C" fn(*mut f32, i32);

/// Stream-closed-by-error notification carrying the backend error code
pub type CloseErrorCallback = extern "C" fn(i32);

/// Global BridgeContext instance backing the C entry points
static CONTEXT: Lazy<BridgeContext> = Lazy::new(BridgeContext::new);

fn playback_sink(callback: PlaybackEventCallback) -> impl FnMut(PlaybackEvent) + Send {
    move |event: PlaybackEvent| {
        let at = event.timestamp();
        callback(event.code(), at.sec, at.usec);
    }
}

fn frame_sink(callback: FrameCallback) -> impl FnMut(CapturedFrame) + Send {
    move |frame: CapturedFrame| {
        let (samples, frames) = frame.into_raw();
        callback(samples, frames as i32);
    }
}

/// Store a reference to the caller's 16-bit mono beep buffer.
///
/// # Safety
/// `samples` must point to `length` samples that stay valid and unchanged
/// until the next call or process exit.
#[no_mangle]
pub unsafe extern "C" fn load_beep_data(samples: *const i16, length: i32) -> i32 {
    let result = SampleSource::from_raw(samples, length).map_err(|err| {
        crate::error::log_audio_error(&err, "load_beep_data");
        err
    });
    let result = CONTEXT.record(result).and_then(|source| CONTEXT.load_samples(source));
    to_status(&result)
}

/// Play the loaded buffer from the start.
///
/// `on_event` (nullable) receives 1 on the first callback, 2 when the buffer
/// is exhausted and 3 when the audio stack closes the stream on error.
#[no_mangle]
pub extern "C" fn my_play_beep(on_event: Option<PlaybackEventCallback>) -> i32 {
    let notifier = on_event.map(|callback| Box::new(playback_sink(callback)) as EventSink);
    to_status(&CONTEXT.play(notifier))
}

/// Stop playback before the buffer is exhausted.
#[no_mangle]
pub extern "C" fn stop_beep() -> i32 {
    to_status(&CONTEXT.stop_playback())
}

/// Configure the next recording session. Always returns 0.
#[no_mangle]
pub extern "C" fn oboe_options(sample_rate_hz: i32, frames_per_callback: i32, device_id: i32) -> i32 {
    let config = CaptureConfig {
        sample_rate_hz,
        frames_per_callback,
        device_id,
    };
    // Only lock poisoning can fail here; it is recorded for last_error
    let _ = CONTEXT.configure_capture(config);
    STATUS_OK
}

/// Start recording. Each callback buffer is copied into a `malloc`
/// allocation passed to `on_frame`, which must release it with `free` or
/// [`release_recorded_frame`].
#[no_mangle]
pub extern "C" fn start_recording(
    on_frame: Option<FrameCallback>,
    on_close_error: Option<CloseErrorCallback>,
) -> i32 {
    let Some(on_frame) = on_frame else {
        let err = AudioError::InvalidArgument {
            reason: "null frame callback".to_string(),
        };
        crate::error::log_audio_error(&err, "start_recording");
        return to_status(&CONTEXT.record(Err::<(), _>(err)));
    };
    let on_close_error = on_close_error
        .map(|callback| Box::new(move |code: i32| callback(code)) as CloseErrorSink);
    to_status(&CONTEXT.start_capture(Box::new(frame_sink(on_frame)), on_close_error))
}

/// Stop recording.
#[no_mangle]
pub extern "C" fn stop_recording() -> i32 {
    to_status(&CONTEXT.stop_capture())
}

/// Release a frame delivered to the `start_recording` callback.
///
/// # Safety
/// `samples` must be null or a frame pointer not released before.
#[no_mangle]
pub unsafe extern "C" fn release_recorded_frame(samples: *mut f32) {
    frame::release_raw(samples);
}

/// Code of the most recent failure, 0 if none (see `AudioErrorCodes`).
#[no_mangle]
pub extern "C" fn audio_bridge_last_error() -> i32 {
    CONTEXT.last_error()
}

#[no_mangle]
pub extern "C" fn audio_bridge_abi_version() -> i32 {
    ABI_VERSION
}
