//! Oboe backend - Android low-latency streams via oboe-rs
//!
//! # Architecture
//! ```text
//! PlaybackEngine::play() / CaptureEngine::start()
//!   └─> OboeBackend::open_output() / open_input()
//!       └─> oboe::AudioStreamBuilder::set_callback(OboeOutput / OboeInput)
//!           └─> on_audio_ready() [Real-time thread]
//!               └─> OutputRenderer::render() / InputConsumer::consume()
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};
use oboe::{
    AudioDeviceDirection, AudioDeviceInfo, AudioFormat, AudioInputCallback, AudioInputStreamSafe,
    AudioOutputCallback, AudioOutputStreamSafe, AudioStream, AudioStreamAsync, AudioStreamBase,
    AudioStreamBuilder, AudioStreamSafe, DataCallbackResult, Input, InputPreset, Output,
};

use crate::config::{InputStreamSpec, OutputStreamSpec, PerformanceMode, SharingMode};
use crate::error::AudioError;

use super::{
    AudioBackend, CallbackAction, ErrorPhase, InputConsumer, OutputRenderer, StreamErrorInfo,
    StreamHandle, StreamInfo,
};

/// Set once `JNI_OnLoad` has registered the Android context with
/// ndk-context; device enumeration goes through JNI and needs it.
static CONTEXT_READY: AtomicBool = AtomicBool::new(false);

pub fn mark_android_context_ready() {
    CONTEXT_READY.store(true, Ordering::Release);
}

fn sharing_mode(mode: SharingMode) -> oboe::SharingMode {
    match mode {
        SharingMode::Exclusive => oboe::SharingMode::Exclusive,
        SharingMode::Shared => oboe::SharingMode::Shared,
    }
}

fn performance_mode(mode: PerformanceMode) -> oboe::PerformanceMode {
    match mode {
        PerformanceMode::LowLatency => oboe::PerformanceMode::LowLatency,
        PerformanceMode::PowerSaving => oboe::PerformanceMode::PowerSaving,
        PerformanceMode::None => oboe::PerformanceMode::None,
    }
}

fn callback_result(action: CallbackAction) -> DataCallbackResult {
    match action {
        CallbackAction::Continue => DataCallbackResult::Continue,
        CallbackAction::Stop => DataCallbackResult::Stop,
    }
}

/// Adapts an [`OutputRenderer`] to oboe's output callback
struct OboeOutput {
    renderer: Box<dyn OutputRenderer>,
}

impl AudioOutputCallback for OboeOutput {
    type FrameType = (i16, oboe::Mono);

    fn on_error_before_close(
        &mut self,
        _audio_stream: &mut dyn AudioOutputStreamSafe,
        error: oboe::Error,
    ) {
        self.renderer.on_stream_error(StreamErrorInfo {
            phase: ErrorPhase::BeforeClose,
            code: error as i32,
        });
    }

    fn on_error_after_close(
        &mut self,
        _audio_stream: &mut dyn AudioOutputStreamSafe,
        error: oboe::Error,
    ) {
        self.renderer.on_stream_error(StreamErrorInfo {
            phase: ErrorPhase::AfterClose,
            code: error as i32,
        });
    }

    fn on_audio_ready(
        &mut self,
        _audio_stream: &mut dyn AudioOutputStreamSafe,
        frames: &mut [i16],
    ) -> DataCallbackResult {
        callback_result(self.renderer.render(frames))
    }
}

/// Adapts an [`InputConsumer`] to oboe's input callback
struct OboeInput {
    consumer: Box<dyn InputConsumer>,
}

impl AudioInputCallback for OboeInput {
    type FrameType = (f32, oboe::Mono);

    fn on_error_before_close(
        &mut self,
        _audio_stream: &mut dyn AudioInputStreamSafe,
        error: oboe::Error,
    ) {
        self.consumer.on_stream_error(StreamErrorInfo {
            phase: ErrorPhase::BeforeClose,
            code: error as i32,
        });
    }

    fn on_error_after_close(
        &mut self,
        _audio_stream: &mut dyn AudioInputStreamSafe,
        error: oboe::Error,
    ) {
        self.consumer.on_stream_error(StreamErrorInfo {
            phase: ErrorPhase::AfterClose,
            code: error as i32,
        });
    }

    fn on_audio_ready(
        &mut self,
        _audio_stream: &mut dyn AudioInputStreamSafe,
        frames: &[f32],
    ) -> DataCallbackResult {
        callback_result(self.consumer.consume(frames))
    }
}

/// Android backend opening Oboe callback streams.
#[derive(Default)]
pub struct OboeBackend {
    _unit: (),
}

impl OboeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn describe_input_device(device_id: i32) {
        if device_id == 0 || !CONTEXT_READY.load(Ordering::Acquire) {
            return;
        }
        match AudioDeviceInfo::request(AudioDeviceDirection::Input) {
            Ok(devices) => match devices.iter().find(|device| device.id == device_id) {
                Some(device) => info!(
                    "[oboe] Input device {}: {} (rates {:?})",
                    device.id, device.product_name, device.sample_rates
                ),
                None => warn!("[oboe] Input device {} not reported by AudioManager", device_id),
            },
            Err(e) => warn!("[oboe] Failed to enumerate input devices: {}", e),
        }
    }
}

impl AudioBackend for OboeBackend {
    fn name(&self) -> &'static str {
        "oboe"
    }

    fn open_output(
        &self,
        spec: &OutputStreamSpec,
        renderer: Box<dyn OutputRenderer>,
    ) -> Result<Box<dyn StreamHandle>, AudioError> {
        let stream = AudioStreamBuilder::default()
            .set_performance_mode(performance_mode(spec.performance_mode))
            .set_sharing_mode(sharing_mode(spec.sharing_mode))
            .set_direction::<Output>()
            .set_channel_count::<oboe::Mono>()
            .set_format::<i16>()
            .set_callback(OboeOutput { renderer })
            .open_stream()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Output stream: {:?}", e),
            })?;

        if stream.get_format() != AudioFormat::I16 {
            warn!("[oboe] Output stream format is {:?}, expected I16", stream.get_format());
        }

        Ok(Box::new(OboeStream::Output(stream)))
    }

    fn open_input(
        &self,
        spec: &InputStreamSpec,
        consumer: Box<dyn InputConsumer>,
    ) -> Result<Box<dyn StreamHandle>, AudioError> {
        Self::describe_input_device(spec.device_id);

        let mut builder = AudioStreamBuilder::default()
            .set_performance_mode(performance_mode(spec.performance_mode))
            .set_sharing_mode(sharing_mode(spec.sharing_mode))
            .set_direction::<Input>()
            .set_sample_rate(spec.sample_rate_hz)
            .set_frames_per_callback(spec.frames_per_callback)
            .set_device_id(spec.device_id)
            .set_channel_count::<oboe::Mono>()
            .set_format::<f32>();
        if spec.unprocessed {
            builder = builder.set_input_preset(InputPreset::Unprocessed);
        }

        let stream = builder
            .set_callback(OboeInput { consumer })
            .open_stream()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Input stream: {:?}", e),
            })?;

        if stream.get_format() != AudioFormat::F32 {
            warn!("[oboe] Input stream format is {:?}, expected F32", stream.get_format());
        }
        if stream.get_sample_rate() != spec.sample_rate_hz {
            warn!(
                "[oboe] Requested {} Hz, stream opened at {} Hz",
                spec.sample_rate_hz,
                stream.get_sample_rate()
            );
        }

        Ok(Box::new(OboeStream::Input(stream)))
    }
}

enum OboeStream {
    Output(AudioStreamAsync<Output, OboeOutput>),
    Input(AudioStreamAsync<Input, OboeInput>),
}

// SAFETY: the native stream is only driven from the engine that owns it,
// under the engine's session mutex. Oboe itself is thread-safe for
// request_start/request_stop/close issued from a non-callback thread.
unsafe impl Send for OboeStream {}

fn hardware_error(action: &str, e: oboe::Error) -> AudioError {
    AudioError::HardwareError {
        details: format!("Failed to {} stream: {:?}", action, e),
    }
}

impl StreamHandle for OboeStream {
    fn start(&mut self) -> Result<(), AudioError> {
        match self {
            OboeStream::Output(stream) => stream.request_start(),
            OboeStream::Input(stream) => stream.request_start(),
        }
        .map_err(|e| hardware_error("start", e))
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        match self {
            OboeStream::Output(stream) => stream.request_stop(),
            OboeStream::Input(stream) => stream.request_stop(),
        }
        .map_err(|e| hardware_error("stop", e))
    }

    fn info(&mut self) -> StreamInfo {
        match self {
            OboeStream::Output(stream) => StreamInfo {
                sample_rate_hz: stream.get_sample_rate(),
                frames_per_callback: stream.get_frames_per_callback(),
                latency_ms: stream.calculate_latency_millis().ok(),
            },
            OboeStream::Input(stream) => StreamInfo {
                sample_rate_hz: stream.get_sample_rate(),
                frames_per_callback: stream.get_frames_per_callback(),
                latency_ms: stream.calculate_latency_millis().ok(),
            },
        }
    }
}
