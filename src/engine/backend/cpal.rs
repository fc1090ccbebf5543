//! CPAL-based audio backend for desktop platforms (Linux, macOS, Windows)
//!
//! Used by the desktop diagnostics harness. CPAL has no exclusive/low-latency
//! negotiation, so those hints in the stream specs are ignored here.
//!
//! CPAL splits data and error callbacks into two closures. Both share the
//! engine callback object through a mutex: the data closure only ever
//! `try_lock`s it (writing silence if the error path holds it), the error
//! closure runs off the audio thread and may block.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use log::{info, warn};

use crate::config::{InputStreamSpec, OutputStreamSpec};
use crate::error::AudioError;

use super::{
    AudioBackend, CallbackAction, ErrorPhase, InputConsumer, OutputRenderer, StreamErrorInfo,
    StreamHandle, StreamInfo, ERROR_DISCONNECTED, ERROR_INTERNAL,
};

/// Mono scratch frames rendered per chunk before fanning out to channels
const SCRATCH_FRAMES: usize = 4096;

/// CPAL-based audio backend using the default host
pub struct CpalBackend {
    host: cpal::Host,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    fn input_device(&self, device_id: i32) -> Result<cpal::Device, AudioError> {
        if device_id > 0 {
            // Desktop hosts have no stable numeric ids; treat the selector
            // as a 1-based index into the host's input device list.
            let mut devices = self
                .host
                .input_devices()
                .map_err(|e| AudioError::StreamOpenFailed {
                    reason: format!("Failed to enumerate input devices: {:?}", e),
                })?;
            return devices
                .nth(device_id as usize - 1)
                .ok_or_else(|| AudioError::StreamOpenFailed {
                    reason: format!("No input device with index {}", device_id),
                });
        }
        self.host
            .default_input_device()
            .ok_or_else(|| AudioError::StreamOpenFailed {
                reason: "No default input device found".to_string(),
            })
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: cpal::Host holds no thread-affine state on the supported desktop
// hosts; it is only used from control threads to look up devices.
unsafe impl Send for CpalBackend {}
unsafe impl Sync for CpalBackend {}

fn stream_error_info(err: &cpal::StreamError) -> StreamErrorInfo {
    let code = match err {
        cpal::StreamError::DeviceNotAvailable => ERROR_DISCONNECTED,
        cpal::StreamError::BackendSpecific { .. } => ERROR_INTERNAL,
    };
    // CPAL keeps the stream object alive after an error; nothing more will
    // be delivered on it, so report it as closed.
    StreamErrorInfo {
        phase: ErrorPhase::AfterClose,
        code,
    }
}

fn write_output<T>(
    data: &mut [T],
    channels: usize,
    scratch: &mut [i16],
    renderer: &mut dyn OutputRenderer,
) where
    T: SizedSample + FromSample<i16>,
{
    let frames = data.len() / channels;
    let mut written = 0;
    while written < frames {
        let chunk = (frames - written).min(scratch.len());
        renderer.render(&mut scratch[..chunk]);
        for (i, sample) in scratch[..chunk].iter().enumerate() {
            let value = T::from_sample(*sample);
            let base = (written + i) * channels;
            for slot in &mut data[base..base + channels] {
                *slot = value;
            }
        }
        written += chunk;
    }
}

fn build_output<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    renderer: Arc<Mutex<Box<dyn OutputRenderer>>>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<i16>,
{
    let channels = config.channels as usize;
    let mut scratch = vec![0_i16; SCRATCH_FRAMES];
    let data_renderer = Arc::clone(&renderer);

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| match data_renderer.try_lock() {
            Ok(mut guard) => write_output(data, channels, &mut scratch, guard.as_mut()),
            Err(_) => data.fill(T::EQUILIBRIUM),
        },
        move |err| {
            if let Ok(mut guard) = renderer.lock() {
                guard.on_stream_error(stream_error_info(&err));
            }
        },
        None,
    )
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn open_output(
        &self,
        _spec: &OutputStreamSpec,
        renderer: Box<dyn OutputRenderer>,
    ) -> Result<Box<dyn StreamHandle>, AudioError> {
        let device = self
            .host
            .default_output_device()
            .ok_or_else(|| AudioError::StreamOpenFailed {
                reason: "No default output device found".to_string(),
            })?;
        let default_config =
            device
                .default_output_config()
                .map_err(|e| AudioError::StreamOpenFailed {
                    reason: format!("Failed to get default output config: {:?}", e),
                })?;
        let config = default_config.config();
        let renderer = Arc::new(Mutex::new(renderer));

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::I16 => build_output::<i16>(&device, &config, renderer),
            cpal::SampleFormat::F32 => build_output::<f32>(&device, &config, renderer),
            other => {
                return Err(AudioError::StreamOpenFailed {
                    reason: format!("Unsupported output sample format {:?}", other),
                })
            }
        }
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Output stream: {:?}", e),
        })?;

        info!(
            "[cpal] Output stream opened: format={:?}, channels={}, sample_rate={}",
            default_config.sample_format(),
            config.channels,
            config.sample_rate.0
        );

        Ok(Box::new(CpalStream {
            stream,
            info: StreamInfo {
                sample_rate_hz: config.sample_rate.0 as i32,
                frames_per_callback: 0,
                latency_ms: None,
            },
        }))
    }

    fn open_input(
        &self,
        spec: &InputStreamSpec,
        consumer: Box<dyn InputConsumer>,
    ) -> Result<Box<dyn StreamHandle>, AudioError> {
        let device = self.input_device(spec.device_id)?;

        let sample_rate = if spec.sample_rate_hz > 0 {
            spec.sample_rate_hz as u32
        } else {
            let default_config =
                device
                    .default_input_config()
                    .map_err(|e| AudioError::StreamOpenFailed {
                        reason: format!("Failed to get default input config: {:?}", e),
                    })?;
            default_config.sample_rate().0
        };
        let buffer_size = if spec.frames_per_callback > 0 {
            cpal::BufferSize::Fixed(spec.frames_per_callback as u32)
        } else {
            cpal::BufferSize::Default
        };
        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size,
        };
        if spec.unprocessed {
            warn!("[cpal] Unprocessed input preset is not available on this host");
        }

        let consumer = Arc::new(Mutex::new(consumer));
        let data_consumer = Arc::clone(&consumer);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut guard) = data_consumer.try_lock() {
                        guard.consume(data);
                    }
                },
                move |err| {
                    if let Ok(mut guard) = consumer.lock() {
                        guard.on_stream_error(stream_error_info(&err));
                    }
                },
                None,
            )
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Input stream: {:?}", e),
            })?;

        info!(
            "[cpal] Input stream opened: sample_rate={}, buffer={:?}",
            sample_rate, config.buffer_size
        );

        Ok(Box::new(CpalStream {
            stream,
            info: StreamInfo {
                sample_rate_hz: sample_rate as i32,
                frames_per_callback: spec.frames_per_callback.max(0),
                latency_ms: None,
            },
        }))
    }
}

struct CpalStream {
    stream: cpal::Stream,
    info: StreamInfo,
}

// SAFETY: the stream is only touched by the engine that owns it, under the
// engine's session mutex; it is never shared between threads concurrently.
unsafe impl Send for CpalStream {}

impl StreamHandle for CpalStream {
    fn start(&mut self) -> Result<(), AudioError> {
        self.stream.play().map_err(|e| AudioError::HardwareError {
            details: format!("Failed to start stream: {}", e),
        })
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.stream.pause().map_err(|e| AudioError::HardwareError {
            details: format!("Failed to stop stream: {}", e),
        })
    }

    fn info(&mut self) -> StreamInfo {
        self.info
    }
}
