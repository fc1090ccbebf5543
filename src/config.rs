//! Stream configuration for the playback and capture engines
//!
//! `CaptureConfig` is the mutable, caller-facing configuration set through
//! `oboe_options`. At `start` it is copied into an immutable
//! [`InputStreamSpec`] that the backend consumes, so a later `configure`
//! never touches an open session. The playback stream parameters are fixed.

use serde::{Deserialize, Serialize};

/// Sample rate the recorder uses when the caller never configured one
pub const DEFAULT_CAPTURE_SAMPLE_RATE_HZ: i32 = 4000;

/// Sharing mode requested from the audio stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharingMode {
    Exclusive,
    Shared,
}

/// Performance hint requested from the audio stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMode {
    LowLatency,
    PowerSaving,
    None,
}

/// Capture configuration applied on the next `start_recording`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Requested sample rate in Hz (passed through unvalidated)
    pub sample_rate_hz: i32,
    /// Frames per data callback, 0 = stream default
    pub frames_per_callback: i32,
    /// Platform device selector, 0 = default device
    pub device_id: i32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_CAPTURE_SAMPLE_RATE_HZ,
            frames_per_callback: 0,
            device_id: 0,
        }
    }
}

impl CaptureConfig {
    /// Freeze this configuration into the spec for one capture session
    pub fn snapshot(&self) -> InputStreamSpec {
        InputStreamSpec {
            sample_rate_hz: self.sample_rate_hz,
            frames_per_callback: self.frames_per_callback,
            device_id: self.device_id,
            sharing_mode: SharingMode::Exclusive,
            performance_mode: PerformanceMode::LowLatency,
            unprocessed: true,
        }
    }
}

/// Parameters of a mono 32-bit float input stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputStreamSpec {
    pub sample_rate_hz: i32,
    pub frames_per_callback: i32,
    pub device_id: i32,
    pub sharing_mode: SharingMode,
    pub performance_mode: PerformanceMode,
    /// Request the "unprocessed" input preset (no AGC / noise suppression)
    pub unprocessed: bool,
}

/// Parameters of a mono 16-bit output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputStreamSpec {
    pub sharing_mode: SharingMode,
    pub performance_mode: PerformanceMode,
}

impl Default for OutputStreamSpec {
    fn default() -> Self {
        Self {
            sharing_mode: SharingMode::Exclusive,
            performance_mode: PerformanceMode::LowLatency,
        }
    }
}

/// Diagnostics reporter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Slots in the callback → reporter event ring
    pub ring_capacity: usize,
    /// How often the reporter thread drains the ring and logs a summary
    pub report_interval_ms: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 256,
            report_interval_ms: 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capture_config() {
        let config = CaptureConfig::default();
        assert_eq!(config.sample_rate_hz, 4000);
        assert_eq!(config.frames_per_callback, 0);
        assert_eq!(config.device_id, 0);
    }

    #[test]
    fn test_snapshot_uses_fixed_stream_parameters() {
        let config = CaptureConfig {
            sample_rate_hz: 48_000,
            frames_per_callback: 192,
            device_id: 7,
        };
        let spec = config.snapshot();

        assert_eq!(spec.sample_rate_hz, 48_000);
        assert_eq!(spec.frames_per_callback, 192);
        assert_eq!(spec.device_id, 7);
        assert_eq!(spec.sharing_mode, SharingMode::Exclusive);
        assert_eq!(spec.performance_mode, PerformanceMode::LowLatency);
        assert!(spec.unprocessed);
    }

    #[test]
    fn test_snapshot_passes_invalid_values_through() {
        let config = CaptureConfig {
            sample_rate_hz: -1,
            frames_per_callback: -5,
            device_id: -2,
        };
        let spec = config.snapshot();
        assert_eq!(spec.sample_rate_hz, -1);
        assert_eq!(spec.frames_per_callback, -5);
        assert_eq!(spec.device_id, -2);
    }

    #[test]
    fn test_json_roundtrip() {
        let spec = CaptureConfig::default().snapshot();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"sharing_mode\":\"exclusive\""));

        let parsed: InputStreamSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, spec);
    }
}
