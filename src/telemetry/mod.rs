//! Callback diagnostics: counters and an event ring drained off the audio thread.
//!
//! The real-time callbacks must not log, so they bump atomic counters and
//! push [`CallbackEvent`]s into a bounded SPSC ring. A reporter thread per
//! session drains the ring and turns events into log lines.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use rtrb::{Consumer, Producer, RingBuffer};
use serde::{Deserialize, Serialize};

use crate::config::DiagnosticsConfig;

pub mod events;

pub use events::{CallbackEvent, LifecyclePhase};

/// Counters updated from the audio thread.
#[derive(Debug, Default)]
pub struct StreamStats {
    callbacks: AtomicU64,
    frames: AtomicU64,
    dropped_frames: AtomicU64,
    dropped_events: AtomicU64,
    errors: AtomicU64,
}

impl StreamStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            callbacks: self.callbacks.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`StreamStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub callbacks: u64,
    pub frames: u64,
    pub dropped_frames: u64,
    pub dropped_events: u64,
    pub errors: u64,
}

/// Factory for a producer/consumer pair sharing one [`StreamStats`]
pub struct DiagnosticsChannel;

impl DiagnosticsChannel {
    pub fn new(capacity: usize) -> (DiagnosticsProducer, DiagnosticsConsumer) {
        let (producer, consumer) = RingBuffer::new(capacity.max(1));
        let stats = Arc::new(StreamStats::default());
        (
            DiagnosticsProducer {
                events: producer,
                stats: Arc::clone(&stats),
            },
            DiagnosticsConsumer {
                events: consumer,
                stats,
            },
        )
    }
}

/// Audio-thread side. Every method is lock-free and allocation-free.
pub struct DiagnosticsProducer {
    events: Producer<CallbackEvent>,
    stats: Arc<StreamStats>,
}

impl DiagnosticsProducer {
    pub fn record_callback(&self, frames: usize) {
        self.stats.callbacks.fetch_add(1, Ordering::Relaxed);
        self.stats
            .frames
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    pub fn record_dropped_frames(&self, frames: usize) {
        self.stats
            .dropped_frames
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.stats.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Queue an event for the reporter; counted as dropped if the ring is full
    pub fn push(&mut self, event: CallbackEvent) {
        if self.events.push(event).is_err() {
            self.stats.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> Arc<StreamStats> {
        Arc::clone(&self.stats)
    }
}

/// Reporter side of the diagnostics ring
pub struct DiagnosticsConsumer {
    events: Consumer<CallbackEvent>,
    stats: Arc<StreamStats>,
}

impl DiagnosticsConsumer {
    /// Pop every queued event, returning how many were handled
    pub fn drain(&mut self, mut f: impl FnMut(CallbackEvent)) -> usize {
        let mut count = 0;
        while let Ok(event) = self.events.pop() {
            f(event);
            count += 1;
        }
        count
    }

    /// True once the producer (and with it the stream callback) is gone
    pub fn is_abandoned(&self) -> bool {
        self.events.is_abandoned()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

fn log_event(label: &str, event: &CallbackEvent) {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| format!("{:?}", event));
    match event {
        CallbackEvent::StreamError { .. } | CallbackEvent::FrameDropped { .. } => {
            warn!("[{}] {}", label, payload)
        }
        _ => info!("[{}] {}", label, payload),
    }
}

/// Spawn the thread draining `consumer` until its producer is dropped.
///
/// The thread is detached by callers; it exits on its own one interval
/// after the session's stream is closed.
pub fn spawn_reporter(
    label: &'static str,
    mut consumer: DiagnosticsConsumer,
    config: DiagnosticsConfig,
) -> io::Result<JoinHandle<()>> {
    let interval = Duration::from_millis(config.report_interval_ms.max(1));
    thread::Builder::new()
        .name(format!("{}-diag", label))
        .spawn(move || {
            let mut last = StatsSnapshot::default();
            loop {
                let abandoned = consumer.is_abandoned();
                consumer.drain(|event| log_event(label, &event));

                let current = consumer.snapshot();
                if current != last {
                    debug!(
                        "[{}] stats {}",
                        label,
                        serde_json::to_string(&current).unwrap_or_default()
                    );
                    last = current;
                }

                if abandoned {
                    info!("[{}] session closed, {} callbacks", label, current.callbacks);
                    break;
                }
                thread::sleep(interval);
            }
        })
}

/// Log a library lifecycle transition.
pub fn record_lifecycle(phase: LifecyclePhase) {
    info!(
        "[lifecycle] {} at {} ms",
        serde_json::to_string(&phase).unwrap_or_default(),
        now_timestamp_ms()
    );
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::backend::ErrorPhase;

    #[test]
    fn counters_accumulate() {
        let (producer, consumer) = DiagnosticsChannel::new(4);
        producer.record_callback(128);
        producer.record_callback(64);
        producer.record_dropped_frames(64);
        producer.record_error();

        let snapshot = consumer.snapshot();
        assert_eq!(snapshot.callbacks, 2);
        assert_eq!(snapshot.frames, 192);
        assert_eq!(snapshot.dropped_frames, 64);
        assert_eq!(snapshot.errors, 1);
    }

    #[test]
    fn full_ring_counts_dropped_events() {
        let (mut producer, mut consumer) = DiagnosticsChannel::new(2);
        for frames in 0..5 {
            producer.push(CallbackEvent::FrameDropped { frames });
        }

        let mut seen = Vec::new();
        assert_eq!(consumer.drain(|event| seen.push(event)), 2);
        assert_eq!(seen[0], CallbackEvent::FrameDropped { frames: 0 });
        assert_eq!(consumer.snapshot().dropped_events, 3);
    }

    #[test]
    fn consumer_sees_abandoned_producer() {
        let (producer, consumer) = DiagnosticsChannel::new(2);
        assert!(!consumer.is_abandoned());
        drop(producer);
        assert!(consumer.is_abandoned());
    }

    #[test]
    fn reporter_exits_after_producer_drop() {
        let (mut producer, consumer) = DiagnosticsChannel::new(8);
        producer.push(CallbackEvent::StreamError {
            phase: ErrorPhase::AfterClose,
            code: -899,
        });
        let handle = spawn_reporter(
            "test",
            consumer,
            DiagnosticsConfig {
                ring_capacity: 8,
                report_interval_ms: 5,
            },
        )
        .unwrap();

        drop(producer);
        handle.join().unwrap();
    }
}
