// Audio module - real-time callback state for beep playback and mic capture

pub mod capture;
pub mod frame;
pub mod playback;
pub mod session;

pub use capture::{CloseErrorSink, FrameForwarder, FrameSink};
pub use frame::CapturedFrame;
pub use playback::{BeepRenderer, EventSink, PlaybackEvent, SampleSource};
pub use session::{SessionState, SessionTracker};
