//! Aegis — detection-triggered camera recording engine.
//!
//! Frames from a camera flow through detector models; when a detection
//! persists for a configured number of consecutive frames, the rolling
//! frame history is encoded into a clip and saved with a snapshot as a
//! durable alert, off the live loop.
//!
//! The external collaborators stay behind traits: cameras implement
//! [`camera::VideoSource`], models implement [`detection::Detector`], and
//! the front-end implements [`session::EventSink`]. [`session::DetectionSession`]
//! wires them to the engine.

pub mod annotate;
pub mod camera;
pub mod config;
pub mod detection;
pub mod error;
pub mod frame;
pub mod persister;
pub mod ring_buffer;
pub mod session;
pub mod state;
pub mod trigger;

pub use camera::{CameraProvider, SourceProvider, VideoSource};
pub use config::Config;
pub use detection::{
    BoundingBox, Detection, Detector, DetectorLoader, InferenceOptions, Mode, ModeKind,
    MotionDetectorLoader,
};
pub use error::{AppResult, DetectorError, PersistError, SessionError, SourceError};
pub use frame::Frame;
pub use persister::{AlertPersister, AlertRecord};
pub use ring_buffer::FrameRingBuffer;
pub use session::{DetectionSession, EventSink, FrameUpdate, SessionConfig};
pub use state::{SessionState, SessionStatus};
pub use trigger::DebounceTrigger;
