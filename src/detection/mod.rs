/// Detection subsystem
///
/// Opaque detector interface, mode policy, and the built-in
/// frame-differencing detector.
pub mod detector;
pub mod mode;
pub mod motion;

pub use detector::{BoundingBox, Detection, Detector, DetectorLoader, InferenceOptions};
pub use mode::{Mode, ModeKind, ModelSpec};
pub use motion::{MotionDetector, MotionDetectorLoader};
