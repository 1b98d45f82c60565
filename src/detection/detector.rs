/// Detector trait and common types
///
/// Defines the interface to the object-detection models. Models are opaque:
/// they take a frame and return detections with already-resolved label
/// strings. The engine never inspects model metadata.
use crate::error::DetectorError;
use crate::frame::Frame;

/// Axis-aligned detection box in pixel coordinates, `x1 < x2`, `y1 < y2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

/// One detection reported by a model for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Resolved class label, possibly prefixed by the mode (e.g. "fire:smoke")
    pub label: String,
    /// Confidence in [0, 1]
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }

    /// Prepend a mode tag to the label (`tag:label`).
    pub fn with_label_prefix(mut self, prefix: &str) -> Self {
        self.label = format!("{}:{}", prefix, self.label);
        self
    }
}

/// Inference knobs passed to the loader; interpretation is up to the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceOptions {
    /// Minimum confidence a detection must reach to be reported
    pub confidence: f32,
    /// Square input size the model letterboxes frames to
    pub input_size: u32,
}

/// An object-detection model.
///
/// Implementations own their runtime state (sessions, previous-frame
/// caches); `infer` may mutate it.
pub trait Detector: Send {
    /// Run the model on one frame.
    ///
    /// Returns the detections at or above the configured confidence, with
    /// resolved labels and boxes clamped to the frame bounds.
    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectorError>;

    /// Model name (for logging)
    fn name(&self) -> &str;
}

/// Loads detector models for a session.
///
/// A load failure is fatal to starting the session; it never enters RUNNING.
pub trait DetectorLoader: Send + Sync {
    fn load(
        &self,
        model_ref: &str,
        options: &InferenceOptions,
    ) -> Result<Box<dyn Detector>, DetectorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_dimensions() {
        let bbox = BoundingBox::new(10, 20, 110, 70);
        assert_eq!(bbox.width(), 100);
        assert_eq!(bbox.height(), 50);
    }

    #[test]
    fn test_label_prefixing() {
        let det = Detection::new("smoke", 0.8, BoundingBox::new(0, 0, 1, 1))
            .with_label_prefix("fire");
        assert_eq!(det.label, "fire:smoke");
    }
}
