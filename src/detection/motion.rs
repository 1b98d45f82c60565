/// Frame-differencing motion detector
///
/// A lightweight built-in `Detector` so the engine runs end-to-end without
/// a model file. Frames are reduced to a coarse luma grid; cells whose mean
/// luma moved more than `delta_threshold` since the previous frame count as
/// changed, and a detection covering the changed region is reported when
/// enough of the grid moved.
use crate::error::DetectorError;
use crate::frame::Frame;

use super::detector::{BoundingBox, Detection, Detector, DetectorLoader, InferenceOptions};

/// Grid resolution the frame is reduced to before differencing.
const GRID: u32 = 16;

pub struct MotionDetector {
    /// Mean-luma delta (0-255) a cell must move to count as changed
    delta_threshold: u8,
    /// Fraction of the grid that must change before motion is reported
    min_changed_fraction: f32,
    /// Reporting threshold from the session's inference options
    confidence: f32,
    previous: Option<Vec<u8>>,
}

impl MotionDetector {
    pub fn new(delta_threshold: u8, min_changed_fraction: f32, options: &InferenceOptions) -> Self {
        Self {
            delta_threshold,
            min_changed_fraction,
            confidence: options.confidence,
            previous: None,
        }
    }

    /// Mean luma of each GRID×GRID cell, row-major.
    fn luma_grid(frame: &Frame) -> Vec<u8> {
        let (width, height) = (frame.width(), frame.height());
        let pixels = frame.rgb8();
        let mut grid = Vec::with_capacity((GRID * GRID) as usize);

        for gy in 0..GRID {
            for gx in 0..GRID {
                let x0 = gx * width / GRID;
                let x1 = ((gx + 1) * width / GRID).max(x0 + 1).min(width);
                let y0 = gy * height / GRID;
                let y1 = ((gy + 1) * height / GRID).max(y0 + 1).min(height);

                let mut sum = 0u64;
                let mut count = 0u64;
                for y in y0..y1 {
                    for x in x0..x1 {
                        let i = ((y * width + x) * 3) as usize;
                        let (r, g, b) = (pixels[i] as u32, pixels[i + 1] as u32, pixels[i + 2] as u32);
                        // Integer BT.601 luma
                        sum += ((r * 299 + g * 587 + b * 114) / 1000) as u64;
                        count += 1;
                    }
                }
                grid.push((sum / count.max(1)) as u8);
            }
        }
        grid
    }
}

impl Detector for MotionDetector {
    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
        if frame.width() < GRID || frame.height() < GRID {
            return Err(DetectorError::InferenceFailed(
                format!("frame {}x{} smaller than {GRID}px grid", frame.width(), frame.height())
                    .into(),
            ));
        }

        let grid = Self::luma_grid(frame);
        let Some(previous) = self.previous.replace(grid.clone()) else {
            // First frame only establishes the baseline.
            return Ok(Vec::new());
        };

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (GRID, GRID, 0, 0);
        let mut changed = 0u32;
        for (i, (now, before)) in grid.iter().zip(previous.iter()).enumerate() {
            if now.abs_diff(*before) >= self.delta_threshold {
                changed += 1;
                let (gx, gy) = (i as u32 % GRID, i as u32 / GRID);
                min_x = min_x.min(gx);
                min_y = min_y.min(gy);
                max_x = max_x.max(gx);
                max_y = max_y.max(gy);
            }
        }

        let fraction = changed as f32 / (GRID * GRID) as f32;
        if changed == 0 || fraction < self.min_changed_fraction {
            return Ok(Vec::new());
        }

        // Confidence grows with how much of the view moved, saturating once
        // a quarter of the grid is in motion.
        let confidence = (fraction * 4.0).min(1.0);
        if confidence < self.confidence {
            return Ok(Vec::new());
        }

        let cell_w = frame.width() / GRID;
        let cell_h = frame.height() / GRID;
        let bbox = BoundingBox::new(
            (min_x * cell_w) as i32,
            (min_y * cell_h) as i32,
            (((max_x + 1) * cell_w).min(frame.width())) as i32,
            (((max_y + 1) * cell_h).min(frame.height())) as i32,
        );

        Ok(vec![Detection::new("motion", confidence, bbox)])
    }

    fn name(&self) -> &str {
        "MotionDetector"
    }
}

/// Loader that hands out motion detectors regardless of the model ref.
///
/// Used by the shipped binary; model-backed deployments plug their own
/// `DetectorLoader` in.
pub struct MotionDetectorLoader {
    pub delta_threshold: u8,
    pub min_changed_fraction: f32,
}

impl Default for MotionDetectorLoader {
    fn default() -> Self {
        Self {
            delta_threshold: 25,
            min_changed_fraction: 0.02,
        }
    }
}

impl DetectorLoader for MotionDetectorLoader {
    fn load(
        &self,
        model_ref: &str,
        options: &InferenceOptions,
    ) -> Result<Box<dyn Detector>, DetectorError> {
        tracing::info!(model_ref, "loading frame-differencing motion detector");
        Ok(Box::new(MotionDetector::new(
            self.delta_threshold,
            self.min_changed_fraction,
            options,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> InferenceOptions {
        InferenceOptions {
            confidence: 0.35,
            input_size: 320,
        }
    }

    fn flat_frame(value: u8) -> Frame {
        Frame::from_rgb8(64, 64, vec![value; 64 * 64 * 3]).unwrap()
    }

    /// Frame with a bright square in the top-left quadrant.
    fn square_frame() -> Frame {
        let mut data = vec![0u8; 64 * 64 * 3];
        for y in 0..24 {
            for x in 0..24 {
                let i = (y * 64 + x) * 3;
                data[i] = 255;
                data[i + 1] = 255;
                data[i + 2] = 255;
            }
        }
        Frame::from_rgb8(64, 64, data).unwrap()
    }

    #[test]
    fn test_first_frame_establishes_baseline() {
        let mut detector = MotionDetector::new(25, 0.02, &options());
        let detections = detector.infer(&flat_frame(0)).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_static_scene_reports_nothing() {
        let mut detector = MotionDetector::new(25, 0.02, &options());
        detector.infer(&flat_frame(10)).unwrap();
        let detections = detector.infer(&flat_frame(10)).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_motion_reported_with_localized_box() {
        let mut detector = MotionDetector::new(25, 0.02, &options());
        detector.infer(&flat_frame(0)).unwrap();
        let detections = detector.infer(&square_frame()).unwrap();

        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert_eq!(det.label, "motion");
        assert!(det.confidence >= 0.35);
        // Changed region is the top-left quadrant, not the whole frame
        assert_eq!(det.bbox.x1, 0);
        assert_eq!(det.bbox.y1, 0);
        assert!(det.bbox.x2 <= 32);
        assert!(det.bbox.y2 <= 32);
    }

    #[test]
    fn test_undersized_frame_is_an_inference_error() {
        let mut detector = MotionDetector::new(25, 0.02, &options());
        let tiny = Frame::from_rgb8(4, 4, vec![0; 4 * 4 * 3]).unwrap();
        assert!(detector.infer(&tiny).is_err());
    }
}
