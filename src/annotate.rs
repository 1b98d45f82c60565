use opencv::core::{Point, Rect, Scalar};
use opencv::imgproc;

use crate::camera::{bgr_mat_to_frame, frame_to_bgr_mat};
use crate::detection::Detection;
use crate::frame::Frame;

/// Detection overlay drawing.
///
/// Produces the annotated copy published to the UI sink each tick: one box
/// per detection with a `{label} {confidence:.2}` tag above it. The input
/// frame is never mutated.

/// BGR box color for a detection label. Fire and generic detections are
/// red, violence is orange.
fn color_for(label: &str) -> Scalar {
    if label.starts_with("violence:") {
        Scalar::new(0.0, 165.0, 255.0, 0.0)
    } else {
        Scalar::new(0.0, 0.0, 255.0, 0.0)
    }
}

/// Draw every detection's box and label onto a copy of `frame`.
pub fn draw_detections(frame: &Frame, detections: &[Detection]) -> Result<Frame, opencv::Error> {
    if detections.is_empty() {
        return Ok(frame.clone());
    }

    let mut mat = frame_to_bgr_mat(frame)?;
    let (width, height) = (frame.width() as i32, frame.height() as i32);

    for det in detections {
        let x1 = det.bbox.x1.clamp(0, width - 1);
        let y1 = det.bbox.y1.clamp(0, height - 1);
        let x2 = det.bbox.x2.clamp(x1 + 1, width);
        let y2 = det.bbox.y2.clamp(y1 + 1, height);
        let color = color_for(&det.label);

        imgproc::rectangle(
            &mut mat,
            Rect::new(x1, y1, x2 - x1, y2 - y1),
            color,
            2,
            imgproc::LINE_8,
            0,
        )?;

        let tag = format!("{} {:.2}", det.label, det.confidence);
        imgproc::put_text(
            &mut mat,
            &tag,
            Point::new(x1, (y1 - 6).max(12)),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.5,
            color,
            1,
            imgproc::LINE_AA,
            false,
        )?;
    }

    bgr_mat_to_frame(&mat).map_err(|e| opencv::Error::new(opencv::core::StsError, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;

    fn black_frame() -> Frame {
        Frame::from_rgb8(64, 64, vec![0; 64 * 64 * 3]).unwrap()
    }

    #[test]
    fn test_no_detections_returns_unmodified_copy() {
        let frame = black_frame();
        let annotated = draw_detections(&frame, &[]).unwrap();
        assert_eq!(annotated.rgb8(), frame.rgb8());
    }

    #[test]
    fn test_boxes_are_drawn() {
        let frame = black_frame();
        let det = Detection::new("person", 0.91, BoundingBox::new(8, 8, 40, 40));

        let annotated = draw_detections(&frame, &[det]).unwrap();

        assert_eq!(annotated.width(), frame.width());
        assert_eq!(annotated.height(), frame.height());
        assert_ne!(annotated.rgb8(), frame.rgb8());

        // Box edge at (8, 20) should now be red in RGB
        let i = ((20 * 64 + 8) * 3) as usize;
        assert_eq!(annotated.rgb8()[i], 255);
    }

    #[test]
    fn test_out_of_bounds_boxes_are_clamped() {
        let frame = black_frame();
        let det = Detection::new("motion", 0.5, BoundingBox::new(-10, -10, 500, 500));

        let annotated = draw_detections(&frame, &[det]).unwrap();
        assert_ne!(annotated.rgb8(), frame.rgb8());
    }
}
