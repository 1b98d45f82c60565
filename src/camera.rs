use opencv::core::{self, Mat};
use opencv::prelude::*;
use opencv::{imgproc, videoio};

use crate::error::SourceError;
use crate::frame::Frame;

/// A stream of frames. `Ok(None)` signals end of stream; the device is
/// released on drop.
pub trait VideoSource: Send {
    fn read(&mut self) -> Result<Option<Frame>, SourceError>;
}

/// Opens a [`VideoSource`] for a session. Sessions open on `start()` and
/// release when the loop exits, so providers must be reusable.
pub trait SourceProvider: Send + Sync {
    fn open(&self) -> Result<Box<dyn VideoSource>, SourceError>;
}

/// Capture device provider backed by OpenCV. Index 0 is the default device.
pub struct CameraProvider {
    pub index: i32,
}

impl SourceProvider for CameraProvider {
    fn open(&self) -> Result<Box<dyn VideoSource>, SourceError> {
        let capture = videoio::VideoCapture::new(self.index, videoio::CAP_ANY).map_err(|e| {
            SourceError::Unavailable {
                index: self.index,
                source: Box::new(e),
            }
        })?;

        let opened = capture.is_opened().map_err(|e| SourceError::Unavailable {
            index: self.index,
            source: Box::new(e),
        })?;
        if !opened {
            return Err(SourceError::Unavailable {
                index: self.index,
                source: "device reported not opened".into(),
            });
        }

        tracing::info!(index = self.index, "camera opened");
        Ok(Box::new(CameraSource {
            capture,
            index: self.index,
        }))
    }
}

/// Live camera stream; one `read` per session tick.
pub struct CameraSource {
    capture: videoio::VideoCapture,
    index: i32,
}

impl VideoSource for CameraSource {
    fn read(&mut self) -> Result<Option<Frame>, SourceError> {
        let mut mat = Mat::default();
        let grabbed = self
            .capture
            .read(&mut mat)
            .map_err(|e| SourceError::ReadFailed(Box::new(e)))?;

        // OpenCV reports both a dead device and end-of-stream as a failed
        // grab; either way the stream is over.
        if !grabbed || mat.empty() {
            return Ok(None);
        }

        bgr_mat_to_frame(&mat).map(Some)
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            tracing::warn!(index = self.index, error = %e, "camera release failed");
        } else {
            tracing::info!(index = self.index, "camera released");
        }
    }
}

/// Convert an OpenCV BGR frame into an owned RGB [`Frame`].
pub(crate) fn bgr_mat_to_frame(mat: &Mat) -> Result<Frame, SourceError> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(
        mat,
        &mut rgb,
        imgproc::COLOR_BGR2RGB,
        0,
        core::AlgorithmHint::ALGO_HINT_DEFAULT,
    )
    .map_err(|e| SourceError::ReadFailed(Box::new(e)))?;

    let width = rgb.cols() as u32;
    let height = rgb.rows() as u32;
    let data = rgb
        .data_bytes()
        .map_err(|e| SourceError::ReadFailed(Box::new(e)))?
        .to_vec();

    Frame::from_rgb8(width, height, data).ok_or_else(|| {
        SourceError::BadFrame(format!("{}x{} buffer size mismatch", width, height))
    })
}

/// Convert a [`Frame`] into an owned OpenCV BGR Mat.
pub(crate) fn frame_to_bgr_mat(frame: &Frame) -> Result<Mat, opencv::Error> {
    let data = frame.rgb8();
    // Borrow the frame's pixels as a CV_8UC3 header; the conversion below
    // copies into an owned Mat before the borrow ends.
    let rgb = unsafe {
        Mat::new_rows_cols_with_data_unsafe(
            frame.height() as i32,
            frame.width() as i32,
            core::CV_8UC3,
            data.as_ptr() as *mut _,
            core::Mat_AUTO_STEP,
        )
    }?;

    let mut bgr = Mat::default();
    imgproc::cvt_color(
        &rgb,
        &mut bgr,
        imgproc::COLOR_RGB2BGR,
        0,
        core::AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;
    Ok(bgr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_mat_round_trip() {
        let mut data = vec![0u8; 8 * 4 * 3];
        // One red, one green, one blue pixel
        data[0] = 255;
        data[4] = 255;
        data[8] = 255;
        let frame = Frame::from_rgb8(8, 4, data).unwrap();

        let mat = frame_to_bgr_mat(&frame).unwrap();
        let back = bgr_mat_to_frame(&mat).unwrap();

        assert_eq!(back.width(), 8);
        assert_eq!(back.height(), 4);
        assert_eq!(back.rgb8(), frame.rgb8());
    }

    #[test]
    fn test_open_invalid_camera_fails() {
        let provider = CameraProvider { index: -99 };
        assert!(provider.open().is_err());
    }
}
