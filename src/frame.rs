use std::sync::Arc;
use std::time::SystemTime;

/// A single captured video frame.
///
/// Pixels are row-major RGB8 behind an `Arc`: immutable once captured, so a
/// frame can be cloned into the ring buffer and across the persistence
/// hand-off without copying the pixel data. BGR-ordered sources convert at
/// the capture boundary.
#[derive(Clone, Debug)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Arc<[u8]>,
    captured_at: SystemTime,
}

impl Frame {
    /// Wrap raw RGB8 pixel data captured now.
    ///
    /// Returns `None` if `data` does not match `width * height * 3` bytes.
    pub fn from_rgb8(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) * 3 {
            return None;
        }
        Some(Self {
            width,
            height,
            data: data.into(),
            captured_at: SystemTime::now(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major RGB8 pixel bytes.
    pub fn rgb8(&self) -> &[u8] {
        &self.data
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }
}
