use std::collections::VecDeque;

use crate::frame::Frame;

/// Fixed-capacity rolling store of the most recent frames.
///
/// Capacity is derived from the configured buffer window
/// (`ceil(buffer_seconds * fps)`) and fixed at construction. Pushing at
/// capacity evicts the oldest frame; the newest frame is never dropped.
/// A capacity of 0 degrades to a no-op buffer.
///
/// The buffer is owned by the session loop. Hand-off to a persistence
/// worker goes through [`snapshot`](FrameRingBuffer::snapshot), which takes
/// a consistent copy on the loop thread, so encoding never races a push.
pub struct FrameRingBuffer {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl FrameRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Capacity for a time window at a given frame rate.
    pub fn for_window(buffer_seconds: f64, fps: f64) -> Self {
        let capacity = (buffer_seconds * fps).ceil().max(0.0) as usize;
        Self::new(capacity)
    }

    /// Append a frame, evicting the oldest if the buffer is full. O(1).
    pub fn push(&mut self, frame: Frame) {
        if self.capacity == 0 {
            return;
        }
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// A consistent copy of the buffered frames, oldest first.
    pub fn snapshot(&self) -> Vec<Frame> {
        self.frames.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8) -> Frame {
        Frame::from_rgb8(1, 1, vec![tag, tag, tag]).unwrap()
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut buffer = FrameRingBuffer::new(3);

        for i in 0..10 {
            buffer.push(frame(i));
            assert!(buffer.len() <= 3);
        }
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_holds_last_capacity_frames_in_push_order() {
        let mut buffer = FrameRingBuffer::new(4);

        for i in 0..9 {
            buffer.push(frame(i));
        }

        let tags: Vec<u8> = buffer.snapshot().iter().map(|f| f.rgb8()[0]).collect();
        assert_eq!(tags, vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_zero_capacity_is_noop() {
        let mut buffer = FrameRingBuffer::new(0);
        buffer.push(frame(1));
        buffer.push(frame(2));

        assert!(buffer.is_empty());
        assert!(buffer.snapshot().is_empty());
    }

    #[test]
    fn test_window_capacity_rounds_up() {
        let buffer = FrameRingBuffer::for_window(5.0, 15.0);
        assert_eq!(buffer.capacity(), 75);

        let buffer = FrameRingBuffer::for_window(0.1, 15.0);
        assert_eq!(buffer.capacity(), 2); // ceil(1.5)

        let buffer = FrameRingBuffer::for_window(0.0, 15.0);
        assert_eq!(buffer.capacity(), 0);
    }

    #[test]
    fn test_snapshot_is_consistent_under_later_pushes() {
        let mut buffer = FrameRingBuffer::new(2);
        buffer.push(frame(1));
        buffer.push(frame(2));

        let snap = buffer.snapshot();
        buffer.push(frame(3));

        let tags: Vec<u8> = snap.iter().map(|f| f.rgb8()[0]).collect();
        assert_eq!(tags, vec![1, 2]);
    }
}
