use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{CaptureError, Result};
use crate::frame::types::PixelBuffer;
use crate::source::backend::{FramePoll, VideoSource};

/// Thread-safe ring buffer of the most recent frames from a device.
///
/// A device thread pushes frames as they arrive; the sampler polls
/// [`VideoSource::current_frame`], which returns the newest one. Stores up
/// to `capacity` frames, overwriting the oldest when full. Frames share
/// their pixel storage, so polling never copies a frame.
pub struct FrameBuffer {
    frames: Mutex<Vec<Option<PixelBuffer>>>,
    capacity: usize,
    write_idx: Mutex<usize>,
    /// Monotonic counter incremented on each push.
    sequence: AtomicU64,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    /// Create a ring buffer for frames of the given fixed dimensions.
    pub fn new(capacity: usize, width: u32, height: u32) -> Self {
        let capacity = capacity.max(1);
        let frames = (0..capacity).map(|_| None).collect();
        Self {
            frames: Mutex::new(frames),
            capacity,
            write_idx: Mutex::new(0),
            sequence: AtomicU64::new(0),
            width,
            height,
        }
    }

    /// Push a new frame, overwriting the oldest if full.
    pub fn push(&self, frame: PixelBuffer) {
        let mut frames = self.frames.lock();
        let mut idx = self.write_idx.lock();
        frames[*idx] = Some(frame);
        *idx = (*idx + 1) % self.capacity;
        self.sequence.fetch_add(1, Ordering::Relaxed);
    }

    /// Wrap packed RGBA bytes and push them.
    pub fn push_rgba(&self, bytes: &[u8]) -> Result<()> {
        let frame = PixelBuffer::from_rgba_bytes(self.width, self.height, bytes)?;
        self.push(frame);
        Ok(())
    }

    /// Number of frames pushed so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// The most recently pushed frame, if any.
    pub fn latest(&self) -> Option<PixelBuffer> {
        let frames = self.frames.lock();
        let idx = self.write_idx.lock();
        let latest_idx = if *idx == 0 {
            self.capacity - 1
        } else {
            *idx - 1
        };
        frames[latest_idx].clone()
    }
}

impl VideoSource for FrameBuffer {
    fn current_frame(&self) -> Result<FramePoll> {
        let Some(frame) = self.latest() else {
            return Ok(FramePoll::NotReady);
        };
        if frame.dimensions() != (self.width, self.height) {
            return Err(CaptureError::InvalidBuffer(format!(
                "frame is {}x{}, source is fixed at {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        Ok(FramePoll::Ready(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::types::Rgba;

    fn make_frame(value: u8) -> PixelBuffer {
        PixelBuffer::filled(4, 2, Rgba::splat(value)).unwrap()
    }

    fn first_value(poll: FramePoll) -> u8 {
        match poll {
            FramePoll::Ready(frame) => frame.pixels()[0].r,
            FramePoll::NotReady => panic!("expected a frame"),
        }
    }

    #[test]
    fn not_ready_when_empty() {
        let buf = FrameBuffer::new(3, 4, 2);
        assert!(buf.latest().is_none());
        assert_eq!(buf.current_frame().unwrap(), FramePoll::NotReady);
    }

    #[test]
    fn stores_and_retrieves_latest() {
        let buf = FrameBuffer::new(3, 4, 2);
        buf.push(make_frame(1));
        buf.push(make_frame(2));
        assert_eq!(first_value(buf.current_frame().unwrap()), 2);
        assert_eq!(buf.sequence(), 2);
    }

    #[test]
    fn overwrites_oldest_when_full() {
        let buf = FrameBuffer::new(3, 4, 2);
        for value in 1..=4 {
            buf.push(make_frame(value));
        }
        assert_eq!(first_value(buf.current_frame().unwrap()), 4);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let buf = FrameBuffer::new(0, 4, 2);
        buf.push(make_frame(5));
        assert_eq!(first_value(buf.current_frame().unwrap()), 5);
    }

    #[test]
    fn latest_shares_pixels_instead_of_copying() {
        let buf = FrameBuffer::new(3, 4, 2);
        buf.push(make_frame(42));
        let a = buf.latest().unwrap();
        let b = buf.latest().unwrap();
        assert!(a.shares_pixels(&b));
    }

    #[test]
    fn push_rgba_validates_length() {
        let buf = FrameBuffer::new(3, 2, 1);
        assert!(buf.push_rgba(&[0; 8]).is_ok());
        assert!(matches!(
            buf.push_rgba(&[0; 7]),
            Err(CaptureError::InvalidBuffer(_))
        ));
        assert_eq!(buf.sequence(), 1);
    }

    #[test]
    fn mismatched_dimensions_are_invalid() {
        let buf = FrameBuffer::new(3, 8, 8);
        buf.push(make_frame(1));
        assert!(matches!(
            buf.current_frame(),
            Err(CaptureError::InvalidBuffer(_))
        ));
    }

    #[test]
    fn frame_buffer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FrameBuffer>();
    }
}
