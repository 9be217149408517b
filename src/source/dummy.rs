use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{CaptureError, Result};
use crate::frame::types::{PixelBuffer, Rgba};
use crate::settings::types::SessionConfig;
use crate::source::backend::{FramePoll, OpenFuture, VideoDevice, VideoSource};

/// A fake camera for running sessions without real hardware.
///
/// Produces a horizontal gradient that scrolls one column per poll, so
/// consecutive frames differ and the two mirrored outputs are visibly
/// distinct. The first `warmup_polls` polls report `NotReady`, like a
/// camera that has not delivered its first frame yet.
pub struct TestPatternDevice {
    warmup_polls: u64,
    unavailable: Option<String>,
}

impl TestPatternDevice {
    pub fn new() -> Self {
        Self {
            warmup_polls: 0,
            unavailable: None,
        }
    }

    /// Report `NotReady` for the first `polls` polls after opening.
    pub fn with_warmup_polls(mut self, polls: u64) -> Self {
        self.warmup_polls = polls;
        self
    }

    /// A device that always fails to open, e.g. permission denied.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            warmup_polls: 0,
            unavailable: Some(reason.into()),
        }
    }
}

impl Default for TestPatternDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoDevice for TestPatternDevice {
    fn open<'a>(&'a self, config: &'a SessionConfig) -> OpenFuture<'a> {
        Box::pin(async move {
            if let Some(reason) = &self.unavailable {
                return Err(CaptureError::DeviceUnavailable(reason.clone()));
            }
            tracing::info!(
                "test pattern device opened at {}x{}",
                config.width,
                config.height
            );
            let source = TestPatternSource {
                width: config.width,
                height: config.height,
                warmup_polls: self.warmup_polls,
                polls: AtomicU64::new(0),
            };
            Ok(Arc::new(source) as Arc<dyn VideoSource>)
        })
    }
}

/// Source side of [`TestPatternDevice`].
struct TestPatternSource {
    width: u32,
    height: u32,
    warmup_polls: u64,
    polls: AtomicU64,
}

impl VideoSource for TestPatternSource {
    fn current_frame(&self) -> Result<FramePoll> {
        let poll = self.polls.fetch_add(1, Ordering::Relaxed);
        if poll < self.warmup_polls {
            return Ok(FramePoll::NotReady);
        }
        let frame = pattern_frame(self.width, self.height, poll - self.warmup_polls)?;
        Ok(FramePoll::Ready(frame))
    }
}

/// Gradient test pattern shifted by `offset` columns.
pub fn pattern_frame(width: u32, height: u32, offset: u64) -> Result<PixelBuffer> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let r = ((u64::from(x) + offset) % 256) as u8;
            let g = (y % 256) as u8;
            pixels.push(Rgba::new(r, g, 128, 255));
        }
    }
    PixelBuffer::new(width, height, pixels)
}
