use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Result;
use crate::frame::types::PixelBuffer;
use crate::settings::types::SessionConfig;

/// Outcome of polling a source for its latest frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePoll {
    Ready(PixelBuffer),
    /// No frame available yet (e.g. the camera is still warming up).
    NotReady,
}

/// An opened video stream, polled once per sampling tick.
///
/// Frames have the fixed dimensions negotiated when the device was opened.
pub trait VideoSource: Send + Sync {
    /// Return the most recent frame, or `NotReady`.
    ///
    /// Fails with `InvalidBuffer` when the device hands back malformed data.
    fn current_frame(&self) -> Result<FramePoll>;
}

/// Future returned by [`VideoDevice::open`].
pub type OpenFuture<'a> = Pin<Box<dyn Future<Output = Result<Arc<dyn VideoSource>>> + Send + 'a>>;

/// Platform capability that yields a frame-producing handle.
///
/// Opening is the only suspension point of a capture session; it may wait
/// for permission prompts or device start-up.
pub trait VideoDevice: Send + Sync {
    /// Open the device at the configured dimensions.
    ///
    /// Fails with `DeviceUnavailable` when the device cannot be opened.
    fn open<'a>(&'a self, config: &'a SessionConfig) -> OpenFuture<'a>;
}
