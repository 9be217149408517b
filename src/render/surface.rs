use crate::error::{CaptureError, Result};
use crate::frame::types::PixelBuffer;

/// A named output sink that displays pixel buffers.
///
/// The capture core only writes through this interface; it never holds a
/// handle to the presentation layer itself. Each target is written by
/// exactly one renderer.
pub trait RenderTarget: Send {
    /// Name used in logs and error reports.
    fn name(&self) -> &str;

    /// Size the surface. Called once during session setup, before the
    /// first frame is rendered.
    fn resize(&mut self, width: u32, height: u32);

    /// Replace the surface contents with `buffer`.
    ///
    /// Fails with `SurfaceUnavailable` unless the surface has been sized to
    /// exactly `buffer.width()` x `buffer.height()`.
    fn render(&mut self, buffer: &PixelBuffer) -> Result<()>;

    /// The most recently rendered buffer, if any.
    fn contents(&self) -> Option<PixelBuffer>;
}

/// In-memory surface that keeps the last rendered buffer.
#[derive(Debug, Clone)]
pub struct Surface {
    name: String,
    size: Option<(u32, u32)>,
    contents: Option<PixelBuffer>,
}

impl Surface {
    /// An unsized, empty surface.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            contents: None,
        }
    }
}

impl RenderTarget for Surface {
    fn name(&self) -> &str {
        &self.name
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.size != Some((width, height)) {
            // Old contents no longer fit the surface.
            self.contents = None;
        }
        self.size = Some((width, height));
    }

    fn render(&mut self, buffer: &PixelBuffer) -> Result<()> {
        match self.size {
            Some(size) if size == buffer.dimensions() => {}
            Some((w, h)) => {
                return Err(CaptureError::SurfaceUnavailable {
                    target: self.name.clone(),
                    reason: format!(
                        "sized {w}x{h}, buffer is {}x{}",
                        buffer.width(),
                        buffer.height()
                    ),
                });
            }
            None => {
                return Err(CaptureError::SurfaceUnavailable {
                    target: self.name.clone(),
                    reason: "surface has not been sized".to_string(),
                });
            }
        }
        self.contents = Some(buffer.clone());
        Ok(())
    }

    fn contents(&self) -> Option<PixelBuffer> {
        self.contents.clone()
    }
}
