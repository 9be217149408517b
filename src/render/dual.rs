use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CaptureError, Result};
use crate::frame::types::PixelBuffer;
use crate::render::surface::{RenderTarget, Surface};

/// Identifies one of the render targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetName {
    /// Left half reflected onto the right.
    Left,
    /// Right half reflected onto the left.
    Right,
    /// Raw, untransformed frame.
    Live,
}

impl TargetName {
    pub const ALL: [TargetName; 3] = [TargetName::Left, TargetName::Right, TargetName::Live];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Live => "live",
        }
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetName {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "live" => Ok(Self::Live),
            other => Err(CaptureError::SurfaceUnavailable {
                target: other.to_string(),
                reason: "unknown render target".to_string(),
            }),
        }
    }
}

/// Owns the render targets and routes buffers to them.
///
/// Each target is written independently: a failure on one never blocks
/// the others.
pub struct DualRenderer {
    left: Box<dyn RenderTarget>,
    right: Box<dyn RenderTarget>,
    live: Box<dyn RenderTarget>,
}

impl DualRenderer {
    pub fn new(
        left: Box<dyn RenderTarget>,
        right: Box<dyn RenderTarget>,
        live: Box<dyn RenderTarget>,
    ) -> Self {
        Self { left, right, live }
    }

    /// Renderer backed by in-memory surfaces.
    pub fn in_memory() -> Self {
        Self::new(
            Box::new(Surface::new(TargetName::Left.as_str())),
            Box::new(Surface::new(TargetName::Right.as_str())),
            Box::new(Surface::new(TargetName::Live.as_str())),
        )
    }

    fn target(&self, name: TargetName) -> &dyn RenderTarget {
        match name {
            TargetName::Left => self.left.as_ref(),
            TargetName::Right => self.right.as_ref(),
            TargetName::Live => self.live.as_ref(),
        }
    }

    fn target_mut(&mut self, name: TargetName) -> &mut dyn RenderTarget {
        match name {
            TargetName::Left => self.left.as_mut(),
            TargetName::Right => self.right.as_mut(),
            TargetName::Live => self.live.as_mut(),
        }
    }

    /// Size every target for a session's frames.
    pub fn resize_all(&mut self, width: u32, height: u32) {
        for name in TargetName::ALL {
            self.target_mut(name).resize(width, height);
        }
    }

    /// Write `buffer` to one target, replacing its contents.
    pub fn render(&mut self, name: TargetName, buffer: &PixelBuffer) -> Result<()> {
        self.target_mut(name).render(buffer)
    }

    /// The most recently rendered buffer of a target.
    pub fn contents(&self, name: TargetName) -> Option<PixelBuffer> {
        self.target(name).contents()
    }
}
