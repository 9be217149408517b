use std::fmt;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::error::{CaptureError, Result};

/// A single RGBA pixel, laid out as four consecutive bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// A pixel with every channel set to `value`.
    pub const fn splat(value: u8) -> Self {
        Self::new(value, value, value, value)
    }
}

/// Immutable row-major image, origin top-left.
///
/// The pixel storage is reference-counted so handing the same frame to
/// several render targets does not copy the pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Arc<[Rgba]>,
}

impl PixelBuffer {
    /// Build a buffer, rejecting zero dimensions and length mismatches.
    pub fn new(width: u32, height: u32, pixels: Vec<Rgba>) -> Result<Self> {
        let expected = expected_len(width, height)?;
        if pixels.len() != expected {
            return Err(CaptureError::InvalidBuffer(format!(
                "{width}x{height} needs {expected} pixels, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// Build a buffer from packed RGBA bytes (4 bytes per pixel).
    pub fn from_rgba_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let pixels: &[Rgba] = bytemuck::try_cast_slice(bytes).map_err(|e| {
            CaptureError::InvalidBuffer(format!("{} bytes is not whole RGBA pixels: {e:?}", bytes.len()))
        })?;
        Self::new(width, height, pixels.to_vec())
    }

    /// A buffer with every pixel set to `pixel`.
    pub fn filled(width: u32, height: u32, pixel: Rgba) -> Result<Self> {
        let len = expected_len(width, height)?;
        Self::new(width, height, vec![pixel; len])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Pixels of row `y`, or `None` past the last row.
    pub fn row(&self, y: u32) -> Option<&[Rgba]> {
        if y >= self.height {
            return None;
        }
        let w = self.width as usize;
        let start = y as usize * w;
        self.pixels.get(start..start + w)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width {
            return None;
        }
        self.row(y).map(|row| row[x as usize])
    }

    /// Packed RGBA bytes, without copying.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels[..])
    }

    /// Whether both buffers share the same pixel allocation.
    pub fn shares_pixels(&self, other: &PixelBuffer) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &self.pixels.len())
            .finish()
    }
}

fn expected_len(width: u32, height: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(CaptureError::InvalidBuffer(format!(
            "dimensions must be non-zero, got {width}x{height}"
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| CaptureError::InvalidBuffer(format!("{width}x{height} overflows")))
}

/// Left- and right-mirrored variants of one frame.
///
/// Produced fresh per tick and consumed by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorPair {
    pub left: PixelBuffer,
    pub right: PixelBuffer,
}
