use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, Result};
use crate::frame::types::{MirrorPair, PixelBuffer, Rgba};

/// What to do with frames whose width has no single midline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OddWidthPolicy {
    /// Fail with `OddWidthUnsupported`.
    #[default]
    Reject,
    /// Keep the center column in both halves; it becomes the mirror axis.
    MirrorCenter,
}

/// Builds the left- and right-mirrored variants of a frame.
///
/// Each output row is symmetric about the vertical center line:
/// `left` keeps the source's left half in place and reflects it onto the
/// right side, `right` keeps the source's right half in place and reflects
/// it onto the left side. Pure and deterministic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorTransform {
    odd_width: OddWidthPolicy,
}

impl MirrorTransform {
    pub fn new(odd_width: OddWidthPolicy) -> Self {
        Self { odd_width }
    }

    /// Mirror `source` about its vertical midline.
    ///
    /// `PixelBuffer` already guarantees `pixels.len() == width * height`, so
    /// raw frame data is rejected with `InvalidBuffer` when it is wrapped,
    /// before it can reach this point.
    pub fn transform(&self, source: &PixelBuffer) -> Result<MirrorPair> {
        let width = source.width() as usize;
        let odd = width % 2 == 1;
        if odd && self.odd_width == OddWidthPolicy::Reject {
            return Err(CaptureError::OddWidthUnsupported(source.width()));
        }

        // Columns kept from each side; with an odd width the center is shared.
        let half = width.div_ceil(2);
        let shared = usize::from(odd);

        let mut left: Vec<Rgba> = Vec::with_capacity(source.pixels().len());
        let mut right: Vec<Rgba> = Vec::with_capacity(source.pixels().len());

        for row in source.pixels().chunks_exact(width) {
            let kept_left = &row[..half];
            left.extend_from_slice(kept_left);
            left.extend(kept_left.iter().rev().skip(shared));

            let kept_right = &row[width - half..];
            right.extend(kept_right.iter().rev());
            right.extend_from_slice(&kept_right[shared..]);
        }

        Ok(MirrorPair {
            left: PixelBuffer::new(source.width(), source.height(), left)?,
            right: PixelBuffer::new(source.width(), source.height(), right)?,
        })
    }
}
