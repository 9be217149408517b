use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageBuffer, ImageEncoder, Rgb};
use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, Result};
use crate::frame::types::PixelBuffer;
use crate::render::dual::TargetName;

/// Encoding used for exported stills.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExportFormat {
    /// Lossless, keeps the alpha channel.
    #[default]
    Png,
    /// Quality 1-100; alpha is dropped.
    Jpeg { quality: u8 },
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
        }
    }
}

/// Encode a buffer as an image file.
pub fn encode(buffer: &PixelBuffer, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Png => encode_png(buffer),
        ExportFormat::Jpeg { quality } => encode_jpeg(buffer, quality),
    }
}

/// Encode RGBA pixel data to PNG.
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(
            buffer.as_bytes(),
            buffer.width(),
            buffer.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| CaptureError::ExportFailure(format!("PNG encoding failed: {e}")))?;
    Ok(out)
}

/// Encode pixel data to JPEG at the given quality (clamped to 1-100).
pub fn encode_jpeg(buffer: &PixelBuffer, quality: u8) -> Result<Vec<u8>> {
    let rgb: Vec<u8> = buffer
        .pixels()
        .iter()
        .flat_map(|p| [p.r, p.g, p.b])
        .collect();
    let img: ImageBuffer<Rgb<u8>, _> = ImageBuffer::from_raw(buffer.width(), buffer.height(), rgb)
        .ok_or_else(|| CaptureError::ExportFailure("invalid buffer dimensions".to_string()))?;

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    img.write_with_encoder(encoder)
        .map_err(|e| CaptureError::ExportFailure(format!("JPEG encoding failed: {e}")))?;
    Ok(out)
}

/// Encode a buffer as a `data:` URL, e.g. for a download link.
pub fn data_url(buffer: &PixelBuffer, format: ExportFormat) -> Result<String> {
    let bytes = encode(buffer, format)?;
    let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &bytes);
    Ok(format!("data:{};base64,{encoded}", format.mime_type()))
}

/// Download file name for a target, e.g. `left-download.png`.
pub fn file_name(target: TargetName, format: ExportFormat) -> String {
    format!("{target}-download.{}", format.extension())
}

/// Encode and write a still into `dir`, returning the written path.
pub fn save(
    buffer: &PixelBuffer,
    target: TargetName,
    format: ExportFormat,
    dir: &Path,
) -> Result<PathBuf> {
    let bytes = encode(buffer, format)?;
    std::fs::create_dir_all(dir)
        .map_err(|e| CaptureError::ExportFailure(format!("{}: {e}", dir.display())))?;
    let path = dir.join(file_name(target, format));
    std::fs::write(&path, bytes)
        .map_err(|e| CaptureError::ExportFailure(format!("{}: {e}", path.display())))?;
    Ok(path)
}
