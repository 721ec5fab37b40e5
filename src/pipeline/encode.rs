//! Image encoding: `DynamicImage` → PNG bytes / base64 `ImageData`.
//!
//! Both OCR engines consume PNG: tesseract reads it from a temp file and the
//! vision engine sends it inline as base64. PNG is lossless, which keeps the
//! edges of rendered glyphs crisp for recognition.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as PNG bytes.
pub fn png_bytes(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Encode an image as a base64 PNG ready for a vision model.
///
/// `detail: "high"` asks OpenAI-style providers for full-resolution tiling;
/// small print is lost at the low-detail setting.
pub fn encode_image(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let buf = png_bytes(img)?;
    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
