//! Image encoding: `DynamicImage` → base64 PNG wrapped in `ImageData`.
//!
//! PNG keeps fine-print ID digits sharp; `detail: "high"` keeps the model
//! from reading a card through a single low-res tile.

use crate::error::AutofillError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode page `index` (0-based) of a scan for the vision request.
pub fn encode_page(index: usize, img: &DynamicImage) -> Result<ImageData, AutofillError> {
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| AutofillError::RasterisationFailed {
            page: index + 1,
            detail: format!("Image encoding failed: {}", e),
        })?;

    let data = STANDARD.encode(&png);
    debug!(
        "Page {}: {}x{} scan → {} bytes base64",
        index + 1,
        img.width(),
        img.height(),
        data.len()
    );
    Ok(ImageData::new(data, "image/png").with_detail("high"))
}
