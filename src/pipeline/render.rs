//! Page rasterisation for the vision text source.
//!
//! PDF uploads are rendered with pdfium; PNG/JPEG uploads are decoded with
//! `image`. Both run inside `spawn_blocking`: pdfium keeps thread-local state
//! and decoding a phone photo is CPU-bound.
//!
//! `max_rendered_pixels` caps the longest edge rather than fixing a DPI, so a
//! full-page scan and a cropped card photo land at similar sizes.

use crate::error::AutofillError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rasterise every page of a PDF.
///
/// # Returns
/// `(page_index_0based, DynamicImage)` in page order.
pub async fn render_pages(
    pdf_path: &Path,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<Vec<(usize, DynamicImage)>, AutofillError> {
    let path = pdf_path.to_path_buf();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || render_pages_blocking(&path, max_pixels, password.as_deref()))
        .await
        .map_err(|e| AutofillError::Internal(format!("Render task panicked: {}", e)))?
}

/// Bind pdfium from `PDFIUM_LIB_PATH` when set, else from the system paths.
fn bind_pdfium() -> Result<Pdfium, AutofillError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(lib) if !lib.is_empty() => Pdfium::bind_to_library(&lib),
        _ => Pdfium::bind_to_system_library(),
    };
    bindings
        .map(Pdfium::new)
        .map_err(|e| AutofillError::RasterisationFailed {
            page: 0,
            detail: format!("pdfium library not available: {:?}", e),
        })
}

fn render_pages_blocking(
    pdf_path: &Path,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<Vec<(usize, DynamicImage)>, AutofillError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| AutofillError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(total_pages);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            AutofillError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        results.push((idx, image));
    }

    Ok(results)
}

/// Decode a PNG/JPEG upload, downscaled to `max_pixels` on the longest edge.
pub async fn load_image(path: &Path, max_pixels: u32) -> Result<DynamicImage, AutofillError> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let img = image::open(&path).map_err(|e| AutofillError::RasterisationFailed {
            page: 1,
            detail: format!("{}: {}", path.display(), e),
        })?;
        Ok(fit_within(img, max_pixels))
    })
    .await
    .map_err(|e| AutofillError::Internal(format!("Decode task panicked: {}", e)))?
}

fn fit_within(img: DynamicImage, max_pixels: u32) -> DynamicImage {
    if img.width().max(img.height()) <= max_pixels {
        img
    } else {
        img.resize(max_pixels, max_pixels, image::imageops::FilterType::Triangle)
    }
}
