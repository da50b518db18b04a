use super::bindings::bind_pdfium;
use super::error::{PdfError, Result};
use image::DynamicImage;
use pdfium_render::prelude::*;

const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Largest edge, in pixels, a rendered page may have.
const MAX_IMAGE_DIMENSION: f32 = 32_768.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRenderOptions {
    pub dpi: u32,
}

impl Default for PageRenderOptions {
    fn default() -> Self {
        Self { dpi: 200 }
    }
}

impl PageRenderOptions {
    pub fn with_dpi(dpi: u32) -> Self {
        Self { dpi }
    }

    /// Pixel size for a page of the given size in points.
    ///
    /// The scale is reduced for oversized pages so neither edge exceeds
    /// [`MAX_IMAGE_DIMENSION`]; both edges are at least one pixel.
    fn target_size(&self, width_points: f32, height_points: f32) -> (i32, i32) {
        let mut scale = self.dpi as f32 / PDF_POINTS_PER_INCH;
        let longest = width_points.max(height_points) * scale;
        if longest > MAX_IMAGE_DIMENSION {
            scale *= MAX_IMAGE_DIMENSION / longest;
        }
        (
            ((width_points * scale) as i32).max(1),
            ((height_points * scale) as i32).max(1),
        )
    }
}

pub struct PdfRenderer {
    pdfium: Pdfium,
}

impl PdfRenderer {
    pub fn new() -> Result<Self> {
        let bindings = bind_pdfium()?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Render every page, in document order.
    pub fn render_all_pages(&self, pdf_bytes: &[u8], options: &PageRenderOptions) -> Result<Vec<DynamicImage>> {
        let document = self.pdfium.load_pdf_from_byte_slice(pdf_bytes, None).map_err(|e| {
            let message = e.to_string();
            if message.to_ascii_lowercase().contains("password") {
                PdfError::PasswordRequired
            } else {
                PdfError::InvalidPdf(message)
            }
        })?;

        let pages = document.pages();
        let mut images = Vec::with_capacity(pages.len() as usize);

        for (page_index, page) in pages.iter().enumerate() {
            let (width, height) = options.target_size(page.width().value, page.height().value);

            let config = PdfRenderConfig::new()
                .set_target_width(width)
                .set_target_height(height)
                .rotate_if_landscape(PdfPageRenderRotation::None, false);

            let bitmap = page.render_with_config(&config).map_err(|e| {
                PdfError::RenderingFailed(format!("Failed to render page {}: {}", page_index + 1, e))
            })?;

            images.push(DynamicImage::ImageRgb8(bitmap.as_image().into_rgb8()));
        }

        tracing::debug!("Rendered {} PDF page(s) at {} dpi", images.len(), options.dpi);
        Ok(images)
    }
}

/// Render all pages of a PDF with a freshly bound renderer.
pub fn render_all_pages(pdf_bytes: &[u8], options: &PageRenderOptions) -> Result<Vec<DynamicImage>> {
    PdfRenderer::new()?.render_all_pages(pdf_bytes, options)
}
