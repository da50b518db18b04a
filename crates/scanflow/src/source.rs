//! Page sources: turning a document into page images.

use crate::core::io::read_file_sync;
use crate::core::mime::SourceKind;
use crate::{Result, ScanflowError};
use image::{DynamicImage, ImageReader};
use std::path::Path;

/// One page's pixels, numbered from 1 in document order.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub page_index: usize,
    pub image: DynamicImage,
}

impl PageImage {
    pub fn new(page_index: usize, image: DynamicImage) -> Self {
        Self { page_index, image }
    }
}

/// Produces the complete, ordered page sequence of a document.
pub trait PageSource: Send + Sync {
    /// Load every page of `path`.
    ///
    /// # Errors
    ///
    /// Returns `ScanflowError::Conversion` when the document yields no pages.
    fn load_pages(&self, path: &Path, kind: SourceKind) -> Result<Vec<PageImage>>;
}

/// Decodes images with the `image` crate and rasterizes PDFs with pdfium.
#[derive(Debug, Clone)]
pub struct RasterPageSource {
    render_dpi: u32,
}

impl RasterPageSource {
    pub fn new(render_dpi: u32) -> Self {
        Self { render_dpi }
    }

    pub fn render_dpi(&self) -> u32 {
        self.render_dpi
    }
}

impl Default for RasterPageSource {
    fn default() -> Self {
        Self::new(200)
    }
}

/// Decode a single image file.
pub fn decode_image(path: &Path) -> Result<DynamicImage> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(image)
}

#[cfg(feature = "pdf")]
fn rasterize_pdf(path: &Path, dpi: u32) -> Result<Vec<DynamicImage>> {
    use crate::pdf::{PageRenderOptions, render_all_pages};

    let bytes = read_file_sync(path)?;
    let images = render_all_pages(&bytes, &PageRenderOptions::with_dpi(dpi))?;
    Ok(images)
}

#[cfg(not(feature = "pdf"))]
fn rasterize_pdf(path: &Path, _dpi: u32) -> Result<Vec<DynamicImage>> {
    read_file_sync(path)?;
    Err(ScanflowError::conversion(format!(
        "Cannot rasterize {}: scanflow was built without the 'pdf' feature",
        path.display()
    )))
}

impl PageSource for RasterPageSource {
    fn load_pages(&self, path: &Path, kind: SourceKind) -> Result<Vec<PageImage>> {
        let images = match kind {
            SourceKind::Image => vec![decode_image(path)?],
            SourceKind::Pdf => rasterize_pdf(path, self.render_dpi)?,
        };

        if images.is_empty() {
            return Err(ScanflowError::conversion(format!(
                "Could not convert {} to images: no pages produced",
                path.display()
            )));
        }

        Ok(images
            .into_iter()
            .enumerate()
            .map(|(i, image)| PageImage::new(i + 1, image))
            .collect())
    }
}
