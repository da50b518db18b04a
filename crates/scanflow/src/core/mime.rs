//! Source kind detection.
//!
//! Routing only needs to know whether a file is a PDF (rasterized page by
//! page) or a single raster image. The decision is made from the extension,
//! with `mime_guess` as a second opinion for extensions outside the table.

use crate::core::config::ExtractionConfig;
use crate::{Result, ScanflowError};
use std::path::Path;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// What kind of document a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Image,
}

impl SourceKind {
    pub fn is_pdf(self) -> bool {
        matches!(self, SourceKind::Pdf)
    }
}

/// Detect the source kind of `path`, rejecting extensions the configuration
/// does not allow.
///
/// # Errors
///
/// - `ScanflowError::UnsupportedFormat` for disallowed or non-image extensions
/// - `ScanflowError::Validation` when the path has no extension
pub fn detect_source_kind(path: impl AsRef<Path>, config: &ExtractionConfig) -> Result<SourceKind> {
    let path = path.as_ref();

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_ascii_lowercase())
        .ok_or_else(|| {
            ScanflowError::validation(format!(
                "Could not determine file type without an extension: {}",
                path.display()
            ))
        })?;

    if !config.is_extension_allowed(&extension) {
        return Err(ScanflowError::UnsupportedFormat(format!(
            "Unsupported file type: .{}",
            extension
        )));
    }

    if extension == "pdf" {
        return Ok(SourceKind::Pdf);
    }

    match mime_guess::from_ext(&extension).first() {
        Some(mime) if mime.essence_str() == PDF_MIME_TYPE => Ok(SourceKind::Pdf),
        Some(mime) if mime.type_() == mime_guess::mime::IMAGE => Ok(SourceKind::Image),
        _ => Err(ScanflowError::UnsupportedFormat(format!(
            "Extension .{} is not a raster image or PDF",
            extension
        ))),
    }
}
