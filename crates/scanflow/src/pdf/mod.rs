//! PDF rasterization.
//!
//! Pages are rendered to RGB images through pdfium, which is bound at runtime
//! to the system library (or to the directory named by `SCANFLOW_PDFIUM_PATH`).
//! Only compiled with the `pdf` feature.
pub mod bindings;
pub mod error;
pub mod rendering;

pub use error::PdfError;
pub use rendering::{PageRenderOptions, PdfRenderer, render_all_pages};
