//! scanflow - OCR extraction orchestration for scanned images and PDFs
//!
//! scanflow turns scanned documents into per-line text with confidence scores
//! and bounding boxes. PDFs are rasterized page by page and recognized in
//! parallel; every page is run through a primary engine, with a fallback
//! engine consulted when the primary result is weak. Page results are put
//! back in document order and combined into one confidence-weighted result.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use scanflow::{ExtractionConfig, ExtractionMode, Extractor};
//!
//! # fn main() -> scanflow::Result<()> {
//! let config = ExtractionConfig::load(None)?;
//! let extractor = Extractor::new(config)?;
//! let result = extractor.extract_sync("invoice.pdf", ExtractionMode::Auto);
//! if result.succeeded {
//!     println!("{}", result.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Page source** (`source`): document to ordered page images
//! - **Engines** (`engine`): recognition adapters, registry and checkout pools
//! - **Pipeline** (`pipeline`): engine selection, page workers, dispatch, aggregation
//! - **Core** (`core`): the `Extractor` facade, configuration, source detection
//!
//! # Features
//!
//! - `pdf` (default): PDF rasterization through pdfium
//! - `tesseract`: native Tesseract engine in addition to the `tesseract` executable

#![cfg_attr(not(test), deny(unsafe_code))]

pub mod core;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod source;
pub mod types;

#[cfg(feature = "pdf")]
pub mod pdf;

pub use error::{Result, ScanflowError};

pub use types::*;

pub use core::config::{EngineConfig, ExtractionConfig, Granularity};
pub use core::extractor::{Extractor, ExtractorBuilder};

pub use engine::{EngineFactory, EngineRegistry, EngineRole, PageInput, RecognitionEngine, RecognizedLine};
pub use source::{PageImage, PageSource, RasterPageSource};
