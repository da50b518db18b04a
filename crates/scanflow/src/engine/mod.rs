//! Recognition engines and their checkout pools.
//!
//! A [`RecognitionEngine`] turns one page image into raw lines. Engines are
//! not required to be thread-safe: each page worker checks an instance out of
//! an [`EnginePool`], uses it exclusively, and returns it when done. Instances
//! are built on demand by an [`EngineFactory`]; the [`EngineRegistry`] maps the
//! primary and fallback roles to their factories.
//!
//! # Implementing an engine
//!
//! ```rust
//! use scanflow::engine::{EngineFactory, PageInput, RecognitionEngine, RecognizedLine};
//! use scanflow::types::bbox_from_rect;
//! use scanflow::Result;
//!
//! struct Constant;
//!
//! impl RecognitionEngine for Constant {
//!     fn name(&self) -> &str {
//!         "constant"
//!     }
//!
//!     fn recognize(&mut self, input: &PageInput<'_>) -> Result<Vec<RecognizedLine>> {
//!         let (width, height) = (input.image().width(), input.image().height());
//!         Ok(vec![RecognizedLine::new(
//!             "hello",
//!             0.9,
//!             bbox_from_rect(0.0, 0.0, width as f64, height as f64),
//!         )])
//!     }
//! }
//!
//! struct ConstantFactory;
//!
//! impl EngineFactory for ConstantFactory {
//!     fn name(&self) -> &str {
//!         "constant"
//!     }
//!
//!     fn create(&self) -> Result<Box<dyn RecognitionEngine>> {
//!         Ok(Box::new(Constant))
//!     }
//! }
//! ```
pub mod pool;
pub mod registry;
#[cfg(feature = "tesseract")]
pub mod tesseract;
pub mod tesseract_cli;
pub mod tsv;

pub use pool::{EngineLease, EnginePool};
pub use registry::{EnginePools, EngineRegistry, factory_for};

use crate::types::BoundingBox;
use crate::{Result, ScanflowError};
use image::DynamicImage;
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tempfile::NamedTempFile;

/// The two engine slots an extraction can draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineRole {
    Primary,
    Fallback,
}

impl fmt::Display for EngineRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineRole::Primary => f.write_str("primary"),
            EngineRole::Fallback => f.write_str("fallback"),
        }
    }
}

/// One line as reported by an engine, before it is attached to a page.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedLine {
    pub text: String,
    /// Normalized to `[0, 1]`.
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl RecognizedLine {
    /// Confidence is clamped to `[0, 1]`; a non-finite value becomes 0.0.
    pub fn new(text: impl Into<String>, confidence: f64, bbox: BoundingBox) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            text: text.into(),
            confidence,
            bbox,
        }
    }
}

/// Page pixels handed to an engine, with a file-backed view created on demand.
///
/// The temporary file (if any) lives exactly as long as the input and is
/// removed when it is dropped, including during unwinding.
pub struct PageInput<'a> {
    image: &'a DynamicImage,
    source_path: Option<&'a Path>,
    materialized: OnceCell<NamedTempFile>,
}

impl<'a> PageInput<'a> {
    pub fn new(image: &'a DynamicImage) -> Self {
        Self {
            image,
            source_path: None,
            materialized: OnceCell::new(),
        }
    }

    /// Input whose pixels already exist on disk at `path`.
    ///
    /// File-based engines read `path` directly instead of writing a copy.
    pub fn with_source_path(image: &'a DynamicImage, path: &'a Path) -> Self {
        Self {
            image,
            source_path: Some(path),
            materialized: OnceCell::new(),
        }
    }

    pub fn image(&self) -> &DynamicImage {
        self.image
    }

    /// Path of a file holding the page pixels, writing a temporary PNG on first use.
    pub fn file_path(&self) -> Result<&Path> {
        if let Some(path) = self.source_path {
            return Ok(path);
        }

        let file = self.materialized.get_or_try_init(|| -> Result<NamedTempFile> {
            let file = tempfile::Builder::new()
                .prefix("scanflow-page-")
                .suffix(".png")
                .tempfile()?;
            self.image
                .save_with_format(file.path(), image::ImageFormat::Png)
                .map_err(|e| ScanflowError::conversion_with_source("Failed to write page image", e))?;
            Ok(file)
        })?;

        Ok(file.path())
    }

    /// Whether a temporary file has been written for this input.
    pub fn is_materialized(&self) -> bool {
        self.materialized.get().is_some()
    }
}

/// A text recognition capability.
///
/// Calls on one instance never overlap; instances may hold per-call state
/// such as an initialized native handle.
pub trait RecognitionEngine: Send {
    /// Adapter name reported in `engines_used`.
    fn name(&self) -> &str;

    /// Whether the engine reads the page from a file rather than from memory.
    fn requires_file_input(&self) -> bool {
        false
    }

    /// Recognize the lines on one page, in reading order.
    fn recognize(&mut self, input: &PageInput<'_>) -> Result<Vec<RecognizedLine>>;
}

/// Builds engine instances for a pool.
pub trait EngineFactory: Send + Sync {
    fn name(&self) -> &str;

    /// Construct a new instance.
    ///
    /// Failures are reported as [`ScanflowError::EngineUnavailable`].
    fn create(&self) -> Result<Box<dyn RecognitionEngine>>;
}
