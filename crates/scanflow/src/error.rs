//! Error types for scanflow.
//!
//! Errors only ever cross two boundaries: the page worker (where they are
//! folded into a failed [`PageResult`](crate::types::PageResult)) and the
//! extraction facade (where they become a failed
//! [`DocumentResult`](crate::types::DocumentResult)). Everything below those
//! boundaries propagates `ScanflowError` with `?`.
//!
//! - `Io` - file system errors, never wrapped
//! - `Conversion` - the document could not be turned into page images
//! - `EngineUnavailable` - a recognition engine could not be constructed
//! - `Recognition` - an engine call failed
//! - `PoolEstablishment` - the worker pool could not be built
//!
//! # Example
//!
//! ```rust
//! use scanflow::{Result, ScanflowError};
//!
//! fn check_threshold(threshold: f64) -> Result<f64> {
//!     if !(0.0..=1.0).contains(&threshold) {
//!         return Err(ScanflowError::validation(format!(
//!             "confidence threshold must be within [0, 1], got {}",
//!             threshold
//!         )));
//!     }
//!     Ok(threshold)
//! }
//! ```
use thiserror::Error;

/// Result type alias using `ScanflowError`.
pub type Result<T> = std::result::Result<T, ScanflowError>;

/// Main error type for all scanflow operations.
#[derive(Debug, Error)]
pub enum ScanflowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Conversion error: {message}")]
    Conversion {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Engine '{engine}' unavailable: {message}")]
    EngineUnavailable { engine: String, message: String },

    #[error("Recognition error: {message}")]
    Recognition {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Worker pool could not be established: {0}")]
    PoolEstablishment(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ScanflowError {
    fn from(err: serde_json::Error) -> Self {
        ScanflowError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<image::ImageError> for ScanflowError {
    fn from(err: image::ImageError) -> Self {
        ScanflowError::Conversion {
            message: format!("Failed to decode image: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "pdf")]
impl From<crate::pdf::error::PdfError> for ScanflowError {
    fn from(err: crate::pdf::error::PdfError) -> Self {
        ScanflowError::Conversion {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl ScanflowError {
    error_constructor!(conversion, Conversion);
    error_constructor!(recognition, Recognition);
    error_constructor!(validation, Validation);
    error_constructor!(serialization, Serialization);

    /// Create an EngineUnavailable error
    pub fn engine_unavailable<E: Into<String>, S: Into<String>>(engine: E, message: S) -> Self {
        Self::EngineUnavailable {
            engine: engine.into(),
            message: message.into(),
        }
    }
}
