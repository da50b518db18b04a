//! Core extraction orchestration.
//!
//! - **Entry point**: [`Extractor`](extractor::Extractor), routing files to the image or PDF path
//! - **Configuration**: loading, discovery, environment overrides
//! - **Source detection**: deciding between PDF and image from the extension
//! - **I/O**: file reading and validation
pub mod config;
pub mod extractor;
pub mod io;
pub mod mime;

pub use config::{EngineConfig, ExtractionConfig, Granularity};
pub use extractor::{Extractor, ExtractorBuilder};
pub use mime::{SourceKind, detect_source_kind};
