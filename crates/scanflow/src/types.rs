use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::ScanflowError;

/// Error recorded on a page whose engine returned zero lines.
pub const NO_TEXT_DETECTED: &str = "no text detected";

/// Four corner points, clockwise from top-left.
pub type BoundingBox = [[f64; 2]; 4];

/// Build a [`BoundingBox`] from an axis-aligned rectangle.
pub fn bbox_from_rect(left: f64, top: f64, width: f64, height: f64) -> BoundingBox {
    [
        [left, top],
        [left + width, top],
        [left + width, top + height],
        [left, top + height],
    ]
}

/// Which engines may run for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Primary first, fallback when the primary is below threshold or fails.
    #[default]
    Auto,
    PrimaryOnly,
    FallbackOnly,
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionMode::Auto => "auto",
            ExtractionMode::PrimaryOnly => "primary_only",
            ExtractionMode::FallbackOnly => "fallback_only",
        };
        f.write_str(name)
    }
}

impl FromStr for ExtractionMode {
    type Err = ScanflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(ExtractionMode::Auto),
            "primary" | "primary_only" => Ok(ExtractionMode::PrimaryOnly),
            "fallback" | "fallback_only" => Ok(ExtractionMode::FallbackOnly),
            other => Err(ScanflowError::validation(format!(
                "Unknown extraction mode '{}'. Expected one of: auto, primary_only, fallback_only",
                other
            ))),
        }
    }
}

/// Role of the engine whose output was accepted for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineUsed {
    Primary,
    Fallback,
    None,
}

impl fmt::Display for EngineUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineUsed::Primary => "primary",
            EngineUsed::Fallback => "fallback",
            EngineUsed::None => "none",
        };
        f.write_str(name)
    }
}

/// One extraction call: which file, and which engines may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub source_path: PathBuf,
    pub mode: ExtractionMode,
}

impl ExtractionRequest {
    pub fn new(source_path: impl Into<PathBuf>, mode: ExtractionMode) -> Self {
        Self {
            source_path: source_path.into(),
            mode,
        }
    }
}

/// A single recognized line of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineResult {
    pub text: String,
    /// Normalized to `[0, 1]`.
    pub confidence: f64,
    pub bbox: BoundingBox,
    /// 1-based page number.
    pub page_index: usize,
}

/// Outcome of recognizing one page.
///
/// Built exactly once by the page worker and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub page_index: usize,
    pub succeeded: bool,
    pub text: String,
    pub lines: Vec<LineResult>,
    pub confidence: f64,
    pub engine_used: EngineUsed,
    /// Adapter name of the engine that produced `lines`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageResult {
    /// Result for lines produced by an engine.
    ///
    /// Zero lines yields a failed page with [`NO_TEXT_DETECTED`] and
    /// `engine_used = None`; otherwise confidence is the mean line confidence.
    pub fn recognized(
        page_index: usize,
        engine_used: EngineUsed,
        engine_name: impl Into<String>,
        lines: Vec<LineResult>,
    ) -> Self {
        if lines.is_empty() {
            return Self::failed(page_index, NO_TEXT_DETECTED);
        }

        let confidence = mean_confidence(&lines);
        let text = lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>().join("\n");

        Self {
            page_index,
            succeeded: true,
            text,
            lines,
            confidence,
            engine_used,
            engine_name: Some(engine_name.into()),
            error: None,
        }
    }

    pub fn failed(page_index: usize, error: impl Into<String>) -> Self {
        Self {
            page_index,
            succeeded: false,
            text: String::new(),
            lines: Vec::new(),
            confidence: 0.0,
            engine_used: EngineUsed::None,
            engine_name: None,
            error: Some(error.into()),
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Arithmetic mean of line confidences, `0.0` for no lines.
pub fn mean_confidence(lines: &[LineResult]) -> f64 {
    if lines.is_empty() {
        return 0.0;
    }
    lines.iter().map(|l| l.confidence).sum::<f64>() / lines.len() as f64
}

/// Final result for one document.
///
/// Callers always get one of these, even on total failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub succeeded: bool,
    pub text: String,
    pub lines: Vec<LineResult>,
    pub confidence: f64,
    pub line_count: usize,
    pub page_count: usize,
    pub engines_used: Vec<String>,
    pub parallel_workers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentResult {
    /// A structurally complete result for a document-level failure.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            text: String::new(),
            lines: Vec::new(),
            confidence: 0.0,
            line_count: 0,
            page_count: 0,
            engines_used: Vec::new(),
            parallel_workers: 0,
            error: Some(error.into()),
        }
    }
}
