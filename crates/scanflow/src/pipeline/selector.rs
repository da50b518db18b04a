//! Primary/fallback engine selection.
//!
//! The selector decides, once per page, which engine output becomes the page
//! result. It does not run engines itself: it asks a caller-supplied runner
//! for the output of a role, so the policy can be exercised without any real
//! engine behind it.

use crate::Result;
use crate::core::config::ExtractionConfig;
use crate::engine::{EngineRole, RecognizedLine};
use crate::types::{EngineUsed, ExtractionMode, LineResult, PageResult};

/// Lines produced by one engine call, tagged with the adapter that made them.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub engine_name: String,
    pub lines: Vec<RecognizedLine>,
}

impl Recognition {
    pub fn new(engine_name: impl Into<String>, lines: Vec<RecognizedLine>) -> Self {
        Self {
            engine_name: engine_name.into(),
            lines,
        }
    }

    /// Mean line confidence, `0.0` without lines.
    pub fn confidence(&self) -> f64 {
        if self.lines.is_empty() {
            return 0.0;
        }
        self.lines.iter().map(|l| l.confidence).sum::<f64>() / self.lines.len() as f64
    }

    fn has_lines(&self) -> bool {
        !self.lines.is_empty()
    }
}

/// The read-only inputs of the selection policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionPolicy {
    pub mode: ExtractionMode,
    pub confidence_threshold: f64,
    pub fallback_enabled: bool,
}

impl SelectionPolicy {
    pub fn from_config(config: &ExtractionConfig, mode: ExtractionMode) -> Self {
        Self {
            mode,
            confidence_threshold: config.confidence_threshold,
            fallback_enabled: config.fallback_enabled,
        }
    }

    /// Produce the page result for `page_index`, calling `run` for each role
    /// the policy needs.
    ///
    /// In `Auto` mode the primary result is kept when it has lines and meets
    /// the threshold. Otherwise an enabled fallback that returns lines wins,
    /// whatever its confidence. Failing that, the primary result is used even
    /// below threshold; a primary with no lines leaves the page failed.
    pub fn select<F>(&self, page_index: usize, mut run: F) -> PageResult
    where
        F: FnMut(EngineRole) -> Result<Recognition>,
    {
        match self.mode {
            ExtractionMode::PrimaryOnly => finish(page_index, EngineUsed::Primary, run(EngineRole::Primary)),
            ExtractionMode::FallbackOnly => finish(page_index, EngineUsed::Fallback, run(EngineRole::Fallback)),
            ExtractionMode::Auto => {
                let primary = run(EngineRole::Primary);

                let accepted = matches!(
                    &primary,
                    Ok(recognition) if recognition.has_lines() && recognition.confidence() >= self.confidence_threshold
                );
                if accepted {
                    return finish(page_index, EngineUsed::Primary, primary);
                }

                match &primary {
                    Ok(recognition) if recognition.has_lines() => tracing::debug!(
                        "Page {}: primary confidence {:.3} below threshold {:.3}",
                        page_index,
                        recognition.confidence(),
                        self.confidence_threshold
                    ),
                    Ok(_) => tracing::debug!("Page {}: primary engine found no text", page_index),
                    Err(e) => tracing::warn!("Page {}: primary engine failed: {}", page_index, e),
                }

                if self.fallback_enabled {
                    match run(EngineRole::Fallback) {
                        Ok(recognition) if recognition.has_lines() => {
                            return finish(page_index, EngineUsed::Fallback, Ok(recognition));
                        }
                        Ok(_) => tracing::debug!("Page {}: fallback engine found no text", page_index),
                        Err(e) => tracing::warn!("Page {}: fallback engine failed: {}", page_index, e),
                    }
                }

                finish(page_index, EngineUsed::Primary, primary)
            }
        }
    }
}

fn finish(page_index: usize, engine_used: EngineUsed, outcome: Result<Recognition>) -> PageResult {
    match outcome {
        Ok(recognition) => {
            let lines = recognition
                .lines
                .into_iter()
                .map(|line| LineResult {
                    text: line.text,
                    confidence: line.confidence,
                    bbox: line.bbox,
                    page_index,
                })
                .collect();
            PageResult::recognized(page_index, engine_used, recognition.engine_name, lines)
        }
        Err(e) => PageResult::failed(page_index, e.to_string()),
    }
}
