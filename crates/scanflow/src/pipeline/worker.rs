//! The page worker: one page in, one `PageResult` out.

use super::selector::{Recognition, SelectionPolicy};
use crate::engine::{EnginePools, EngineRole, PageInput};
use crate::source::PageImage;
use crate::types::PageResult;
use crate::{Result, ScanflowError};
use image::DynamicImage;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

/// Runs engine selection for single pages.
///
/// Never fails: engine faults, unavailable engines and panics all end up in
/// the returned page's `error`.
#[derive(Debug, Clone)]
pub struct PageWorker {
    pools: EnginePools,
    policy: SelectionPolicy,
}

impl PageWorker {
    pub fn new(pools: EnginePools, policy: SelectionPolicy) -> Self {
        Self { pools, policy }
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    /// Process a page produced by a page source.
    pub fn process(&self, page: &PageImage) -> PageResult {
        self.process_image(page.page_index, &page.image, None)
    }

    /// Process raw pixels, optionally backed by an existing file that
    /// file-based engines may read directly.
    pub fn process_image(&self, page_index: usize, image: &DynamicImage, source_path: Option<&Path>) -> PageResult {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let input = match source_path {
                Some(path) => PageInput::with_source_path(image, path),
                None => PageInput::new(image),
            };
            self.policy.select(page_index, |role| self.run_engine(role, &input))
        }));

        let result = outcome.unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::warn!("Page {}: worker panicked: {}", page_index, message);
            PageResult::failed(page_index, format!("Page processing panicked: {}", message))
        });

        tracing::debug!(
            "Page {}: {} line(s), confidence {:.3}, engine {}",
            page_index,
            result.line_count(),
            result.confidence,
            result.engine_used
        );
        result
    }

    fn run_engine(&self, role: EngineRole, input: &PageInput<'_>) -> Result<Recognition> {
        let pool = self
            .pools
            .get(role)
            .ok_or_else(|| ScanflowError::engine_unavailable(role.to_string(), "no engine registered for this role"))?;

        let mut engine = pool.acquire()?;
        if engine.requires_file_input() {
            input.file_path()?;
        }
        let lines = engine.recognize(input)?;

        Ok(Recognition::new(engine.name(), lines))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
