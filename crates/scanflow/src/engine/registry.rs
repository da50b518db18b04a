//! Engine registry: which factory serves each role.

use super::pool::EnginePool;
use super::tesseract_cli::{self, TesseractCliFactory};
use super::{EngineFactory, EngineRole};
use crate::core::config::{EngineConfig, ExtractionConfig};
use crate::{Result, ScanflowError};
use std::sync::Arc;

/// Build the factory named by `config.backend` for `role`.
///
/// # Errors
///
/// Returns `ScanflowError::Validation` for unknown backends, and for
/// `tesseract` when the crate was built without the `tesseract` feature.
pub fn factory_for(config: &EngineConfig, role: EngineRole) -> Result<Arc<dyn EngineFactory>> {
    match config.backend.as_str() {
        tesseract_cli::ENGINE_NAME => Ok(Arc::new(TesseractCliFactory::new(config, role))),
        #[cfg(feature = "tesseract")]
        super::tesseract::ENGINE_NAME => Ok(Arc::new(super::tesseract::TesseractFactory::new(config, role))),
        #[cfg(not(feature = "tesseract"))]
        "tesseract" => Err(ScanflowError::validation(format!(
            "{} engine backend 'tesseract' requires the 'tesseract' feature",
            role
        ))),
        other => Err(ScanflowError::validation(format!(
            "Unknown {} engine backend '{}'. Expected 'tesseract-cli' or 'tesseract'",
            role, other
        ))),
    }
}

/// Factories for the primary and (optional) fallback roles.
#[derive(Clone)]
pub struct EngineRegistry {
    primary: Arc<dyn EngineFactory>,
    fallback: Option<Arc<dyn EngineFactory>>,
}

impl EngineRegistry {
    pub fn new(primary: Arc<dyn EngineFactory>) -> Self {
        Self { primary, fallback: None }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn EngineFactory>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Registry with the backends named in `config`.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        let registry = Self::new(factory_for(&config.primary, EngineRole::Primary)?);
        Ok(registry.with_fallback(factory_for(&config.fallback, EngineRole::Fallback)?))
    }

    pub fn factory(&self, role: EngineRole) -> Option<&Arc<dyn EngineFactory>> {
        match role {
            EngineRole::Primary => Some(&self.primary),
            EngineRole::Fallback => self.fallback.as_ref(),
        }
    }

    /// One checkout pool per registered role.
    pub fn pools(&self, max_idle: usize) -> EnginePools {
        EnginePools {
            primary: EnginePool::new(Arc::clone(&self.primary), max_idle),
            fallback: self
                .fallback
                .as_ref()
                .map(|factory| EnginePool::new(Arc::clone(factory), max_idle)),
        }
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.as_ref().map(|f| f.name()))
            .finish()
    }
}

/// Checkout pools for each role, shared by all workers of an extractor.
#[derive(Debug, Clone)]
pub struct EnginePools {
    primary: EnginePool,
    fallback: Option<EnginePool>,
}

impl EnginePools {
    pub fn get(&self, role: EngineRole) -> Option<&EnginePool> {
        match role {
            EngineRole::Primary => Some(&self.primary),
            EngineRole::Fallback => self.fallback.as_ref(),
        }
    }
}
