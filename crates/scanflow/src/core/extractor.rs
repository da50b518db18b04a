//! Extraction entry points.
//!
//! [`Extractor`] is the single way in: it routes a file to the image path
//! (one page, recognized on the calling thread) or the PDF path (page source,
//! dispatcher, aggregator), and always hands back a complete
//! [`DocumentResult`]. Failures that prevent extraction as a whole are
//! reported through `succeeded = false` and `error`, never as `Err`.
//!
//! # Example
//!
//! ```rust,no_run
//! use scanflow::{ExtractionConfig, ExtractionMode, Extractor};
//!
//! # async fn example() -> scanflow::Result<()> {
//! let extractor = Extractor::new(ExtractionConfig::default())?;
//! let result = extractor.extract("scan.pdf", ExtractionMode::Auto).await;
//! println!("{} lines, confidence {:.2}", result.line_count, result.confidence);
//! # Ok(())
//! # }
//! ```

use crate::core::config::ExtractionConfig;
use crate::core::io::validate_file_exists;
use crate::core::mime::{SourceKind, detect_source_kind};
use crate::engine::{EnginePools, EngineRegistry};
use crate::pipeline::{Dispatcher, PageWorker, PoolBuilder, SelectionPolicy, aggregate, single_page};
use crate::source::{PageSource, RasterPageSource};
use crate::types::{DocumentResult, ExtractionMode, ExtractionRequest};
use crate::{Result, ScanflowError};
use once_cell::sync::Lazy;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runtime used by the `*_sync` wrappers.
///
/// Shared by every call so synchronous callers never pay for runtime setup.
static GLOBAL_RUNTIME: Lazy<std::result::Result<tokio::runtime::Runtime, String>> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("scanflow-runtime")
        .build()
        .map_err(|e| e.to_string())
});

/// Run `future` to completion on the process-wide runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output> {
    match &*GLOBAL_RUNTIME {
        Ok(runtime) => Ok(runtime.block_on(future)),
        Err(e) => Err(ScanflowError::Other(format!("Failed to create global Tokio runtime: {}", e))),
    }
}

struct ExtractorInner {
    config: ExtractionConfig,
    registry: EngineRegistry,
    pools: EnginePools,
    page_source: Arc<dyn PageSource>,
    dispatcher: Dispatcher,
}

/// OCR extraction facade.
///
/// Cheap to clone; clones share configuration, page source and engine pools,
/// so engine instances initialized by one call are reused by the next.
#[derive(Clone)]
pub struct Extractor {
    inner: Arc<ExtractorInner>,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .field("dispatcher", &self.inner.dispatcher)
            .finish()
    }
}

/// Builder for [`Extractor`] with injectable collaborators.
pub struct ExtractorBuilder {
    config: ExtractionConfig,
    registry: Option<EngineRegistry>,
    page_source: Option<Arc<dyn PageSource>>,
    pool_builder: Option<PoolBuilder>,
    available_parallelism: Option<usize>,
}

impl ExtractorBuilder {
    /// Use these engine factories instead of the ones named in the configuration.
    pub fn registry(mut self, registry: EngineRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn page_source(mut self, page_source: Arc<dyn PageSource>) -> Self {
        self.page_source = Some(page_source);
        self
    }

    /// Replace how the page worker thread pool is built.
    pub fn pool_builder(mut self, pool_builder: PoolBuilder) -> Self {
        self.pool_builder = Some(pool_builder);
        self
    }

    /// Override the CPU count used to size the worker pool.
    pub fn available_parallelism(mut self, available: usize) -> Self {
        self.available_parallelism = Some(available);
        self
    }

    /// Validate the configuration and assemble the extractor.
    ///
    /// # Errors
    ///
    /// Returns `ScanflowError::Validation` for out-of-range settings or
    /// unknown engine backends.
    pub fn build(self) -> Result<Extractor> {
        self.config.validate()?;

        let registry = match self.registry {
            Some(registry) => registry,
            None => EngineRegistry::from_config(&self.config)?,
        };
        let pools = registry.pools(self.config.max_workers);

        let page_source = self
            .page_source
            .unwrap_or_else(|| Arc::new(RasterPageSource::new(self.config.render_dpi)));

        let mut dispatcher = Dispatcher::new(self.config.max_workers);
        if let Some(available) = self.available_parallelism {
            dispatcher = dispatcher.with_available_parallelism(available);
        }
        if let Some(pool_builder) = self.pool_builder {
            dispatcher = dispatcher.with_pool_builder(pool_builder);
        }

        Ok(Extractor {
            inner: Arc::new(ExtractorInner {
                config: self.config,
                registry,
                pools,
                page_source,
                dispatcher,
            }),
        })
    }
}

impl Extractor {
    /// Extractor with the engines and page source described by `config`.
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: ExtractionConfig) -> ExtractorBuilder {
        ExtractorBuilder {
            config,
            registry: None,
            page_source: None,
            pool_builder: None,
            available_parallelism: None,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.inner.config
    }

    /// Extract text from one file.
    ///
    /// Recognition runs on tokio's blocking pool.
    pub async fn extract(&self, path: impl AsRef<Path>, mode: ExtractionMode) -> DocumentResult {
        let request = ExtractionRequest::new(path.as_ref(), mode);
        let this = self.clone();

        match tokio::task::spawn_blocking(move || this.extract_blocking(&request)).await {
            Ok(result) => result,
            Err(join_err) => DocumentResult::failure(format!("Extraction task failed: {}", join_err)),
        }
    }

    /// Synchronous wrapper for [`extract`](Self::extract) on the global runtime.
    ///
    /// Must not be called from within an async runtime.
    pub fn extract_sync(&self, path: impl AsRef<Path>, mode: ExtractionMode) -> DocumentResult {
        block_on(self.extract(path, mode)).unwrap_or_else(|e| DocumentResult::failure(e.to_string()))
    }

    /// Extract several files concurrently.
    ///
    /// At most `max_concurrent_documents` files (default: CPU count) are in
    /// flight at once. Results are in input order, one per path.
    pub async fn batch_extract(&self, paths: Vec<impl AsRef<Path>>, mode: ExtractionMode) -> Vec<DocumentResult> {
        use tokio::sync::Semaphore;
        use tokio::task::JoinSet;

        if paths.is_empty() {
            return Vec::new();
        }

        let max_concurrent = self
            .inner
            .config
            .max_concurrent_documents
            .unwrap_or_else(num_cpus::get)
            .max(1);
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        let mut tasks = JoinSet::new();
        let total = paths.len();

        for (index, path) in paths.into_iter().enumerate() {
            let path: PathBuf = path.as_ref().to_path_buf();
            let this = self.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => this.extract(&path, mode).await,
                    Err(_) => DocumentResult::failure("Batch extraction was cancelled"),
                };
                (index, result)
            });
        }

        let mut results: Vec<Option<DocumentResult>> = vec![None; total];

        while let Some(task_result) = tasks.join_next().await {
            match task_result {
                Ok((index, result)) => results[index] = Some(result),
                Err(join_err) => tracing::warn!("Batch extraction task failed: {}", join_err),
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| DocumentResult::failure("Extraction task did not complete")))
            .collect()
    }

    /// Synchronous wrapper for [`batch_extract`](Self::batch_extract).
    pub fn batch_extract_sync(&self, paths: Vec<impl AsRef<Path>>, mode: ExtractionMode) -> Vec<DocumentResult> {
        let total = paths.len();
        block_on(self.batch_extract(paths, mode)).unwrap_or_else(|e| {
            let message = e.to_string();
            (0..total).map(|_| DocumentResult::failure(message.clone())).collect()
        })
    }

    /// Run one extraction on the current thread.
    pub fn extract_blocking(&self, request: &ExtractionRequest) -> DocumentResult {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.try_extract(request)));

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!("Extraction of {} failed: {}", request.source_path.display(), e);
                DocumentResult::failure(e.to_string())
            }
            Err(_) => {
                tracing::warn!("Extraction of {} panicked", request.source_path.display());
                DocumentResult::failure(format!(
                    "Extraction of {} panicked",
                    request.source_path.display()
                ))
            }
        }
    }

    fn try_extract(&self, request: &ExtractionRequest) -> Result<DocumentResult> {
        let inner = &self.inner;
        let path = request.source_path.as_path();

        validate_file_exists(path)?;
        let kind = detect_source_kind(path, &inner.config)?;

        tracing::info!(
            "Extracting {} ({}, mode {})",
            path.display(),
            if kind.is_pdf() { "pdf" } else { "image" },
            request.mode
        );

        let worker = PageWorker::new(
            inner.pools.clone(),
            SelectionPolicy::from_config(&inner.config, request.mode),
        );

        let pages = inner.page_source.load_pages(path, kind)?;
        if pages.is_empty() {
            return Err(ScanflowError::conversion(format!(
                "Could not convert {} to images: no pages produced",
                path.display()
            )));
        }

        match kind {
            SourceKind::Image => {
                let page = &pages[0];
                Ok(single_page(worker.process_image(page.page_index, &page.image, Some(path))))
            }
            SourceKind::Pdf => {
                let page_count = pages.len();
                let outcome = inner.dispatcher.dispatch(&pages, &worker);
                Ok(aggregate(outcome.results, page_count, outcome.parallel_workers))
            }
        }
    }
}
