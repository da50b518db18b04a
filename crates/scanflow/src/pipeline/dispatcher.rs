//! Fan-out of page workers over a bounded thread pool.
//!
//! Pages run on a dedicated rayon pool sized by [`worker_count`]. Results are
//! collected in completion order; callers restore document order afterwards.
//! When the pool cannot be built the same worker runs every page sequentially
//! on the calling thread.

use super::worker::PageWorker;
use crate::source::PageImage;
use crate::types::PageResult;
use crate::{Result, ScanflowError};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use std::sync::mpsc;

/// Default upper bound on page workers.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// `max(1, min(pages, available - 1, cap))`.
///
/// One core is left to the caller; the result is never zero.
pub fn worker_count(page_count: usize, available_parallelism: usize, cap: usize) -> usize {
    page_count
        .min(available_parallelism.saturating_sub(1))
        .min(cap)
        .max(1)
}

/// Builds the thread pool for a given worker count.
pub type PoolBuilder = Arc<dyn Fn(usize) -> Result<ThreadPool> + Send + Sync>;

/// Build a rayon pool with `workers` named threads.
pub fn build_rayon_pool(workers: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("scanflow-page-{}", i))
        .build()
        .map_err(|e| ScanflowError::PoolEstablishment(e.to_string()))
}

/// Page results plus the parallelism actually used.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// One result per page, in completion order.
    pub results: Vec<PageResult>,
    pub parallel_workers: usize,
}

#[derive(Clone)]
pub struct Dispatcher {
    max_workers: usize,
    available_parallelism: usize,
    pool_builder: PoolBuilder,
}

impl Dispatcher {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers,
            available_parallelism: num_cpus::get(),
            pool_builder: Arc::new(build_rayon_pool),
        }
    }

    /// Override the detected CPU count.
    pub fn with_available_parallelism(mut self, available: usize) -> Self {
        self.available_parallelism = available;
        self
    }

    /// Replace how the thread pool is built.
    pub fn with_pool_builder(mut self, builder: PoolBuilder) -> Self {
        self.pool_builder = builder;
        self
    }

    pub fn planned_workers(&self, page_count: usize) -> usize {
        worker_count(page_count, self.available_parallelism, self.max_workers)
    }

    /// Run `worker` on every page and return all results, unordered.
    pub fn dispatch(&self, pages: &[PageImage], worker: &PageWorker) -> DispatchOutcome {
        if pages.is_empty() {
            return DispatchOutcome {
                results: Vec::new(),
                parallel_workers: 0,
            };
        }

        let workers = self.planned_workers(pages.len());

        match (self.pool_builder)(workers) {
            Ok(pool) => {
                tracing::debug!("Dispatching {} page(s) over {} worker(s)", pages.len(), workers);
                DispatchOutcome {
                    results: run_parallel(&pool, pages, worker),
                    parallel_workers: workers,
                }
            }
            Err(e) => {
                tracing::warn!("{}. Falling back to sequential execution.", e);
                DispatchOutcome {
                    results: pages.iter().map(|page| worker.process(page)).collect(),
                    parallel_workers: 1,
                }
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("max_workers", &self.max_workers)
            .field("available_parallelism", &self.available_parallelism)
            .finish()
    }
}

fn run_parallel(pool: &ThreadPool, pages: &[PageImage], worker: &PageWorker) -> Vec<PageResult> {
    let (tx, rx) = mpsc::channel();

    pool.scope(|scope| {
        for page in pages {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let _ = tx.send(worker.process(page));
            });
        }
    });
    drop(tx);

    rx.into_iter().collect()
}
