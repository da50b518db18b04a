//! Checkout pool for recognition engine instances.
//!
//! Engines are expensive to initialize and not thread-safe, so each role keeps
//! a pool of idle instances. A worker [`acquire`](EnginePool::acquire)s an
//! [`EngineLease`], which has exclusive use of one instance and puts it back
//! when dropped. An instance whose lease is dropped while the thread is
//! panicking is discarded instead of returned.
//!
//! The pool is `Send + Sync` and shared between workers through `Arc`.

use super::{EngineFactory, RecognitionEngine};
use crate::{Result, ScanflowError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A thread-safe pool of engine instances for one role.
#[derive(Clone)]
pub struct EnginePool {
    factory: Arc<dyn EngineFactory>,
    idle: Arc<Mutex<Vec<Box<dyn RecognitionEngine>>>>,
    max_idle: usize,
    created: Arc<AtomicUsize>,
}

impl EnginePool {
    /// Create an empty pool that keeps at most `max_idle` instances between uses.
    pub fn new(factory: Arc<dyn EngineFactory>, max_idle: usize) -> Self {
        Self {
            factory,
            idle: Arc::new(Mutex::new(Vec::with_capacity(max_idle))),
            max_idle: max_idle.max(1),
            created: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Adapter name of the engines this pool hands out.
    pub fn engine_name(&self) -> &str {
        self.factory.name()
    }

    /// Check out an idle instance, creating one if none is available.
    ///
    /// # Errors
    ///
    /// Returns `ScanflowError::EngineUnavailable` if a new instance is needed
    /// and the factory cannot construct it.
    pub fn acquire(&self) -> Result<EngineLease> {
        let reused = self.idle.lock().pop();

        let engine = match reused {
            Some(engine) => engine,
            None => {
                let engine = self.factory.create().map_err(|e| match e {
                    unavailable @ ScanflowError::EngineUnavailable { .. } => unavailable,
                    other => ScanflowError::engine_unavailable(self.factory.name(), other.to_string()),
                })?;
                self.created.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Created '{}' engine instance", self.factory.name());
                engine
            }
        };

        Ok(EngineLease {
            engine: Some(engine),
            idle: Arc::clone(&self.idle),
            max_idle: self.max_idle,
        })
    }

    /// Number of instances currently waiting in the pool.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Number of instances the factory has built over the pool's lifetime.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for EnginePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnginePool")
            .field("engine", &self.factory.name())
            .field("idle", &self.idle_count())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// Exclusive use of one engine instance, returned to its pool on drop.
pub struct EngineLease {
    engine: Option<Box<dyn RecognitionEngine>>,
    idle: Arc<Mutex<Vec<Box<dyn RecognitionEngine>>>>,
    max_idle: usize,
}

impl std::ops::Deref for EngineLease {
    type Target = dyn RecognitionEngine;

    fn deref(&self) -> &Self::Target {
        self.engine.as_deref().expect("engine is present until drop")
    }
}

impl std::ops::DerefMut for EngineLease {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.engine.as_deref_mut().expect("engine is present until drop")
    }
}

impl Drop for EngineLease {
    fn drop(&mut self) {
        let Some(engine) = self.engine.take() else {
            return;
        };

        if std::thread::panicking() {
            tracing::warn!("Discarding '{}' engine instance after a panic", engine.name());
            return;
        }

        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(engine);
        }
    }
}
