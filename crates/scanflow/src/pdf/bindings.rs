use super::error::PdfError;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use std::path::PathBuf;

/// Environment variable naming a directory that contains the pdfium library.
pub const PDFIUM_PATH_ENV: &str = "SCANFLOW_PDFIUM_PATH";

/// Cached outcome of the first binding attempt.
///
/// Bindings themselves are not `Clone`, so the resolved location (or the
/// failure) is cached and fresh bindings are created from it on each call.
enum InitializationState {
    Uninitialized,
    Initialized { lib_dir: Option<PathBuf> },
    Failed(String),
}

static PDFIUM_STATE: Lazy<Mutex<InitializationState>> = Lazy::new(|| Mutex::new(InitializationState::Uninitialized));

fn configured_lib_dir() -> Option<PathBuf> {
    std::env::var_os(PDFIUM_PATH_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn bind_at(lib_dir: Option<&PathBuf>) -> Result<Box<dyn PdfiumLibraryBindings>, String> {
    match lib_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            .map_err(|e| format!("Failed to bind pdfium in '{}': {}", dir.display(), e)),
        None => Pdfium::bind_to_system_library().map_err(|e| format!("Failed to bind system pdfium: {}", e)),
    }
}

/// Get pdfium bindings, resolving the library location on first use.
///
/// A failed first attempt is remembered so later documents fail fast with
/// the same message instead of probing the file system again.
pub(crate) fn bind_pdfium() -> Result<Box<dyn PdfiumLibraryBindings>, PdfError> {
    let mut state = PDFIUM_STATE.lock();

    match &*state {
        InitializationState::Uninitialized => {
            let lib_dir = configured_lib_dir();
            match bind_at(lib_dir.as_ref()) {
                Ok(bindings) => {
                    tracing::debug!("Pdfium bound (custom dir: {:?})", lib_dir);
                    *state = InitializationState::Initialized { lib_dir };
                    Ok(bindings)
                }
                Err(err) => {
                    tracing::warn!("Pdfium initialization failed: {}", err);
                    *state = InitializationState::Failed(err.clone());
                    Err(PdfError::LibraryUnavailable(err))
                }
            }
        }
        InitializationState::Initialized { lib_dir } => bind_at(lib_dir.as_ref()).map_err(PdfError::LibraryUnavailable),
        InitializationState::Failed(err) => Err(PdfError::LibraryUnavailable(format!(
            "initialization previously failed: {}",
            err
        ))),
    }
}
