//! File I/O utilities.

use crate::{Result, ScanflowError};
use std::path::Path;

/// Read a file synchronously.
///
/// # Errors
///
/// Returns `ScanflowError::Io` for I/O errors (these always bubble up).
pub fn read_file_sync(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    std::fs::read(path.as_ref()).map_err(ScanflowError::Io)
}

/// Validate that a path exists and is a regular file.
///
/// # Errors
///
/// Returns `ScanflowError::Validation` if it doesn't.
pub fn validate_file_exists(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ScanflowError::validation(format!(
            "File does not exist: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(ScanflowError::validation(format!(
            "Path is not a regular file: {}",
            path.display()
        )));
    }
    Ok(())
}
