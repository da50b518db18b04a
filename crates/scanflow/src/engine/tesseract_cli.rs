//! Tesseract adapter that runs the `tesseract` executable.
//!
//! Each call runs `tesseract <image> stdout --psm N --oem M -l LANG tsv` on a
//! file and parses the TSV written to stdout. A hung process is killed once
//! the configured timeout elapses.

use super::tsv::lines_from_tsv;
use super::{EngineFactory, EngineRole, PageInput, RecognitionEngine, RecognizedLine};
use crate::core::config::{EngineConfig, Granularity};
use crate::core::extractor::block_on;
use crate::{Result, ScanflowError};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

pub const ENGINE_NAME: &str = "tesseract-cli";

fn tesseract_install_message(command: &str) -> String {
    format!(
        "Tesseract executable '{}' was not found. \
Install: macOS: 'brew install tesseract', \
Linux: 'apt install tesseract-ocr', \
Windows: 'winget install UB-Mannheim.TesseractOCR'. \
If Tesseract is installed in a custom location, set SCANFLOW_TESSERACT_CMD to the executable.",
        command
    )
}

fn executable_candidates(command: &str) -> Vec<PathBuf> {
    let as_path = Path::new(command);
    if as_path.components().count() > 1 || as_path.is_absolute() {
        return vec![as_path.to_path_buf()];
    }

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    if let Some(path_env) = env::var_os("PATH") {
        for dir in env::split_paths(&path_env) {
            for name in [command.to_string(), format!("{}.exe", command)] {
                let candidate = dir.join(name);
                if seen.insert(candidate.clone()) {
                    candidates.push(candidate);
                }
            }
        }
    }

    candidates
}

/// Resolve `command` to an existing executable file, searching `PATH` for bare names.
pub fn locate_executable(command: &str) -> Result<PathBuf> {
    executable_candidates(command)
        .into_iter()
        .find(|candidate| candidate.metadata().map(|m| m.is_file()).unwrap_or(false))
        .ok_or_else(|| ScanflowError::engine_unavailable(ENGINE_NAME, tesseract_install_message(command)))
}

/// Settings for one `tesseract-cli` instance, resolved for its role.
#[derive(Debug, Clone, PartialEq)]
pub struct TesseractCliSettings {
    pub language: String,
    pub psm: u8,
    pub oem: u8,
    pub granularity: Granularity,
    pub timeout: Option<Duration>,
}

impl TesseractCliSettings {
    pub fn from_config(config: &EngineConfig, role: EngineRole) -> Self {
        let fallback_role = role == EngineRole::Fallback;
        Self {
            language: config.language.clone(),
            psm: config.page_segmentation_mode(fallback_role),
            oem: config.oem,
            granularity: config.line_granularity(fallback_role),
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }

    fn args(&self, image_path: &Path) -> Vec<String> {
        vec![
            image_path.to_string_lossy().into_owned(),
            "stdout".to_string(),
            "--psm".to_string(),
            self.psm.to_string(),
            "--oem".to_string(),
            self.oem.to_string(),
            "-l".to_string(),
            self.language.clone(),
            "tsv".to_string(),
        ]
    }
}

pub struct TesseractCliEngine {
    executable: PathBuf,
    settings: TesseractCliSettings,
}

impl TesseractCliEngine {
    pub fn new(executable: PathBuf, settings: TesseractCliSettings) -> Self {
        Self { executable, settings }
    }

    fn run(&self, image_path: &Path) -> Result<String> {
        let mut command = Command::new(&self.executable);
        command
            .args(self.settings.args(image_path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let timeout_after = self.settings.timeout;
        let executable = self.executable.to_string_lossy().into_owned();

        block_on(async move {
            let child = command.spawn().map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ScanflowError::engine_unavailable(ENGINE_NAME, tesseract_install_message(&executable))
                } else {
                    ScanflowError::recognition_with_source("Failed to start tesseract", e)
                }
            })?;
            let child_id = child.id();

            let output = match timeout_after {
                Some(limit) => match timeout(limit, child.wait_with_output()).await {
                    Ok(output) => output,
                    Err(_) => {
                        // Dropping the future drops the child, which kills it.
                        tracing::warn!("Killed tesseract process {:?} after {:?}", child_id, limit);
                        return Err(ScanflowError::recognition(format!(
                            "tesseract timed out after {} seconds (PID: {:?})",
                            limit.as_secs(),
                            child_id
                        )));
                    }
                },
                None => child.wait_with_output().await,
            }
            .map_err(|e| ScanflowError::recognition_with_source("Failed to wait for tesseract", e))?;

            if !output.status.success() {
                return Err(ScanflowError::recognition(format!(
                    "tesseract exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }

            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        })?
    }
}

impl RecognitionEngine for TesseractCliEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn requires_file_input(&self) -> bool {
        true
    }

    fn recognize(&mut self, input: &PageInput<'_>) -> Result<Vec<RecognizedLine>> {
        let path = input.file_path()?;
        let tsv = self.run(path)?;
        let lines = lines_from_tsv(&tsv, self.settings.granularity);
        tracing::debug!(
            "tesseract (psm {}) found {} line(s) in {}",
            self.settings.psm,
            lines.len(),
            path.display()
        );
        Ok(lines)
    }
}

/// Factory for [`TesseractCliEngine`]; the executable is located once and shared.
pub struct TesseractCliFactory {
    command: String,
    settings: TesseractCliSettings,
    executable: OnceCell<std::result::Result<PathBuf, String>>,
}

impl TesseractCliFactory {
    pub fn new(config: &EngineConfig, role: EngineRole) -> Self {
        Self {
            command: config.command.clone(),
            settings: TesseractCliSettings::from_config(config, role),
            executable: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &TesseractCliSettings {
        &self.settings
    }
}

impl EngineFactory for TesseractCliFactory {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn create(&self) -> Result<Box<dyn RecognitionEngine>> {
        let executable = self
            .executable
            .get_or_init(|| locate_executable(&self.command).map_err(|e| e.to_string()))
            .clone()
            .map_err(|message| ScanflowError::engine_unavailable(ENGINE_NAME, message))?;

        Ok(Box::new(TesseractCliEngine::new(executable, self.settings.clone())))
    }
}
