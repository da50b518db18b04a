//! Configuration loading and management.
//!
//! Configuration is process-wide and read-only for the lifetime of an
//! extraction call. It can be loaded from TOML or JSON, discovered as
//! `scanflow.toml` in the project hierarchy, and overridden from the
//! environment.

use crate::types::ExtractionMode;
use crate::{Result, ScanflowError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the file looked up by [`ExtractionConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "scanflow.toml";

/// Main extraction configuration.
///
/// # Example
///
/// ```rust
/// use scanflow::core::config::ExtractionConfig;
///
/// let config = ExtractionConfig::default();
/// assert_eq!(config.confidence_threshold, 0.7);
/// assert!(config.fallback_enabled);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Minimum primary-engine confidence before the fallback is consulted.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Whether the fallback engine may run in `Auto` mode.
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,

    /// Mode used when the caller does not pick one.
    #[serde(default)]
    pub default_mode: ExtractionMode,

    /// Upper bound on page workers per document.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Maximum documents extracted at once by batch operations (None = CPU count).
    #[serde(default)]
    pub max_concurrent_documents: Option<usize>,

    /// Rasterization resolution for PDF pages.
    #[serde(default = "default_render_dpi")]
    pub render_dpi: u32,

    /// Accepted file extensions, lowercase, without the dot.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Primary recognition engine.
    #[serde(default)]
    pub primary: EngineConfig,

    /// Fallback recognition engine.
    #[serde(default)]
    pub fallback: EngineConfig,
}

/// How an engine groups recognized words into result lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Line,
    Word,
}

/// Settings for one recognition engine adapter.
///
/// `psm` and `granularity` are optional so that each role keeps its own
/// default when a table only overrides some fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Adapter name: `tesseract-cli` or `tesseract` (native, needs the `tesseract` feature).
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Tesseract language code(s), e.g. `eng` or `eng+deu`.
    #[serde(default = "default_language")]
    pub language: String,

    /// Page segmentation mode (None = role default: 3 primary, 11 fallback).
    #[serde(default)]
    pub psm: Option<u8>,

    /// OCR engine mode, passed as `--oem`. Only the `tesseract-cli` backend
    /// uses it; the native backend initializes with the library default.
    #[serde(default = "default_oem")]
    pub oem: u8,

    /// Line grouping (None = role default: line primary, word fallback).
    #[serde(default)]
    pub granularity: Option<Granularity>,

    /// Executable used by the `tesseract-cli` adapter.
    #[serde(default = "default_tesseract_cmd")]
    pub command: String,

    /// Bound on a single engine call, in seconds (None = wait indefinitely).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: Option<u64>,
}

impl EngineConfig {
    pub fn page_segmentation_mode(&self, fallback_role: bool) -> u8 {
        self.psm.unwrap_or(if fallback_role { 11 } else { 3 })
    }

    pub fn line_granularity(&self, fallback_role: bool) -> Granularity {
        self.granularity
            .unwrap_or(if fallback_role { Granularity::Word } else { Granularity::Line })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            language: default_language(),
            psm: None,
            oem: default_oem(),
            granularity: None,
            command: default_tesseract_cmd(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_confidence_threshold() -> f64 {
    0.7
}
fn default_max_workers() -> usize {
    4
}
fn default_render_dpi() -> u32 {
    200
}
fn default_allowed_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "pdf", "tiff", "tif", "bmp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_backend() -> String {
    "tesseract-cli".to_string()
}
fn default_language() -> String {
    "eng".to_string()
}
fn default_oem() -> u8 {
    3
}
fn default_tesseract_cmd() -> String {
    "tesseract".to_string()
}
fn default_timeout_secs() -> Option<u64> {
    Some(120)
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            fallback_enabled: true,
            default_mode: ExtractionMode::Auto,
            max_workers: default_max_workers(),
            max_concurrent_documents: None,
            render_dpi: default_render_dpi(),
            allowed_extensions: default_allowed_extensions(),
            primary: EngineConfig::default(),
            fallback: EngineConfig::default(),
        }
    }
}

impl ExtractionConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ScanflowError::Validation` if the file can't be read or is invalid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ScanflowError::validation(format!("Failed to read config file {}: {}", path.as_ref().display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| ScanflowError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ScanflowError::validation(format!("Failed to read config file {}: {}", path.as_ref().display(), e))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| ScanflowError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from a file, picking the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
            Some(ext) if ext == "json" => Self::from_json_file(path),
            Some(ext) if ext == "toml" => Self::from_toml_file(path),
            _ => Err(ScanflowError::validation(format!(
                "Unsupported config file format: {} (expected .toml or .json)",
                path.display()
            ))),
        }
    }

    /// Discover `scanflow.toml` in the current directory or any parent.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let current = std::env::current_dir().map_err(ScanflowError::Io)?;
        Self::discover_from(&current)
    }

    /// Like [`discover`](Self::discover), starting from `start` instead of the working directory.
    pub fn discover_from(start: &Path) -> Result<Option<Self>> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                tracing::debug!("Using configuration from {}", candidate.display());
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Resolve the effective configuration: an explicit file, else a discovered
    /// one, else defaults; then environment overrides; then validation.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => Self::discover()?.unwrap_or_default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SCANFLOW_*` environment variables on top of this configuration.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_value("SCANFLOW_CONFIDENCE_THRESHOLD") {
            self.confidence_threshold = value.parse().map_err(|_| {
                ScanflowError::validation(format!("SCANFLOW_CONFIDENCE_THRESHOLD is not a number: '{}'", value))
            })?;
        }

        if let Some(value) = env_value("SCANFLOW_FALLBACK_ENABLED") {
            self.fallback_enabled = parse_bool(&value).ok_or_else(|| {
                ScanflowError::validation(format!("SCANFLOW_FALLBACK_ENABLED is not a boolean: '{}'", value))
            })?;
        }

        if let Some(value) = env_value("SCANFLOW_MAX_WORKERS") {
            self.max_workers = value.parse().map_err(|_| {
                ScanflowError::validation(format!("SCANFLOW_MAX_WORKERS is not an integer: '{}'", value))
            })?;
        }

        if let Some(value) = env_value("SCANFLOW_TESSERACT_CMD") {
            self.primary.command = value.clone();
            self.fallback.command = value;
        }

        if let Some(value) = env_value("SCANFLOW_OCR_LANGUAGE") {
            self.primary.language = value.clone();
            self.fallback.language = value;
        }

        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ScanflowError::validation(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }

        if self.max_workers == 0 {
            return Err(ScanflowError::validation("max_workers must be at least 1"));
        }

        if self.max_concurrent_documents == Some(0) {
            return Err(ScanflowError::validation("max_concurrent_documents must be at least 1"));
        }

        if !(36..=1200).contains(&self.render_dpi) {
            return Err(ScanflowError::validation(format!(
                "render_dpi must be within [36, 1200], got {}",
                self.render_dpi
            )));
        }

        for (role, engine) in [("primary", &self.primary), ("fallback", &self.fallback)] {
            if engine.language.trim().is_empty() {
                return Err(ScanflowError::validation(format!("{} engine language cannot be empty", role)));
            }
            if engine.psm.is_some_and(|psm| psm > 13) {
                return Err(ScanflowError::validation(format!(
                    "{} engine psm must be within [0, 13]",
                    role
                )));
            }
        }

        Ok(())
    }

    pub fn is_extension_allowed(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.allowed_extensions.iter().any(|e| e.eq_ignore_ascii_case(&extension))
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
