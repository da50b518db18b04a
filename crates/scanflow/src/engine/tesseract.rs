//! Native Tesseract adapter.
//!
//! Works on in-memory pixels through libtesseract. The API handle is
//! initialized once per engine instance (language data, page segmentation
//! mode) and reused for every page that instance processes.

use super::tsv::lines_from_tsv;
use super::{EngineFactory, EngineRole, PageInput, RecognitionEngine, RecognizedLine};
use crate::core::config::{EngineConfig, Granularity};
use crate::{Result, ScanflowError};
use kreuzberg_tesseract::{TessPageSegMode, TesseractAPI};
use std::env;
use std::path::Path;

pub const ENGINE_NAME: &str = "tesseract";

const TESSDATA_FALLBACK_PATHS: &[&str] = &[
    "/opt/homebrew/share/tessdata",
    "/opt/homebrew/opt/tesseract/share/tessdata",
    "/usr/local/opt/tesseract/share/tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    r#"C:\Program Files\Tesseract-OCR\tessdata"#,
    r#"C:\ProgramData\Tesseract-OCR\tessdata"#,
];

/// `TESSDATA_PREFIX`, else the first standard location that exists, else empty
/// (letting libtesseract use its compiled-in default).
fn resolve_tessdata_path() -> String {
    env::var("TESSDATA_PREFIX")
        .ok()
        .filter(|p| !p.is_empty())
        .or_else(|| {
            TESSDATA_FALLBACK_PATHS
                .iter()
                .find(|p| Path::new(p).exists())
                .map(|p| (*p).to_string())
        })
        .unwrap_or_default()
}

pub struct TesseractEngine {
    api: TesseractAPI,
    granularity: Granularity,
}

impl TesseractEngine {
    pub fn new(config: &EngineConfig, role: EngineRole) -> Result<Self> {
        let fallback_role = role == EngineRole::Fallback;
        let tessdata_path = resolve_tessdata_path();

        let api = TesseractAPI::new();
        api.init(&tessdata_path, &config.language).map_err(|e| {
            ScanflowError::engine_unavailable(
                ENGINE_NAME,
                format!(
                    "Failed to initialize language '{}' (tessdata '{}'): {}",
                    config.language, tessdata_path, e
                ),
            )
        })?;

        let psm = config.page_segmentation_mode(fallback_role);
        api.set_page_seg_mode(TessPageSegMode::from_int(psm as i32))
            .map_err(|e| ScanflowError::engine_unavailable(ENGINE_NAME, format!("Failed to set PSM {}: {}", psm, e)))?;

        tracing::debug!(
            "Initialized native tesseract {} (language {}, psm {})",
            TesseractAPI::version(),
            config.language,
            psm
        );

        Ok(Self {
            api,
            granularity: config.line_granularity(fallback_role),
        })
    }
}

impl RecognitionEngine for TesseractEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn recognize(&mut self, input: &PageInput<'_>) -> Result<Vec<RecognizedLine>> {
        let rgb_image = input.image().to_rgb8();
        let (width, height) = rgb_image.dimensions();
        let bytes_per_pixel = 3;
        let bytes_per_line = width * bytes_per_pixel;

        self.api
            .set_image(
                rgb_image.as_raw(),
                width as i32,
                height as i32,
                bytes_per_pixel as i32,
                bytes_per_line as i32,
            )
            .map_err(|e| ScanflowError::recognition(format!("Failed to set image: {}", e)))?;

        self.api
            .recognize()
            .map_err(|e| ScanflowError::recognition(format!("Failed to recognize text: {}", e)))?;

        let tsv = self
            .api
            .get_tsv_text(0)
            .map_err(|e| ScanflowError::recognition(format!("Failed to extract TSV: {}", e)))?;

        Ok(lines_from_tsv(&tsv, self.granularity))
    }
}

pub struct TesseractFactory {
    config: EngineConfig,
    role: EngineRole,
}

impl TesseractFactory {
    pub fn new(config: &EngineConfig, role: EngineRole) -> Self {
        Self {
            config: config.clone(),
            role,
        }
    }
}

impl EngineFactory for TesseractFactory {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn create(&self) -> Result<Box<dyn RecognitionEngine>> {
        Ok(Box::new(TesseractEngine::new(&self.config, self.role)?))
    }
}
