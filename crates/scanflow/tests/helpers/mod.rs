//! Shared fixtures: scripted engines and in-memory page sources.
//!
//! Page images carry their page number in the red channel of every pixel so a
//! scripted engine can answer per page without knowing about page indices.

#![allow(dead_code)]

use image::{DynamicImage, Rgb, RgbImage};
use scanflow::core::mime::SourceKind;
use scanflow::engine::{EngineFactory, PageInput, RecognitionEngine, RecognizedLine};
use scanflow::types::bbox_from_rect;
use scanflow::{PageImage, PageSource, Result, ScanflowError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What a scripted engine does for one page.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Return one line per confidence.
    Lines(Vec<f64>),
    /// Sleep, then return lines.
    Delayed(Duration, Vec<f64>),
    /// Return zero lines.
    Empty,
    /// Return a recognition error.
    Fail(String),
    /// Panic inside `recognize`.
    Panic,
}

/// Image whose pixels encode `page_index`.
pub fn page_image(page_index: usize) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 4, Rgb([page_index as u8, 0, 0])))
}

pub fn page_of(input: &PageInput<'_>) -> usize {
    input.image().to_rgb8().get_pixel(0, 0)[0] as usize
}

/// Counters shared by a factory and every engine it creates.
#[derive(Debug, Default)]
pub struct EngineStats {
    pub calls: AtomicUsize,
    pub created: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl EngineStats {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

pub struct ScriptedEngine {
    name: String,
    script: Arc<HashMap<usize, Behavior>>,
    default: Behavior,
    stats: Arc<EngineStats>,
}

impl RecognitionEngine for ScriptedEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognize(&mut self, input: &PageInput<'_>) -> Result<Vec<RecognizedLine>> {
        let page = page_of(input);
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_active.fetch_max(active, Ordering::SeqCst);

        let behavior = self.script.get(&page).cloned().unwrap_or_else(|| self.default.clone());
        let outcome = match behavior {
            Behavior::Lines(confidences) => Ok(lines_for(page, &confidences)),
            Behavior::Delayed(delay, confidences) => {
                std::thread::sleep(delay);
                Ok(lines_for(page, &confidences))
            }
            Behavior::Empty => Ok(Vec::new()),
            Behavior::Fail(message) => Err(ScanflowError::recognition(message)),
            Behavior::Panic => {
                self.stats.active.fetch_sub(1, Ordering::SeqCst);
                panic!("scripted engine panic on page {}", page);
            }
        };

        self.stats.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

fn lines_for(page: usize, confidences: &[f64]) -> Vec<RecognizedLine> {
    confidences
        .iter()
        .enumerate()
        .map(|(i, c)| {
            RecognizedLine::new(
                format!("page {} line {}", page, i + 1),
                *c,
                bbox_from_rect(10.0, 20.0 * i as f64, 200.0, 16.0),
            )
        })
        .collect()
}

/// Factory for [`ScriptedEngine`]s sharing one script and one set of counters.
pub struct ScriptedFactory {
    name: String,
    script: Arc<HashMap<usize, Behavior>>,
    default: Behavior,
    unavailable: Option<String>,
    pub stats: Arc<EngineStats>,
}

impl ScriptedFactory {
    /// Every page gets `default`.
    pub fn uniform(name: &str, default: Behavior) -> Self {
        Self {
            name: name.to_string(),
            script: Arc::new(HashMap::new()),
            default,
            unavailable: None,
            stats: Arc::new(EngineStats::default()),
        }
    }

    /// Per-page behavior; unlisted pages get `Empty`.
    pub fn scripted(name: &str, script: impl IntoIterator<Item = (usize, Behavior)>) -> Self {
        Self {
            script: Arc::new(script.into_iter().collect()),
            ..Self::uniform(name, Behavior::Empty)
        }
    }

    /// A factory that can never build an engine.
    pub fn unavailable(name: &str, message: &str) -> Self {
        Self {
            unavailable: Some(message.to_string()),
            ..Self::uniform(name, Behavior::Empty)
        }
    }

    pub fn into_shared(self) -> (Arc<dyn EngineFactory>, Arc<EngineStats>) {
        let stats = Arc::clone(&self.stats);
        (Arc::new(self), stats)
    }
}

impl EngineFactory for ScriptedFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self) -> Result<Box<dyn RecognitionEngine>> {
        if let Some(message) = &self.unavailable {
            return Err(ScanflowError::engine_unavailable(self.name.clone(), message.clone()));
        }
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedEngine {
            name: self.name.clone(),
            script: Arc::clone(&self.script),
            default: self.default.clone(),
            stats: Arc::clone(&self.stats),
        }))
    }
}

/// Page source producing `page_count` synthetic pages for any path.
pub struct FakePageSource {
    pub page_count: usize,
    pub loads: AtomicUsize,
}

impl FakePageSource {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            loads: AtomicUsize::new(0),
        }
    }
}

impl PageSource for FakePageSource {
    fn load_pages(&self, _path: &Path, kind: SourceKind) -> Result<Vec<PageImage>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let count = if kind.is_pdf() { self.page_count } else { 1 };
        Ok((1..=count).map(|i| PageImage::new(i, page_image(i))).collect())
    }
}

/// Page source that always reports a corrupt document.
pub struct CorruptPageSource;

impl PageSource for CorruptPageSource {
    fn load_pages(&self, path: &Path, _kind: SourceKind) -> Result<Vec<PageImage>> {
        Err(ScanflowError::conversion(format!(
            "Could not convert {} to images: invalid PDF",
            path.display()
        )))
    }
}

/// Create an empty file with the given name so path validation passes.
pub fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"placeholder").expect("write fixture");
    path
}

/// Write a real PNG whose pixels encode `page_index`.
pub fn write_png(dir: &Path, name: &str, page_index: usize) -> PathBuf {
    let path = dir.join(name);
    page_image(page_index).save(&path).expect("write png fixture");
    path
}
