//! End-to-end extraction through the `Extractor` with scripted engines.

mod helpers;

use helpers::{Behavior, CorruptPageSource, FakePageSource, ScriptedFactory, touch, write_png};
use scanflow::pipeline::PoolBuilder;
use scanflow::{
    DocumentResult, EngineRegistry, ExtractionConfig, ExtractionMode, Extractor, RasterPageSource, ScanflowError,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn extractor(
    primary: ScriptedFactory,
    fallback: ScriptedFactory,
    page_source: Arc<dyn scanflow::PageSource>,
) -> Extractor {
    let (primary, _) = primary.into_shared();
    let (fallback, _) = fallback.into_shared();
    Extractor::builder(ExtractionConfig::default())
        .registry(EngineRegistry::new(primary).with_fallback(fallback))
        .page_source(page_source)
        .available_parallelism(8)
        .build()
        .unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {}, got {}", expected, actual);
}

#[test]
fn test_three_page_document_with_failed_middle_page() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = touch(dir.path(), "statement.pdf");

    let extractor = extractor(
        ScriptedFactory::scripted(
            "primary",
            [(1, Behavior::Lines(vec![0.9, 0.9])), (3, Behavior::Lines(vec![0.6]))],
        ),
        ScriptedFactory::uniform("fallback", Behavior::Empty),
        Arc::new(FakePageSource::new(3)),
    );

    let result = extractor.extract_sync(&pdf, ExtractionMode::Auto);

    assert!(result.succeeded);
    assert_eq!(result.page_count, 3);
    assert_eq!(result.line_count, 3);
    assert_close(result.confidence, 0.8);
    assert_eq!(result.engines_used.len(), 2);
    assert!(result.engines_used[0].starts_with("Page 1: primary"));
    assert!(result.engines_used[1].starts_with("Page 3: primary"));
    assert!(result.text.contains("PAGE 1"));
    assert!(!result.text.contains("PAGE 2"));
    assert!(result.error.is_none());
}

#[test]
fn test_lines_follow_page_order_not_completion_order() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = touch(dir.path(), "report.pdf");

    let script = (1..=6).map(|page| {
        let delay = Duration::from_millis(20 * (7 - page as u64));
        (page, Behavior::Delayed(delay, vec![0.95, 0.9]))
    });

    let extractor = extractor(
        ScriptedFactory::scripted("primary", script),
        ScriptedFactory::uniform("fallback", Behavior::Empty),
        Arc::new(FakePageSource::new(6)),
    );

    let result = extractor.extract_sync(&pdf, ExtractionMode::Auto);

    assert_eq!(result.parallel_workers, 4);
    assert_eq!(result.line_count, 12);
    let pages: Vec<usize> = result.lines.iter().map(|l| l.page_index).collect();
    let mut sorted = pages.clone();
    sorted.sort();
    assert_eq!(pages, sorted);

    let first_page: Vec<&str> = result.lines[..2].iter().map(|l| l.text.as_str()).collect();
    assert_eq!(first_page, vec!["page 1 line 1", "page 1 line 2"]);
}

#[test]
fn test_line_count_matches_sum_of_pages() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = touch(dir.path(), "mixed.pdf");

    let extractor = extractor(
        ScriptedFactory::scripted(
            "primary",
            [
                (1, Behavior::Lines(vec![0.8; 4])),
                (2, Behavior::Fail("tesseract exited with status 1".to_string())),
                (3, Behavior::Lines(vec![0.75; 2])),
                (4, Behavior::Empty),
            ],
        ),
        ScriptedFactory::uniform("fallback", Behavior::Empty),
        Arc::new(FakePageSource::new(4)),
    );

    let result = extractor.extract_sync(&pdf, ExtractionMode::Auto);

    assert!(result.succeeded);
    assert_eq!(result.line_count, 6);
    assert_eq!(result.lines.len(), result.line_count);
    assert_close(result.confidence, (0.8 * 4.0 + 0.75 * 2.0) / 6.0);
}

#[test]
fn test_pool_failure_runs_sequentially_with_same_results() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = touch(dir.path(), "contract.pdf");

    let script = || {
        [
            (1, Behavior::Lines(vec![0.91, 0.82])),
            (2, Behavior::Lines(vec![0.5])),
            (3, Behavior::Empty),
            (4, Behavior::Lines(vec![0.77])),
        ]
    };
    let fallback_script = || [(2, Behavior::Lines(vec![0.66, 0.61]))];

    let parallel = extractor(
        ScriptedFactory::scripted("primary", script()),
        ScriptedFactory::scripted("fallback", fallback_script()),
        Arc::new(FakePageSource::new(4)),
    )
    .extract_sync(&pdf, ExtractionMode::Auto);

    let failing_builder: PoolBuilder = Arc::new(|_workers: usize| -> scanflow::Result<rayon::ThreadPool> {
        Err(ScanflowError::PoolEstablishment("thread spawn refused".to_string()))
    });
    let (primary, _) = ScriptedFactory::scripted("primary", script()).into_shared();
    let (fallback, _) = ScriptedFactory::scripted("fallback", fallback_script()).into_shared();
    let sequential = Extractor::builder(ExtractionConfig::default())
        .registry(EngineRegistry::new(primary).with_fallback(fallback))
        .page_source(Arc::new(FakePageSource::new(4)))
        .available_parallelism(8)
        .pool_builder(failing_builder)
        .build()
        .unwrap()
        .extract_sync(&pdf, ExtractionMode::Auto);

    assert_eq!(parallel.parallel_workers, 4);
    assert_eq!(sequential.parallel_workers, 1);
    assert!(sequential.succeeded);
    assert_eq!(sequential.lines, parallel.lines);
    assert_eq!(sequential.text, parallel.text);
    assert_eq!(sequential.engines_used, parallel.engines_used);
    assert_close(sequential.confidence, parallel.confidence);
}

#[test]
fn test_conversion_failure_dispatches_no_workers() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = touch(dir.path(), "corrupt.pdf");

    let (primary, primary_stats) = ScriptedFactory::uniform("primary", Behavior::Lines(vec![0.9])).into_shared();
    let (fallback, fallback_stats) = ScriptedFactory::uniform("fallback", Behavior::Lines(vec![0.9])).into_shared();
    let extractor = Extractor::builder(ExtractionConfig::default())
        .registry(EngineRegistry::new(primary).with_fallback(fallback))
        .page_source(Arc::new(CorruptPageSource))
        .build()
        .unwrap();

    let result = extractor.extract_sync(&pdf, ExtractionMode::Auto);

    assert!(!result.succeeded);
    assert!(result.error.as_deref().is_some_and(|e| !e.is_empty()));
    assert_eq!(result.line_count, 0);
    assert_eq!(result.parallel_workers, 0);
    assert_eq!(primary_stats.calls(), 0);
    assert_eq!(fallback_stats.calls(), 0);
}

#[test]
fn test_zero_page_document_is_failure() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = touch(dir.path(), "empty.pdf");

    let (primary, stats) = ScriptedFactory::uniform("primary", Behavior::Lines(vec![0.9])).into_shared();
    let extractor = Extractor::builder(ExtractionConfig::default())
        .registry(EngineRegistry::new(primary))
        .page_source(Arc::new(FakePageSource::new(0)))
        .build()
        .unwrap();

    let result = extractor.extract_sync(&pdf, ExtractionMode::Auto);

    assert!(!result.succeeded);
    assert!(result.error.unwrap().contains("no pages produced"));
    assert_eq!(stats.calls(), 0);
    assert_eq!(stats.created(), 0);
}

#[test]
fn test_single_image_falls_back_on_low_confidence() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "receipt.png", 1);

    let extractor = extractor(
        ScriptedFactory::uniform("primary", Behavior::Lines(vec![0.5])),
        ScriptedFactory::uniform("fallback", Behavior::Lines(vec![0.65])),
        Arc::new(RasterPageSource::default()),
    );

    let result = extractor.extract_sync(&image, ExtractionMode::Auto);

    assert!(result.succeeded);
    assert_close(result.confidence, 0.65);
    assert_eq!(result.page_count, 1);
    assert_eq!(result.engines_used, vec!["Page 1: fallback (fallback)"]);
    assert_eq!(result.text, "page 1 line 1");
    assert!(!result.text.contains("PAGE 1"));
}

#[test]
fn test_single_image_without_text_is_failure() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "blank.png", 1);

    let extractor = extractor(
        ScriptedFactory::uniform("primary", Behavior::Empty),
        ScriptedFactory::uniform("fallback", Behavior::Empty),
        Arc::new(RasterPageSource::default()),
    );

    let result = extractor.extract_sync(&image, ExtractionMode::Auto);

    assert!(!result.succeeded);
    assert_eq!(result.error.as_deref(), Some(scanflow::NO_TEXT_DETECTED));
    assert_eq!(result.line_count, 0);
}

#[test]
fn test_fallback_disabled_keeps_low_primary() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "faded.png", 1);

    let (primary, _) = ScriptedFactory::uniform("primary", Behavior::Lines(vec![0.5])).into_shared();
    let (fallback, fallback_stats) =
        ScriptedFactory::uniform("fallback", Behavior::Lines(vec![0.95])).into_shared();
    let config = ExtractionConfig {
        fallback_enabled: false,
        ..ExtractionConfig::default()
    };
    let extractor = Extractor::builder(config)
        .registry(EngineRegistry::new(primary).with_fallback(fallback))
        .page_source(Arc::new(RasterPageSource::default()))
        .build()
        .unwrap();

    let result = extractor.extract_sync(&image, ExtractionMode::Auto);

    assert!(result.succeeded);
    assert_close(result.confidence, 0.5);
    assert_eq!(result.engines_used, vec!["Page 1: primary (primary)"]);
    assert_eq!(fallback_stats.calls(), 0);
}

#[test]
fn test_panicking_page_does_not_abort_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = touch(dir.path(), "flaky.pdf");

    let (primary, stats) = ScriptedFactory::scripted(
        "primary",
        [
            (1, Behavior::Lines(vec![0.9])),
            (2, Behavior::Panic),
            (3, Behavior::Lines(vec![0.8])),
        ],
    )
    .into_shared();
    let extractor = Extractor::builder(ExtractionConfig {
        fallback_enabled: false,
        ..ExtractionConfig::default()
    })
    .registry(EngineRegistry::new(primary))
    .page_source(Arc::new(FakePageSource::new(3)))
    .available_parallelism(8)
    .build()
    .unwrap();

    let result = extractor.extract_sync(&pdf, ExtractionMode::Auto);

    assert!(result.succeeded);
    assert_eq!(result.line_count, 2);
    assert_eq!(result.engines_used.len(), 2);
    assert_eq!(stats.calls(), 3);
}

#[test]
fn test_unavailable_engines_degrade_per_page() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = touch(dir.path(), "scan.pdf");

    let extractor = extractor(
        ScriptedFactory::unavailable("primary", "model files missing"),
        ScriptedFactory::uniform("fallback", Behavior::Lines(vec![0.7, 0.6])),
        Arc::new(FakePageSource::new(2)),
    );
    let result = extractor.extract_sync(&pdf, ExtractionMode::Auto);

    assert!(result.succeeded);
    assert_eq!(result.line_count, 4);
    assert!(result.engines_used.iter().all(|e| e.ends_with("(fallback)")));

    let nothing = extractor.extract_sync(&pdf, ExtractionMode::PrimaryOnly);
    assert!(nothing.succeeded);
    assert_eq!(nothing.line_count, 0);
    assert!(nothing.engines_used.is_empty());
}

#[test]
fn test_engine_instances_never_shared() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = touch(dir.path(), "large.pdf");

    let (primary, stats) =
        ScriptedFactory::uniform("primary", Behavior::Delayed(Duration::from_millis(15), vec![0.9])).into_shared();
    let extractor = Extractor::builder(ExtractionConfig::default())
        .registry(EngineRegistry::new(primary))
        .page_source(Arc::new(FakePageSource::new(12)))
        .available_parallelism(8)
        .build()
        .unwrap();

    let result = extractor.extract_sync(&pdf, ExtractionMode::PrimaryOnly);

    assert_eq!(result.line_count, 12);
    assert!(stats.max_active() <= result.parallel_workers);
    assert!(stats.created() <= result.parallel_workers);
    assert_eq!(stats.active.load(Ordering::SeqCst), 0);
}

#[test]
fn test_engines_are_reused_across_calls() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "page.png", 1);

    let (primary, stats) = ScriptedFactory::uniform("primary", Behavior::Lines(vec![0.9])).into_shared();
    let extractor = Extractor::builder(ExtractionConfig::default())
        .registry(EngineRegistry::new(primary))
        .page_source(Arc::new(RasterPageSource::default()))
        .build()
        .unwrap();

    for _ in 0..3 {
        assert!(extractor.extract_sync(&image, ExtractionMode::Auto).succeeded);
    }
    assert_eq!(stats.created(), 1);
    assert_eq!(stats.calls(), 3);
}

#[tokio::test]
async fn test_batch_results_keep_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let first = touch(dir.path(), "first.pdf");
    let missing = dir.path().join("missing.pdf");
    let third = write_png(dir.path(), "third.png", 1);
    let unsupported = touch(dir.path(), "notes.txt");

    let extractor = extractor(
        ScriptedFactory::uniform("primary", Behavior::Lines(vec![0.9])),
        ScriptedFactory::uniform("fallback", Behavior::Empty),
        Arc::new(FakePageSource::new(2)),
    );

    let results: Vec<DocumentResult> = extractor
        .batch_extract(vec![first, missing, third, unsupported], ExtractionMode::Auto)
        .await;

    assert_eq!(results.len(), 4);
    assert!(results[0].succeeded);
    assert_eq!(results[0].page_count, 2);
    assert!(!results[1].succeeded);
    assert!(results[1].error.as_deref().unwrap().contains("does not exist"));
    assert!(results[2].succeeded);
    assert_eq!(results[2].page_count, 1);
    assert!(!results[3].succeeded);
    assert!(results[3].error.as_deref().unwrap().contains("Unsupported file type"));
}

#[tokio::test]
async fn test_async_extract_matches_sync() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = touch(dir.path(), "async.pdf");

    let extractor = extractor(
        ScriptedFactory::uniform("primary", Behavior::Lines(vec![0.88, 0.92])),
        ScriptedFactory::uniform("fallback", Behavior::Empty),
        Arc::new(FakePageSource::new(3)),
    );

    let result = extractor.extract(&pdf, ExtractionMode::Auto).await;

    assert!(result.succeeded);
    assert_eq!(result.line_count, 6);
    assert_close(result.confidence, 0.9);
}
