//! Reassembly of page results into a document result.

use crate::types::{DocumentResult, PageResult};

const PAGE_RULE_WIDTH: usize = 60;

/// Text block placed in front of each page's text in multi-page documents.
pub fn page_marker(page_index: usize) -> String {
    let rule = "=".repeat(PAGE_RULE_WIDTH);
    format!("\n{}\nPAGE {}\n{}\n", rule, page_index, rule)
}

fn engine_summary(page: &PageResult) -> String {
    let engine = page.engine_name.as_deref().unwrap_or("unknown");
    format!("Page {}: {} ({})", page.page_index, engine, page.engine_used)
}

/// Build the result of a paginated document.
///
/// Pages are sorted by `page_index`; failed pages contribute neither text nor
/// lines nor confidence weight. The document counts as succeeded because
/// conversion did; per-page failures stay visible through `engines_used`
/// and `line_count`.
pub fn aggregate(mut pages: Vec<PageResult>, page_count: usize, parallel_workers: usize) -> DocumentResult {
    pages.sort_by_key(|p| p.page_index);

    let mut blocks = Vec::with_capacity(pages.len());
    let mut lines = Vec::new();
    let mut engines_used = Vec::new();
    let mut weighted = 0.0;
    let mut total = 0usize;

    for page in pages {
        if !page.succeeded {
            tracing::debug!(
                "Page {}: skipped ({})",
                page.page_index,
                page.error.as_deref().unwrap_or("failed")
            );
            continue;
        }

        engines_used.push(engine_summary(&page));
        blocks.push(format!("{}{}", page_marker(page.page_index), page.text));

        let count = page.line_count();
        weighted += page.confidence * count as f64;
        total += count;
        lines.extend(page.lines);
    }

    let confidence = if total > 0 { weighted / total as f64 } else { 0.0 };

    tracing::info!(
        "Document complete: {} page(s), {} line(s), confidence {:.1}%, {} worker(s)",
        page_count,
        total,
        confidence * 100.0,
        parallel_workers
    );

    DocumentResult {
        succeeded: true,
        text: blocks.join("\n"),
        lines,
        confidence,
        line_count: total,
        page_count,
        engines_used,
        parallel_workers,
        error: None,
    }
}

/// Build the result of a single image: no page marker, and success follows
/// the page.
pub fn single_page(page: PageResult) -> DocumentResult {
    let engines_used = if page.succeeded {
        vec![engine_summary(&page)]
    } else {
        Vec::new()
    };

    DocumentResult {
        succeeded: page.succeeded,
        line_count: page.line_count(),
        confidence: page.confidence,
        text: page.text,
        lines: page.lines,
        page_count: 1,
        engines_used,
        parallel_workers: 1,
        error: page.error,
    }
}
