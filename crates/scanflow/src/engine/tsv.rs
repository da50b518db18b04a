//! Tesseract TSV output parsing.
//!
//! Tesseract's `tsv` output has one row per layout element with the columns
//! `level page_num block_num par_num line_num word_num left top width height conf text`.
//! Only word rows (level 5) carry text; they are either reported one per line
//! or grouped into the text lines Tesseract identified.

use crate::core::config::Granularity;
use crate::engine::RecognizedLine;
use crate::types::bbox_from_rect;

const TSV_WORD_LEVEL: u32 = 5;
const TSV_MIN_FIELDS: usize = 12;

/// A single word row from TSV output.
#[derive(Debug, Clone, PartialEq)]
pub struct TsvWord {
    pub block_num: u32,
    pub par_num: u32,
    pub line_num: u32,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
    /// Raw Tesseract confidence, 0-100.
    pub confidence: f64,
    pub text: String,
}

impl TsvWord {
    fn line_key(&self) -> (u32, u32, u32) {
        (self.block_num, self.par_num, self.line_num)
    }

    fn right(&self) -> u32 {
        self.left.saturating_add(self.width)
    }

    fn bottom(&self) -> u32 {
        self.top.saturating_add(self.height)
    }
}

/// Extract the word rows with positive confidence and non-empty text.
///
/// The header row, short rows and non-word levels are skipped.
pub fn parse_words(tsv_data: &str) -> Vec<TsvWord> {
    let mut words = Vec::new();

    for (line_num, line) in tsv_data.lines().enumerate() {
        if line_num == 0 && line.starts_with("level") {
            continue;
        }

        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() < TSV_MIN_FIELDS {
            continue;
        }

        if fields[0].trim().parse::<u32>().unwrap_or(0) != TSV_WORD_LEVEL {
            continue;
        }

        let confidence = fields[10].trim().parse::<f64>().unwrap_or(-1.0);
        if !confidence.is_finite() || confidence <= 0.0 {
            continue;
        }

        let text = fields[11..].join("\t");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        words.push(TsvWord {
            block_num: fields[2].trim().parse().unwrap_or(0),
            par_num: fields[3].trim().parse().unwrap_or(0),
            line_num: fields[4].trim().parse().unwrap_or(0),
            left: fields[6].trim().parse().unwrap_or(0),
            top: fields[7].trim().parse().unwrap_or(0),
            width: fields[8].trim().parse().unwrap_or(0),
            height: fields[9].trim().parse().unwrap_or(0),
            confidence,
            text: text.to_string(),
        });
    }

    words
}

/// Convert TSV output into recognized lines at the requested granularity.
pub fn lines_from_tsv(tsv_data: &str, granularity: Granularity) -> Vec<RecognizedLine> {
    let words = parse_words(tsv_data);
    match granularity {
        Granularity::Word => words.iter().map(word_to_line).collect(),
        Granularity::Line => group_into_lines(&words),
    }
}

fn word_to_line(word: &TsvWord) -> RecognizedLine {
    RecognizedLine::new(
        word.text.clone(),
        word.confidence / 100.0,
        bbox_from_rect(word.left as f64, word.top as f64, word.width as f64, word.height as f64),
    )
}

/// Join consecutive words sharing a block/paragraph/line into one line.
///
/// Text is space-joined, the box is the union of the word boxes, and the
/// confidence is the mean word confidence.
fn group_into_lines(words: &[TsvWord]) -> Vec<RecognizedLine> {
    let mut lines = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let key = words[start].line_key();
        let end = words[start..]
            .iter()
            .position(|w| w.line_key() != key)
            .map_or(words.len(), |offset| start + offset);
        let group = &words[start..end];

        let text = group.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
        let confidence = group.iter().map(|w| w.confidence).sum::<f64>() / group.len() as f64 / 100.0;

        let left = group.iter().map(|w| w.left).min().unwrap_or(0);
        let top = group.iter().map(|w| w.top).min().unwrap_or(0);
        let right = group.iter().map(TsvWord::right).max().unwrap_or(left);
        let bottom = group.iter().map(TsvWord::bottom).max().unwrap_or(top);

        lines.push(RecognizedLine::new(
            text,
            confidence,
            bbox_from_rect(
                left as f64,
                top as f64,
                right.saturating_sub(left) as f64,
                bottom.saturating_sub(top) as f64,
            ),
        ));

        start = end;
    }

    lines
}
