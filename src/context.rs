//! # Context Extraction Module
//!
//! ## Purpose
//! Locates the lines of a ruling that contain query words, extracts one line
//! of surrounding context, and renders the matched line with every query
//! word occurrence wrapped for highlighting.
//!
//! ## Input/Output Specification
//! - **Input**: A document and the normalized query words
//! - **Output**: Match records in document order (ascending line number)
//! - **Highlighting**: Case-/diacritic-insensitive, non-overlapping spans,
//!   longest query word first
//!
//! Matching runs over a normalized shadow of each line with a position map
//! back to the original bytes, so vocalized text highlights correctly.

use crate::text_processing::TextNormalizer;
use crate::Document;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// Highlight wrapper emitted around matched occurrences.
pub const HIGHLIGHT_OPEN: &str = "<mark>";
pub const HIGHLIGHT_CLOSE: &str = "</mark>";

/// One matched line with its surrounding context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// The line immediately before the match; empty at document start
    pub line_before: String,
    /// The matched line, verbatim
    pub matched_line: String,
    /// The line immediately after the match; empty at document end
    pub line_after: String,
    /// The matched line with query word occurrences wrapped
    pub highlighted_line: String,
    /// 1-based line number within the document
    pub line_number: usize,
}

/// Extracts match records from documents for a fixed set of query words.
pub struct ContextExtractor<'a> {
    normalizer: &'a TextNormalizer,
    max_matches_per_document: usize,
}

impl<'a> ContextExtractor<'a> {
    pub fn new(normalizer: &'a TextNormalizer, max_matches_per_document: usize) -> Self {
        Self {
            normalizer,
            max_matches_per_document,
        }
    }

    /// All lines containing at least one query word, in document order.
    /// Lines are the document's natural line breaks; a document without any
    /// is treated as a single line.
    pub fn extract_matches(&self, document: &Document, query_words: &[String]) -> Vec<MatchRecord> {
        if query_words.is_empty() {
            return Vec::new();
        }

        let word_set: HashSet<&str> = query_words.iter().map(String::as_str).collect();
        let lines: Vec<&str> = TextNormalizer::split_lines(&document.full_text).collect();
        let mut records = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            if records.len() >= self.max_matches_per_document {
                break;
            }

            let line_matches = self
                .normalizer
                .tokenize(line)
                .iter()
                .any(|token| word_set.contains(token.as_str()));
            if !line_matches {
                continue;
            }

            records.push(MatchRecord {
                line_before: if i > 0 { lines[i - 1].to_string() } else { String::new() },
                matched_line: line.to_string(),
                line_after: lines.get(i + 1).map(|l| l.to_string()).unwrap_or_default(),
                highlighted_line: self.highlight(line, query_words),
                line_number: i + 1,
            });
        }

        records
    }

    /// Wrap every occurrence of every query word in the line. Occurrences
    /// are located on the normalized shadow and mapped back to original byte
    /// spans; spans never overlap, longer query words claim positions first.
    pub fn highlight(&self, line: &str, query_words: &[String]) -> String {
        let shadow = Shadow::of(line, self.normalizer);

        let mut words: Vec<Vec<char>> = query_words
            .iter()
            .map(|w| w.chars().collect())
            .filter(|w: &Vec<char>| !w.is_empty())
            .collect();
        words.sort_by_key(|w| std::cmp::Reverse(w.len()));
        words.dedup();

        let mut occupied = vec![false; shadow.chars.len()];
        let mut spans: Vec<(usize, usize)> = Vec::new();

        for word in &words {
            let mut start = 0;
            while start + word.len() <= shadow.chars.len() {
                if shadow.chars[start..start + word.len()] == word[..]
                    && !occupied[start..start + word.len()].iter().any(|&o| o)
                {
                    for slot in &mut occupied[start..start + word.len()] {
                        *slot = true;
                    }
                    let byte_start = shadow.origin[start].0;
                    let byte_end = shadow.origin[start + word.len() - 1].1;
                    spans.push((byte_start, byte_end));
                    start += word.len();
                } else {
                    start += 1;
                }
            }
        }

        if spans.is_empty() {
            return line.to_string();
        }

        spans.sort_unstable();

        let mut out = String::with_capacity(line.len() + spans.len() * 16);
        let mut cursor = 0;
        for (start, end) in spans {
            if start < cursor {
                continue;
            }
            out.push_str(&line[cursor..start]);
            out.push_str(HIGHLIGHT_OPEN);
            out.push_str(&line[start..end]);
            out.push_str(HIGHLIGHT_CLOSE);
            cursor = end;
        }
        out.push_str(&line[cursor..]);
        out
    }
}

/// Normalized view of a line with, per shadow character, the byte range of
/// the original character it came from.
struct Shadow {
    chars: Vec<char>,
    origin: Vec<(usize, usize)>,
}

impl Shadow {
    fn of(line: &str, normalizer: &TextNormalizer) -> Self {
        let mut chars = Vec::with_capacity(line.len());
        let mut origin = Vec::with_capacity(line.len());

        for (offset, original) in line.char_indices() {
            let end = offset + original.len_utf8();
            for decomposed in std::iter::once(original).nfd() {
                if let Some(folded) = normalizer.fold_char(decomposed) {
                    chars.push(folded);
                    origin.push((offset, end));
                }
            }
        }

        Self { chars, origin }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new(Config::default().text_processing)
    }

    fn doc(text: &str) -> Document {
        Document {
            id: "1".to_string(),
            title: "פסק דין".to_string(),
            court: "בית דין ירושלים".to_string(),
            year: 2015,
            full_text: text.to_string(),
            summary: String::new(),
        }
    }

    #[test]
    fn single_line_document_matches_whole_text() {
        let n = normalizer();
        let extractor = ContextExtractor::new(&n, 20);
        let records = extractor.extract_matches(&doc("שור שנגח את הפרה"), &["שור".to_string()]);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].matched_line, "שור שנגח את הפרה");
        assert_eq!(records[0].line_before, "");
        assert_eq!(records[0].line_after, "");
        assert_eq!(records[0].line_number, 1);
        assert!(records[0].highlighted_line.contains("<mark>שור</mark>"));
    }

    #[test]
    fn context_boundaries_are_empty_at_document_edges() {
        let n = normalizer();
        let extractor = ContextExtractor::new(&n, 20);
        let text = "שור בשורה הראשונה\nשורה אמצעית\nפרה בשורה האחרונה";

        let first = extractor.extract_matches(&doc(text), &["שור".to_string()]);
        assert_eq!(first[0].line_number, 1);
        assert_eq!(first[0].line_before, "");
        assert_eq!(first[0].line_after, "שורה אמצעית");

        let last = extractor.extract_matches(&doc(text), &["פרה".to_string()]);
        assert_eq!(last[0].line_number, 3);
        assert_eq!(last[0].line_before, "שורה אמצעית");
        assert_eq!(last[0].line_after, "");
    }

    #[test]
    fn records_follow_document_order() {
        let n = normalizer();
        let extractor = ContextExtractor::new(&n, 20);
        let text = "פרה ראשונה\nשום דבר\nפרה שנייה";
        let records = extractor.extract_matches(&doc(text), &["פרה".to_string()]);

        let numbers: Vec<usize> = records.iter().map(|r| r.line_number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn highlight_is_diacritic_insensitive() {
        let n = normalizer();
        let extractor = ContextExtractor::new(&n, 20);
        let highlighted = extractor.highlight("שׁוֹר שנגח", &["שור".to_string()]);
        assert_eq!(highlighted, "<mark>שׁוֹר</mark> שנגח");
    }

    #[test]
    fn highlight_spans_never_overlap() {
        let n = normalizer();
        let extractor = ContextExtractor::new(&n, 20);

        // "שורה" contains "שור" as a prefix; the longer word wins and the
        // shorter must not nest inside its span
        let highlighted = extractor.highlight(
            "שורה של שור",
            &["שור".to_string(), "שורה".to_string()],
        );
        assert_eq!(
            highlighted,
            "<mark>שורה</mark> של <mark>שור</mark>"
        );
        assert!(!highlighted.contains("<mark><mark>"));
    }

    #[test]
    fn highlights_every_occurrence() {
        let n = normalizer();
        let extractor = ContextExtractor::new(&n, 20);
        let highlighted = extractor.highlight("שור ועוד שור", &["שור".to_string()]);
        assert_eq!(highlighted.matches("<mark>").count(), 2);
    }

    #[test]
    fn no_match_lines_yield_no_records() {
        let n = normalizer();
        let extractor = ContextExtractor::new(&n, 20);
        let records = extractor.extract_matches(&doc("חמור שנגח חמור"), &["שור".to_string()]);
        assert!(records.is_empty());
    }

    #[test]
    fn respects_per_document_match_cap() {
        let n = normalizer();
        let extractor = ContextExtractor::new(&n, 2);
        let text = "שור\nשור\nשור\nשור";
        let records = extractor.extract_matches(&doc(text), &["שור".to_string()]);
        assert_eq!(records.len(), 2);
    }
}
