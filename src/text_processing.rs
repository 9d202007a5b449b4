//! # Text Processing Module
//!
//! ## Purpose
//! Normalization and tokenization pipeline for ruling text. The same
//! normalizer runs at index build time and query time; that symmetry is the
//! central correctness invariant of the index, and diverging the two sides
//! silently degrades recall.
//!
//! ## Input/Output Specification
//! - **Input**: Raw ruling text (Hebrew with vowel points, mixed Latin)
//! - **Output**: Normalized tokens and folded characters
//! - **Rules**: NFD decomposition, mark stripping, final-letter folding,
//!   case folding, tokenization on whitespace and punctuation
//!
//! ## Key Features
//! - Hebrew niqqud and cantillation stripping (U+0591–U+05C7 mark subset)
//! - Final-letter folding so word-final and medial forms match
//! - Latin combining-mark stripping and case folding
//! - Shared per-character folding for the highlighter's shadow mapping

use crate::config::TextProcessingConfig;
use unicode_normalization::UnicodeNormalization;

/// Text normalizer shared by the index builder, the query evaluator and the
/// context extractor.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    config: TextProcessingConfig,
}

impl TextNormalizer {
    pub fn new(config: TextProcessingConfig) -> Self {
        Self { config }
    }

    /// Normalize a single word: NFD decomposition, mark stripping, letter
    /// folding. Does not tokenize; punctuation survives.
    pub fn normalize_word(&self, word: &str) -> String {
        word.nfd().filter_map(|c| self.fold_char(c)).collect()
    }

    /// Tokenize text into normalized words. Tokens are maximal runs of
    /// alphanumeric characters after folding; stripped marks inside a word
    /// do not break it, punctuation and whitespace do.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut current = String::new();

        for ch in text.nfd() {
            match self.fold_char(ch) {
                // Stripped mark inside a word (niqqud, taamim)
                None => continue,
                Some(c) if c.is_alphanumeric() => current.push(c),
                Some(_) => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                }
            }
        }

        if !current.is_empty() {
            tokens.push(current);
        }

        tokens
    }

    /// Fold one (already NFD-decomposed) character. Returns `None` for
    /// characters stripped entirely: combining marks that never separate
    /// words.
    pub fn fold_char(&self, c: char) -> Option<char> {
        if self.config.strip_diacritics && is_stripped_mark(c) {
            return None;
        }

        let c = if self.config.fold_final_letters {
            fold_final_letter(c)
        } else {
            c
        };

        if self.config.enable_case_folding {
            // to_lowercase always yields at least one char; multi-char
            // expansions collapse to their first character on both the
            // build and query side, so symmetry holds.
            Some(c.to_lowercase().next().unwrap_or(c))
        } else {
            Some(c)
        }
    }

    /// Split text into its natural lines. A text without line breaks is a
    /// single line.
    pub fn split_lines(text: &str) -> std::str::Lines<'_> {
        text.lines()
    }
}

/// Combining marks removed during normalization: the Latin combining range
/// and the Hebrew cantillation/vowel-point block. The Hebrew punctuation
/// code points inside that block (maqaf, paseq, sof pasuq, nun hafukha) are
/// excluded; they separate words and must flush tokens instead.
fn is_stripped_mark(c: char) -> bool {
    match c {
        '\u{0300}'..='\u{036F}' => true,
        '\u{05BE}' | '\u{05C0}' | '\u{05C3}' | '\u{05C6}' => false,
        '\u{0591}'..='\u{05C7}' => true,
        _ => false,
    }
}

/// Fold Hebrew final letters to their medial forms.
fn fold_final_letter(c: char) -> char {
    match c {
        'ך' => 'כ',
        'ם' => 'מ',
        'ן' => 'נ',
        'ף' => 'פ',
        'ץ' => 'צ',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new(Config::default().text_processing)
    }

    #[test]
    fn strips_niqqud() {
        let n = normalizer();
        assert_eq!(n.normalize_word("שָׁלוֹם"), "שלומ");
        assert_eq!(n.normalize_word("שלום"), "שלומ");
    }

    #[test]
    fn vocalized_and_plain_forms_normalize_identically() {
        let n = normalizer();
        assert_eq!(n.normalize_word("שׁוֹר"), n.normalize_word("שור"));
    }

    #[test]
    fn folds_final_letters() {
        let n = normalizer();
        assert_eq!(n.normalize_word("בן"), "בנ");
        assert_eq!(n.normalize_word("כסף"), "כספ");
    }

    #[test]
    fn tokenizes_on_whitespace_and_punctuation() {
        let n = normalizer();
        assert_eq!(
            n.tokenize("שור שנגח, את הפרה."),
            vec!["שור", "שנגח", "את", "הפרה"]
        );
    }

    #[test]
    fn maqaf_separates_words() {
        let n = normalizer();
        assert_eq!(n.tokenize("בית־דין"), vec!["בית", "דינ"]);
    }

    #[test]
    fn marks_inside_words_do_not_split_tokens() {
        let n = normalizer();
        assert_eq!(n.tokenize("תּוֹרָה"), vec!["תורה"]);
    }

    #[test]
    fn case_folds_latin() {
        let n = normalizer();
        assert_eq!(n.tokenize("Beth-Din 1994"), vec!["beth", "din", "1994"]);
    }

    #[test]
    fn text_without_line_breaks_is_one_line() {
        let lines: Vec<&str> = TextNormalizer::split_lines("שור שנגח את הפרה").collect();
        assert_eq!(lines.len(), 1);
    }
}
