//! # Utilities Module
//!
//! ## Purpose
//! Small helpers shared across the engine: operation timing and text
//! preview/truncation used when deriving summaries and logging queries.

use std::time::Instant;

/// Performance timer for measuring operation duration
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    /// Start a new timer with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Stop timer and log duration
    pub fn stop(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::debug!("Timer '{}' completed in {}ms", self.name, elapsed);
        elapsed
    }
}

/// Text processing utilities
pub struct TextUtils;

impl TextUtils {
    /// Truncate text to a maximum character count with ellipsis
    pub fn truncate(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            text.to_string()
        } else {
            let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{}...", cut)
        }
    }

    /// Extract a preview of the opening words of longer content
    pub fn extract_preview(text: &str, max_words: usize) -> String {
        let words: Vec<&str> = text.split_whitespace().take(max_words).collect();
        let preview = words.join(" ");

        if words.len() >= max_words {
            format!("{}...", preview)
        } else {
            preview
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(TextUtils::truncate("שלום עולם", 20), "שלום עולם");
        assert_eq!(TextUtils::truncate("שור שנגח את הפרה", 10), "שור שנג...");
    }

    #[test]
    fn preview_takes_opening_words() {
        assert_eq!(
            TextUtils::extract_preview("שור שנגח את הפרה", 2),
            "שור שנגח..."
        );
        assert_eq!(TextUtils::extract_preview("שור", 5), "שור");
    }
}
