//! # Inverted Index Module
//!
//! ## Purpose
//! The inverted index data structure: a hash mapping from normalized word to
//! the set of document ids containing it, together with the metadata echo
//! needed to answer condition queries without touching full text.
//!
//! ## Input/Output Specification
//! - **Input**: Normalized (word, document id) pairs at build time
//! - **Output**: O(1) average posting-set lookups at query time
//! - **Mutation**: Construction only; the engine swaps whole snapshots
//!
//! Readers hold an `Arc<InvertedIndex>` snapshot for the duration of a
//! query and never observe a half-built index.

use crate::{CorpusFingerprint, DocumentId, DocumentSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Current index schema version. A persisted index with any other version is
/// stale and must be rebuilt before use.
pub const SCHEMA_VERSION: u32 = 2;

/// Inverted index over the ruling corpus.
///
/// Invariant: every document id appearing in `word_to_document_ids` has a
/// corresponding entry in `document_summaries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvertedIndex {
    /// Normalized word → ids of documents containing it
    pub word_to_document_ids: HashMap<String, HashSet<DocumentId>>,
    /// Document id → metadata echo for condition evaluation
    pub document_summaries: HashMap<DocumentId, DocumentSummary>,
    /// Total token count across the corpus at build time
    pub total_words: usize,
    /// When this index was built
    pub last_updated: DateTime<Utc>,
    /// Schema version this index was built with
    pub schema_version: u32,
    /// Corpus state this index was built from
    pub corpus_fingerprint: CorpusFingerprint,
}

impl InvertedIndex {
    /// An empty index carrying the current schema version.
    pub fn empty() -> Self {
        Self {
            word_to_document_ids: HashMap::new(),
            document_summaries: HashMap::new(),
            total_words: 0,
            last_updated: Utc::now(),
            schema_version: SCHEMA_VERSION,
            corpus_fingerprint: CorpusFingerprint::empty(),
        }
    }

    /// Posting set for a normalized word. O(1) average.
    pub fn postings(&self, word: &str) -> Option<&HashSet<DocumentId>> {
        self.word_to_document_ids.get(word)
    }

    /// Metadata echo for a document id.
    pub fn summary(&self, id: &str) -> Option<&DocumentSummary> {
        self.document_summaries.get(id)
    }

    /// Number of indexed documents.
    pub fn document_count(&self) -> usize {
        self.document_summaries.len()
    }

    /// Number of distinct normalized words.
    pub fn vocabulary_size(&self) -> usize {
        self.word_to_document_ids.len()
    }

    /// Content equality ignoring the build timestamp. Rebuilding from an
    /// unchanged corpus twice must produce content-equal indices.
    pub fn content_equal(&self, other: &InvertedIndex) -> bool {
        self.schema_version == other.schema_version
            && self.total_words == other.total_words
            && self.word_to_document_ids == other.word_to_document_ids
            && self.document_summaries == other.document_summaries
    }

    /// Check the posting/summary invariant. Used by tests and the builder's
    /// post-build verification.
    pub fn is_consistent(&self) -> bool {
        self.word_to_document_ids
            .values()
            .flatten()
            .all(|id| self.document_summaries.contains_key(id))
    }
}

/// Index statistics reported by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub vocabulary_size: usize,
    pub total_words: usize,
    pub last_updated: DateTime<Utc>,
    pub schema_version: u32,
}

impl IndexStats {
    pub fn of(index: &InvertedIndex) -> Self {
        Self {
            document_count: index.document_count(),
            vocabulary_size: index.vocabulary_size(),
            total_words: index.total_words,
            last_updated: index.last_updated,
            schema_version: index.schema_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_summary() -> DocumentSummary {
        DocumentSummary {
            title: "שור שנגח".to_string(),
            court: "בית דין ירושלים".to_string(),
            year: 2015,
            summary: String::new(),
        }
    }

    #[test]
    fn empty_index_is_consistent() {
        let index = InvertedIndex::empty();
        assert!(index.is_consistent());
        assert_eq!(index.document_count(), 0);
        assert!(index.postings("שור").is_none());
    }

    #[test]
    fn consistency_detects_orphaned_postings() {
        let mut index = InvertedIndex::empty();
        index
            .word_to_document_ids
            .entry("שור".to_string())
            .or_default()
            .insert("1".to_string());
        assert!(!index.is_consistent());

        index
            .document_summaries
            .insert("1".to_string(), sample_summary());
        assert!(index.is_consistent());
    }

    #[test]
    fn content_equality_ignores_timestamp() {
        let mut a = InvertedIndex::empty();
        a.word_to_document_ids
            .entry("שור".to_string())
            .or_default()
            .insert("1".to_string());
        a.document_summaries
            .insert("1".to_string(), sample_summary());

        let mut b = a.clone();
        b.last_updated = b.last_updated + chrono::Duration::hours(5);
        assert!(a.content_equal(&b));

        b.word_to_document_ids
            .entry("פרה".to_string())
            .or_default()
            .insert("1".to_string());
        assert!(!a.content_equal(&b));
    }
}
