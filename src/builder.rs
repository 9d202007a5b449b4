//! # Index Builder / Maintainer Module
//!
//! ## Purpose
//! Builds the inverted index from the document store, decides when a rebuild
//! is required, and publishes fresh snapshots without ever exposing a
//! half-built index to readers.
//!
//! ## Input/Output Specification
//! - **Input**: The full document corpus and the persisted index, if any
//! - **Output**: Complete `InvertedIndex` snapshots, staleness verdicts
//! - **Failure policy**: A failed rebuild keeps the last good snapshot
//!   serving and reports degraded mode; persistence writes are best-effort
//!
//! ## Key Features
//! - Parallel per-document tokenization (rayon), deterministic merge
//! - Staleness detection: schema mismatch, corpus drift, freshness window
//! - Replace-on-rebuild snapshot discipline

use crate::config::{IndexConfig, TextProcessingConfig};
use crate::errors::Result;
use crate::index::{InvertedIndex, SCHEMA_VERSION};
use crate::storage::Storage;
use crate::text_processing::TextNormalizer;
use crate::utils::TextUtils;
use crate::{CorpusFingerprint, Document, DocumentId, DocumentSummary};
use chrono::{Duration, Utc};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

/// Why an index was judged stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StalenessReason {
    /// Persisted schema differs from the builder's current schema
    SchemaMismatch { found: u32, expected: u32 },
    /// Corpus count or last-modified differs from what produced the index
    CorpusDrift,
    /// The index predates the configured freshness window
    Expired { age_hours: i64 },
}

impl std::fmt::Display for StalenessReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StalenessReason::SchemaMismatch { found, expected } => {
                write!(f, "schema version {} (expected {})", found, expected)
            }
            StalenessReason::CorpusDrift => write!(f, "corpus changed since last build"),
            StalenessReason::Expired { age_hours } => {
                write!(f, "index is {}h old", age_hours)
            }
        }
    }
}

/// Builds inverted indices from documents.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    normalizer: TextNormalizer,
    freshness_window: Duration,
}

impl IndexBuilder {
    pub fn new(text_config: TextProcessingConfig, index_config: &IndexConfig) -> Self {
        Self {
            normalizer: TextNormalizer::new(text_config),
            freshness_window: Duration::hours(index_config.max_age_hours),
        }
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// Build a complete index from the given documents. Title and full text
    /// are both indexed; documents arriving without a summary get one
    /// derived from the opening words of the full text.
    pub fn build(&self, documents: &[Document], fingerprint: CorpusFingerprint) -> InvertedIndex {
        let timer = crate::utils::Timer::new("index_build");

        let per_document: Vec<(DocumentId, HashSet<String>, usize, DocumentSummary)> = documents
            .par_iter()
            .map(|doc| {
                let mut tokens = self.normalizer.tokenize(&doc.full_text);
                tokens.extend(self.normalizer.tokenize(&doc.title));
                let token_count = tokens.len();
                let distinct: HashSet<String> = tokens.into_iter().collect();

                let mut summary = DocumentSummary::of(doc);
                if summary.summary.is_empty() {
                    summary.summary = TextUtils::extract_preview(&doc.full_text, 30);
                }

                (doc.id.clone(), distinct, token_count, summary)
            })
            .collect();

        let mut index = InvertedIndex::empty();
        index.corpus_fingerprint = fingerprint;

        for (id, words, token_count, summary) in per_document {
            index.total_words += token_count;
            for word in words {
                index
                    .word_to_document_ids
                    .entry(word)
                    .or_default()
                    .insert(id.clone());
            }
            index.document_summaries.insert(id, summary);
        }

        index.last_updated = Utc::now();
        index.schema_version = SCHEMA_VERSION;

        debug_assert!(index.is_consistent());

        tracing::info!(
            documents = index.document_count(),
            vocabulary = index.vocabulary_size(),
            total_words = index.total_words,
            elapsed_ms = timer.elapsed_ms(),
            "Built inverted index"
        );

        index
    }

    /// Judge whether the index still reflects the corpus. Returns the first
    /// staleness reason found, or `None` when the index is fresh.
    pub fn is_stale(
        &self,
        index: &InvertedIndex,
        fingerprint: &CorpusFingerprint,
    ) -> Option<StalenessReason> {
        if index.schema_version != SCHEMA_VERSION {
            return Some(StalenessReason::SchemaMismatch {
                found: index.schema_version,
                expected: SCHEMA_VERSION,
            });
        }

        if index.corpus_fingerprint != *fingerprint {
            return Some(StalenessReason::CorpusDrift);
        }

        let age = Utc::now() - index.last_updated;
        if age > self.freshness_window {
            return Some(StalenessReason::Expired {
                age_hours: age.num_hours(),
            });
        }

        None
    }
}

/// Owns the rebuild path: reads the corpus, builds off to the side, persists
/// best-effort, and hands back the snapshot to publish.
pub struct IndexMaintainer {
    builder: IndexBuilder,
    storage: Arc<Storage>,
}

/// Outcome of a freshness check: the snapshot to serve and whether the
/// engine is running degraded (serving stale or empty data after a failure).
pub struct FreshIndex {
    pub index: Arc<InvertedIndex>,
    pub degraded: bool,
    pub rebuilt: bool,
}

impl IndexMaintainer {
    pub fn new(builder: IndexBuilder, storage: Arc<Storage>) -> Self {
        Self { builder, storage }
    }

    /// Return the current snapshot unchanged when fresh; otherwise rebuild
    /// from the document store and persist before publishing. On failure the
    /// previous snapshot keeps serving and the outcome is flagged degraded.
    pub async fn ensure_fresh(&self, current: Option<Arc<InvertedIndex>>) -> FreshIndex {
        let fingerprint = match self.storage.corpus_fingerprint().await {
            Ok(fp) => fp,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot read corpus fingerprint, serving last good index");
                return FreshIndex {
                    index: current.unwrap_or_else(|| Arc::new(InvertedIndex::empty())),
                    degraded: true,
                    rebuilt: false,
                };
            }
        };

        if let Some(ref index) = current {
            match self.builder.is_stale(index, &fingerprint) {
                None => {
                    return FreshIndex {
                        index: Arc::clone(index),
                        degraded: false,
                        rebuilt: false,
                    }
                }
                Some(reason) => {
                    tracing::info!(%reason, "Index is stale, rebuilding");
                }
            }
        }

        match self.rebuild(fingerprint).await {
            Ok(index) => FreshIndex {
                index,
                degraded: false,
                rebuilt: true,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Index rebuild failed, serving last good index");
                FreshIndex {
                    index: current.unwrap_or_else(|| Arc::new(InvertedIndex::empty())),
                    degraded: true,
                    rebuilt: false,
                }
            }
        }
    }

    /// Rebuild unconditionally from the document store. The new index is
    /// persisted to the inactive slot before being returned; a persistence
    /// failure downgrades to in-memory operation for the session.
    pub async fn rebuild(&self, fingerprint: CorpusFingerprint) -> Result<Arc<InvertedIndex>> {
        let documents = self.storage.all_documents().await?;
        let index = self.builder.build(&documents, fingerprint);

        if let Err(e) = self.storage.save_index(&index).await {
            tracing::warn!(error = %e, "Index persistence failed, continuing in-memory");
        }

        Ok(Arc::new(index))
    }
}
