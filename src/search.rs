//! # Search Engine Module
//!
//! ## Purpose
//! The public search surface: keeps the index snapshot fresh, evaluates
//! queries, extracts per-line context, and assembles the final ranked
//! result list consumed by the UI layer.
//!
//! ## Input/Output Specification
//! - **Input**: Free text and/or filter rules
//! - **Output**: Ordered `SearchResult`s with context and highlights
//! - **Guarantees**: Deterministic order, stable result ids, no unhandled
//!   fault escapes to the caller
//!
//! ## Key Features
//! - Automatic staleness-triggered rebuild before answering
//! - Degraded-mode serving from the last good snapshot
//! - Snapshot reads: queries run lock-free over one `Arc<InvertedIndex>`

use crate::builder::{IndexBuilder, IndexMaintainer};
use crate::config::Config;
use crate::context::{ContextExtractor, MatchRecord};
use crate::errors::{Result, SearchError};
use crate::index::{IndexStats, InvertedIndex};
use crate::query::{FilterRules, QueryEvaluator};
use crate::storage::Storage;
use crate::text_processing::TextNormalizer;
use crate::DocumentId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A single ranked search result. Created fresh per query and never
/// persisted by the engine; `id` is stable so an external bookmark store
/// can deduplicate, and `matches` is immutable for a given execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: DocumentId,
    pub title: String,
    pub court: String,
    pub year: i32,
    pub score: f32,
    pub matches: Vec<MatchRecord>,
}

/// Outcome of one search call. `degraded` is set when the engine answered
/// from a stale or empty snapshot after a rebuild failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub degraded: bool,
    pub total_candidates: usize,
}

/// Engine statistics reported by the API layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub index: IndexStats,
    pub stored_documents: usize,
}

/// Main search engine.
pub struct SearchEngine {
    config: Arc<Config>,
    storage: Arc<Storage>,
    maintainer: IndexMaintainer,
    normalizer: TextNormalizer,
    snapshot: RwLock<Option<Arc<InvertedIndex>>>,
}

impl SearchEngine {
    /// Create an engine over an already-open storage. Loads the persisted
    /// index when present; rebuilds eagerly when configured to.
    pub async fn new(config: Arc<Config>, storage: Arc<Storage>) -> Result<Self> {
        let builder = IndexBuilder::new(config.text_processing.clone(), &config.index);
        let normalizer = builder.normalizer().clone();
        let maintainer = IndexMaintainer::new(builder, Arc::clone(&storage));

        let persisted = storage.load_index().await?.map(Arc::new);
        if let Some(ref index) = persisted {
            tracing::info!(
                documents = index.document_count(),
                schema = index.schema_version,
                "Loaded persisted index"
            );
        }

        let engine = Self {
            config,
            storage,
            maintainer,
            normalizer,
            snapshot: RwLock::new(persisted),
        };

        if engine.config.index.rebuild_on_start {
            engine.rebuild_index().await?;
        }

        Ok(engine)
    }

    /// Convenience constructor: open storage from configuration.
    pub async fn open(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let storage = Arc::new(Storage::open(config.storage.clone()).await?);
        Self::new(config, storage).await
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// Execute a search. Empty free text and empty rules yield an empty
    /// outcome; the engine never returns the whole corpus implicitly. Use
    /// [`SearchEngine::list_all`] for that.
    pub async fn search(
        &self,
        free_text: Option<&str>,
        filter_rules: Option<&FilterRules>,
    ) -> Result<SearchOutcome> {
        let free_text = free_text.map(str::trim).filter(|t| !t.is_empty());

        if let Some(text) = free_text {
            let length = text.chars().count();
            if length > self.config.search.max_query_length {
                return Err(SearchError::InvalidSearchQuery {
                    reason: format!(
                        "query too long: maximum {} characters",
                        self.config.search.max_query_length
                    ),
                });
            }
            if length < self.config.search.min_query_length {
                return Err(SearchError::InvalidSearchQuery {
                    reason: format!(
                        "query too short: minimum {} characters",
                        self.config.search.min_query_length
                    ),
                });
            }
        }

        let (index, degraded) = self.fresh_snapshot().await;

        if free_text.is_none() && filter_rules.is_none() {
            return Ok(SearchOutcome {
                results: Vec::new(),
                degraded,
                total_candidates: 0,
            });
        }

        let evaluator = QueryEvaluator::new(&index, &self.normalizer);
        let candidates = evaluator.evaluate(free_text, filter_rules);
        let total_candidates = candidates.len();

        let query_words = free_text
            .map(|t| evaluator.query_words(t))
            .unwrap_or_default();

        let extractor = ContextExtractor::new(
            &self.normalizer,
            self.config.search.max_matches_per_document,
        );

        let mut results = Vec::with_capacity(candidates.len().min(self.config.search.default_max_results));
        for candidate in candidates
            .into_iter()
            .take(self.config.search.default_max_results)
        {
            let summary = match index.summary(&candidate.id) {
                Some(summary) => summary,
                None => {
                    tracing::warn!(id = %candidate.id, "Candidate missing from index summaries, skipping");
                    continue;
                }
            };

            // Metadata-only hits legitimately carry no match lines; the
            // presentation layer decides how to render an empty list.
            let matches = match self.storage.get_document(&candidate.id).await? {
                Some(document) => extractor.extract_matches(&document, &query_words),
                None => {
                    tracing::warn!(id = %candidate.id, "Indexed document absent from store");
                    Vec::new()
                }
            };

            results.push(SearchResult {
                id: candidate.id,
                title: summary.title.clone(),
                court: summary.court.clone(),
                year: summary.year,
                score: candidate.score,
                matches,
            });
        }

        Ok(SearchOutcome {
            results,
            degraded,
            total_candidates,
        })
    }

    /// Explicit unscored listing of the whole corpus, ordered by id. This is
    /// the only way to obtain "all documents" through the search surface.
    pub async fn list_all(&self) -> Result<Vec<SearchResult>> {
        let (index, _) = self.fresh_snapshot().await;

        let mut results: Vec<SearchResult> = index
            .document_summaries
            .iter()
            .map(|(id, summary)| SearchResult {
                id: id.clone(),
                title: summary.title.clone(),
                court: summary.court.clone(),
                year: summary.year,
                score: 0.0,
                matches: Vec::new(),
            })
            .collect();

        results.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(results)
    }

    /// Force a rebuild from the document store and publish the new snapshot.
    pub async fn rebuild_index(&self) -> Result<IndexStats> {
        let fingerprint = self.storage.corpus_fingerprint().await?;
        let index = self.maintainer.rebuild(fingerprint).await?;
        let stats = IndexStats::of(&index);
        *self.snapshot.write().await = Some(index);
        Ok(stats)
    }

    /// Engine statistics for the stats endpoint.
    pub async fn stats(&self) -> Result<EngineStats> {
        let (index, _) = self.fresh_snapshot().await;
        Ok(EngineStats {
            index: IndexStats::of(&index),
            stored_documents: self.storage.document_count(),
        })
    }

    /// Health check for the search path.
    pub async fn health_check(&self) -> Result<()> {
        self.storage.health_check().await
    }

    /// Current snapshot, rebuilt first when stale. Queries keep the returned
    /// `Arc` for their whole duration; a concurrent rebuild swaps the slot
    /// without disturbing them.
    async fn fresh_snapshot(&self) -> (Arc<InvertedIndex>, bool) {
        let current = self.snapshot.read().await.clone();
        let fresh = self.maintainer.ensure_fresh(current).await;

        if fresh.rebuilt {
            *self.snapshot.write().await = Some(Arc::clone(&fresh.index));
        }

        (fresh.index, fresh.degraded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;
    use tempfile::TempDir;

    fn doc(id: &str, year: i32, text: &str) -> Document {
        Document {
            id: id.to_string(),
            title: format!("פסק דין {}", id),
            court: "בית דין ירושלים".to_string(),
            year,
            full_text: text.to_string(),
            summary: String::new(),
        }
    }

    async fn engine_with(docs: Vec<Document>) -> (SearchEngine, TempDir) {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.db_path = dir.path().join("engine.db");

        let engine = SearchEngine::open(config).await.unwrap();
        engine.storage().replace_corpus(docs).await.unwrap();
        (engine, dir)
    }

    #[tokio::test]
    async fn free_text_search_returns_context() {
        let (engine, _dir) = engine_with(vec![doc("1", 2015, "שור שנגח את הפרה")]).await;

        let outcome = engine.search(Some("שור"), None).await.unwrap();
        assert!(!outcome.degraded);
        assert_eq!(outcome.results.len(), 1);

        let result = &outcome.results[0];
        assert_eq!(result.id, "1");
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].matched_line, "שור שנגח את הפרה");
        assert!(result.matches[0]
            .highlighted_line
            .contains("<mark>שור</mark>"));
    }

    #[tokio::test]
    async fn empty_query_returns_empty_outcome() {
        let (engine, _dir) = engine_with(vec![doc("1", 2015, "שור שנגח את הפרה")]).await;

        let outcome = engine.search(None, None).await.unwrap();
        assert!(outcome.results.is_empty());

        let outcome = engine.search(Some("   "), None).await.unwrap();
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn list_all_is_the_explicit_pass_through() {
        let (engine, _dir) = engine_with(vec![
            doc("2", 2018, "חמור שנגח חמור"),
            doc("1", 2015, "שור שנגח את הפרה"),
        ])
        .await;

        let all = engine.list_all().await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(all.iter().all(|r| r.score == 0.0 && r.matches.is_empty()));
    }

    #[tokio::test]
    async fn corpus_update_reflected_after_replace() {
        let (engine, _dir) = engine_with(vec![doc("1", 2015, "שור שנגח את הפרה")]).await;

        // First query builds an index over the original corpus
        assert_eq!(engine.search(Some("שור"), None).await.unwrap().results.len(), 1);

        // Replacing the corpus drifts the fingerprint; the next query must
        // answer from a rebuilt index
        engine
            .storage()
            .replace_corpus(vec![doc("9", 2020, "גמל שנשך את הסוס")])
            .await
            .unwrap();

        let stale = engine.search(Some("שור"), None).await.unwrap();
        assert!(stale.results.is_empty());

        let fresh = engine.search(Some("גמל"), None).await.unwrap();
        assert_eq!(fresh.results.len(), 1);
        assert_eq!(fresh.results[0].id, "9");
    }

    #[tokio::test]
    async fn repeated_searches_are_deterministic() {
        let (engine, _dir) = engine_with(vec![
            doc("1", 2015, "שור פרה בשדה"),
            doc("2", 2015, "שור פרה בחצר"),
            doc("3", 2018, "שור פרה ברחוב"),
        ])
        .await;

        let first = engine.search(Some("שור פרה"), None).await.unwrap();
        let second = engine.search(Some("שור פרה"), None).await.unwrap();

        let order = |o: &SearchOutcome| o.results.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
        assert_eq!(order(&first), order(&second));
        assert_eq!(order(&first), vec!["3", "1", "2"]);
    }

    #[tokio::test]
    async fn overlong_query_is_a_typed_failure() {
        let (engine, _dir) = engine_with(vec![doc("1", 2015, "שור")]).await;
        let long = "א".repeat(5000);
        assert!(matches!(
            engine.search(Some(&long), None).await,
            Err(SearchError::InvalidSearchQuery { .. })
        ));
    }
}
