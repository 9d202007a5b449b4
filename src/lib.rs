//! # Psak Din Search Engine
//!
//! ## Overview
//! This library implements a full-text search engine for rabbinical court
//! rulings (piskei din) combining inverted-index retrieval with structured
//! metadata conditions and line-level context extraction.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `corpus`: Document ingestion from local files and upstream providers
//! - `text_processing`: Tokenization, Hebrew normalization, line splitting
//! - `index`: Inverted index mapping normalized words to document ids
//! - `builder`: Index construction, staleness detection and refresh
//! - `query`: Free-text and condition evaluation over the index
//! - `context`: Match-line extraction and highlighting
//! - `search`: Search engine assembling ranked results
//! - `api`: REST API endpoints
//! - `share`: Encoded share-link search state
//! - `storage`: Persistent document store and index slots
//! - `config`: Configuration management and settings
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Ruling documents (JSON), free-text queries, filter rules
//! - **Output**: Ranked search results with per-line context and highlights
//! - **Performance**: Snapshot reads without locking, deterministic results
//!
//! ## Usage
//! ```rust,no_run
//! use psak_search::{Config, SearchEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config.toml")?;
//!     let engine = SearchEngine::open(config).await?;
//!     let outcome = engine.search(Some("שור שנגח"), None).await?;
//!     println!("Found {} results", outcome.results.len());
//!     Ok(())
//! }
//! ```

// Core modules
pub mod builder;
pub mod config;
pub mod context;
pub mod corpus;
pub mod errors;
pub mod index;
pub mod query;
pub mod search;
pub mod share;
pub mod storage;
pub mod text_processing;

// API surface
pub mod api;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use errors::{Result, SearchError};
pub use query::{Combinator, FilterRules, SearchCondition};
pub use search::{SearchEngine, SearchOutcome, SearchResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Unique identifier for ruling documents. Ids come from the corpus; rulings
/// ingested without one are assigned a UUID v4 string.
pub type DocumentId = String;

/// A single ruling document. Immutable once stored; the corpus is replaced
/// wholesale on refresh, never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier
    #[serde(default)]
    pub id: DocumentId,
    /// Ruling title
    pub title: String,
    /// Court that issued the ruling
    pub court: String,
    /// Year the ruling was issued
    pub year: i32,
    /// Full text of the ruling
    pub full_text: String,
    /// Editorial summary
    #[serde(default)]
    pub summary: String,
}

/// Metadata echo stored inside the index so condition evaluation and result
/// assembly never touch the full text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub title: String,
    pub court: String,
    pub year: i32,
    pub summary: String,
}

impl DocumentSummary {
    pub fn of(doc: &Document) -> Self {
        Self {
            title: doc.title.clone(),
            court: doc.court.clone(),
            year: doc.year,
            summary: doc.summary.clone(),
        }
    }
}

/// Comparable snapshot of corpus state, used for index staleness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusFingerprint {
    /// Number of documents in the corpus
    pub document_count: usize,
    /// When the corpus was last replaced
    pub last_modified: DateTime<Utc>,
}

impl CorpusFingerprint {
    pub fn empty() -> Self {
        Self {
            document_count: 0,
            last_modified: DateTime::<Utc>::MIN_UTC,
        }
    }
}

/// Application state shared across API handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub engine: Arc<search::SearchEngine>,
}
