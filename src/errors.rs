//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the psak din search engine, providing
//! structured error types and conversion utilities for all system components.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from storage, indexing, query evaluation, API
//! - **Output**: Typed errors with context, recoverability and category hints
//! - **Error Categories**: Corpus, Indexing, Query, Storage, Api, Configuration
//!
//! ## Key Features
//! - Recoverable vs. fatal classification for the search path
//! - Automatic conversion from library error types
//! - Category tags for structured logging
//!
//! No error in this module may escape the public search surface as an
//! unhandled fault: callers receive either a valid (possibly empty) outcome
//! or one of these typed failures.

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, SearchError>;

/// Error types for the psak din search engine
#[derive(Debug, Error)]
pub enum SearchError {
    /// Index schema or corpus state no longer matches the persisted index.
    /// Recoverable: triggers a rebuild.
    #[error("Index is stale: {reason}")]
    IndexStale { reason: String },

    /// Rebuilding the inverted index failed. Recoverable: the engine keeps
    /// serving the last good snapshot if one exists.
    #[error("Index build failed: {reason}")]
    IndexBuildFailed { reason: String },

    /// Unparseable filter rules or condition triples. Treated as "no
    /// condition filter" at the query boundary, never fatal.
    #[error("Malformed query: {details}")]
    MalformedQuery { details: String },

    /// The persistence layer cannot be reached or written. The index
    /// operates in-memory only for the session; writes are best-effort.
    #[error("Persistence unavailable: {details}")]
    PersistenceUnavailable { details: String },

    /// A document id referenced by the index is missing from the store
    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation failed for field '{field}': {reason}")]
    ValidationFailed { field: String, reason: String },

    /// Upstream provider failures, with the upstream status embedded
    #[error("Upstream source '{source_name}' failed: {details}")]
    UpstreamFailed {
        source_name: String,
        details: String,
        status: Option<u16>,
    },

    /// Invalid search query parameters (length bounds, etc.)
    #[error("Invalid search query: {reason}")]
    InvalidSearchQuery { reason: String },

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Binary serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SearchError {
    /// Check if the error is recoverable on the search path (the engine can
    /// answer from a previous snapshot or an empty result instead of failing)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SearchError::IndexStale { .. }
                | SearchError::IndexBuildFailed { .. }
                | SearchError::MalformedQuery { .. }
                | SearchError::PersistenceUnavailable { .. }
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            SearchError::UpstreamFailed { .. } | SearchError::Http(_) => "corpus",
            SearchError::IndexStale { .. } | SearchError::IndexBuildFailed { .. } => "indexing",
            SearchError::MalformedQuery { .. } | SearchError::InvalidSearchQuery { .. } => "query",
            SearchError::PersistenceUnavailable { .. }
            | SearchError::Database(_)
            | SearchError::Serialization(_)
            | SearchError::DocumentNotFound { .. }
            | SearchError::Io(_) => "storage",
            SearchError::Config { .. } | SearchError::Toml(_) => "configuration",
            SearchError::Json(_) => "api",
            SearchError::ValidationFailed { .. } | SearchError::Internal { .. } => "generic",
        }
    }
}

// Helper macro for internal errors with formatted messages
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::errors::SearchError::Internal {
            message: $msg.to_string(),
        }
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::errors::SearchError::Internal {
            message: format!($fmt, $($arg)*),
        }
    };
}
