//! # Corpus Ingestion Module
//!
//! ## Purpose
//! Loads the ruling corpus into the document store from local files or an
//! upstream provider, with validation and wholesale replacement semantics.
//!
//! ## Input/Output Specification
//! - **Input**: JSON arrays of ruling documents (file or HTTP endpoint)
//! - **Output**: A validated corpus replacing the stored one atomically
//! - **Failure**: Upstream errors carry the HTTP status and are never
//!   retried here; retry policy belongs to the caller
//!
//! ## Key Features
//! - Unified `DocumentSource` interface over files and HTTP
//! - Concurrent multi-source fetch
//! - Text-length validation and id assignment for incoming rulings

use crate::config::CorpusConfig;
use crate::errors::{Result, SearchError};
use crate::storage::Storage;
use crate::Document;
use async_trait::async_trait;
use std::path::PathBuf;

/// A source of ruling documents.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Human-readable source name for logs and errors
    fn name(&self) -> &str;

    /// Fetch the complete document set from this source
    async fn fetch_documents(&self) -> Result<Vec<Document>>;
}

/// Local JSON file containing an array of documents.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentSource for JsonFileSource {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn fetch_documents(&self) -> Result<Vec<Document>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SearchError::UpstreamFailed {
                source_name: self.name().to_string(),
                details: format!("cannot read {:?}: {}", self.path, e),
                status: None,
            }
        })?;

        Ok(serde_json::from_str(&content)?)
    }
}

/// Remote endpoint returning the same JSON array shape.
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_documents(&self) -> Result<Vec<Document>> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            SearchError::UpstreamFailed {
                source_name: self.name().to_string(),
                details: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::UpstreamFailed {
                source_name: self.name().to_string(),
                details: format!("GET {} returned {}", self.url, status),
                status: Some(status.as_u16()),
            });
        }

        Ok(response.json().await?)
    }
}

/// Loads, validates and installs a corpus.
pub struct CorpusLoader {
    config: CorpusConfig,
}

impl CorpusLoader {
    pub fn new(config: CorpusConfig) -> Self {
        Self { config }
    }

    /// Fetch from every configured source concurrently and replace the
    /// stored corpus with the combined, validated result.
    pub async fn load_configured(&self, storage: &Storage) -> Result<usize> {
        let mut sources: Vec<Box<dyn DocumentSource>> = Vec::new();
        if let Some(ref path) = self.config.corpus_file {
            sources.push(Box::new(JsonFileSource::new(path.clone())));
        }
        if let Some(ref url) = self.config.corpus_url {
            sources.push(Box::new(HttpSource::new(url.clone())));
        }

        if sources.is_empty() {
            return Err(SearchError::Config {
                message: "no corpus source configured".to_string(),
            });
        }

        let fetched = futures::future::try_join_all(
            sources.iter().map(|source| source.fetch_documents()),
        )
        .await?;

        let documents: Vec<Document> = fetched.into_iter().flatten().collect();
        self.install(documents, storage).await
    }

    /// Load from one explicit source.
    pub async fn load_from(&self, source: &dyn DocumentSource, storage: &Storage) -> Result<usize> {
        let documents = source.fetch_documents().await?;
        self.install(documents, storage).await
    }

    async fn install(&self, documents: Vec<Document>, storage: &Storage) -> Result<usize> {
        let total = documents.len();
        let accepted = self.prepare(documents);
        let rejected = total - accepted.len();
        if rejected > 0 {
            tracing::warn!(rejected, "Dropped rulings failing validation");
        }

        let count = accepted.len();
        storage.replace_corpus(accepted).await?;

        tracing::info!(documents = count, "Corpus loaded");
        Ok(count)
    }

    /// Validate text-length bounds and assign ids to rulings arriving
    /// without one.
    fn prepare(&self, documents: Vec<Document>) -> Vec<Document> {
        documents
            .into_iter()
            .filter(|doc| {
                let len = doc.full_text.chars().count();
                if len < self.config.min_text_length || len > self.config.max_text_length {
                    tracing::debug!(id = %doc.id, length = len, "Ruling text length out of bounds");
                    return false;
                }
                true
            })
            .map(|mut doc| {
                if doc.id.is_empty() {
                    doc.id = uuid::Uuid::new_v4().to_string();
                }
                doc
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn loader() -> CorpusLoader {
        CorpusLoader::new(Config::default().corpus)
    }

    #[tokio::test]
    async fn json_file_source_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.json");
        let json = serde_json::json!([
            {
                "id": "1",
                "title": "שור שנגח את הפרה",
                "court": "בית דין ירושלים",
                "year": 2015,
                "full_text": "שור שנגח את הפרה",
                "summary": ""
            }
        ]);
        std::fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

        let source = JsonFileSource::new(path);
        let documents = source.fetch_documents().await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "1");
    }

    #[tokio::test]
    async fn missing_file_is_an_upstream_failure() {
        let source = JsonFileSource::new("/nonexistent/corpus.json");
        assert!(matches!(
            source.fetch_documents().await,
            Err(SearchError::UpstreamFailed { .. })
        ));
    }

    #[test]
    fn prepare_assigns_ids_and_filters_empty_text() {
        let documents = vec![
            Document {
                id: String::new(),
                title: "ללא מזהה".to_string(),
                court: "בית דין חיפה".to_string(),
                year: 2018,
                full_text: "חמור שנגח חמור".to_string(),
                summary: String::new(),
            },
            Document {
                id: "empty".to_string(),
                title: "ריק".to_string(),
                court: "בית דין חיפה".to_string(),
                year: 2018,
                full_text: String::new(),
                summary: String::new(),
            },
        ];

        let prepared = loader().prepare(documents);
        assert_eq!(prepared.len(), 1);
        assert!(!prepared[0].id.is_empty());
    }

    #[tokio::test]
    async fn load_from_replaces_stored_corpus() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(crate::config::StorageConfig {
            db_path: dir.path().join("db"),
            enable_compression: false,
        })
        .await
        .unwrap();

        let path = dir.path().join("corpus.json");
        let json = serde_json::json!([
            {"id": "1", "title": "א", "court": "ב", "year": 2000, "full_text": "שור", "summary": ""}
        ]);
        std::fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

        let count = loader()
            .load_from(&JsonFileSource::new(path), &storage)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(storage.document_count(), 1);
    }
}
