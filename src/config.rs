//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration management for the psak din search engine,
//! supporting TOML files and environment variable overrides with validation
//! and type-safe access to all system settings.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Type checking, range validation, dependency verification
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (highest priority)
//! 2. Configuration files
//! 3. Default values (lowest priority)
//!
//! ## Usage
//! ```rust,no_run
//! use psak_search::config::Config;
//!
//! let config = Config::from_file("config.toml").unwrap();
//! println!("Server port: {}", config.server.port);
//! ```

use crate::errors::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server and API configuration
    pub server: ServerConfig,
    /// Corpus ingestion settings
    pub corpus: CorpusConfig,
    /// Text normalization configuration
    pub text_processing: TextProcessingConfig,
    /// Index freshness configuration
    pub index: IndexConfig,
    /// Search behavior
    pub search: SearchEngineConfig,
    /// Storage and database settings
    pub storage: StorageConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Performance tuning
    pub performance: PerformanceConfig,
}

/// Server and API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Maximum request payload size in MB
    pub max_payload_size_mb: u32,
    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Corpus ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Local corpus file (JSON array of documents)
    pub corpus_file: Option<PathBuf>,
    /// Remote corpus endpoint returning the same JSON shape
    pub corpus_url: Option<String>,
    /// Minimum full-text length accepted at ingestion
    pub min_text_length: usize,
    /// Maximum full-text length accepted at ingestion
    pub max_text_length: usize,
}

/// Text normalization configuration. Build-time and query-time normalization
/// share these settings; diverging them silently degrades recall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextProcessingConfig {
    /// Enable case folding (lowercase conversion)
    pub enable_case_folding: bool,
    /// Strip Hebrew vowel points and cantillation marks
    pub strip_diacritics: bool,
    /// Fold Hebrew final letters to their medial forms
    pub fold_final_letters: bool,
}

/// Index freshness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Rebuild when the persisted index is older than this many hours
    pub max_age_hours: i64,
    /// Force a rebuild at engine startup regardless of staleness
    pub rebuild_on_start: bool,
}

/// Search engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEngineConfig {
    /// Default maximum number of results
    pub default_max_results: usize,
    /// Minimum query length in characters
    pub min_query_length: usize,
    /// Maximum query length in characters
    pub max_query_length: usize,
    /// Maximum match records extracted per document
    pub max_matches_per_document: usize,
}

/// Storage and database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file path
    pub db_path: PathBuf,
    /// Enable compression of stored document blobs
    pub enable_compression: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

/// Performance tuning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Number of worker threads for async runtime
    pub worker_threads: usize,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| SearchError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("PSAK_SEARCH_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PSAK_SEARCH_PORT") {
            self.server.port = port.parse().map_err(|_| SearchError::Config {
                message: "Invalid port number in PSAK_SEARCH_PORT".to_string(),
            })?;
        }
        if let Ok(db_path) = std::env::var("PSAK_SEARCH_DB_PATH") {
            self.storage.db_path = PathBuf::from(db_path);
        }
        if let Ok(corpus_file) = std::env::var("PSAK_SEARCH_CORPUS_FILE") {
            self.corpus.corpus_file = Some(PathBuf::from(corpus_file));
        }
        if let Ok(level) = std::env::var("PSAK_SEARCH_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(SearchError::ValidationFailed {
                field: "server.port".to_string(),
                reason: "Port cannot be zero".to_string(),
            });
        }

        if self.search.min_query_length > self.search.max_query_length {
            return Err(SearchError::ValidationFailed {
                field: "search.min_query_length".to_string(),
                reason: "Minimum query length cannot be greater than maximum".to_string(),
            });
        }

        if self.corpus.min_text_length > self.corpus.max_text_length {
            return Err(SearchError::ValidationFailed {
                field: "corpus.min_text_length".to_string(),
                reason: "Minimum text length cannot be greater than maximum".to_string(),
            });
        }

        if self.index.max_age_hours <= 0 {
            return Err(SearchError::ValidationFailed {
                field: "index.max_age_hours".to_string(),
                reason: "Freshness window must be positive".to_string(),
            });
        }

        Ok(())
    }

    /// Get configuration as TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SearchError::Config {
            message: format!("Failed to serialize config to TOML: {}", e),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_payload_size_mb: 10,
                request_timeout_seconds: 30,
            },
            corpus: CorpusConfig {
                corpus_file: Some(PathBuf::from("./data/corpus.json")),
                corpus_url: None,
                min_text_length: 1,
                max_text_length: 1_000_000,
            },
            text_processing: TextProcessingConfig {
                enable_case_folding: true,
                strip_diacritics: true,
                fold_final_letters: true,
            },
            index: IndexConfig {
                max_age_hours: 24,
                rebuild_on_start: false,
            },
            search: SearchEngineConfig {
                default_max_results: 50,
                min_query_length: 1,
                max_query_length: 1000,
                max_matches_per_document: 20,
            },
            storage: StorageConfig {
                db_path: PathBuf::from("./data/psak_search.db"),
                enable_compression: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json_format: false,
            },
            performance: PerformanceConfig {
                worker_threads: num_cpus::get(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_query_bounds() {
        let mut config = Config::default();
        config.search.min_query_length = 100;
        config.search.max_query_length = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.index.max_age_hours, config.index.max_age_hours);
    }
}
