//! # Storage Management Module
//!
//! ## Purpose
//! Persistent storage for the ruling corpus and the inverted index using an
//! embedded database. The corpus is the source of truth for re-indexing;
//! the index is persisted into alternating slots so a failed write never
//! clobbers the last good copy.
//!
//! ## Input/Output Specification
//! - **Input**: Ruling documents, built index snapshots
//! - **Output**: Corpus reads, fingerprints, persisted index slots
//! - **Storage**: Sled embedded database, bincode blobs, optional gzip
//!
//! ## Key Features
//! - Wholesale corpus replacement (documents are never patched in place)
//! - Two-slot index persistence with a current-slot pointer
//! - Corpus fingerprint (count + last-modified) for staleness checks
//! - Compression for space efficiency

use crate::config::StorageConfig;
use crate::errors::{Result, SearchError};
use crate::index::InvertedIndex;
use crate::{CorpusFingerprint, Document};
use chrono::Utc;

const META_FINGERPRINT: &[u8] = b"corpus_fingerprint";
const INDEX_POINTER: &[u8] = b"current";
const SLOT_A: &[u8] = b"slot_a";
const SLOT_B: &[u8] = b"slot_b";

/// Embedded storage for documents and index slots.
pub struct Storage {
    config: StorageConfig,
    db: sled::Db,
    documents: sled::Tree,
    meta: sled::Tree,
    index_slots: sled::Tree,
}

impl Storage {
    /// Open (or create) the database at the configured path.
    pub async fn open(config: StorageConfig) -> Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let db = sled::open(&config.db_path).map_err(|e| SearchError::PersistenceUnavailable {
            details: format!("cannot open database at {:?}: {}", config.db_path, e),
        })?;

        let documents = db.open_tree("documents")?;
        let meta = db.open_tree("meta")?;
        let index_slots = db.open_tree("index_slots")?;

        tracing::info!(
            path = ?config.db_path,
            documents = documents.len(),
            "Storage opened"
        );

        Ok(Self {
            config,
            db,
            documents,
            meta,
            index_slots,
        })
    }

    /// Replace the whole corpus. Documents are immutable once stored; a
    /// refresh swaps the entire set and advances the fingerprint.
    pub async fn replace_corpus(&self, documents: Vec<Document>) -> Result<CorpusFingerprint> {
        self.documents.clear()?;

        for doc in &documents {
            let blob = self.encode(doc)?;
            self.documents.insert(doc.id.as_bytes(), blob)?;
        }

        let fingerprint = CorpusFingerprint {
            document_count: documents.len(),
            last_modified: Utc::now(),
        };
        self.meta
            .insert(META_FINGERPRINT, bincode::serialize(&fingerprint)?)?;

        self.db.flush_async().await?;

        tracing::info!(documents = documents.len(), "Corpus replaced");
        Ok(fingerprint)
    }

    /// All documents, ordered by id for deterministic builds.
    pub async fn all_documents(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::with_capacity(self.documents.len());
        for entry in self.documents.iter() {
            let (_, blob) = entry?;
            documents.push(self.decode(&blob)?);
        }
        Ok(documents)
    }

    /// Fetch one document by id.
    pub async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        match self.documents.get(id.as_bytes())? {
            Some(blob) => Ok(Some(self.decode(&blob)?)),
            None => Ok(None),
        }
    }

    /// Current corpus fingerprint; an untouched store reports the empty
    /// fingerprint rather than an error.
    pub async fn corpus_fingerprint(&self) -> Result<CorpusFingerprint> {
        match self.meta.get(META_FINGERPRINT)? {
            Some(blob) => Ok(bincode::deserialize(&blob)?),
            None => Ok(CorpusFingerprint::empty()),
        }
    }

    /// Persist an index snapshot: serialize into the inactive slot, flush,
    /// then flip the current-slot pointer and flush again. Readers of the
    /// previous slot are never exposed to a partial write.
    pub async fn save_index(&self, index: &InvertedIndex) -> Result<()> {
        let serialized = bincode::serialize(index)?;
        let blob = if self.config.enable_compression {
            compress(&serialized)?
        } else {
            serialized
        };

        let (inactive_slot, pointer): (&[u8], &[u8]) = match self.current_slot()? {
            Some(slot) if slot == SLOT_A => (SLOT_B, b"slot_b"),
            _ => (SLOT_A, b"slot_a"),
        };

        let write = || -> Result<()> {
            self.index_slots.insert(inactive_slot, blob.as_slice())?;
            self.db.flush()?;
            self.index_slots.insert(INDEX_POINTER, pointer)?;
            self.db.flush()?;
            Ok(())
        };

        write().map_err(|e| SearchError::PersistenceUnavailable {
            details: format!("index slot write failed: {}", e),
        })?;

        tracing::debug!(slot = ?String::from_utf8_lossy(pointer), bytes = blob.len(), "Index persisted");
        Ok(())
    }

    /// Load the persisted index, if any. A corrupt slot is reported as
    /// absent so the caller rebuilds instead of failing the search path.
    pub async fn load_index(&self) -> Result<Option<InvertedIndex>> {
        let slot = match self.current_slot()? {
            Some(slot) => slot,
            None => return Ok(None),
        };

        let blob = match self.index_slots.get(&slot)? {
            Some(blob) => blob,
            None => return Ok(None),
        };

        let serialized = if self.config.enable_compression {
            match decompress(&blob) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(error = %e, "Persisted index is unreadable, will rebuild");
                    return Ok(None);
                }
            }
        } else {
            blob.to_vec()
        };

        match bincode::deserialize(&serialized) {
            Ok(index) => Ok(Some(index)),
            Err(e) => {
                tracing::warn!(error = %e, "Persisted index is corrupt, will rebuild");
                Ok(None)
            }
        }
    }

    /// Basic read/write probe of the underlying database.
    pub async fn health_check(&self) -> Result<()> {
        let probe_key = b"health_check";
        self.meta.insert(probe_key, b"ok")?;
        if self.meta.get(probe_key)?.is_none() {
            return Err(SearchError::PersistenceUnavailable {
                details: "health check value not found after write".to_string(),
            });
        }
        self.meta.remove(probe_key)?;
        Ok(())
    }

    /// Number of stored documents.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    fn current_slot(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.index_slots.get(INDEX_POINTER)?.map(|v| v.to_vec()))
    }

    fn encode(&self, doc: &Document) -> Result<Vec<u8>> {
        let serialized = bincode::serialize(doc)?;
        if self.config.enable_compression {
            compress(&serialized)
        } else {
            Ok(serialized)
        }
    }

    fn decode(&self, blob: &[u8]) -> Result<Document> {
        let serialized = if self.config.enable_compression {
            decompress(blob)?
        } else {
            blob.to_vec()
        };
        Ok(bincode::deserialize(&serialized)?)
    }
}

fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    use std::io::Write;

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    use std::io::Read;

    let mut decoder = flate2::read::GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
