//! # semsearch index
//!
//! Document storage for semantic search. Documents carry their precomputed
//! embedding and are persisted as JSON records (the embedding as a plain JSON
//! list) through a pluggable [`IndexBackend`]:
//!
//! - an in-memory `HashMap` backend for tests and throwaway runs,
//! - a Redb backend for on-disk storage (enabled via the `backend-redb` feature).
//!
//! Every record carries a sequence number assigned at write time, so
//! [`DocumentStore::get_all`] returns documents in insertion order on any
//! backend. Re-inserting an id replaces the record and moves it to the end.
//!
//! ## Example Usage
//!
//! ```
//! use index::{BackendConfig, Document, DocumentIndex, DocumentStore};
//!
//! let store = DocumentIndex::open(&BackendConfig::in_memory()).unwrap();
//! store
//!     .upsert(Document::new("1", "User login", "Password checks", vec![1.0, 0.0]))
//!     .unwrap();
//! store
//!     .upsert(Document::new("2", "Data export", "CSV and Excel", vec![0.0, 1.0]))
//!     .unwrap();
//!
//! let ids: Vec<_> = store.get_all().unwrap().into_iter().map(|d| d.id).collect();
//! assert_eq!(ids, ["1", "2"]);
//! ```

mod backend;

pub use backend::{BackendConfig, InMemoryBackend, IndexBackend};
#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// A searchable document with its precomputed embedding.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            embedding,
        }
    }
}

/// On-disk layout: the document plus its insertion sequence.
#[derive(Serialize, Deserialize)]
struct StoredDocument {
    seq: u64,
    #[serde(flatten)]
    document: Document,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Serialization encode error: {0}")]
    Encode(String),
    #[error("Serialization decode error: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Storage collaborator used by the search service.
pub trait DocumentStore: Send + Sync {
    /// All documents in insertion order.
    fn get_all(&self) -> Result<Vec<Document>, StoreError>;
    /// Insert or replace by id. A replaced document moves to the end.
    fn upsert(&self, document: Document) -> Result<(), StoreError>;
    /// Insert or replace several documents, preserving their relative order.
    fn upsert_many(&self, documents: Vec<Document>) -> Result<(), StoreError> {
        for document in documents {
            self.upsert(document)?;
        }
        Ok(())
    }
    fn get(&self, id: &str) -> Result<Option<Document>, StoreError>;
    /// Returns whether a document was removed.
    fn delete(&self, id: &str) -> Result<bool, StoreError>;
    fn len(&self) -> Result<usize, StoreError>;
    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

/// [`DocumentStore`] over any [`IndexBackend`].
pub struct DocumentIndex {
    backend: Box<dyn IndexBackend>,
    next_seq: AtomicU64,
    /// Keeps sequence assignment and the backend write in the same order.
    write_lock: Mutex<()>,
}

impl DocumentIndex {
    pub fn open(config: &BackendConfig) -> Result<Self, StoreError> {
        Self::with_backend(config.build()?)
    }

    /// Wraps an existing backend, resuming the sequence after its newest record.
    pub fn with_backend(backend: Box<dyn IndexBackend>) -> Result<Self, StoreError> {
        let mut max_seq: Option<u64> = None;
        backend.scan(&mut |bytes| {
            let record = decode(bytes)?;
            max_seq = Some(max_seq.map_or(record.seq, |m| m.max(record.seq)));
            Ok(())
        })?;
        let next = max_seq.map_or(0, |m| m + 1);
        tracing::debug!(next_seq = next, "document index opened");

        Ok(Self {
            backend,
            next_seq: AtomicU64::new(next),
            write_lock: Mutex::new(()),
        })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.backend.flush()
    }

    fn lock_writes(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::backend("poisoned lock"))
    }

    fn stamp(&self, document: Document) -> Result<(String, Vec<u8>), StoreError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let key = document.id.clone();
        let record = StoredDocument { seq, document };
        let bytes = serde_json::to_vec(&record).map_err(|e| StoreError::Encode(e.to_string()))?;
        Ok((key, bytes))
    }
}

fn decode(bytes: &[u8]) -> Result<StoredDocument, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Decode(e.to_string()))
}

impl DocumentStore for DocumentIndex {
    fn get_all(&self) -> Result<Vec<Document>, StoreError> {
        let mut records = Vec::new();
        self.backend.scan(&mut |bytes| {
            records.push(decode(bytes)?);
            Ok(())
        })?;
        records.sort_by_key(|r| r.seq);
        Ok(records.into_iter().map(|r| r.document).collect())
    }

    fn upsert(&self, document: Document) -> Result<(), StoreError> {
        let _guard = self.lock_writes()?;
        let (key, bytes) = self.stamp(document)?;
        self.backend.put(&key, &bytes)
    }

    fn upsert_many(&self, documents: Vec<Document>) -> Result<(), StoreError> {
        let _guard = self.lock_writes()?;
        let mut entries = Vec::with_capacity(documents.len());
        for document in documents {
            entries.push(self.stamp(document)?);
        }
        // Later duplicates win, matching sequential upserts.
        self.backend.batch_put(entries)
    }

    fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        self.backend
            .get(id)?
            .map(|bytes| decode(&bytes).map(|r| r.document))
            .transpose()
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.lock_writes()?;
        self.backend.delete(id)
    }

    fn len(&self) -> Result<usize, StoreError> {
        self.backend.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, embedding: Vec<f32>) -> Document {
        Document::new(id, format!("title {id}"), format!("content {id}"), embedding)
    }

    fn ids(store: &dyn DocumentStore) -> Vec<String> {
        store
            .get_all()
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect()
    }

    #[test]
    fn empty_store() {
        let store = DocumentIndex::open(&BackendConfig::in_memory()).unwrap();
        assert!(store.is_empty().unwrap());
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn get_all_keeps_insertion_order() {
        let store = DocumentIndex::open(&BackendConfig::in_memory()).unwrap();
        for id in ["c", "a", "b", "z", "m"] {
            store.upsert(doc(id, vec![1.0])).unwrap();
        }
        assert_eq!(ids(&store), ["c", "a", "b", "z", "m"]);
    }

    #[test]
    fn replace_moves_document_to_end() {
        let store = DocumentIndex::open(&BackendConfig::in_memory()).unwrap();
        store.upsert(doc("1", vec![1.0, 0.0])).unwrap();
        store.upsert(doc("2", vec![0.0, 1.0])).unwrap();
        store.upsert(doc("1", vec![0.5, 0.5])).unwrap();

        assert_eq!(ids(&store), ["2", "1"]);
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.get("1").unwrap().unwrap().embedding, vec![0.5, 0.5]);
    }

    #[test]
    fn upsert_many_preserves_order_and_last_duplicate_wins() {
        let store = DocumentIndex::open(&BackendConfig::in_memory()).unwrap();
        store
            .upsert_many(vec![doc("a", vec![1.0]), doc("b", vec![2.0]), doc("a", vec![3.0])])
            .unwrap();
        assert_eq!(ids(&store), ["b", "a"]);
        assert_eq!(store.get("a").unwrap().unwrap().embedding, vec![3.0]);
    }

    #[test]
    fn delete_reports_presence() {
        let store = DocumentIndex::open(&BackendConfig::in_memory()).unwrap();
        store.upsert(doc("1", vec![1.0])).unwrap();
        assert!(store.delete("1").unwrap());
        assert!(!store.delete("1").unwrap());
        assert!(store.get("1").unwrap().is_none());
    }

    #[test]
    fn records_are_json_with_embedding_list() {
        let backend = InMemoryBackend::new();
        let bytes = serde_json::to_vec(&StoredDocument {
            seq: 7,
            document: doc("x", vec![0.25, -1.0]),
        })
        .unwrap();
        backend.put("x", &bytes).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&backend.get("x").unwrap().unwrap()).unwrap();
        assert_eq!(raw["seq"], 7);
        assert_eq!(raw["embedding"], serde_json::json!([0.25, -1.0]));

        let store = DocumentIndex::with_backend(Box::new(backend)).unwrap();
        store.upsert(doc("y", vec![1.0])).unwrap();
        assert_eq!(ids(&store), ["x", "y"]);
    }

    #[test]
    fn corrupt_record_is_a_decode_error() {
        let backend = InMemoryBackend::new();
        backend.put("bad", b"not json").unwrap();
        let err = DocumentIndex::with_backend(Box::new(backend)).err().unwrap();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[cfg(feature = "backend-redb")]
    #[test]
    fn redb_store_resumes_sequence_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.redb");
        let config = BackendConfig::redb(path.to_string_lossy());
        {
            let store = DocumentIndex::open(&config).unwrap();
            store.upsert(doc("first", vec![1.0])).unwrap();
            store.upsert(doc("second", vec![1.0])).unwrap();
        }
        let store = DocumentIndex::open(&config).unwrap();
        store.upsert(doc("first", vec![2.0])).unwrap();
        assert_eq!(ids(&store), ["second", "first"]);
    }
}
