//! Redb backend for the document store.
//!
//! Redb is a pure Rust embedded key-value store with ACID transactions and
//! MVCC reads, so a `get_all` scan never observes a half-written upsert.
//!
//! ```yaml
//! store:
//!   backend: redb
//!   path: ./data/search.redb
//! ```

use crate::{IndexBackend, StoreError};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const DOCUMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// Persistent backend over a single redb file.
///
/// Every write is its own committed transaction; `batch_put` commits once
/// for the whole batch.
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open or create a Redb database at the given path.
    ///
    /// # Example
    /// ```no_run
    /// use index::RedbBackend;
    ///
    /// let backend = RedbBackend::open("./data/search.redb").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(StoreError::backend)?;
        }
        let db = Database::create(path).map_err(StoreError::backend)?;

        // Opening the table inside a write txn creates it on first use.
        let write_txn = db.begin_write().map_err(StoreError::backend)?;
        {
            let _table = write_txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(StoreError::backend)?;
        }
        write_txn.commit().map_err(StoreError::backend)?;

        tracing::debug!(path = %path.display(), "opened redb document store");
        Ok(Self { db: Arc::new(db) })
    }
}

impl IndexBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = write_txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(StoreError::backend)?;
            table.insert(key, value).map_err(StoreError::backend)?;
        }
        write_txn.commit().map_err(StoreError::backend)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = read_txn
            .open_table(DOCUMENTS_TABLE)
            .map_err(StoreError::backend)?;
        let value = table.get(key).map_err(StoreError::backend)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        let existed = {
            let mut table = write_txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(StoreError::backend)?;
            let removed = table.remove(key).map_err(StoreError::backend)?;
            removed.is_some()
        };
        write_txn.commit().map_err(StoreError::backend)?;
        Ok(existed)
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = write_txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(StoreError::backend)?;
            for (key, value) in entries {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(StoreError::backend)?;
            }
        }
        write_txn.commit().map_err(StoreError::backend)
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = read_txn
            .open_table(DOCUMENTS_TABLE)
            .map_err(StoreError::backend)?;

        for item in table.iter().map_err(StoreError::backend)? {
            let (_, value) = item.map_err(StoreError::backend)?;
            visitor(value.value())?;
        }
        Ok(())
    }

    fn len(&self) -> Result<usize, StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = read_txn
            .open_table(DOCUMENTS_TABLE)
            .map_err(StoreError::backend)?;
        Ok(table.len().map_err(StoreError::backend)? as usize)
    }
}
