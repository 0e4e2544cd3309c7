//! LMDB-backed durable store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to keep cache entries in a
//! memory-mapped file that survives process restarts.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `get_item` and prefix scans
//! - Write transactions for `set_item` and `remove_item`
//!
//! A write transaction is committed before the method returns, so an entry is
//! either fully written or not at all.

use std::path::{Path, PathBuf};

use bestiary_core::StoreError;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use super::traits::KvStore;

/// LMDB-backed key-value store.
///
/// # Example
///
/// ```ignore
/// use bestiary_storage::cache::{KvStore, LmdbStore};
///
/// let store = LmdbStore::open("/tmp/bestiary-cache", 64)?;
/// store.set_item("poke::detail_25", "{...}")?;
/// assert!(store.get_item("poke::detail_25")?.is_some());
/// ```
pub struct LmdbStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    path: PathBuf,
}

impl LmdbStore {
    /// Open (or create) a store in `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let open_failed = |reason: String| StoreError::OpenFailed {
            path: path.display().to_string(),
            reason,
        };

        std::fs::create_dir_all(&path).map_err(|e| open_failed(e.to_string()))?;

        // SAFETY: the environment is opened once per directory by this store
        // and the files are not modified by anything else while it is open.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(&path)
        }
        .map_err(|e| open_failed(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(transaction)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| open_failed(e.to_string()))?;
        wtxn.commit().map_err(transaction)?;

        Ok(Self { env, db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored entries.
    pub fn len(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(transaction)?;
        self.db.len(&rtxn).map_err(transaction)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

fn transaction(e: heed::Error) -> StoreError {
    StoreError::TransactionFailed {
        reason: e.to_string(),
    }
}

impl KvStore for LmdbStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let rtxn = self.env.read_txn().map_err(transaction)?;
        match self.db.get(&rtxn, key.as_bytes()).map_err(transaction)? {
            Some(bytes) => {
                let value = std::str::from_utf8(bytes).map_err(|e| StoreError::DecodeFailed {
                    key: key.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(Some(value.to_string()))
            }
            None => Ok(None),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(transaction)?;
        self.db
            .put(&mut wtxn, key.as_bytes(), value.as_bytes())
            .map_err(transaction)?;
        wtxn.commit().map_err(transaction)
    }

    fn remove_item(&self, key: &str) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(transaction)?;
        let deleted = self
            .db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(transaction)?;
        wtxn.commit().map_err(transaction)?;
        Ok(deleted)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let rtxn = self.env.read_txn().map_err(transaction)?;
        let prefix = prefix.as_bytes();

        let mut keys = Vec::new();
        for result in self.db.iter(&rtxn).map_err(transaction)? {
            match result {
                Ok((key, _)) => {
                    if key.starts_with(prefix) {
                        if let Ok(key) = std::str::from_utf8(key) {
                            keys.push(key.to_string());
                        }
                    }
                }
                Err(_) => continue,
            }
        }

        Ok(keys)
    }
}
