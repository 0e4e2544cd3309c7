//! Volatile in-process store.
//!
//! Used when the durable store cannot be opened, and in tests. An optional
//! byte quota makes it reject writes the way a full durable store would.

use std::collections::BTreeMap;
use std::sync::RwLock;

use bestiary_core::StoreError;

use super::traits::KvStore;

/// In-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
    /// Maximum total size of keys plus values, in bytes.
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes once keys plus values would exceed `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn used_bytes(entries: &BTreeMap<String, String>) -> usize {
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KvStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        if let Some(quota) = self.quota_bytes {
            let replaced = entries.get(key).map(|old| key.len() + old.len()).unwrap_or(0);
            let projected = Self::used_bytes(&entries) - replaced + key.len() + value.len();
            if projected > quota {
                return Err(StoreError::TransactionFailed {
                    reason: format!("quota exceeded ({projected} > {quota} bytes)"),
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.remove(key).is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        store.set_item("a::x", "1").unwrap();
        assert_eq!(store.get_item("a::x").unwrap().as_deref(), Some("1"));
        assert!(store.remove_item("a::x").unwrap());
        assert!(!store.remove_item("a::x").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_keys_with_prefix_is_exact() {
        let store = MemoryStore::new();
        for key in ["a::1", "a::2", "ab::1", "b::1", "a:"] {
            store.set_item(key, "v").unwrap();
        }
        assert_eq!(
            store.keys_with_prefix("a::").unwrap(),
            vec!["a::1".to_string(), "a::2".to_string()]
        );
    }

    #[test]
    fn test_quota_rejects_oversized_write() {
        let store = MemoryStore::with_quota(10);
        store.set_item("k", "12345").unwrap();

        let err = store.set_item("k2", "123456789").unwrap_err();
        assert!(matches!(err, StoreError::TransactionFailed { .. }));
        assert!(store.get_item("k2").unwrap().is_none());
    }

    #[test]
    fn test_quota_accounts_for_replaced_value() {
        let store = MemoryStore::with_quota(10);
        store.set_item("k", "123456789").unwrap();
        // Replacing the value frees the old bytes first.
        store.set_item("k", "987654321").unwrap();
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("987654321"));
    }

    #[test]
    fn test_write_check_succeeds() {
        let store = MemoryStore::new();
        store.check_writable().unwrap();
        assert!(store.is_empty());
    }
}
