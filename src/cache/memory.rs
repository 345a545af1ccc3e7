//! In-Process Cache Backend
//!
//! HashMap-backed implementation of [`CacheBackend`] with per-key expiry.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{CacheBackend, CacheEntry};
use crate::error::CacheError;

/// Default capacity of [`MemoryBackend::new`].
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

// == Memory Backend ==
/// Bounded in-process key-value store.
///
/// Expired entries are dropped when read. When the store is full, expired
/// entries are purged first; if none expired, the entry closest to expiry
/// is evicted.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    /// Creates a store holding at most `max_entries` keys (at least one).
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    // == Purge Expired ==
    /// Removes all expired entries and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    /// Returns true if `key` holds a live entry.
    pub async fn contains_key(&self, key: &str) -> bool {
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Number of stored entries, expired ones included until purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it unless it was overwritten in the meantime
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(CacheEntry::is_expired) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn setex(&self, key: &str, ttl: Duration, value: Vec<u8>) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;

        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            entries.retain(|_, entry| !entry.is_expired());
        }
        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            let victim = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone());
            if let Some(victim) = victim {
                entries.remove(&victim);
            }
        }

        entries.insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn test_set_and_get() {
        let backend = MemoryBackend::new();

        backend.setex("key1", TTL, b"value1".to_vec()).await.unwrap();

        assert_eq!(backend.get("key1").await.unwrap(), Some(b"value1".to_vec()));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_entry() {
        let backend = MemoryBackend::new();

        backend.setex("key1", TTL, b"value1".to_vec()).await.unwrap();
        backend.setex("key1", TTL, b"value2".to_vec()).await.unwrap();

        assert_eq!(backend.get("key1").await.unwrap(), Some(b"value2".to_vec()));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = MemoryBackend::new();

        backend.setex("key1", TTL, b"value1".to_vec()).await.unwrap();
        backend.delete("key1").await.unwrap();
        backend.delete("never-set").await.unwrap();

        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent_and_dropped() {
        let backend = MemoryBackend::new();

        backend
            .setex("short", Duration::from_millis(20), b"v".to_vec())
            .await
            .unwrap();
        assert!(backend.contains_key("short").await);

        sleep(Duration::from_millis(40)).await;

        assert!(!backend.contains_key("short").await);
        assert_eq!(backend.get("short").await.unwrap(), None);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let backend = MemoryBackend::new();

        backend
            .setex("short", Duration::from_millis(20), b"v".to_vec())
            .await
            .unwrap();
        backend.setex("long", TTL, b"v".to_vec()).await.unwrap();

        sleep(Duration::from_millis(40)).await;

        assert_eq!(backend.purge_expired().await, 1);
        assert_eq!(backend.len().await, 1);
        assert!(backend.contains_key("long").await);
    }

    #[tokio::test]
    async fn test_capacity_evicts_closest_to_expiry() {
        let backend = MemoryBackend::with_capacity(2);

        backend
            .setex("soon", Duration::from_secs(10), b"1".to_vec())
            .await
            .unwrap();
        backend.setex("later", TTL, b"2".to_vec()).await.unwrap();
        backend.setex("new", TTL, b"3".to_vec()).await.unwrap();

        assert_eq!(backend.len().await, 2);
        assert!(!backend.contains_key("soon").await);
        assert!(backend.contains_key("later").await);
        assert!(backend.contains_key("new").await);
    }

    #[tokio::test]
    async fn test_capacity_prefers_purging_expired() {
        let backend = MemoryBackend::with_capacity(2);

        backend
            .setex("expired", Duration::from_millis(10), b"1".to_vec())
            .await
            .unwrap();
        backend.setex("kept", Duration::from_secs(1), b"2".to_vec()).await.unwrap();
        sleep(Duration::from_millis(20)).await;

        backend.setex("new", TTL, b"3".to_vec()).await.unwrap();

        assert!(backend.contains_key("kept").await);
        assert!(backend.contains_key("new").await);
    }
}
