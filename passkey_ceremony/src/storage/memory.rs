use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::errors::StorageError;
use super::types::{InMemoryStore, KeyValueStore, StoredEntry, make_key};

impl InMemoryStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory key-value store");
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entry(value: String, ttl: u64) -> StoredEntry {
        let expires_at = match ttl {
            0 => None,
            secs => Some(Utc::now() + Duration::seconds(secs.min(i64::MAX as u64) as i64)),
        };
        StoredEntry { value, expires_at }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoredEntry {
    fn is_live(&self) -> bool {
        self.expires_at.is_none_or(|t| t > Utc::now())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(()) // Nothing to initialize for in-memory store
    }

    async fn get(&self, prefix: &str, key: &str) -> Result<Option<String>, StorageError> {
        let key = make_key(prefix, key);
        let mut entries = self.entries.lock().await;

        match entries.get(&key) {
            Some(entry) if entry.is_live() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, prefix: &str, key: &str, value: String) -> Result<(), StorageError> {
        let key = make_key(prefix, key);
        self.entries.lock().await.insert(key, Self::entry(value, 0));
        Ok(())
    }

    async fn put_with_ttl(
        &self,
        prefix: &str,
        key: &str,
        value: String,
        ttl: u64,
    ) -> Result<(), StorageError> {
        let key = make_key(prefix, key);
        self.entries
            .lock()
            .await
            .insert(key, Self::entry(value, ttl));
        Ok(())
    }

    async fn put_if_not_exists(
        &self,
        prefix: &str,
        key: &str,
        value: String,
        ttl: u64,
    ) -> Result<bool, StorageError> {
        let key = make_key(prefix, key);
        let mut entries = self.entries.lock().await;

        if entries.get(&key).is_some_and(StoredEntry::is_live) {
            return Ok(false);
        }
        entries.insert(key, Self::entry(value, ttl));
        Ok(true)
    }

    async fn compare_and_swap(
        &self,
        prefix: &str,
        key: &str,
        expected: &str,
        value: String,
    ) -> Result<bool, StorageError> {
        let key = make_key(prefix, key);
        let mut entries = self.entries.lock().await;

        match entries.get(&key) {
            Some(entry) if entry.is_live() && entry.value == expected => {
                entries.insert(key, Self::entry(value, 0));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove(&self, prefix: &str, key: &str) -> Result<(), StorageError> {
        let key = make_key(prefix, key);
        self.entries.lock().await.remove(&key);
        Ok(())
    }
}
