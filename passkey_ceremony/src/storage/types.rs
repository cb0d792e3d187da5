use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::errors::StorageError;

pub(super) struct StoredEntry {
    pub(super) value: String,
    pub(super) expires_at: Option<DateTime<Utc>>,
}

/// Process-local store, used in tests and single-instance deployments.
pub struct InMemoryStore {
    pub(super) entries: Mutex<HashMap<String, StoredEntry>>,
}

/// Store backed by a Redis server.
pub struct RedisStore {
    pub(super) client: redis::Client,
}

/// String-keyed persistence used for users, credential claims and sessions.
///
/// Every method takes `&self`; implementations must not hold a lock across an
/// await point so that independent ceremonies never serialise on the store.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Verify the backend is reachable.
    async fn init(&self) -> Result<(), StorageError>;

    /// Get a value from the store.
    async fn get(&self, prefix: &str, key: &str) -> Result<Option<String>, StorageError>;

    /// Put a value into the store without expiry, replacing any previous value.
    async fn put(&self, prefix: &str, key: &str, value: String) -> Result<(), StorageError>;

    /// Put a value into the store with a TTL in seconds.
    async fn put_with_ttl(
        &self,
        prefix: &str,
        key: &str,
        value: String,
        ttl: u64,
    ) -> Result<(), StorageError>;

    /// Put a value only if the key is absent (atomic check-and-set).
    /// Returns true if the value was stored, false if the key already existed.
    /// A `ttl` of 0 means no expiry.
    async fn put_if_not_exists(
        &self,
        prefix: &str,
        key: &str,
        value: String,
        ttl: u64,
    ) -> Result<bool, StorageError>;

    /// Replace a value only if it still equals `expected` (atomic compare-and-swap).
    /// Returns false, writing nothing, if the key is absent or holds another value.
    /// The replacement keeps no expiry.
    async fn compare_and_swap(
        &self,
        prefix: &str,
        key: &str,
        expected: &str,
        value: String,
    ) -> Result<bool, StorageError>;

    /// Remove a value from the store.
    async fn remove(&self, prefix: &str, key: &str) -> Result<(), StorageError>;
}

pub(super) fn make_key(prefix: &str, key: &str) -> String {
    format!("{prefix}:{key}")
}
