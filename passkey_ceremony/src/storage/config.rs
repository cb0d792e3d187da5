use std::{env, sync::Arc};

use super::errors::StorageError;
use super::types::{InMemoryStore, KeyValueStore, RedisStore};

/// Builds the store selected by `KV_STORE_TYPE` (`memory` or `redis`) and
/// `KV_STORE_URL`, and verifies it is reachable.
pub async fn store_from_env() -> Result<Arc<dyn KeyValueStore>, StorageError> {
    let store_type = env::var("KV_STORE_TYPE").unwrap_or_else(|_| "memory".to_string());

    let store: Arc<dyn KeyValueStore> = match store_type.as_str() {
        "memory" => Arc::new(InMemoryStore::new()),
        "redis" => {
            let url = env::var("KV_STORE_URL").map_err(|_| {
                StorageError::Config("KV_STORE_URL must be set for redis".to_string())
            })?;
            tracing::info!("Initializing redis store at {}", url);
            Arc::new(RedisStore::open(&url)?)
        }
        t => {
            return Err(StorageError::Config(format!(
                "Unsupported store type: {t}. Supported types are 'memory' and 'redis'"
            )));
        }
    };

    if let Err(e) = store.init().await {
        tracing::error!("Failed to connect to {} store: {}", store_type, e);
        return Err(e);
    }

    tracing::info!("Connected to key-value store: type={}", store_type);

    Ok(store)
}
