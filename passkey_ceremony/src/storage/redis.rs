use async_trait::async_trait;
use redis::{self, AsyncCommands};

use super::errors::StorageError;
use super::types::{KeyValueStore, RedisStore, make_key};

/// GET and SET in one script so no other client can write in between.
const COMPARE_AND_SWAP_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2])
    return 1
end
return 0
"#;

impl RedisStore {
    pub fn open(url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StorageError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn init(&self) -> Result<(), StorageError> {
        // Verify the connection works
        let _conn = self.connection().await?;
        Ok(())
    }

    async fn get(&self, prefix: &str, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.connection().await?;

        let key = make_key(prefix, key);
        let value: Option<String> = conn.get(&key).await?;
        Ok(value)
    }

    async fn put(&self, prefix: &str, key: &str, value: String) -> Result<(), StorageError> {
        let mut conn = self.connection().await?;

        let key = make_key(prefix, key);
        let _: () = conn.set(&key, value).await?;
        Ok(())
    }

    async fn put_with_ttl(
        &self,
        prefix: &str,
        key: &str,
        value: String,
        ttl: u64,
    ) -> Result<(), StorageError> {
        if ttl == 0 {
            return self.put(prefix, key, value).await;
        }
        let mut conn = self.connection().await?;

        let key = make_key(prefix, key);
        let _: () = redis::cmd("SET")
            .arg(&key)
            .arg(value)
            .arg("EX")
            .arg(ttl)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn put_if_not_exists(
        &self,
        prefix: &str,
        key: &str,
        value: String,
        ttl: u64,
    ) -> Result<bool, StorageError> {
        let mut conn = self.connection().await?;

        let key = make_key(prefix, key);

        // SET NX replies OK when the key was created and nil when it already existed
        let mut cmd = redis::cmd("SET");
        cmd.arg(&key).arg(value).arg("NX");
        if ttl > 0 {
            cmd.arg("EX").arg(ttl);
        }
        let reply: Option<String> = cmd.query_async(&mut conn).await?;

        Ok(reply.is_some())
    }

    async fn compare_and_swap(
        &self,
        prefix: &str,
        key: &str,
        expected: &str,
        value: String,
    ) -> Result<bool, StorageError> {
        let mut conn = self.connection().await?;

        let key = make_key(prefix, key);
        let swapped: i64 = redis::Script::new(COMPARE_AND_SWAP_SCRIPT)
            .key(&key)
            .arg(expected)
            .arg(value)
            .invoke_async(&mut conn)
            .await?;
        Ok(swapped == 1)
    }

    async fn remove(&self, prefix: &str, key: &str) -> Result<(), StorageError> {
        let mut conn = self.connection().await?;

        let key = make_key(prefix, key);
        let _: () = conn.del(&key).await?;
        Ok(())
    }
}
