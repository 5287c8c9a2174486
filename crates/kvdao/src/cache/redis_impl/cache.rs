//! Redis cache implementation.
//!
//! Every command is a single round trip on a cloned connection manager
//! handle; the manager reconnects on its own after a dropped connection.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use kvdao_core::cache::{CacheClient, KeyType, Result};

use super::error::map_redis_error;

/// Redis cache backend using connection manager for pooling.
#[derive(Clone)]
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Creates a new Redis cache connection.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheClient for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let result: Option<Vec<u8>> = conn.get(key).await.map_err(map_redis_error)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();

        match ttl {
            Some(duration) => {
                let seconds = duration.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, value, seconds)
                    .await
                    .map_err(map_redis_error)?;
            }
            None => {
                conn.set::<_, _, ()>(key, value)
                    .await
                    .map_err(map_redis_error)?;
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(map_redis_error)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(map_redis_error)
    }

    async fn key_type(&self, key: &str) -> Result<KeyType> {
        let mut conn = self.conn.clone();
        let tag: String = conn.key_type(key).await.map_err(map_redis_error)?;
        Ok(KeyType::from_tag(&tag))
    }

    async fn lpush(&self, key: &str, values: &[Vec<u8>]) -> Result<usize> {
        let mut conn = self.conn.clone();
        conn.lpush(key, values).await.map_err(map_redis_error)
    }

    async fn rpush(&self, key: &str, values: &[Vec<u8>]) -> Result<usize> {
        let mut conn = self.conn.clone();
        conn.rpush(key, values).await.map_err(map_redis_error)
    }

    async fn lpop(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.lpop(key, None).await.map_err(map_redis_error)
    }

    async fn rpop(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.rpop(key, None).await.map_err(map_redis_error)
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.lrange(key, start, stop).await.map_err(map_redis_error)
    }

    async fn llen(&self, key: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        conn.llen(key).await.map_err(map_redis_error)
    }

    async fn lrem(&self, key: &str, count: isize, value: &[u8]) -> Result<usize> {
        let mut conn = self.conn.clone();
        conn.lrem(key, count, value).await.map_err(map_redis_error)
    }
}
