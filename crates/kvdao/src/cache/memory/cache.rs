//! In-memory cache implementation with LRU eviction.
//!
//! Provides a thread-safe in-memory key-value store with TTL support using
//! tokio synchronization primitives and LRU eviction policy.
//!
//! This implementation mirrors the Redis command semantics the cache record
//! relies on:
//! - Keys hold either a string or a list; commands of the other kind fail
//!   with a `WRONGTYPE` error
//! - A list whose last element is removed stops existing
//! - `SET` overwrites any existing value and its TTL

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;

use kvdao_core::cache::{CacheClient, CacheError, KeyType, Result};

use crate::config::Config;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Debug, Clone)]
enum StoredValue {
    String(Vec<u8>),
    List(VecDeque<Vec<u8>>),
}

/// A single cache entry with optional expiration.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    /// Creates a new cache entry with optional TTL.
    fn new(value: StoredValue, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| Instant::now() + d);
        Self { value, expires_at }
    }

    /// Returns true if this entry has expired.
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }

    fn list_mut(&mut self) -> Result<&mut VecDeque<Vec<u8>>> {
        match &mut self.value {
            StoredValue::List(list) => Ok(list),
            StoredValue::String(_) => Err(CacheError::OperationFailed(WRONGTYPE.to_string())),
        }
    }
}

type Store = LruCache<String, CacheEntry>;

/// Returns the live entry for `key`, dropping it first if it has expired.
fn live_entry<'a>(store: &'a mut Store, key: &str) -> Option<&'a mut CacheEntry> {
    if store.peek(key).is_some_and(CacheEntry::is_expired) {
        store.pop(key);
        return None;
    }
    store.get_mut(key)
}

/// Resolves Redis-style inclusive list bounds to a half-open range.
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<std::ops::Range<usize>> {
    let len = len as isize;
    let start = if start < 0 {
        (len + start).max(0)
    } else {
        start
    };
    let stop = if stop < 0 {
        len + stop
    } else {
        stop.min(len - 1)
    };
    if start > stop || start >= len {
        return None;
    }
    Some(start as usize..stop as usize + 1)
}

/// In-memory cache implementation with LRU eviction.
///
/// Thread-safe cache using `Arc<RwLock<LruCache>>` for concurrent access.
/// Supports TTL with lazy expiration (entries are cleaned up on access).
/// Uses LRU eviction to limit memory usage when max_entries is reached.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    store: Arc<RwLock<Store>>,
}

impl MemoryCache {
    /// Creates a new in-memory cache with LRU eviction.
    ///
    /// A `max_entries` of 0 is treated as 1.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }

    /// Creates a cache sized by `CACHE_MAX_ENTRIES`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_max_entries)
    }

    async fn push(&self, key: &str, values: &[Vec<u8>], front: bool) -> Result<usize> {
        let mut store = self.store.write().await;

        if live_entry(&mut store, key).is_none() {
            store.put(
                key.to_string(),
                CacheEntry::new(StoredValue::List(VecDeque::new()), None),
            );
        }
        let Some(entry) = store.get_mut(key) else {
            return Ok(0);
        };

        let list = entry.list_mut()?;
        for value in values {
            if front {
                list.push_front(value.clone());
            } else {
                list.push_back(value.clone());
            }
        }
        let len = list.len();

        // LPUSH with no values leaves no empty list behind.
        if len == 0 {
            store.pop(key);
        }
        Ok(len)
    }

    async fn pop(&self, key: &str, front: bool) -> Result<Option<Vec<u8>>> {
        let mut store = self.store.write().await;
        let Some(entry) = live_entry(&mut store, key) else {
            return Ok(None);
        };

        let list = entry.list_mut()?;
        let value = if front {
            list.pop_front()
        } else {
            list.pop_back()
        };
        if list.is_empty() {
            store.pop(key);
        }
        Ok(value)
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut store = self.store.write().await;

        match live_entry(&mut store, key) {
            Some(CacheEntry {
                value: StoredValue::String(bytes),
                ..
            }) => Ok(Some(bytes.clone())),
            Some(_) => Err(CacheError::OperationFailed(WRONGTYPE.to_string())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut store = self.store.write().await;
        let entry = CacheEntry::new(StoredValue::String(value.to_vec()), ttl);
        store.put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut store = self.store.write().await;
        store.pop(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut store = self.store.write().await;
        Ok(live_entry(&mut store, key).is_some())
    }

    async fn key_type(&self, key: &str) -> Result<KeyType> {
        let mut store = self.store.write().await;
        Ok(match live_entry(&mut store, key) {
            Some(CacheEntry {
                value: StoredValue::String(_),
                ..
            }) => KeyType::String,
            Some(CacheEntry {
                value: StoredValue::List(_),
                ..
            }) => KeyType::List,
            None => KeyType::None,
        })
    }

    async fn lpush(&self, key: &str, values: &[Vec<u8>]) -> Result<usize> {
        self.push(key, values, true).await
    }

    async fn rpush(&self, key: &str, values: &[Vec<u8>]) -> Result<usize> {
        self.push(key, values, false).await
    }

    async fn lpop(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.pop(key, true).await
    }

    async fn rpop(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.pop(key, false).await
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<Vec<u8>>> {
        let mut store = self.store.write().await;
        let Some(entry) = live_entry(&mut store, key) else {
            return Ok(Vec::new());
        };

        let list = entry.list_mut()?;
        Ok(match resolve_range(list.len(), start, stop) {
            Some(range) => list.range(range).cloned().collect(),
            None => Vec::new(),
        })
    }

    async fn llen(&self, key: &str) -> Result<usize> {
        let mut store = self.store.write().await;
        match live_entry(&mut store, key) {
            Some(entry) => Ok(entry.list_mut()?.len()),
            None => Ok(0),
        }
    }

    async fn lrem(&self, key: &str, count: isize, value: &[u8]) -> Result<usize> {
        let mut store = self.store.write().await;
        let Some(entry) = live_entry(&mut store, key) else {
            return Ok(0);
        };

        let list = entry.list_mut()?;
        let limit = if count == 0 {
            usize::MAX
        } else {
            count.unsigned_abs()
        };

        let mut removed = 0;
        if count >= 0 {
            let mut i = 0;
            while i < list.len() && removed < limit {
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                } else {
                    i += 1;
                }
            }
        } else {
            let mut i = list.len();
            while i > 0 && removed < limit {
                i -= 1;
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                }
            }
        }

        if list.is_empty() {
            store.pop(key);
        }
        Ok(removed)
    }
}
