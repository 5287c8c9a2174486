//! A single cache key bound to a client.
//!
//! [`CacheRecord`] stores JSON values and manipulates lists under one key.
//! Each operation comes in two forms: `try_*` returns the error, and the plain
//! form logs it and degrades to a safe default (an empty value for reads, a
//! no-op for writes). List reads that require the key to be a list fail with
//! [`CacheError::NotAList`] instead.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{Instrument, Span};

use kvdao_core::cache::{
    decode_text, decode_value, encode_value, CacheClient, CacheError, KeyType, Result, ValueShape,
};

/// One cache key plus the client that serves it.
pub struct CacheRecord<C: CacheClient + ?Sized> {
    key: String,
    default_shape: ValueShape,
    default_ttl: Option<Duration>,
    client: Arc<C>,
    span: Span,
}

impl<C: CacheClient + ?Sized> CacheRecord<C> {
    /// Binds `key` to `client`.
    ///
    /// Reads default to the sequence shape and writes to no expiry. Log events
    /// are emitted under a `cache_record` span carrying the key, unless a span
    /// is supplied with [`CacheRecord::with_span`].
    pub fn new(client: Arc<C>, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(CacheError::InvalidKey("key must not be empty".to_string()));
        }
        let span = tracing::info_span!("cache_record", key = %key);
        Ok(Self {
            key,
            default_shape: ValueShape::default(),
            default_ttl: None,
            client,
            span,
        })
    }

    /// Sets the shape used by reads that do not name one.
    pub fn with_shape(mut self, shape: ValueShape) -> Self {
        self.default_shape = shape;
        self
    }

    /// Sets the expiry used by writes that do not name one.
    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Replaces the span log events are attached to.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    // ------------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------------

    /// Stores `value`, JSON-encoding objects and arrays.
    pub async fn try_store(&self, value: &Value, ttl: Option<Duration>) -> Result<()> {
        let bytes = encode_value(value)?;
        let ttl = ttl.or(self.default_ttl);
        self.client
            .set(&self.key, &bytes, ttl)
            .instrument(self.span.clone())
            .await
    }

    /// Stores `value`, logging and swallowing any failure.
    pub async fn store(&self, value: &Value, ttl: Option<Duration>) {
        if let Err(e) = self.try_store(value, ttl).await {
            tracing::error!(parent: &self.span, error = %e, "Failed to store cache value");
        }
    }

    /// Serializes any serde value as JSON and stores it.
    ///
    /// Strings are stored as JSON strings here, so [`CacheRecord::fetch_as`]
    /// reads back every value written through this method.
    pub async fn try_store_as<T: Serialize + ?Sized>(
        &self,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let ttl = ttl.or(self.default_ttl);
        self.client
            .set(&self.key, &bytes, ttl)
            .instrument(self.span.clone())
            .await
    }

    pub async fn store_as<T: Serialize + ?Sized>(&self, value: &T, ttl: Option<Duration>) {
        if let Err(e) = self.try_store_as(value, ttl).await {
            tracing::error!(parent: &self.span, error = %e, "Failed to store cache value");
        }
    }

    /// Reads the value, distinguishing a missing key (`Ok(None)`) from errors.
    pub async fn try_fetch(&self, shape: Option<ValueShape>) -> Result<Option<Value>> {
        let shape = shape.unwrap_or(self.default_shape);
        let Some(bytes) = self
            .client
            .get(&self.key)
            .instrument(self.span.clone())
            .await?
        else {
            return Ok(None);
        };
        decode_value(decode_text(bytes)?, shape).map(Some)
    }

    /// Reads the value, returning the shape's empty default when the key is
    /// missing or cannot be read.
    pub async fn fetch(&self, shape: Option<ValueShape>) -> Value {
        let shape = shape.unwrap_or(self.default_shape);
        match self.try_fetch(Some(shape)).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                tracing::warn!(parent: &self.span, "Key not found");
                shape.default_value()
            }
            Err(CacheError::Serialization(e)) => {
                tracing::error!(parent: &self.span, error = %e, "Failed to decode cached value");
                shape.default_value()
            }
            Err(e) => {
                tracing::error!(parent: &self.span, error = %e, "Failed to fetch cache value");
                shape.default_value()
            }
        }
    }

    /// Reads and deserializes the value into `T`.
    pub async fn try_fetch_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let Some(bytes) = self
            .client
            .get(&self.key)
            .instrument(self.span.clone())
            .await?
        else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Reads and deserializes the value, falling back to `T::default()`.
    pub async fn fetch_as<T: DeserializeOwned + Default>(&self) -> T {
        match self.try_fetch_as().await {
            Ok(Some(value)) => value,
            Ok(None) => {
                tracing::warn!(parent: &self.span, "Key not found");
                T::default()
            }
            Err(e) => {
                tracing::error!(parent: &self.span, error = %e, "Failed to fetch cache value");
                T::default()
            }
        }
    }

    pub async fn try_remove(&self) -> Result<()> {
        self.client
            .delete(&self.key)
            .instrument(self.span.clone())
            .await
    }

    /// Deletes the key, logging and swallowing any failure.
    pub async fn remove(&self) {
        if let Err(e) = self.try_remove().await {
            tracing::error!(parent: &self.span, error = %e, "Failed to delete key");
        }
    }

    pub async fn exists(&self) -> Result<bool> {
        self.client
            .exists(&self.key)
            .instrument(self.span.clone())
            .await
    }

    pub async fn key_type(&self) -> Result<KeyType> {
        self.client
            .key_type(&self.key)
            .instrument(self.span.clone())
            .await
    }

    // ------------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------------

    /// Whether the key exists and holds a list.
    pub async fn is_list_type(&self) -> Result<bool> {
        if !self.exists().await? {
            return Ok(false);
        }
        Ok(self.key_type().await? == KeyType::List)
    }

    async fn ensure_list(&self) -> Result<()> {
        if self.is_list_type().await? {
            Ok(())
        } else {
            Err(CacheError::NotAList {
                key: self.key.clone(),
            })
        }
    }

    /// Prepends values, returning the new length. The last value ends up first.
    pub async fn push_left<I, V>(&self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        let values: Vec<Vec<u8>> = values.into_iter().map(Into::into).collect();
        self.client
            .lpush(&self.key, &values)
            .instrument(self.span.clone())
            .await
    }

    /// Appends values, returning the new length.
    pub async fn push_right<I, V>(&self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        let values: Vec<Vec<u8>> = values.into_iter().map(Into::into).collect();
        self.client
            .rpush(&self.key, &values)
            .instrument(self.span.clone())
            .await
    }

    /// Removes and returns the first element as raw bytes.
    pub async fn pop_left_raw(&self) -> Result<Option<Vec<u8>>> {
        self.client
            .lpop(&self.key)
            .instrument(self.span.clone())
            .await
    }

    /// Removes and returns the last element as raw bytes.
    pub async fn pop_right_raw(&self) -> Result<Option<Vec<u8>>> {
        self.client
            .rpop(&self.key)
            .instrument(self.span.clone())
            .await
    }

    /// Removes and returns the first element as text.
    ///
    /// An element that is not UTF-8 is pushed back onto the head before the
    /// error is returned; use [`CacheRecord::pop_left_raw`] to take it.
    pub async fn pop_left(&self) -> Result<Option<String>> {
        let Some(bytes) = self.pop_left_raw().await? else {
            return Ok(None);
        };
        self.decode_popped(bytes, true).await.map(Some)
    }

    /// Removes and returns the last element as text.
    ///
    /// An element that is not UTF-8 is pushed back onto the tail before the
    /// error is returned; use [`CacheRecord::pop_right_raw`] to take it.
    pub async fn pop_right(&self) -> Result<Option<String>> {
        let Some(bytes) = self.pop_right_raw().await? else {
            return Ok(None);
        };
        self.decode_popped(bytes, false).await.map(Some)
    }

    async fn decode_popped(&self, bytes: Vec<u8>, head: bool) -> Result<String> {
        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(e) => {
                let error = CacheError::Serialization(e.utf8_error().to_string());
                let restore = [e.into_bytes()];
                let restored = if head {
                    self.push_left(restore).await
                } else {
                    self.push_right(restore).await
                };
                if let Err(push_error) = restored {
                    tracing::error!(
                        parent: &self.span,
                        error = %push_error,
                        "Failed to restore undecodable list element"
                    );
                }
                Err(error)
            }
        }
    }

    /// Elements between `start` and `stop` (inclusive) as raw bytes.
    pub async fn range_raw(&self, start: isize, stop: isize) -> Result<Vec<Vec<u8>>> {
        self.ensure_list().await?;
        self.client
            .lrange(&self.key, start, stop)
            .instrument(self.span.clone())
            .await
    }

    /// Elements between `start` and `stop` (inclusive) decoded as text.
    pub async fn range(&self, start: isize, stop: isize) -> Result<Vec<String>> {
        self.range_raw(start, stop)
            .await?
            .into_iter()
            .map(decode_text)
            .collect()
    }

    pub async fn length(&self) -> Result<usize> {
        self.ensure_list().await?;
        self.client
            .llen(&self.key)
            .instrument(self.span.clone())
            .await
    }

    /// Removes occurrences of `value`; see [`CacheClient::lrem`] for `count`.
    pub async fn remove_value(&self, count: isize, value: impl AsRef<[u8]>) -> Result<usize> {
        self.ensure_list().await?;
        self.client
            .lrem(&self.key, count, value.as_ref())
            .instrument(self.span.clone())
            .await
    }
}
