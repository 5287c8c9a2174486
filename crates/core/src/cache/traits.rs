use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use super::Result;

/// The type tag a key-value store reports for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyType {
    /// The key does not exist.
    None,
    String,
    List,
    Set,
    ZSet,
    Hash,
    Stream,
    Other(String),
}

impl KeyType {
    /// Parses the tag returned by the `TYPE` command.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "none" => Self::None,
            "string" => Self::String,
            "list" => Self::List,
            "set" => Self::Set,
            "zset" => Self::ZSet,
            "hash" => Self::Hash,
            "stream" => Self::Stream,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Self::None => "none",
            Self::String => "string",
            Self::List => "list",
            Self::Set => "set",
            Self::ZSet => "zset",
            Self::Hash => "hash",
            Self::Stream => "stream",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Key-value store commands used by cache records.
///
/// Implementations follow Redis semantics: list indices may be negative to
/// count from the tail, `lrange` stops are inclusive, and a list whose last
/// element is removed stops existing.
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Gets a value by key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Sets a value with an optional TTL.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Deletes a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Returns whether the key exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Returns the type tag of the key.
    async fn key_type(&self, key: &str) -> Result<KeyType>;

    /// Prepends values to a list, returning its new length.
    async fn lpush(&self, key: &str, values: &[Vec<u8>]) -> Result<usize>;

    /// Appends values to a list, returning its new length.
    async fn rpush(&self, key: &str, values: &[Vec<u8>]) -> Result<usize>;

    /// Removes and returns the first element of a list.
    async fn lpop(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Removes and returns the last element of a list.
    async fn rpop(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Returns the elements between `start` and `stop`, both inclusive.
    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<Vec<u8>>>;

    /// Returns the length of a list.
    async fn llen(&self, key: &str) -> Result<usize>;

    /// Removes occurrences of `value`: `count > 0` from the head, `count < 0`
    /// from the tail, `0` removes all. Returns the number removed.
    async fn lrem(&self, key: &str, count: isize, value: &[u8]) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_known_tags() {
        assert_eq!(KeyType::from_tag("list"), KeyType::List);
        assert_eq!(KeyType::from_tag("string"), KeyType::String);
        assert_eq!(KeyType::from_tag("none"), KeyType::None);
    }

    #[test]
    fn test_key_type_unknown_tag_is_preserved() {
        let kind = KeyType::from_tag("ReJSON-RL");
        assert_eq!(kind, KeyType::Other("ReJSON-RL".to_string()));
        assert_eq!(kind.to_string(), "ReJSON-RL");
    }
}
