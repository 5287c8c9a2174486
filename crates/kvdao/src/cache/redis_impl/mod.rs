//! Redis cache backend implementation.
//!
//! Provides a distributed cache using Redis for multi-instance deployments.
//! Supports connection pooling, TTL, and list commands.

mod cache;
mod error;

pub use cache::RedisCache;
pub use error::map_redis_error;
