//! Cache backends and the per-key record wrapper.
//!
//! Backends implement `kvdao_core::cache::CacheClient` and are selected via
//! feature flags. Both may be enabled at once.
//!
//! # Feature Flags
//!
//! - `memory` (default): in-process LRU cache with lazy TTL expiry
//! - `redis`: Redis cache over a connection manager

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_impl;

mod record;

#[cfg(feature = "memory")]
pub use memory::MemoryCache;

#[cfg(feature = "redis")]
pub use redis_impl::RedisCache;

pub use record::CacheRecord;
