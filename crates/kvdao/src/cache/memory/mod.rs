//! In-memory cache backend implementation.
//!
//! Provides a thread-safe in-memory key-value store with TTL support and
//! Redis-compatible list commands, for tests and single-process deployments.

mod cache;

pub use cache::MemoryCache;
