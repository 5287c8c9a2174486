//! Cache record and entity repository helpers.
//!
//! - [`cache::CacheRecord`] binds one cache key to a `CacheClient` and stores
//!   JSON values or manipulates the key as a list.
//! - [`storage::EntityRepository`] runs CRUD for any `Entity` over a
//!   `Session`, with change-tracked updates.
//!
//! Pure types, traits, and statement builders live in `kvdao_core`; this crate
//! holds the I/O backends.

pub mod cache;
pub mod config;
pub mod storage;

pub use config::Config;
