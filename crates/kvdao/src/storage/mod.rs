//! Storage backends and the generic entity repository.
//!
//! The repository works over any `kvdao_core::storage::Session`; SQLite is
//! the bundled session implementation.
//!
//! # Feature Flags
//!
//! - `sqlite` (default): SQLite session using `rusqlite` and `tokio-rusqlite`

mod repository;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use repository::EntityRepository;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSession;
