//! SQLite storage backend implementation.
//!
//! Provides a `Session` over SQLite using `rusqlite` for synchronous
//! operations and `tokio-rusqlite` for async wrapping.

mod conversions;
mod error;
mod session;

pub use error::map_tokio_rusqlite_error;
pub use session::SqliteSession;
