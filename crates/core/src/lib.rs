//! Functional core for kvdao.
//!
//! Everything in this crate is pure: traits describing the cache client and
//! the database session, the value types that flow through them, and the
//! functions that build statements and compute change sets. The I/O lives in
//! the `kvdao` crate.

pub mod cache;
pub mod storage;
