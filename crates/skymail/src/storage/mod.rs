//! Storage backend implementations.
//!
//! This module provides concrete implementations of the repository traits
//! defined in `skymail_core::storage`, plus the write-through cache that
//! sits in front of them.
//!
//! # Feature Flags
//!
//! - `sqlite` (default): SQLite storage backend using `rusqlite` and `tokio-rusqlite`
//!
//! Without `sqlite`, the binary falls back to the in-memory backend.
//!
//! # Examples
//!
//! Build with SQLite (default):
//! ```bash
//! cargo build -p skymail
//! ```
//!
//! Build with the in-memory backend only:
//! ```bash
//! cargo build -p skymail --no-default-features
//! ```

pub mod cached;
#[cfg_attr(all(feature = "sqlite", not(test)), allow(dead_code))]
pub mod inmemory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
pub(crate) mod testing;

pub use cached::CachedStore;
#[cfg_attr(all(feature = "sqlite", not(test)), allow(unused_imports))]
pub use inmemory::InMemoryRepository;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepository;
