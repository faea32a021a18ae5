//! In-memory storage backend.
//!
//! Stores every table in a `HashMap` wrapped in `Arc<RwLock<_>>`. Used by the
//! test suites and as the fallback backend when the `sqlite` feature is off.
//!
//! # Example
//!
//! ```rust,ignore
//! use skymail::storage::inmemory::InMemoryRepository;
//!
//! let repo = InMemoryRepository::new();
//! // Use repo for testing...
//! ```

mod repository;

pub use repository::InMemoryRepository;
