//! Write-through cache over a [`Resolver`](skymail_core::storage::Resolver).
//!
//! [`CachedStore`] implements every repository trait by decorating an
//! underlying resolver:
//!
//! - **Reads**: Check the index first, on miss fetch from the resolver and index the result
//! - **Writes**: Persist to the resolver, then overwrite every index entry for the entity
//! - **Deletes**: Persist to the resolver, then purge every index entry that refers to it
//!
//! # Example
//!
//! ```ignore
//! use std::num::NonZeroUsize;
//! use std::sync::Arc;
//!
//! let repo = Arc::new(SqliteRepository::new("skymail.db").await?);
//! let store = CachedStore::new(repo, NonZeroUsize::new(10_000).unwrap());
//! ```

mod city;
mod index;
mod store;
mod subscription;
mod token;
mod user;
mod weather;

pub use store::CachedStore;
