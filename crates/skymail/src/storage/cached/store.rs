//! The cache store and its indices.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use skymail_core::storage::Resolver;
use skymail_core::subscription::{City, Subscription, Token, TokenKind, User, WeatherSnapshot};

use super::index::Index;

/// Write-through cache in front of a [`Resolver`].
///
/// - **Reads**: check the index, on miss fetch from the resolver and index
///   the entity under every key it supports. Misses are never cached.
/// - **Writes**: persist to the resolver first, then update the indices.
///   A failed write leaves the indices untouched.
/// - **Deletes**: persist first, then purge every index entry that refers
///   to the deleted entity, including entries keyed by its owner.
///
/// Each index is an LRU map with its own lock.
///
/// A miss records the write generation before going to the resolver and
/// only fills the indices if no write has completed since. Every write
/// bumps the generation and updates the indices while holding the same
/// lock, so a read that raced a delete or replacement cannot bring the old
/// row back. The generation lock is always taken before any index lock.
///
/// # Type Parameters
///
/// * `R` - The underlying resolver
pub struct CachedStore<R: Resolver> {
    pub(super) resolver: Arc<R>,
    pub(super) cities_by_id: Index<Uuid, City>,
    /// Keyed by the ASCII-lowercased city name.
    pub(super) cities_by_name: Index<String, City>,
    pub(super) users_by_id: Index<Uuid, User>,
    pub(super) users_by_email: Index<String, User>,
    pub(super) tokens_by_value: Index<String, Token>,
    pub(super) tokens_by_owner: Index<(Uuid, TokenKind), Token>,
    pub(super) subscriptions_by_user: Index<Uuid, Subscription>,
    pub(super) weather_by_city: Index<Uuid, WeatherSnapshot>,
    generation: Mutex<u64>,
}

impl<R: Resolver> CachedStore<R> {
    /// Creates a cache store with `capacity` entries per index.
    pub fn new(resolver: Arc<R>, capacity: NonZeroUsize) -> Self {
        Self {
            resolver,
            cities_by_id: Index::new(capacity),
            cities_by_name: Index::new(capacity),
            users_by_id: Index::new(capacity),
            users_by_email: Index::new(capacity),
            tokens_by_value: Index::new(capacity),
            tokens_by_owner: Index::new(capacity),
            subscriptions_by_user: Index::new(capacity),
            weather_by_city: Index::new(capacity),
            generation: Mutex::new(0),
        }
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The write generation a miss must still observe when it fills.
    pub(super) fn generation(&self) -> u64 {
        *self.lock_generation()
    }

    /// Applies the index updates of a write that the resolver accepted.
    pub(super) fn after_write<T>(&self, apply: impl FnOnce() -> T) -> T {
        let mut generation = self.lock_generation();
        *generation = generation.wrapping_add(1);
        apply()
    }

    /// Fills the indices with a row read at `observed`. Returns `false`,
    /// leaving the indices alone, when a write completed in between.
    pub(super) fn fill_if_current(&self, observed: u64, fill: impl FnOnce()) -> bool {
        let generation = self.lock_generation();
        if *generation != observed {
            return false;
        }
        fill();
        true
    }
}

pub(super) fn city_name_key(name: &str) -> String {
    name.to_ascii_lowercase()
}
