//! Cached city lookups.

use async_trait::async_trait;
use uuid::Uuid;

use skymail_core::storage::{CityRepository, Resolver, Result};
use skymail_core::subscription::City;

use super::store::{city_name_key, CachedStore};

impl<R: Resolver> CachedStore<R> {
    fn index_city(&self, city: &City) {
        if let Some(previous) = self.cities_by_id.pop(&city.id) {
            if !previous.name.eq_ignore_ascii_case(&city.name) {
                self.cities_by_name.pop(&city_name_key(&previous.name));
            }
        }
        self.cities_by_id.put(city.id, city.clone());
        self.cities_by_name
            .put(city_name_key(&city.name), city.clone());
    }
}

#[async_trait]
impl<R> CityRepository for CachedStore<R>
where
    R: Resolver + 'static,
{
    async fn get_city(&self, id: Uuid) -> Result<Option<City>> {
        if let Some(city) = self.cities_by_id.get(&id) {
            tracing::trace!(city_id = %id, "Cache hit for city");
            return Ok(Some(city));
        }

        tracing::trace!(city_id = %id, "Cache miss for city");
        let observed = self.generation();
        let city = self.resolver.get_city(id).await?;
        if let Some(ref c) = city {
            if !self.fill_if_current(observed, || self.index_city(c)) {
                tracing::trace!(city_id = %id, "Skipped filling city raced by a write");
            }
        }
        Ok(city)
    }

    async fn get_city_by_name(&self, name: &str) -> Result<Option<City>> {
        if let Some(city) = self.cities_by_name.get(&city_name_key(name)) {
            tracing::trace!(city = %name, "Cache hit for city name");
            return Ok(Some(city));
        }

        tracing::trace!(city = %name, "Cache miss for city name");
        let observed = self.generation();
        let city = self.resolver.get_city_by_name(name).await?;
        if let Some(ref c) = city {
            if !self.fill_if_current(observed, || self.index_city(c)) {
                tracing::trace!(city = %name, "Skipped filling city raced by a write");
            }
        }
        Ok(city)
    }

    async fn save_city(&self, city: &City) -> Result<()> {
        self.resolver.save_city(city).await?;
        self.after_write(|| self.index_city(city));

        tracing::debug!(city_id = %city.id, city = %city.name, "City saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use skymail_core::subscription::Coordinates;

    use super::*;
    use crate::storage::testing::CountingResolver;

    fn store() -> (Arc<CountingResolver>, CachedStore<CountingResolver>) {
        let backing = Arc::new(CountingResolver::new());
        let store = CachedStore::new(backing.clone(), NonZeroUsize::new(64).unwrap());
        (backing, store)
    }

    fn paris() -> City {
        City::new(
            "paris",
            Coordinates {
                latitude: 48.8566,
                longitude: 2.3522,
            },
            "place-paris",
        )
    }

    #[tokio::test]
    async fn test_get_city_by_name_populates_both_indices() {
        let (backing, store) = store();
        let city = paris();
        backing.inner.save_city(&city).await.unwrap();

        assert_eq!(store.get_city_by_name("Paris").await.unwrap(), Some(city.clone()));
        assert_eq!(backing.reads(), 1);

        // Second lookup by name and a lookup by id are both hits
        assert_eq!(store.get_city_by_name("PARIS").await.unwrap(), Some(city.clone()));
        assert_eq!(store.get_city(city.id).await.unwrap(), Some(city));
        assert_eq!(backing.reads(), 1);
    }

    #[tokio::test]
    async fn test_missing_city_is_not_cached() {
        let (backing, store) = store();

        assert!(store.get_city_by_name("atlantis").await.unwrap().is_none());
        assert!(store.get_city_by_name("atlantis").await.unwrap().is_none());
        assert_eq!(backing.reads(), 2);
    }

    #[tokio::test]
    async fn test_save_city_writes_through() {
        let (backing, store) = store();
        let city = paris();

        store.save_city(&city).await.unwrap();

        assert_eq!(backing.city_saves.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_city_by_name("paris").await.unwrap(), Some(city));
        assert_eq!(backing.reads(), 0);
    }

    #[tokio::test]
    async fn test_failed_save_leaves_cache_unchanged() {
        let (backing, store) = store();
        backing.set_fail_writes(true);
        let city = paris();

        assert!(store.save_city(&city).await.is_err());
        assert!(store.get_city(city.id).await.unwrap().is_none());
        assert_eq!(backing.reads(), 1);
    }

    #[tokio::test]
    async fn test_miss_racing_save_keeps_newer_row() {
        let (backing, store) = store();
        let store = Arc::new(store);
        let city = paris();
        let moved = City {
            latitude: 48.8600,
            ..city.clone()
        };
        backing.inner.save_city(&city).await.unwrap();

        let gate = backing.pause_next_read();
        let reader = tokio::spawn({
            let store = store.clone();
            async move { store.get_city_by_name("paris").await }
        });
        gate.reached().await;
        store.save_city(&moved).await.unwrap();
        gate.release();

        assert_eq!(reader.await.unwrap().unwrap(), Some(city.clone()));
        assert_eq!(store.get_city(city.id).await.unwrap(), Some(moved.clone()));
        assert_eq!(store.get_city_by_name("PARIS").await.unwrap(), Some(moved));
    }
}
