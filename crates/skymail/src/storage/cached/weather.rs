//! Cached weather snapshots.
//!
//! The cache keeps the latest snapshot per city regardless of age. Callers
//! decide whether it is fresh enough.

use async_trait::async_trait;
use uuid::Uuid;

use skymail_core::storage::{Resolver, Result, WeatherRepository};
use skymail_core::subscription::WeatherSnapshot;

use super::store::CachedStore;

#[async_trait]
impl<R> WeatherRepository for CachedStore<R>
where
    R: Resolver + 'static,
{
    async fn get_weather_for_city(&self, city_id: Uuid) -> Result<Option<WeatherSnapshot>> {
        if let Some(snapshot) = self.weather_by_city.get(&city_id) {
            tracing::trace!(city_id = %city_id, "Cache hit for weather");
            return Ok(Some(snapshot));
        }

        tracing::trace!(city_id = %city_id, "Cache miss for weather");
        let observed = self.generation();
        let snapshot = self.resolver.get_weather_for_city(city_id).await?;
        if let Some(ref s) = snapshot {
            let filled = self.fill_if_current(observed, || {
                self.weather_by_city.put(city_id, s.clone());
            });
            if !filled {
                tracing::trace!(city_id = %city_id, "Skipped filling weather raced by a write");
            }
        }
        Ok(snapshot)
    }

    async fn save_weather(&self, snapshot: &WeatherSnapshot) -> Result<()> {
        self.resolver.save_weather(snapshot).await?;
        self.after_write(|| {
            self.weather_by_city.put(snapshot.city_id, snapshot.clone());
        });

        tracing::debug!(
            city_id = %snapshot.city_id,
            observed_at = %snapshot.observed_at,
            "Weather saved"
        );
        Ok(())
    }
}
