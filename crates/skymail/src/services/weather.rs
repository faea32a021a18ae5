//! City resolution and current weather with a freshness window.

use std::sync::Arc;

use chrono::Utc;

use skymail_core::integrations::{Geocoder, UpstreamError, WeatherProvider};
use skymail_core::storage::{RepositoryError, Resolver};
use skymail_core::subscription::{
    canonical_city_name, is_snapshot_fresh, City, ServiceError, WeatherSnapshot, WEATHER_TTL,
};

/// Resolves cities through the store first and the geocoder second, and
/// serves weather snapshots no older than the freshness window.
pub struct WeatherService {
    store: Arc<dyn Resolver>,
    geocoder: Arc<dyn Geocoder>,
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherService {
    pub fn new(
        store: Arc<dyn Resolver>,
        geocoder: Arc<dyn Geocoder>,
        provider: Arc<dyn WeatherProvider>,
    ) -> Self {
        Self {
            store,
            geocoder,
            provider,
        }
    }

    /// Returns the stored city with this name, geocoding and saving it on
    /// first sight.
    ///
    /// # Errors
    ///
    /// Fails with [`UpstreamError::NoMatch`] when the name is empty or the
    /// geocoder knows no such place.
    pub async fn resolve_city(&self, name: &str) -> Result<City, ServiceError> {
        let name = canonical_city_name(name);
        if name.is_empty() {
            return Err(UpstreamError::NoMatch(name).into());
        }

        if let Some(city) = self.store.get_city_by_name(&name).await? {
            return Ok(city);
        }

        let city = self.geocoder.resolve_city(&name).await?;
        match self.store.save_city(&city).await {
            Ok(()) => {
                tracing::info!(city = %city.name, place_id = %city.place_id, "City geocoded");
                Ok(city)
            }
            // Another request stored the same city first.
            Err(err @ RepositoryError::AlreadyExists { .. }) => {
                tracing::debug!(city = %name, "City saved concurrently, re-reading");
                self.store
                    .get_city_by_name(&name)
                    .await?
                    .ok_or(ServiceError::Store(err))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the city's stored snapshot while it is fresh, otherwise
    /// fetches and stores a new one.
    pub async fn current_weather(&self, city: &City) -> Result<WeatherSnapshot, ServiceError> {
        if let Some(snapshot) = self.store.get_weather_for_city(city.id).await? {
            if is_snapshot_fresh(&snapshot, Utc::now(), WEATHER_TTL) {
                tracing::trace!(city = %city.name, "Serving stored weather");
                return Ok(snapshot);
            }
        }

        let snapshot = self.provider.current_conditions(city).await?;
        self.store.save_weather(&snapshot).await?;

        tracing::debug!(
            city = %city.name,
            temperature = snapshot.temperature,
            "Weather refreshed"
        );
        Ok(snapshot)
    }

    /// Resolves `city_name` and returns it with its current weather.
    pub async fn get_or_fetch_current_weather(
        &self,
        city_name: &str,
    ) -> Result<(City, WeatherSnapshot), ServiceError> {
        let city = self.resolve_city(city_name).await?;
        let snapshot = self.current_weather(&city).await?;
        Ok((city, snapshot))
    }
}
