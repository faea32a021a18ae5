use async_trait::async_trait;

use crate::subscription::{City, MailMessage, WeatherSnapshot};

use super::Result;

/// Resolves a city name to coordinates and an external place ID.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Geocode a canonical city name into a new, unsaved [`City`].
    ///
    /// Fails with [`super::UpstreamError::NoMatch`] if nothing matches.
    async fn resolve_city(&self, name: &str) -> Result<City>;
}

/// Fetches current conditions for a city.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch a new, unsaved snapshot of the current weather at the city.
    async fn current_conditions(&self, city: &City) -> Result<WeatherSnapshot>;
}

/// Single-shot email delivery.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<()>;
}
