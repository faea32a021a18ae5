//! Google Maps Platform client: geocoding and current conditions.

mod types;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;

use skymail_core::integrations::{Geocoder, Result, UpstreamError, WeatherProvider};
use skymail_core::subscription::{City, Coordinates, WeatherSnapshot};

use types::{CurrentConditions, GeocodeResponse};

const MAPS_API_BASE: &str = "https://maps.googleapis.com";
const WEATHER_API_BASE: &str = "https://weather.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Geocoder and weather provider backed by Google's HTTP APIs.
pub struct GoogleMapsClient {
    client: reqwest::Client,
    api_key: String,
    maps_base_url: String,
    weather_base_url: String,
}

impl GoogleMapsClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_urls(api_key, MAPS_API_BASE, WEATHER_API_BASE)
    }

    /// Points both APIs at other hosts, e.g. a local mock server.
    pub fn with_base_urls(api_key: &str, maps_base_url: &str, weather_base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| UpstreamError::Request(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            maps_base_url: maps_base_url.trim_end_matches('/').to_string(),
            weather_base_url: weather_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| UpstreamError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Geocoder for GoogleMapsClient {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn resolve_city(&self, name: &str) -> Result<City> {
        let url = format!("{}/maps/api/geocode/json", self.maps_base_url);
        let response: GeocodeResponse = self
            .get_json(
                &url,
                &[("address", name.to_string()), ("key", self.api_key.clone())],
            )
            .await?;

        match response.status.as_str() {
            "OK" | "ZERO_RESULTS" => {}
            other => {
                return Err(UpstreamError::Request(format!(
                    "{other}: {}",
                    response.error_message.unwrap_or_default()
                )));
            }
        }

        let first = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::NoMatch(name.to_string()))?;

        Ok(City::new(
            name,
            Coordinates {
                latitude: first.geometry.location.lat,
                longitude: first.geometry.location.lng,
            },
            first.place_id,
        ))
    }
}

#[async_trait]
impl WeatherProvider for GoogleMapsClient {
    #[tracing::instrument(skip(self, city), fields(city = %city.name), level = "debug")]
    async fn current_conditions(&self, city: &City) -> Result<WeatherSnapshot> {
        let url = format!("{}/v1/currentConditions:lookup", self.weather_base_url);
        let conditions: CurrentConditions = self
            .get_json(
                &url,
                &[
                    ("key", self.api_key.clone()),
                    ("location.latitude", city.latitude.to_string()),
                    ("location.longitude", city.longitude.to_string()),
                ],
            )
            .await?;

        Ok(WeatherSnapshot::new(
            city.id,
            Utc::now(),
            conditions.temperature.degrees,
            conditions.relative_humidity,
            conditions.weather_condition.description.text,
        ))
    }
}
