//! Wire types for the Google Geocoding and Weather APIs.
//!
//! Only the fields this service reads are modelled.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GeocodeResult {
    pub place_id: String,
    pub geometry: Geometry,
}

#[derive(Debug, Deserialize)]
pub(super) struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Deserialize)]
pub(super) struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CurrentConditions {
    pub temperature: Temperature,
    pub relative_humidity: i32,
    pub weather_condition: WeatherCondition,
}

#[derive(Debug, Deserialize)]
pub(super) struct Temperature {
    pub degrees: f64,
}

#[derive(Debug, Deserialize)]
pub(super) struct WeatherCondition {
    pub description: LocalizedText,
}

#[derive(Debug, Deserialize)]
pub(super) struct LocalizedText {
    pub text: String,
}
