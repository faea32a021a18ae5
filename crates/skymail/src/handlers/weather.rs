//! Current weather endpoint.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use skymail_core::integrations::UpstreamError;
use skymail_core::subscription::{RequestError, ServiceError};

use crate::{handlers::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    #[serde(default)]
    pub city: String,
}

/// Current weather for a city (GET /weather?city=).
pub async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<Value>, AppError> {
    if query.city.trim().is_empty() {
        return Err(RequestError::MissingCity.into());
    }

    let (city, snapshot) = state
        .weather
        .get_or_fetch_current_weather(&query.city)
        .await
        .map_err(|err| match err {
            ServiceError::Upstream(UpstreamError::NoMatch(_)) => {
                AppError::from(ServiceError::NotFound("City"))
            }
            other => AppError::bad_request(other),
        })?;

    tracing::debug!(city = %city.name, "Weather served");
    Ok(Json(json!({
        "temperature": snapshot.temperature,
        "humidity": snapshot.humidity,
        "description": snapshot.description,
    })))
}
