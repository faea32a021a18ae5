use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How often a subscriber receives a weather report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Cadence {
    Hourly,
    Daily,
}

impl Cadence {
    /// Returns the lowercase name used in storage and email subjects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::Hourly => "hourly",
            Cadence::Daily => "daily",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a cadence string is neither "hourly" nor "daily".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown cadence: {0}")]
pub struct ParseCadenceError(pub String);

impl FromStr for Cadence {
    type Err = ParseCadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(Cadence::Hourly),
            "daily" => Ok(Cadence::Daily),
            _ => Err(ParseCadenceError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Cadence {
    type Error = ParseCadenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The two token kinds a user holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Proves control of the email address; redeemed into a subscription.
    Confirm,
    /// Embedded in every report; redeemed into a full unsubscribe.
    Cancel,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Confirm => "confirm",
            TokenKind::Cancel => "cancel",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirm" => Ok(TokenKind::Confirm),
            "cancel" => Ok(TokenKind::Cancel),
            other => Err(format!("Unknown token kind: {other}")),
        }
    }
}

/// Geographic coordinates of a city.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A geocoded city. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: Uuid,
    /// Canonical (slug form) name, unique case-insensitively.
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
    /// External place identifier from the geocoder, globally unique.
    pub place_id: String,
}

impl City {
    /// Creates a new city with a fresh time-ordered ID.
    pub fn new(
        name: impl Into<String>,
        coordinates: Coordinates,
        place_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            longitude: coordinates.longitude,
            latitude: coordinates.latitude,
            place_id: place_id.into(),
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Sets a specific ID for this city (useful for testing).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// A registered email address bound to a city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub city_id: Uuid,
}

impl User {
    pub fn new(email: impl Into<String>, city_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            email: email.into(),
            city_id,
        }
    }
}

/// A confirm or cancel code owned by a user.
///
/// The code value is the token's identity. Only confirm tokens carry a
/// cadence; use [`Token::confirm`] and [`Token::cancel`] to build them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
    pub kind: TokenKind,
    pub user_id: Uuid,
    pub cadence: Option<Cadence>,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn confirm(
        value: impl Into<String>,
        user_id: Uuid,
        cadence: Cadence,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            value: value.into(),
            kind: TokenKind::Confirm,
            user_id,
            cadence: Some(cadence),
            expires_at,
        }
    }

    pub fn cancel(value: impl Into<String>, user_id: Uuid, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            kind: TokenKind::Cancel,
            user_id,
            cadence: None,
            expires_at,
        }
    }
}

/// An active weather subscription. Its cadence is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub cadence: Cadence,
    pub user_id: Uuid,
}

impl Subscription {
    pub fn new(user_id: Uuid, cadence: Cadence) -> Self {
        Self {
            id: Uuid::now_v7(),
            cadence,
            user_id,
        }
    }
}

/// The current observed weather for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub id: Uuid,
    pub observed_at: DateTime<Utc>,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: i32,
    pub description: String,
    pub city_id: Uuid,
}

impl WeatherSnapshot {
    pub fn new(
        city_id: Uuid,
        observed_at: DateTime<Utc>,
        temperature: f64,
        humidity: i32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            observed_at,
            temperature,
            humidity,
            description: description.into(),
            city_id,
        }
    }
}

/// An outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: Vec<String>,
    pub subject: String,
    /// HTML body.
    pub body: String,
}
