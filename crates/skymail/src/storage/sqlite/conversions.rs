//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite rows and domain types.
//! These are testable in isolation without database access.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

use skymail_core::subscription::{
    Cadence, City, Subscription, Token, TokenKind, User, WeatherSnapshot,
};

/// Convert a SQLite row to a City.
///
/// Expected columns: id, name, longitude, latitude, place_id
pub fn row_to_city(row: &Row) -> rusqlite::Result<City> {
    let id: String = row.get(0)?;

    Ok(City {
        id: parse_uuid(&id)?,
        name: row.get(1)?,
        longitude: row.get(2)?,
        latitude: row.get(3)?,
        place_id: row.get(4)?,
    })
}

/// Convert a SQLite row to a User.
///
/// Expected columns: id, email, city_id
pub fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let email: String = row.get(1)?;
    let city_id: String = row.get(2)?;

    Ok(User {
        id: parse_uuid(&id)?,
        email,
        city_id: parse_uuid(&city_id)?,
    })
}

/// Convert a SQLite row to a Token.
///
/// Expected columns: value, kind, user_id, cadence, expires_at
pub fn row_to_token(row: &Row) -> rusqlite::Result<Token> {
    let value: String = row.get(0)?;
    let kind: String = row.get(1)?;
    let user_id: String = row.get(2)?;
    let cadence: Option<String> = row.get(3)?;
    let expires_at: String = row.get(4)?;

    Ok(Token {
        value,
        kind: parse_token_kind(&kind)?,
        user_id: parse_uuid(&user_id)?,
        cadence: cadence.as_deref().map(parse_cadence).transpose()?,
        expires_at: parse_datetime(&expires_at)?,
    })
}

/// Convert a SQLite row to a Subscription.
///
/// Expected columns: id, cadence, user_id
pub fn row_to_subscription(row: &Row) -> rusqlite::Result<Subscription> {
    let id: String = row.get(0)?;
    let cadence: String = row.get(1)?;
    let user_id: String = row.get(2)?;

    Ok(Subscription {
        id: parse_uuid(&id)?,
        cadence: parse_cadence(&cadence)?,
        user_id: parse_uuid(&user_id)?,
    })
}

/// Convert a SQLite row to a WeatherSnapshot.
///
/// Expected columns: id, observed_at, temperature, humidity, description, city_id
pub fn row_to_weather(row: &Row) -> rusqlite::Result<WeatherSnapshot> {
    let id: String = row.get(0)?;
    let observed_at: String = row.get(1)?;
    let city_id: String = row.get(5)?;

    Ok(WeatherSnapshot {
        id: parse_uuid(&id)?,
        observed_at: parse_datetime(&observed_at)?,
        temperature: row.get(2)?,
        humidity: row.get(3)?,
        description: row.get(4)?,
        city_id: parse_uuid(&city_id)?,
    })
}

fn conversion_error(err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
}

/// Parse a UUID from string.
fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(conversion_error)
}

/// Parse a datetime from RFC 3339 string.
fn parse_datetime(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_error)
}

fn parse_cadence(s: &str) -> rusqlite::Result<Cadence> {
    s.parse().map_err(conversion_error)
}

fn parse_token_kind(s: &str) -> rusqlite::Result<TokenKind> {
    s.parse::<TokenKind>().map_err(|msg| {
        conversion_error(std::io::Error::new(std::io::ErrorKind::InvalidData, msg))
    })
}

/// Format a DateTime<Utc> for SQLite storage (RFC 3339).
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_datetime_round_trips() {
        let dt = DateTime::parse_from_rfc3339("2024-06-15T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let formatted = format_datetime(&dt);
        assert!(formatted.starts_with("2024-06-15"));
        assert_eq!(parse_datetime(&formatted).unwrap(), dt);
    }

    #[test]
    fn test_parse_uuid_invalid() {
        assert!(parse_uuid("not-a-uuid").is_err());
    }

    #[test]
    fn test_parse_datetime_invalid() {
        assert!(parse_datetime("not-a-datetime").is_err());
    }

    #[test]
    fn test_parse_cadence() {
        assert_eq!(parse_cadence("hourly").unwrap(), Cadence::Hourly);
        assert_eq!(parse_cadence("daily").unwrap(), Cadence::Daily);
        assert!(parse_cadence("weekly").is_err());
    }

    #[test]
    fn test_parse_token_kind() {
        assert_eq!(parse_token_kind("confirm").unwrap(), TokenKind::Confirm);
        assert_eq!(parse_token_kind("cancel").unwrap(), TokenKind::Cancel);
        assert!(parse_token_kind("").is_err());
    }
}
