use chrono::{DateTime, Duration, Utc};

use super::WeatherSnapshot;

/// Maximum age of a stored snapshot before it must be refetched.
pub const WEATHER_TTL: Duration = Duration::minutes(5);

/// A snapshot is fresh while it is strictly younger than `ttl`.
///
/// Staleness is evaluated at read time; nothing evicts old snapshots.
pub fn is_snapshot_fresh(snapshot: &WeatherSnapshot, now: DateTime<Utc>, ttl: Duration) -> bool {
    now - snapshot.observed_at < ttl
}
