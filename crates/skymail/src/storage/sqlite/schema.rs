//! SQLite schema definitions and SQL query constants.
//!
//! Pure data, no I/O. Uniqueness and cascade rules live here so the store
//! enforces them regardless of which caller writes.

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
PRAGMA foreign_keys = ON;

-- Cities table
CREATE TABLE IF NOT EXISTS cities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    longitude REAL NOT NULL,
    latitude REAL NOT NULL,
    place_id TEXT NOT NULL UNIQUE
);

-- Users table
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    city_id TEXT NOT NULL,
    FOREIGN KEY (city_id) REFERENCES cities(id)
);

-- Tokens table: at most one token per (user, kind)
CREATE TABLE IF NOT EXISTS tokens (
    value TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    user_id TEXT NOT NULL,
    cadence TEXT,
    expires_at TEXT NOT NULL,
    UNIQUE (user_id, kind),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- Subscriptions table: at most one per user
CREATE TABLE IF NOT EXISTS subscriptions (
    id TEXT PRIMARY KEY,
    cadence TEXT NOT NULL,
    user_id TEXT NOT NULL UNIQUE,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- Weather table: one current snapshot per city
CREATE TABLE IF NOT EXISTS weather (
    id TEXT PRIMARY KEY,
    observed_at TEXT NOT NULL,
    temperature REAL NOT NULL,
    humidity INTEGER NOT NULL,
    description TEXT NOT NULL,
    city_id TEXT NOT NULL UNIQUE,
    FOREIGN KEY (city_id) REFERENCES cities(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_subscriptions_cadence ON subscriptions(cadence);
CREATE INDEX IF NOT EXISTS idx_users_city_id ON users(city_id);
"#;

// City queries
pub const UPSERT_CITY: &str = r#"
INSERT INTO cities (id, name, longitude, latitude, place_id)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT (id) DO UPDATE SET
    name = excluded.name,
    longitude = excluded.longitude,
    latitude = excluded.latitude,
    place_id = excluded.place_id
"#;

pub const SELECT_CITY_BY_ID: &str = r#"
SELECT id, name, longitude, latitude, place_id
FROM cities
WHERE id = ?1
"#;

pub const SELECT_CITY_BY_NAME: &str = r#"
SELECT id, name, longitude, latitude, place_id
FROM cities
WHERE name = ?1
"#;

// User queries
pub const UPSERT_USER: &str = r#"
INSERT INTO users (id, email, city_id)
VALUES (?1, ?2, ?3)
ON CONFLICT (id) DO UPDATE SET
    email = excluded.email,
    city_id = excluded.city_id
"#;

pub const SELECT_USER_BY_ID: &str = r#"
SELECT id, email, city_id
FROM users
WHERE id = ?1
"#;

pub const SELECT_USER_BY_EMAIL: &str = r#"
SELECT id, email, city_id
FROM users
WHERE email = ?1
"#;

pub const DELETE_USER: &str = r#"
DELETE FROM users WHERE id = ?1
"#;

// Token queries
pub const INSERT_TOKEN: &str = r#"
INSERT INTO tokens (value, kind, user_id, cadence, expires_at)
VALUES (?1, ?2, ?3, ?4, ?5)
"#;

pub const SELECT_TOKEN_BY_VALUE: &str = r#"
SELECT value, kind, user_id, cadence, expires_at
FROM tokens
WHERE value = ?1
"#;

pub const SELECT_TOKEN_BY_USER_AND_KIND: &str = r#"
SELECT value, kind, user_id, cadence, expires_at
FROM tokens
WHERE user_id = ?1 AND kind = ?2
"#;

pub const DELETE_TOKEN: &str = r#"
DELETE FROM tokens WHERE value = ?1
"#;

// Subscription queries
pub const UPSERT_SUBSCRIPTION: &str = r#"
INSERT INTO subscriptions (id, cadence, user_id)
VALUES (?1, ?2, ?3)
ON CONFLICT (id) DO UPDATE SET
    cadence = excluded.cadence,
    user_id = excluded.user_id
"#;

pub const SELECT_SUBSCRIPTION_BY_USER: &str = r#"
SELECT id, cadence, user_id
FROM subscriptions
WHERE user_id = ?1
"#;

pub const SELECT_SUBSCRIPTIONS_BY_CADENCE: &str = r#"
SELECT id, cadence, user_id
FROM subscriptions
WHERE cadence = ?1
ORDER BY id
"#;

pub const DELETE_SUBSCRIPTION: &str = r#"
DELETE FROM subscriptions WHERE id = ?1
"#;

// Weather queries
pub const UPSERT_WEATHER: &str = r#"
INSERT INTO weather (id, observed_at, temperature, humidity, description, city_id)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT (city_id) DO UPDATE SET
    id = excluded.id,
    observed_at = excluded.observed_at,
    temperature = excluded.temperature,
    humidity = excluded.humidity,
    description = excluded.description
"#;

pub const SELECT_WEATHER_BY_CITY: &str = r#"
SELECT id, observed_at, temperature, humidity, description, city_id
FROM weather
WHERE city_id = ?1
"#;
