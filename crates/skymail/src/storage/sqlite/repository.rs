//! SQLite repository implementation.
//!
//! Implements the repository traits from `skymail_core::storage` using SQLite.

use async_trait::async_trait;
use rusqlite::Row;
use tokio_rusqlite::Connection;
use uuid::Uuid;

use skymail_core::storage::{
    CityRepository, RepositoryError, Result, SubscriptionRepository, TokenRepository,
    UserRepository, WeatherRepository,
};
use skymail_core::subscription::{
    Cadence, City, Subscription, Token, TokenKind, User, WeatherSnapshot,
};

use super::conversions::{
    format_datetime, row_to_city, row_to_subscription, row_to_token, row_to_user, row_to_weather,
};
use super::error::map_tokio_rusqlite_error_with_id;
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// SQLite-based repository implementation.
///
/// Provides async access to SQLite storage for all entity types.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Creates a new repository with a file-based database.
    ///
    /// The database file will be created if it doesn't exist.
    /// Schema tables are created automatically.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Creates a new repository with an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Initialize the database schema.
    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))
    }

    /// Runs a single-row query, mapping "no rows" to `None`.
    async fn query_optional<T, P>(
        &self,
        sql: &'static str,
        params: P,
        map_row: fn(&Row<'_>) -> rusqlite::Result<T>,
        entity_type: &'static str,
        id: String,
    ) -> Result<Option<T>>
    where
        T: Send + 'static,
        P: rusqlite::Params + Send + 'static,
    {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(sql).map_err(wrap_err)?;
                match stmt.query_row(params, map_row) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(wrap_err(e)),
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, entity_type, id))
    }

    /// Executes a write statement. A delete that touches no row fails with
    /// `NotFound`.
    async fn execute<P>(
        &self,
        sql: &'static str,
        params: P,
        require_row: bool,
        entity_type: &'static str,
        id: String,
    ) -> Result<()>
    where
        P: rusqlite::Params + Send + 'static,
    {
        self.conn
            .call(move |conn| {
                let rows = conn.execute(sql, params).map_err(wrap_err)?;
                if require_row && rows == 0 {
                    Err(wrap_err(rusqlite::Error::QueryReturnedNoRows))
                } else {
                    Ok(())
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, entity_type, id))
    }
}

// ============================================================================
// CityRepository implementation
// ============================================================================

#[async_trait]
impl CityRepository for SqliteRepository {
    async fn get_city(&self, id: Uuid) -> Result<Option<City>> {
        self.query_optional(
            schema::SELECT_CITY_BY_ID,
            [id.to_string()],
            row_to_city,
            "City",
            id.to_string(),
        )
        .await
    }

    async fn get_city_by_name(&self, name: &str) -> Result<Option<City>> {
        self.query_optional(
            schema::SELECT_CITY_BY_NAME,
            [name.to_string()],
            row_to_city,
            "City",
            name.to_string(),
        )
        .await
    }

    async fn save_city(&self, city: &City) -> Result<()> {
        let params = (
            city.id.to_string(),
            city.name.clone(),
            city.longitude,
            city.latitude,
            city.place_id.clone(),
        );
        self.execute(schema::UPSERT_CITY, params, false, "City", city.name.clone())
            .await
    }
}

// ============================================================================
// UserRepository implementation
// ============================================================================

#[async_trait]
impl UserRepository for SqliteRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.query_optional(
            schema::SELECT_USER_BY_ID,
            [id.to_string()],
            row_to_user,
            "User",
            id.to_string(),
        )
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_optional(
            schema::SELECT_USER_BY_EMAIL,
            [email.to_string()],
            row_to_user,
            "User",
            email.to_string(),
        )
        .await
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let params = (
            user.id.to_string(),
            user.email.clone(),
            user.city_id.to_string(),
        );
        self.execute(schema::UPSERT_USER, params, false, "User", user.email.clone())
            .await
    }

    /// Subscriptions and tokens go with the user through `ON DELETE CASCADE`.
    async fn delete_user(&self, id: Uuid) -> Result<()> {
        self.execute(
            schema::DELETE_USER,
            [id.to_string()],
            true,
            "User",
            id.to_string(),
        )
        .await
    }
}

// ============================================================================
// TokenRepository implementation
// ============================================================================

#[async_trait]
impl TokenRepository for SqliteRepository {
    async fn get_token(&self, value: &str) -> Result<Option<Token>> {
        self.query_optional(
            schema::SELECT_TOKEN_BY_VALUE,
            [value.to_string()],
            row_to_token,
            "Token",
            value.to_string(),
        )
        .await
    }

    async fn get_token_for_user(&self, user_id: Uuid, kind: TokenKind) -> Result<Option<Token>> {
        self.query_optional(
            schema::SELECT_TOKEN_BY_USER_AND_KIND,
            [user_id.to_string(), kind.as_str().to_string()],
            row_to_token,
            "Token",
            format!("{user_id}/{kind}"),
        )
        .await
    }

    async fn replace_token(&self, token: &Token) -> Result<Option<Token>> {
        let value = token.value.clone();
        let kind = token.kind.as_str().to_string();
        let user_id = token.user_id.to_string();
        let cadence = token.cadence.map(|c| c.as_str().to_string());
        let expires_at = format_datetime(&token.expires_at);
        let token_value = token.value.clone();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;

                let retired = match tx.query_row(
                    schema::SELECT_TOKEN_BY_USER_AND_KIND,
                    [&user_id, &kind],
                    row_to_token,
                ) {
                    Ok(existing) => Some(existing),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(wrap_err(e)),
                };

                if let Some(ref existing) = retired {
                    tx.execute(schema::DELETE_TOKEN, [&existing.value])
                        .map_err(wrap_err)?;
                }

                tx.execute(
                    schema::INSERT_TOKEN,
                    rusqlite::params![value, kind, user_id, cadence, expires_at],
                )
                .map_err(wrap_err)?;

                tx.commit().map_err(wrap_err)?;
                Ok(retired)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Token", token_value))
    }

    async fn delete_token(&self, value: &str) -> Result<()> {
        self.execute(
            schema::DELETE_TOKEN,
            [value.to_string()],
            true,
            "Token",
            value.to_string(),
        )
        .await
    }
}

// ============================================================================
// SubscriptionRepository implementation
// ============================================================================

#[async_trait]
impl SubscriptionRepository for SqliteRepository {
    async fn get_subscription_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>> {
        self.query_optional(
            schema::SELECT_SUBSCRIPTION_BY_USER,
            [user_id.to_string()],
            row_to_subscription,
            "Subscription",
            user_id.to_string(),
        )
        .await
    }

    async fn list_subscriptions(&self, cadence: Cadence) -> Result<Vec<Subscription>> {
        let cadence_str = cadence.as_str().to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(schema::SELECT_SUBSCRIPTIONS_BY_CADENCE)
                    .map_err(wrap_err)?;
                let rows = stmt
                    .query_map([&cadence_str], row_to_subscription)
                    .map_err(wrap_err)?;

                let mut subscriptions = Vec::new();
                for row_result in rows {
                    subscriptions.push(row_result.map_err(wrap_err)?);
                }
                Ok(subscriptions)
            })
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))
    }

    async fn save_subscription(&self, subscription: &Subscription) -> Result<()> {
        let params = (
            subscription.id.to_string(),
            subscription.cadence.as_str().to_string(),
            subscription.user_id.to_string(),
        );
        self.execute(
            schema::UPSERT_SUBSCRIPTION,
            params,
            false,
            "Subscription",
            subscription.user_id.to_string(),
        )
        .await
    }

    async fn delete_subscription(&self, id: Uuid) -> Result<()> {
        self.execute(
            schema::DELETE_SUBSCRIPTION,
            [id.to_string()],
            true,
            "Subscription",
            id.to_string(),
        )
        .await
    }
}

// ============================================================================
// WeatherRepository implementation
// ============================================================================

#[async_trait]
impl WeatherRepository for SqliteRepository {
    async fn get_weather_for_city(&self, city_id: Uuid) -> Result<Option<WeatherSnapshot>> {
        self.query_optional(
            schema::SELECT_WEATHER_BY_CITY,
            [city_id.to_string()],
            row_to_weather,
            "Weather",
            city_id.to_string(),
        )
        .await
    }

    async fn save_weather(&self, snapshot: &WeatherSnapshot) -> Result<()> {
        let params = (
            snapshot.id.to_string(),
            format_datetime(&snapshot.observed_at),
            snapshot.temperature,
            snapshot.humidity,
            snapshot.description.clone(),
            snapshot.city_id.to_string(),
        );
        self.execute(
            schema::UPSERT_WEATHER,
            params,
            false,
            "Weather",
            snapshot.city_id.to_string(),
        )
        .await
    }
}
