use async_trait::async_trait;
use uuid::Uuid;

use crate::subscription::{Cadence, City, Subscription, Token, TokenKind, User, WeatherSnapshot};

use super::Result;

/// Repository for city operations.
#[async_trait]
pub trait CityRepository: Send + Sync {
    /// Gets a city by its ID.
    async fn get_city(&self, id: Uuid) -> Result<Option<City>>;

    /// Gets a city by its canonical name, ignoring case.
    async fn get_city_by_name(&self, name: &str) -> Result<Option<City>>;

    /// Creates or overwrites a city.
    async fn save_city(&self, city: &City) -> Result<()>;
}

/// Repository for user operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Gets a user by their ID.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Gets a user by their email address.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Creates or overwrites a user.
    async fn save_user(&self, user: &User) -> Result<()>;

    /// Deletes a user together with their subscription and tokens.
    async fn delete_user(&self, id: Uuid) -> Result<()>;
}

/// Repository for confirm and cancel tokens.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Gets a token by its code value.
    async fn get_token(&self, value: &str) -> Result<Option<Token>>;

    /// Gets the outstanding token of a kind for a user.
    async fn get_token_for_user(&self, user_id: Uuid, kind: TokenKind) -> Result<Option<Token>>;

    /// Stores a token, atomically retiring any token of the same kind
    /// already held by the same user.
    ///
    /// Returns the retired token, if there was one.
    async fn replace_token(&self, token: &Token) -> Result<Option<Token>>;

    /// Deletes a token by its code value.
    async fn delete_token(&self, value: &str) -> Result<()>;
}

/// Repository for subscriptions.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Gets the subscription owned by a user.
    async fn get_subscription_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>>;

    /// Lists every subscription with the given cadence.
    async fn list_subscriptions(&self, cadence: Cadence) -> Result<Vec<Subscription>>;

    /// Creates or overwrites a subscription.
    async fn save_subscription(&self, subscription: &Subscription) -> Result<()>;

    /// Deletes a subscription by its ID.
    async fn delete_subscription(&self, id: Uuid) -> Result<()>;
}

/// Repository for weather snapshots. One snapshot is kept per city.
#[async_trait]
pub trait WeatherRepository: Send + Sync {
    /// Gets the current snapshot for a city.
    async fn get_weather_for_city(&self, city_id: Uuid) -> Result<Option<WeatherSnapshot>>;

    /// Stores a snapshot, replacing the city's previous one.
    async fn save_weather(&self, snapshot: &WeatherSnapshot) -> Result<()>;
}

/// Every repository the services need, behind a single bound.
pub trait Resolver:
    CityRepository + UserRepository + TokenRepository + SubscriptionRepository + WeatherRepository
{
}

impl<T> Resolver for T where
    T: CityRepository
        + UserRepository
        + TokenRepository
        + SubscriptionRepository
        + WeatherRepository
{
}
