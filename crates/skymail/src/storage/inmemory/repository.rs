//! In-memory repository implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use skymail_core::storage::{
    CityRepository, RepositoryError, Result, SubscriptionRepository, TokenRepository,
    UserRepository, WeatherRepository,
};
use skymail_core::subscription::{
    Cadence, City, Subscription, Token, TokenKind, User, WeatherSnapshot,
};

/// In-memory storage backend for testing.
///
/// Uses HashMaps wrapped in `Arc<RwLock<_>>` for thread-safe access.
/// Data is not persisted and will be lost when the repository is dropped.
///
/// Uniqueness rules match the SQLite schema: city name and place ID, user
/// email, one token per (user, kind), one subscription per user, and one
/// weather snapshot per city.
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    cities: Arc<RwLock<HashMap<Uuid, City>>>,
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    subscriptions: Arc<RwLock<HashMap<Uuid, Subscription>>>,
    tokens: Arc<RwLock<HashMap<String, Token>>>,
    weather: Arc<RwLock<HashMap<Uuid, WeatherSnapshot>>>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self {
            cities: Arc::new(RwLock::new(HashMap::new())),
            users: Arc::new(RwLock::new(HashMap::new())),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            tokens: Arc::new(RwLock::new(HashMap::new())),
            weather: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl CityRepository for InMemoryRepository {
    async fn get_city(&self, id: Uuid) -> Result<Option<City>> {
        let cities = self.cities.read().await;
        Ok(cities.get(&id).cloned())
    }

    async fn get_city_by_name(&self, name: &str) -> Result<Option<City>> {
        let cities = self.cities.read().await;
        Ok(cities
            .values()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn save_city(&self, city: &City) -> Result<()> {
        let mut cities = self.cities.write().await;
        let conflict = cities.values().any(|c| {
            c.id != city.id
                && (c.name.eq_ignore_ascii_case(&city.name) || c.place_id == city.place_id)
        });
        if conflict {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "City",
                id: city.name.clone(),
            });
        }
        cities.insert(city.id, city.clone());
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "User",
                id: user.email.clone(),
            });
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        // Lock order: users, subscriptions, tokens.
        let mut users = self.users.write().await;
        let mut subscriptions = self.subscriptions.write().await;
        let mut tokens = self.tokens.write().await;

        if users.remove(&id).is_none() {
            return Err(RepositoryError::not_found("User", id));
        }
        subscriptions.retain(|_, s| s.user_id != id);
        tokens.retain(|_, t| t.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl TokenRepository for InMemoryRepository {
    async fn get_token(&self, value: &str) -> Result<Option<Token>> {
        let tokens = self.tokens.read().await;
        Ok(tokens.get(value).cloned())
    }

    async fn get_token_for_user(&self, user_id: Uuid, kind: TokenKind) -> Result<Option<Token>> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .values()
            .find(|t| t.user_id == user_id && t.kind == kind)
            .cloned())
    }

    async fn replace_token(&self, token: &Token) -> Result<Option<Token>> {
        let mut tokens = self.tokens.write().await;

        if let Some(existing) = tokens.get(&token.value) {
            if existing.user_id != token.user_id || existing.kind != token.kind {
                return Err(RepositoryError::AlreadyExists {
                    entity_type: "Token",
                    id: token.value.clone(),
                });
            }
        }

        let retired_value = tokens
            .values()
            .find(|t| t.user_id == token.user_id && t.kind == token.kind)
            .map(|t| t.value.clone());
        let retired = retired_value.and_then(|value| tokens.remove(&value));

        tokens.insert(token.value.clone(), token.clone());
        Ok(retired)
    }

    async fn delete_token(&self, value: &str) -> Result<()> {
        let mut tokens = self.tokens.write().await;
        if tokens.remove(value).is_none() {
            return Err(RepositoryError::not_found("Token", value));
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryRepository {
    async fn get_subscription_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions
            .values()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn list_subscriptions(&self, cadence: Cadence) -> Result<Vec<Subscription>> {
        let subscriptions = self.subscriptions.read().await;
        let mut matching: Vec<Subscription> = subscriptions
            .values()
            .filter(|s| s.cadence == cadence)
            .cloned()
            .collect();
        matching.sort_by_key(|s| s.id);
        Ok(matching)
    }

    async fn save_subscription(&self, subscription: &Subscription) -> Result<()> {
        let mut subscriptions = self.subscriptions.write().await;
        if subscriptions
            .values()
            .any(|s| s.id != subscription.id && s.user_id == subscription.user_id)
        {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "Subscription",
                id: subscription.user_id.to_string(),
            });
        }
        subscriptions.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn delete_subscription(&self, id: Uuid) -> Result<()> {
        let mut subscriptions = self.subscriptions.write().await;
        if subscriptions.remove(&id).is_none() {
            return Err(RepositoryError::not_found("Subscription", id));
        }
        Ok(())
    }
}

#[async_trait]
impl WeatherRepository for InMemoryRepository {
    async fn get_weather_for_city(&self, city_id: Uuid) -> Result<Option<WeatherSnapshot>> {
        let weather = self.weather.read().await;
        Ok(weather.get(&city_id).cloned())
    }

    async fn save_weather(&self, snapshot: &WeatherSnapshot) -> Result<()> {
        let mut weather = self.weather.write().await;
        weather.insert(snapshot.city_id, snapshot.clone());
        Ok(())
    }
}
