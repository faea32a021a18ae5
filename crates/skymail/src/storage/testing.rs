//! Instrumented resolver for tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use uuid::Uuid;

use skymail_core::storage::{
    CityRepository, RepositoryError, Result, SubscriptionRepository, TokenRepository,
    UserRepository, WeatherRepository,
};
use skymail_core::subscription::{
    Cadence, City, Subscription, Token, TokenKind, User, WeatherSnapshot,
};

use super::inmemory::InMemoryRepository;

/// Holds one read after it has fetched from the store until released.
#[derive(Default)]
pub struct ReadGate {
    reached: Notify,
    release: Notify,
}

impl ReadGate {
    /// Waits until the held read has its result in hand.
    pub async fn reached(&self) {
        self.reached.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// Wraps [`InMemoryRepository`] and counts every call that reaches it.
///
/// Setting `fail_writes` makes every write fail with
/// [`RepositoryError::ConnectionFailed`] without touching the data.
/// `collide_token_writes` makes that many upcoming token replacements fail
/// with [`RepositoryError::AlreadyExists`].
#[derive(Default)]
pub struct CountingResolver {
    pub inner: InMemoryRepository,
    pub reads: AtomicUsize,
    pub city_saves: AtomicUsize,
    pub user_saves: AtomicUsize,
    pub user_deletes: AtomicUsize,
    pub token_writes: AtomicUsize,
    pub subscription_saves: AtomicUsize,
    pub weather_saves: AtomicUsize,
    pub lists: AtomicUsize,
    pub fail_writes: AtomicBool,
    pub collide_token_writes: AtomicUsize,
    read_gate: Mutex<Option<Arc<ReadGate>>>,
}

impl CountingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Holds the next read between the store lookup and its return.
    pub fn pause_next_read(&self) -> Arc<ReadGate> {
        let gate = Arc::new(ReadGate::default());
        *self.read_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    async fn hold<T>(&self, result: T) -> T {
        let gate = self.read_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }
        result
    }

    fn collide(&self, token: &Token) -> Result<()> {
        let pending = self
            .collide_token_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "Token",
                id: token.value.clone(),
            });
        }
        Ok(())
    }

    fn write(&self, counter: &AtomicUsize) -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::ConnectionFailed(
                "store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CityRepository for CountingResolver {
    async fn get_city(&self, id: Uuid) -> Result<Option<City>> {
        self.read();
        let result = self.inner.get_city(id).await;
        self.hold(result).await
    }

    async fn get_city_by_name(&self, name: &str) -> Result<Option<City>> {
        self.read();
        let result = self.inner.get_city_by_name(name).await;
        self.hold(result).await
    }

    async fn save_city(&self, city: &City) -> Result<()> {
        self.write(&self.city_saves)?;
        self.inner.save_city(city).await
    }
}

#[async_trait]
impl UserRepository for CountingResolver {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.read();
        let result = self.inner.get_user(id).await;
        self.hold(result).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.read();
        let result = self.inner.get_user_by_email(email).await;
        self.hold(result).await
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        self.write(&self.user_saves)?;
        self.inner.save_user(user).await
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        self.write(&self.user_deletes)?;
        self.inner.delete_user(id).await
    }
}

#[async_trait]
impl TokenRepository for CountingResolver {
    async fn get_token(&self, value: &str) -> Result<Option<Token>> {
        self.read();
        let result = self.inner.get_token(value).await;
        self.hold(result).await
    }

    async fn get_token_for_user(&self, user_id: Uuid, kind: TokenKind) -> Result<Option<Token>> {
        self.read();
        let result = self.inner.get_token_for_user(user_id, kind).await;
        self.hold(result).await
    }

    async fn replace_token(&self, token: &Token) -> Result<Option<Token>> {
        self.write(&self.token_writes)?;
        self.collide(token)?;
        self.inner.replace_token(token).await
    }

    async fn delete_token(&self, value: &str) -> Result<()> {
        self.write(&self.token_writes)?;
        self.inner.delete_token(value).await
    }
}

#[async_trait]
impl SubscriptionRepository for CountingResolver {
    async fn get_subscription_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>> {
        self.read();
        let result = self.inner.get_subscription_for_user(user_id).await;
        self.hold(result).await
    }

    async fn list_subscriptions(&self, cadence: Cadence) -> Result<Vec<Subscription>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list_subscriptions(cadence).await
    }

    async fn save_subscription(&self, subscription: &Subscription) -> Result<()> {
        self.write(&self.subscription_saves)?;
        self.inner.save_subscription(subscription).await
    }

    async fn delete_subscription(&self, id: Uuid) -> Result<()> {
        self.write(&self.subscription_saves)?;
        self.inner.delete_subscription(id).await
    }
}

#[async_trait]
impl WeatherRepository for CountingResolver {
    async fn get_weather_for_city(&self, city_id: Uuid) -> Result<Option<WeatherSnapshot>> {
        self.read();
        let result = self.inner.get_weather_for_city(city_id).await;
        self.hold(result).await
    }

    async fn save_weather(&self, snapshot: &WeatherSnapshot) -> Result<()> {
        self.write(&self.weather_saves)?;
        self.inner.save_weather(snapshot).await
    }
}
