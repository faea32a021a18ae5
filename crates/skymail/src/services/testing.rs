//! Collaborator doubles and a fully wired service graph for tests.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Utc;

use skymail_core::integrations::{
    Geocoder, MailTransport, Result as UpstreamResult, UpstreamError, WeatherProvider,
};
use skymail_core::storage::Resolver;
use skymail_core::subscription::{City, Coordinates, MailMessage, WeatherSnapshot};

use super::{NotificationDispatcher, SubscriptionOrchestrator, TokenLifecycle, WeatherService};
use crate::storage::testing::CountingResolver;
use crate::storage::CachedStore;
use crate::templates::EmailTemplates;

/// Geocoder that resolves every name except those in `unknown`.
#[derive(Default)]
pub struct MockGeocoder {
    pub calls: AtomicUsize,
    pub unknown: Mutex<HashSet<String>>,
}

impl MockGeocoder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn forget(&self, name: &str) {
        self.unknown.lock().unwrap().insert(name.to_string());
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn resolve_city(&self, name: &str) -> UpstreamResult<City> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unknown.lock().unwrap().contains(name) {
            return Err(UpstreamError::NoMatch(name.to_string()));
        }
        Ok(City::new(
            name,
            Coordinates {
                latitude: 48.8566,
                longitude: 2.3522,
            },
            format!("place-{name}"),
        ))
    }
}

/// Weather provider that reports the same conditions, observed now.
#[derive(Default)]
pub struct MockWeatherProvider {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl MockWeatherProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for MockWeatherProvider {
    async fn current_conditions(&self, city: &City) -> UpstreamResult<WeatherSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(UpstreamError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(WeatherSnapshot::new(city.id, Utc::now(), 21.5, 40, "Sunny"))
    }
}

/// Mail transport that records messages and tracks peak concurrency.
#[derive(Default)]
pub struct MockMailer {
    pub sent: Mutex<Vec<MailMessage>>,
    pub failing_recipients: Mutex<HashSet<String>>,
    pub fail_all: AtomicBool,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl MockMailer {
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<MailMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.to.iter().any(|to| to == recipient))
            .collect()
    }

    pub fn fail_for(&self, recipient: &str) {
        self.failing_recipients
            .lock()
            .unwrap()
            .insert(recipient.to_string());
    }
}

#[async_trait]
impl MailTransport for MockMailer {
    async fn send(&self, message: &MailMessage) -> UpstreamResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(StdDuration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let rejected = self.fail_all.load(Ordering::SeqCst)
            || message
                .to
                .iter()
                .any(|to| self.failing_recipients.lock().unwrap().contains(to));
        if rejected {
            return Err(UpstreamError::Mail("mailbox unavailable".to_string()));
        }

        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub const FRONTEND_URL: &str = "https://weather.example.com";

/// Every service wired over a cached [`CountingResolver`].
pub struct Harness {
    pub backing: Arc<CountingResolver>,
    pub store: Arc<dyn Resolver>,
    pub geocoder: Arc<MockGeocoder>,
    pub provider: Arc<MockWeatherProvider>,
    pub mailer: Arc<MockMailer>,
    pub tokens: Arc<TokenLifecycle>,
    pub weather: Arc<WeatherService>,
    pub orchestrator: SubscriptionOrchestrator,
    pub dispatcher: NotificationDispatcher,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_concurrency(4)
    }

    pub fn with_concurrency(concurrency: usize) -> Self {
        let backing = Arc::new(CountingResolver::new());
        let store: Arc<dyn Resolver> = Arc::new(CachedStore::new(
            backing.clone(),
            NonZeroUsize::new(256).unwrap(),
        ));
        let geocoder = Arc::new(MockGeocoder::default());
        let provider = Arc::new(MockWeatherProvider::default());
        let mailer = Arc::new(MockMailer::default());
        let templates = Arc::new(EmailTemplates::new(FRONTEND_URL).unwrap());

        let tokens = Arc::new(TokenLifecycle::new(store.clone()));
        let weather = Arc::new(WeatherService::new(
            store.clone(),
            geocoder.clone(),
            provider.clone(),
        ));
        let orchestrator = SubscriptionOrchestrator::new(
            store.clone(),
            weather.clone(),
            tokens.clone(),
            mailer.clone(),
            templates.clone(),
        );
        let dispatcher = NotificationDispatcher::new(
            store.clone(),
            weather.clone(),
            mailer.clone(),
            templates,
            concurrency,
        );

        Self {
            backing,
            store,
            geocoder,
            provider,
            mailer,
            tokens,
            weather,
            orchestrator,
            dispatcher,
        }
    }
}
