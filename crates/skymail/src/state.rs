//! Shared application state.
//!
//! Holds the services every handler and the scheduler share, wired over a
//! [`CachedStore`] in front of the configured storage backend.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;

use skymail_core::integrations::{Geocoder, MailTransport, WeatherProvider};
use skymail_core::storage::Resolver;

use crate::config::Config;
use crate::integrations::{GoogleMapsClient, SmtpMailer};
use crate::services::{
    NotificationDispatcher, SubscriptionOrchestrator, TokenLifecycle, WeatherService,
};
use crate::storage::CachedStore;
use crate::templates::EmailTemplates;

/// External collaborators the services talk to.
pub struct Collaborators {
    pub geocoder: Arc<dyn Geocoder>,
    pub weather: Arc<dyn WeatherProvider>,
    pub mailer: Arc<dyn MailTransport>,
}

/// Shared application state, cloned into each request handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SubscriptionOrchestrator>,
    pub weather: Arc<WeatherService>,
    pub dispatcher: Arc<NotificationDispatcher>,
    /// Shutdown signal sender for background tasks.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Wires the services over `store`.
    pub fn build(
        store: Arc<dyn Resolver>,
        collaborators: Collaborators,
        config: &Config,
    ) -> anyhow::Result<Self> {
        let templates = Arc::new(
            EmailTemplates::new(&config.frontend_url)
                .with_context(|| format!("invalid FRONTEND_URL: {}", config.frontend_url))?,
        );

        let tokens = Arc::new(TokenLifecycle::new(store.clone()));
        let weather = Arc::new(WeatherService::new(
            store.clone(),
            collaborators.geocoder,
            collaborators.weather,
        ));
        let orchestrator = Arc::new(SubscriptionOrchestrator::new(
            store.clone(),
            weather.clone(),
            tokens,
            collaborators.mailer.clone(),
            templates.clone(),
        ));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            store,
            weather.clone(),
            collaborators.mailer,
            templates,
            config.dispatch_concurrency,
        ));
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            orchestrator,
            weather,
            dispatcher,
            shutdown_tx,
        })
    }

    /// Google and SMTP clients built from `config`.
    pub fn collaborators(config: &Config) -> anyhow::Result<Collaborators> {
        if config.google_maps_api_key.is_empty() {
            tracing::warn!("GOOGLE_MAPS_API_KEY is not set; geocoding and weather lookups will fail");
        }
        let google = Arc::new(GoogleMapsClient::new(&config.google_maps_api_key)?);
        let mailer = Arc::new(
            SmtpMailer::new(&config.smtp_settings()).context("failed to configure SMTP")?,
        );

        Ok(Collaborators {
            geocoder: google.clone(),
            weather: google,
            mailer,
        })
    }

    /// Signal all background tasks to shut down.
    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(feature = "sqlite")]
mod sqlite_backend {
    use super::*;
    use crate::storage::SqliteRepository;

    impl AppState {
        /// Creates AppState with SQLite storage behind the cache.
        pub async fn new(config: &Config) -> anyhow::Result<Self> {
            let sqlite = Arc::new(
                SqliteRepository::new(&config.sqlite_path)
                    .await
                    .with_context(|| format!("failed to open {}", config.sqlite_path))?,
            );
            tracing::info!(path = %config.sqlite_path, "Using SQLite storage");

            let store = Arc::new(CachedStore::new(sqlite, config.cache_max_entries));
            Self::build(store, Self::collaborators(config)?, config)
        }
    }
}

#[cfg(not(feature = "sqlite"))]
mod inmemory_backend {
    use super::*;
    use crate::storage::InMemoryRepository;

    impl AppState {
        /// Creates AppState with in-memory storage behind the cache.
        pub async fn new(config: &Config) -> anyhow::Result<Self> {
            tracing::warn!("Using in-memory storage; data is lost on restart");

            let memory = Arc::new(InMemoryRepository::new());
            let store = Arc::new(CachedStore::new(memory, config.cache_max_entries));
            Self::build(store, Self::collaborators(config)?, config)
        }
    }
}
