//! Periodic weather report fan-out.
//!
//! Reports for one cadence are prepared sequentially, then sent through a
//! bounded pool of tasks. A failure for one subscriber is logged and counted
//! without affecting the others.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use skymail_core::integrations::MailTransport;
use skymail_core::storage::Resolver;
use skymail_core::subscription::{
    Cadence, City, MailMessage, ServiceError, Subscription, TokenKind, WeatherSnapshot,
};

use super::WeatherService;
use crate::templates::EmailTemplates;

type Forecast = Result<(City, WeatherSnapshot), ServiceError>;

/// Outcome of one dispatch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub cadence: Cadence,
    pub subscriptions: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Sends weather reports to every subscriber of a cadence.
pub struct NotificationDispatcher {
    store: Arc<dyn Resolver>,
    weather: Arc<WeatherService>,
    mailer: Arc<dyn MailTransport>,
    templates: Arc<EmailTemplates>,
    concurrency: usize,
}

impl NotificationDispatcher {
    /// `concurrency` bounds the number of sends in flight; zero is treated
    /// as one.
    pub fn new(
        store: Arc<dyn Resolver>,
        weather: Arc<WeatherService>,
        mailer: Arc<dyn MailTransport>,
        templates: Arc<EmailTemplates>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            weather,
            mailer,
            templates,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run_hourly(&self) -> Result<DispatchReport, ServiceError> {
        self.run(Cadence::Hourly).await
    }

    pub async fn run_daily(&self) -> Result<DispatchReport, ServiceError> {
        self.run(Cadence::Daily).await
    }

    /// Sends one report to each subscriber with `cadence`.
    ///
    /// # Errors
    ///
    /// Only fails if the subscriptions cannot be listed. Per-subscriber
    /// failures are reported in [`DispatchReport::failed`].
    pub async fn run(&self, cadence: Cadence) -> Result<DispatchReport, ServiceError> {
        let subscriptions = self.store.list_subscriptions(cadence).await?;
        let mut report = DispatchReport {
            cadence,
            subscriptions: subscriptions.len(),
            sent: 0,
            failed: 0,
        };

        let mut forecasts: HashMap<Uuid, Forecast> = HashMap::new();
        let mut messages = Vec::with_capacity(subscriptions.len());
        for subscription in &subscriptions {
            match self.prepare(subscription, &mut forecasts).await {
                Ok(message) => messages.push((subscription.user_id, message)),
                Err(err) => {
                    tracing::warn!(
                        user_id = %subscription.user_id,
                        %cadence,
                        error = %err,
                        "Failed to prepare weather report"
                    );
                    report.failed += 1;
                }
            }
        }

        let (sent, failed) = self.send_all(messages).await;
        report.sent = sent;
        report.failed += failed;

        tracing::info!(
            %cadence,
            subscriptions = report.subscriptions,
            sent = report.sent,
            failed = report.failed,
            "Dispatch finished"
        );
        Ok(report)
    }

    async fn prepare(
        &self,
        subscription: &Subscription,
        forecasts: &mut HashMap<Uuid, Forecast>,
    ) -> Result<MailMessage, ServiceError> {
        let user = self
            .store
            .get_user(subscription.user_id)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        if !forecasts.contains_key(&user.city_id) {
            let forecast = self.forecast(user.city_id).await;
            forecasts.insert(user.city_id, forecast);
        }
        let (city, snapshot) = match forecasts.get(&user.city_id) {
            Some(Ok(forecast)) => forecast,
            Some(Err(err)) => return Err(err.clone()),
            None => return Err(ServiceError::NotFound("City")),
        };

        let cancel = self
            .store
            .get_token_for_user(user.id, TokenKind::Cancel)
            .await?
            .ok_or(ServiceError::NotFound("Cancel token"))?;

        self.templates
            .weather_email(&user.email, subscription.cadence, city, snapshot, &cancel)
    }

    async fn forecast(&self, city_id: Uuid) -> Forecast {
        let city = self
            .store
            .get_city(city_id)
            .await?
            .ok_or(ServiceError::NotFound("City"))?;
        let snapshot = self.weather.current_weather(&city).await?;
        Ok((city, snapshot))
    }

    async fn send_all(&self, messages: Vec<(Uuid, MailMessage)>) -> (usize, usize) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (user_id, message) in messages {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let mailer = self.mailer.clone();
            tasks.spawn(async move {
                let result = mailer.send(&message).await;
                drop(permit);
                if let Err(ref err) = result {
                    tracing::warn!(user_id = %user_id, error = %err, "Failed to send weather report");
                }
                result.is_ok()
            });
        }

        let (mut sent, mut failed) = (0, 0);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => sent += 1,
                Ok(false) => failed += 1,
                Err(err) => {
                    tracing::error!(error = %err, "Send task panicked");
                    failed += 1;
                }
            }
        }
        (sent, failed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::Utc;
    use skymail_core::subscription::{SubscribeRequest, User};

    use super::*;
    use crate::services::testing::Harness;

    async fn subscriber(h: &Harness, email: &str, city: &str, cadence: Cadence) -> User {
        let request = SubscribeRequest {
            email: email.to_string(),
            city: city.to_string(),
            cadence,
        }
        .normalized()
        .unwrap();
        let user = h.orchestrator.invite_user(&request).await.unwrap();
        let code = h
            .store
            .get_token_for_user(user.id, TokenKind::Confirm)
            .await
            .unwrap()
            .unwrap()
            .value;
        h.orchestrator.confirm(&code).await.unwrap();
        user
    }

    fn reports(h: &Harness) -> Vec<MailMessage> {
        h.mailer
            .sent()
            .into_iter()
            .filter(|m| m.subject.ends_with("weather"))
            .collect()
    }

    #[tokio::test]
    async fn test_daily_run_sends_report_with_unsubscribe_link() {
        let h = Harness::new();
        let alice = subscriber(&h, "alice@example.com", "Paris", Cadence::Daily).await;
        let cancel = h
            .store
            .get_token_for_user(alice.id, TokenKind::Cancel)
            .await
            .unwrap()
            .unwrap();

        let report = h.dispatcher.run_daily().await.unwrap();

        assert_eq!(
            report,
            DispatchReport {
                cadence: Cadence::Daily,
                subscriptions: 1,
                sent: 1,
                failed: 0,
            }
        );
        let sent = reports(&h);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["alice@example.com".to_string()]);
        assert_eq!(sent[0].subject, "Your daily weather");
        assert!(sent[0].body.contains("Sunny"));
        assert!(sent[0]
            .body
            .contains(&format!("/unsubscribe/{}", cancel.value)));
    }

    #[tokio::test]
    async fn test_run_only_reaches_matching_cadence() {
        let h = Harness::new();
        subscriber(&h, "alice@example.com", "Paris", Cadence::Daily).await;
        subscriber(&h, "bob@example.com", "Paris", Cadence::Hourly).await;

        let report = h.dispatcher.run_hourly().await.unwrap();

        assert_eq!(report.subscriptions, 1);
        assert_eq!(report.sent, 1);
        let sent = reports(&h);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["bob@example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_unconfirmed_users_get_nothing() {
        let h = Harness::new();
        let request = SubscribeRequest {
            email: "carol@example.com".to_string(),
            city: "paris".to_string(),
            cadence: Cadence::Daily,
        };
        h.orchestrator.invite_user(&request).await.unwrap();

        let report = h.dispatcher.run_daily().await.unwrap();

        assert_eq!(report.subscriptions, 0);
        assert!(reports(&h).is_empty());
    }

    #[tokio::test]
    async fn test_weather_is_fetched_once_per_city() {
        let h = Harness::new();
        subscriber(&h, "a@example.com", "Paris", Cadence::Daily).await;
        subscriber(&h, "b@example.com", "Paris", Cadence::Daily).await;
        subscriber(&h, "c@example.com", "Lyon", Cadence::Daily).await;

        let report = h.dispatcher.run_daily().await.unwrap();

        assert_eq!(report.sent, 3);
        assert_eq!(h.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_send_failure_is_isolated() {
        let h = Harness::new();
        subscriber(&h, "a@example.com", "Paris", Cadence::Daily).await;
        subscriber(&h, "b@example.com", "Paris", Cadence::Daily).await;
        subscriber(&h, "c@example.com", "Paris", Cadence::Daily).await;
        h.mailer.fail_for("b@example.com");

        let report = h.dispatcher.run_daily().await.unwrap();

        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 1);
        let recipients: Vec<_> = reports(&h).into_iter().flat_map(|m| m.to).collect();
        assert!(recipients.contains(&"a@example.com".to_string()));
        assert!(recipients.contains(&"c@example.com".to_string()));
    }

    #[tokio::test]
    async fn test_weather_failure_skips_only_that_city() {
        let h = Harness::new();
        subscriber(&h, "a@example.com", "Paris", Cadence::Daily).await;
        subscriber(&h, "b@example.com", "Lyon", Cadence::Daily).await;
        // Paris gets a stored snapshot; Lyon has to hit the failing provider
        let paris = h.weather.resolve_city("paris").await.unwrap();
        h.store
            .save_weather(&WeatherSnapshot::new(
                paris.id,
                Utc::now(),
                18.0,
                50,
                "Clear",
            ))
            .await
            .unwrap();
        h.provider.fail.store(true, Ordering::SeqCst);

        let report = h.dispatcher.run_daily().await.unwrap();

        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        let recipients: Vec<_> = reports(&h).into_iter().flat_map(|m| m.to).collect();
        assert_eq!(recipients, vec!["a@example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_sends_never_exceed_concurrency() {
        let h = Harness::with_concurrency(2);
        for i in 0..8 {
            subscriber(&h, &format!("user{i}@example.com"), "Paris", Cadence::Hourly).await;
        }
        h.mailer.peak_in_flight.store(0, Ordering::SeqCst);

        let report = h.dispatcher.run_hourly().await.unwrap();

        assert_eq!(report.sent, 8);
        assert!(h.mailer.peak_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_empty_cadence_is_a_no_op() {
        let h = Harness::new();

        let report = h.dispatcher.run_hourly().await.unwrap();

        assert_eq!(report.subscriptions, 0);
        assert_eq!(report.sent, 0);
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_while_refreshing_counts_as_failed() {
        let h = Harness::new();
        subscriber(&h, "a@example.com", "Paris", Cadence::Daily).await;
        h.backing.set_fail_writes(true);

        let report = h.dispatcher.run_daily().await.unwrap();

        assert_eq!(report.subscriptions, 1);
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_alice_daily_lifecycle_in_paris() {
        let h = Harness::new();
        let request = SubscribeRequest {
            email: "alice@example.com".to_string(),
            city: "Paris".to_string(),
            cadence: Cadence::Daily,
        }
        .normalized()
        .unwrap();

        let alice = h.orchestrator.invite_user(&request).await.unwrap();
        assert_eq!(h.geocoder.calls(), 1);
        let confirm = h
            .store
            .get_token_for_user(alice.id, TokenKind::Confirm)
            .await
            .unwrap()
            .unwrap();
        let cancel = h
            .store
            .get_token_for_user(alice.id, TokenKind::Cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(confirm.cadence, Some(Cadence::Daily));
        let verification = h.mailer.sent_to("alice@example.com");
        assert_eq!(verification.len(), 1);
        assert!(verification[0].body.contains(&confirm.value));

        let subscription = h.orchestrator.confirm(&confirm.value).await.unwrap();
        assert_eq!(subscription.cadence, Cadence::Daily);
        assert_eq!(subscription.user_id, alice.id);
        assert!(h.store.get_token(&confirm.value).await.unwrap().is_none());

        let report = h.dispatcher.run_daily().await.unwrap();
        assert_eq!(report.sent, 1);
        let sent = reports(&h);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("Sunny"));
        assert!(sent[0].body.contains(&cancel.value));

        h.orchestrator.cancel(&cancel.value).await.unwrap();
        assert!(h.store.get_user(alice.id).await.unwrap().is_none());
        assert!(h
            .store
            .get_subscription_for_user(alice.id)
            .await
            .unwrap()
            .is_none());
        assert!(h.store.get_token(&cancel.value).await.unwrap().is_none());

        let report = h.dispatcher.run_daily().await.unwrap();
        assert_eq!(report.subscriptions, 0);
        assert_eq!(reports(&h).len(), 1);
    }
}
