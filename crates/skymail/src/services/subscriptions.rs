//! Subscribe, confirm, and unsubscribe flows.

use std::sync::Arc;

use skymail_core::integrations::MailTransport;
use skymail_core::storage::{RepositoryError, Resolver};
use skymail_core::subscription::{ServiceError, SubscribeRequest, Subscription, User};

use super::{TokenLifecycle, WeatherService};
use crate::templates::EmailTemplates;

/// Drives a user from subscribe request to active subscription and back out.
pub struct SubscriptionOrchestrator {
    store: Arc<dyn Resolver>,
    weather: Arc<WeatherService>,
    tokens: Arc<TokenLifecycle>,
    mailer: Arc<dyn MailTransport>,
    templates: Arc<EmailTemplates>,
}

impl SubscriptionOrchestrator {
    pub fn new(
        store: Arc<dyn Resolver>,
        weather: Arc<WeatherService>,
        tokens: Arc<TokenLifecycle>,
        mailer: Arc<dyn MailTransport>,
        templates: Arc<EmailTemplates>,
    ) -> Self {
        Self {
            store,
            weather,
            tokens,
            mailer,
            templates,
        }
    }

    /// Registers the email against the requested city and sends it a
    /// confirm code.
    ///
    /// The request is expected to be normalized already. No subscription
    /// exists until the confirm code is redeemed.
    ///
    /// # Errors
    ///
    /// Fails with [`ServiceError::AlreadyExists`] if the email is taken,
    /// before anything is written.
    pub async fn invite_user(&self, request: &SubscribeRequest) -> Result<User, ServiceError> {
        let city = self.weather.resolve_city(&request.city).await?;

        if self.store.get_user_by_email(&request.email).await?.is_some() {
            return Err(ServiceError::AlreadyExists(request.email.clone()));
        }

        let user = User::new(&request.email, city.id);
        match self.store.save_user(&user).await {
            Ok(()) => {}
            Err(RepositoryError::AlreadyExists { .. }) => {
                return Err(ServiceError::AlreadyExists(request.email.clone()));
            }
            Err(err) => return Err(err.into()),
        }

        let confirm = self.tokens.issue_confirm(user.id, request.cadence).await?;
        self.tokens.issue_cancel(user.id).await?;

        let message =
            self.templates
                .verification_email(&user.email, &city, request.cadence, &confirm)?;
        self.mailer.send(&message).await?;

        tracing::info!(
            user_id = %user.id,
            city = %city.name,
            cadence = %request.cadence,
            "Verification email sent"
        );
        Ok(user)
    }

    /// Redeems a confirm code into an active subscription.
    pub async fn confirm(&self, value: &str) -> Result<Subscription, ServiceError> {
        Ok(self.tokens.redeem_confirm(value).await?)
    }

    /// Redeems a cancel code, removing the user and all they own.
    pub async fn cancel(&self, value: &str) -> Result<(), ServiceError> {
        Ok(self.tokens.redeem_cancel(value).await?)
    }
}
