//! Email rendering.
//!
//! Bodies are askama templates under `templates/`. Links point at the
//! frontend, which forwards confirm and unsubscribe codes back to this
//! service.

use askama::Template;
use url::Url;

use skymail_core::subscription::{
    Cadence, City, MailMessage, ServiceError, Token, WeatherSnapshot,
};

pub const VERIFICATION_SUBJECT: &str = "Confirm your weather subscription";

/// Body of the email sent after a subscribe request.
#[derive(Template)]
#[template(path = "verification_email.html")]
struct VerificationEmail<'a> {
    city: &'a str,
    cadence: Cadence,
    code: &'a str,
    confirm_url: String,
}

/// Body of a periodic weather report.
#[derive(Template)]
#[template(path = "weather_email.html")]
struct WeatherEmail<'a> {
    city: &'a str,
    cadence: Cadence,
    temperature: f64,
    humidity: i32,
    description: &'a str,
    observed_at: String,
    unsubscribe_url: String,
}

/// Renders outgoing emails with links back to the frontend.
#[derive(Debug, Clone)]
pub struct EmailTemplates {
    frontend_url: String,
}

impl EmailTemplates {
    /// Creates a renderer for the given frontend base URL.
    ///
    /// # Errors
    ///
    /// Fails if `frontend_url` is not an absolute URL.
    pub fn new(frontend_url: &str) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(frontend_url)?;
        Ok(Self {
            frontend_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn confirm_url(&self, code: &str) -> String {
        format!("{}/confirm/{code}", self.frontend_url)
    }

    pub fn unsubscribe_url(&self, code: &str) -> String {
        format!("{}/unsubscribe/{code}", self.frontend_url)
    }

    /// Builds the verification email carrying the confirm code.
    pub fn verification_email(
        &self,
        to: &str,
        city: &City,
        cadence: Cadence,
        confirm: &Token,
    ) -> Result<MailMessage, ServiceError> {
        let body = VerificationEmail {
            city: &city.name,
            cadence,
            code: &confirm.value,
            confirm_url: self.confirm_url(&confirm.value),
        }
        .render()
        .map_err(|e| ServiceError::Render(e.to_string()))?;

        Ok(MailMessage {
            to: vec![to.to_string()],
            subject: VERIFICATION_SUBJECT.to_string(),
            body,
        })
    }

    /// Builds a weather report with the unsubscribe link for `cancel`.
    pub fn weather_email(
        &self,
        to: &str,
        cadence: Cadence,
        city: &City,
        snapshot: &WeatherSnapshot,
        cancel: &Token,
    ) -> Result<MailMessage, ServiceError> {
        let body = WeatherEmail {
            city: &city.name,
            cadence,
            temperature: snapshot.temperature,
            humidity: snapshot.humidity,
            description: &snapshot.description,
            observed_at: snapshot.observed_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            unsubscribe_url: self.unsubscribe_url(&cancel.value),
        }
        .render()
        .map_err(|e| ServiceError::Render(e.to_string()))?;

        Ok(MailMessage {
            to: vec![to.to_string()],
            subject: format!("Your {cadence} weather"),
            body,
        })
    }
}
