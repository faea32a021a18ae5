use std::{env, num::NonZeroUsize};

use crate::integrations::mail::SmtpSettings;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file (default: "skymail.db")
    pub sqlite_path: String,
    /// Maximum entries per cache index (default: 10,000)
    pub cache_max_entries: NonZeroUsize,
    /// Base URL of the frontend that receives confirm and unsubscribe links
    /// (default: "http://localhost:3000")
    pub frontend_url: String,
    /// Google Maps Platform API key (default: empty)
    pub google_maps_api_key: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    /// Upper bound on concurrent report sends (default: 16)
    pub dispatch_concurrency: usize,
    /// UTC hour of the daily dispatch (default: 12)
    pub daily_dispatch_hour: u32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SQLITE_PATH` - SQLite database path (default: "skymail.db")
    /// - `CACHE_MAX_ENTRIES` - Maximum entries per cache index (default: 10,000)
    /// - `FRONTEND_URL` - Frontend base URL (default: "http://localhost:3000")
    /// - `GOOGLE_MAPS_API_KEY` - Geocoding and Weather API key
    /// - `SMTP_HOST` / `SMTP_PORT` - Mail relay (default: "localhost", 465)
    /// - `SMTP_USERNAME` / `SMTP_PASSWORD` - Relay credentials (optional)
    /// - `SMTP_FROM` - Sender address (default: "Skymail <weather@localhost>")
    /// - `DISPATCH_CONCURRENCY` - Concurrent sends per pass (default: 16)
    /// - `DAILY_DISPATCH_HOUR` - UTC hour of the daily pass, 0-23 (default: 12)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            sqlite_path: lookup("SQLITE_PATH").unwrap_or_else(|| "skymail.db".to_string()),
            cache_max_entries: lookup("CACHE_MAX_ENTRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(NonZeroUsize::new(10_000).unwrap_or(NonZeroUsize::MIN)),
            frontend_url: lookup("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            google_maps_api_key: lookup("GOOGLE_MAPS_API_KEY").unwrap_or_default(),
            smtp_host: lookup("SMTP_HOST").unwrap_or_else(|| "localhost".to_string()),
            smtp_port: lookup("SMTP_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(465),
            smtp_username: non_empty("SMTP_USERNAME"),
            smtp_password: non_empty("SMTP_PASSWORD"),
            smtp_from: lookup("SMTP_FROM")
                .unwrap_or_else(|| "Skymail <weather@localhost>".to_string()),
            dispatch_concurrency: lookup("DISPATCH_CONCURRENCY")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(16),
            daily_dispatch_hour: lookup("DAILY_DISPATCH_HOUR")
                .and_then(|v| v.parse().ok())
                .filter(|h| *h < 24)
                .unwrap_or(12),
        }
    }

    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
            from: self.smtp_from.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
