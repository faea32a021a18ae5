use serde::Deserialize;

use super::Cadence;

/// Subscribe request as submitted by a user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    pub city: String,
    #[serde(alias = "frequency")]
    pub cadence: Cadence,
}

/// Reasons a subscribe request is rejected before reaching the services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Email is required")]
    MissingEmail,
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("City is required")]
    MissingCity,
}

impl SubscribeRequest {
    /// Validates the request and returns it with the email trimmed and the
    /// city canonicalised.
    pub fn normalized(self) -> Result<Self, RequestError> {
        let email = self.email.trim().to_string();
        if email.is_empty() {
            return Err(RequestError::MissingEmail);
        }
        if !is_plausible_email(&email) {
            return Err(RequestError::InvalidEmail(email));
        }

        let city = canonical_city_name(&self.city);
        if city.is_empty() {
            return Err(RequestError::MissingCity);
        }

        Ok(Self {
            email,
            city,
            cadence: self.cadence,
        })
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

/// Canonicalises a city name into slug form.
///
/// Lowercases ASCII letters, keeps ASCII alphanumerics, and collapses every
/// other run of characters into a single `-`. Leading and trailing dashes
/// are trimmed.
///
/// # Examples
///
/// ```
/// use skymail_core::subscription::canonical_city_name;
///
/// assert_eq!(canonical_city_name("  New York City "), "new-york-city");
/// assert_eq!(canonical_city_name("PARIS"), "paris");
/// ```
pub fn canonical_city_name(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
