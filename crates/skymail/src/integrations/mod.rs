//! Clients for the geocoding, weather, and mail collaborators.

pub mod google;
pub mod mail;

pub use google::GoogleMapsClient;
pub use mail::SmtpMailer;
