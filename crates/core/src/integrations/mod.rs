//! Traits for the external collaborators: geocoder, weather provider, and
//! mail transport.

mod error;
mod traits;

pub use error::{Result, UpstreamError};
pub use traits::{Geocoder, MailTransport, WeatherProvider};
