mod error;
mod http_mapping;
mod requests;
mod tokens;
mod types;
mod weather;

pub use error::{ServiceError, TokenError};
pub use http_mapping::service_error_to_status_code;
pub use requests::{canonical_city_name, RequestError, SubscribeRequest};
pub use tokens::{
    generate_code, is_token_expired, token_expiry, token_ttl, CANCEL_TOKEN_TTL, CONFIRM_TOKEN_TTL,
    TOKEN_CODE_LENGTH,
};
pub use types::{
    Cadence, City, Coordinates, MailMessage, ParseCadenceError, Subscription, Token, TokenKind,
    User, WeatherSnapshot,
};
pub use weather::{is_snapshot_fresh, WEATHER_TTL};
