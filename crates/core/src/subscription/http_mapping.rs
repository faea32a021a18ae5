//! Pure functions for mapping service errors to HTTP status codes.

use super::ServiceError;

/// Maps a [`ServiceError`] to an HTTP status code.
///
/// - `AlreadyExists` -> 409 (Conflict)
/// - `InvalidToken` -> 404 (Not Found)
/// - `NotFound` -> 404 (Not Found)
/// - everything else -> 400 (Bad Request)
///
/// # Examples
///
/// ```
/// use skymail_core::subscription::{service_error_to_status_code, ServiceError};
///
/// assert_eq!(service_error_to_status_code(&ServiceError::InvalidToken), 404);
/// ```
pub fn service_error_to_status_code(error: &ServiceError) -> u16 {
    match error {
        ServiceError::AlreadyExists(_) => 409,
        ServiceError::InvalidToken | ServiceError::NotFound(_) => 404,
        ServiceError::Upstream(_)
        | ServiceError::Store(_)
        | ServiceError::TokenGeneration(_)
        | ServiceError::Render(_) => 400,
    }
}
