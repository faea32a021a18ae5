use thiserror::Error;

use crate::integrations::UpstreamError;
use crate::storage::RepositoryError;

use super::TokenKind;

/// Errors raised while issuing, verifying, or redeeming tokens.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TokenError {
    #[error("Token not found")]
    NotFound,
    #[error("Token expired")]
    Expired,
    #[error("Expected a {expected} token, got a {actual} token")]
    WrongKind {
        expected: TokenKind,
        actual: TokenKind,
    },
    #[error("Failed to generate token code: {0}")]
    Generation(String),
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

/// Errors surfaced by the subscription services to their callers.
///
/// Token failures that reveal why a code was rejected (absent, expired,
/// wrong kind) collapse into [`ServiceError::InvalidToken`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("User already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid token")]
    InvalidToken,
    #[error("Upstream failure: {0}")]
    Upstream(#[from] UpstreamError),
    #[error("Store failure: {0}")]
    Store(#[from] RepositoryError),
    #[error("Failed to generate token code: {0}")]
    TokenGeneration(String),
    #[error("Failed to render email: {0}")]
    Render(String),
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::NotFound | TokenError::Expired | TokenError::WrongKind { .. } => {
                ServiceError::InvalidToken
            }
            TokenError::Generation(reason) => ServiceError::TokenGeneration(reason),
            TokenError::Storage(err) => ServiceError::Store(err),
        }
    }
}
