use thiserror::Error;

/// Failures reported by geocoding, weather, or mail collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("No results found for city with name: '{0}'")]
    NoMatch(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),
}

/// Result type for collaborator calls.
pub type Result<T> = std::result::Result<T, UpstreamError>;
