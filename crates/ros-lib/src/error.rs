//! Error types for the resource optimization client

use thiserror::Error;

/// Errors raised while talking to the ROS and inventory APIs.
///
/// A provider entity that is missing for a system is not an error: the
/// record is kept with its own fields and the miss is only counted.
#[derive(Error, Debug)]
pub enum RosError {
    /// Non-success HTTP status; displays the response status text
    #[error("{status_text}")]
    Http { status: u16, status_text: String },

    /// The request never produced a response (connect, timeout, TLS)
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The response body was not the expected JSON
    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Query parameters out of range (zero page or per_page)
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A page violated `items.len() <= per_page` or `page >= 1`
    #[error("invalid page: {0}")]
    InvalidPage(String),

    /// The current user could not be resolved
    #[error("authentication error: {0}")]
    Auth(String),
}

impl RosError {
    /// HTTP status code for `Http` errors
    pub fn status(&self) -> Option<u16> {
        match self {
            RosError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<url::ParseError> for RosError {
    fn from(error: url::ParseError) -> Self {
        RosError::InvalidUrl(error.to_string())
    }
}

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, RosError>;
