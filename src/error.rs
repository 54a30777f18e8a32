//! DevSocial client error types

use std::time::Duration;

use serde_json::Value;

/// DevSocial client error types.
///
/// Every variant is `Clone`: a single in-flight request may resolve many
/// waiting callers, and each of them receives its own copy of the outcome.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DevSocialError {
    // Transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    // Backend errors
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        details: Option<Value>,
    },

    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// A protected endpoint answered 401; the session has been cleared.
    #[error("session expired, please sign in again")]
    SessionExpired,

    /// The backend answered 2xx but reported `success: false`.
    #[error("request rejected: {0}")]
    Rejected(String),

    // Data errors
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DevSocialError {
    /// HTTP status associated with this error, if the backend produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            DevSocialError::Api { status, .. } => Some(*status),
            DevSocialError::RateLimited { .. } => Some(429),
            DevSocialError::SessionExpired => Some(401),
            _ => None,
        }
    }

    /// Whether the backend rejected the request itself (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Server-provided error details, when the error body carried any.
    pub fn details(&self) -> Option<&Value> {
        match self {
            DevSocialError::Api { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DevSocialError {
    fn from(err: reqwest::Error) -> Self {
        DevSocialError::Http(err.to_string())
    }
}

/// Result type alias for DevSocial operations
pub type Result<T> = std::result::Result<T, DevSocialError>;
