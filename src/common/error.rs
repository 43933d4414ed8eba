use thiserror::Error;

use crate::client::models::app_state::Route;

/// Failure of a single remote call. Passed through to the caller untranslated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{kind} not found: {message}")]
    NotFound { kind: &'static str, message: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Maps an HTTP status and the server-provided message onto the taxonomy.
    pub fn from_status(status: u16, kind: &'static str, message: String) -> Self {
        match status {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound { kind, message },
            400 | 422 => ApiError::Validation(message),
            500..=599 => ApiError::Server { status, message },
            _ => ApiError::UnexpectedStatus { status, message },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::NetworkFailure(e.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("keyring unavailable and file fallback disabled")]
    FallbackDisabled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt session record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of a user-initiated form action in a view controller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{field} must be {expected}")]
    InvalidNumber { field: &'static str, expected: &'static str },

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("{0}")]
    Invalid(String),

    #[error("not permitted, redirecting to {0}")]
    NotPermitted(Route),

    #[error("{0} is not available for this account")]
    NotAvailable(&'static str),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}
