//! Errors raised by the scheduling service client.

use coxswain_core::CoxswainError;
use thiserror::Error;

/// Failure talking to the scheduling service.
#[derive(Error, Debug, Clone)]
pub enum SchedulingError {
    /// Connection, DNS, or timeout trouble before any response arrived
    #[error("transport error: {0}")]
    Transport(String),

    /// Credentials were refused or the session token went bad
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Non-success response with a structured error payload; the message
    /// is the server's own wording
    #[error("scheduling service error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The service refused a reservation operation (double-booking and
    /// the like); shown to the member verbatim
    #[error("{message}")]
    Rejected { message: String },

    /// The referenced entity does not exist on the server
    #[error("not found: {0}")]
    NotFound(String),

    /// The response body did not match the expected shape
    #[error("decode error: {0}")]
    Decode(String),
}

impl SchedulingError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for SchedulingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<SchedulingError> for CoxswainError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::Transport(message) => CoxswainError::transport(message),
            SchedulingError::Auth(message) => CoxswainError::auth(message),
            SchedulingError::Api { status, message } => {
                CoxswainError::transport(format!("HTTP {}: {}", status, message))
            }
            SchedulingError::Rejected { message } => CoxswainError::rejected(message),
            SchedulingError::NotFound(what) => CoxswainError::not_found("reservation", what),
            SchedulingError::Decode(message) => CoxswainError::Serialization {
                format: "JSON".to_string(),
                message,
            },
        }
    }
}

/// A type alias for `Result<T, SchedulingError>`.
pub type Result<T> = std::result::Result<T, SchedulingError>;
