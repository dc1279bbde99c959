//! Error types for the calupsert tools.

use thiserror::Error;

/// Errors that can occur while normalizing, authenticating or upserting.
#[derive(Error, Debug)]
pub enum CalError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{provider} API error {status}: {message}")]
    RemoteService {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Token cache error: {0}")]
    TokenCache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Interrupted")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CalError {
    /// Process exit code for this error class.
    pub fn exit_code(&self) -> u8 {
        match self {
            CalError::Validation(_) => 2,
            CalError::Authentication(_) => 3,
            CalError::Authorization(_) => 4,
            CalError::NotFound(_) => 5,
            CalError::RemoteService { .. } | CalError::Transport(_) => 6,
            CalError::Cancelled => 130,
            CalError::TokenCache(_) | CalError::Config(_) | CalError::Io(_) => 1,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        CalError::Validation(msg.into())
    }
}

/// Result type alias for calupsert operations.
pub type CalResult<T> = Result<T, CalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_class() {
        assert_eq!(CalError::Validation("x".into()).exit_code(), 2);
        assert_eq!(CalError::Authentication("x".into()).exit_code(), 3);
        assert_eq!(CalError::Authorization("x".into()).exit_code(), 4);
        assert_eq!(CalError::NotFound("x".into()).exit_code(), 5);
        assert_eq!(
            CalError::RemoteService {
                provider: "Graph",
                status: 500,
                message: "boom".into()
            }
            .exit_code(),
            6
        );
        assert_eq!(CalError::Cancelled.exit_code(), 130);
        assert_eq!(CalError::Config("x".into()).exit_code(), 1);
    }

    #[test]
    fn remote_service_message_names_provider_and_status() {
        let err = CalError::RemoteService {
            provider: "Google Calendar",
            status: 409,
            message: "The requested identifier already exists.".into(),
        };
        assert_eq!(
            err.to_string(),
            "Google Calendar API error 409: The requested identifier already exists."
        );
    }
}
