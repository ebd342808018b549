//! Error types for coursepulse-core

use thiserror::Error;

/// Main error type for the coursepulse-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed or missing input
    #[error("validation error: {0}")]
    Validation(String),

    /// Course not found
    #[error("course not found: {0}")]
    CourseNotFound(String),

    /// Any other referenced entity (route, user, content) not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Blocking store task panicked or was cancelled
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Status code used at the request boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::CourseNotFound(_) | Error::NotFound(_) => 404,
            Error::Database(_) | Error::Io(_) | Error::Json(_) | Error::Config(_) | Error::Task(_) => {
                500
            }
        }
    }

    /// Message safe to hand back to a caller.
    ///
    /// Internal failures collapse to a generic message; the detailed cause
    /// only goes to the log.
    pub fn public_message(&self) -> String {
        match self.status_code() {
            500 => "internal error".to_string(),
            _ => self.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}

/// Result type alias for coursepulse-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::validation("bad segment").status_code(), 400);
        assert_eq!(Error::CourseNotFound("c1".into()).status_code(), 404);
        assert_eq!(Error::Config("nope".into()).status_code(), 500);
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let err = Error::Config("secret path /etc/thing".into());
        assert_eq!(err.public_message(), "internal error");

        let err = Error::CourseNotFound("c9".into());
        assert_eq!(err.public_message(), "course not found: c9");
    }
}
