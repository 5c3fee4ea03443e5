//! Error types for scribe-core

use std::collections::BTreeMap;

use thiserror::Error;

/// Result type alias using scribe-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in scribe-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport or connectivity failure (including request timeouts)
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid or expired credentials (HTTP 401)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Insufficient rights (HTTP 403)
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Rejected input, with per-field messages (HTTP 422 or client-side)
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },

    /// Missing resource (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend failure (HTTP 5xx)
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Local persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything that escaped classification
    #[error("{0}")]
    App(String),
}

impl Error {
    /// Build a validation error from field-level messages.
    pub fn validation(message: impl Into<String>, fields: BTreeMap<String, String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields,
        }
    }

    /// Build a validation error for a single field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), message.clone());
        Self::Validation { message, fields }
    }

    /// Severity level driving default notification dismiss behavior.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::Validation { .. } | Self::NotFound(_) => Severity::Low,
            Self::Network(_) | Self::Storage(_) | Self::Serialization(_) | Self::App(_) => {
                Severity::Medium
            }
            Self::Authentication(_) | Self::Authorization(_) => Severity::High,
            Self::Server { .. } => Severity::Critical,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

/// How disruptive an error is to the user.
///
/// Low-severity failures auto-dismiss from the notification surface;
/// high and critical ones stay until acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_classification() {
        assert_eq!(
            Error::invalid_field("email", "required").severity(),
            Severity::Low
        );
        assert_eq!(Error::Network("offline".into()).severity(), Severity::Medium);
        assert_eq!(
            Error::Authentication("bad token".into()).severity(),
            Severity::High
        );
        assert_eq!(
            Error::Server {
                status: 500,
                message: "boom".into()
            }
            .severity(),
            Severity::Critical
        );
    }

    #[test]
    fn invalid_field_carries_field_map() {
        let error = Error::invalid_field("password", "too short");
        let Error::Validation { fields, .. } = &error else {
            panic!("expected validation error");
        };
        assert_eq!(fields.get("password").map(String::as_str), Some("too short"));
    }
}
