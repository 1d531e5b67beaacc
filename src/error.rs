//! Application error types for the relay.
//!
//! Most of these never reach the browser: handlers recover them into
//! `null`, `false` or partial results. They serialize to a structured JSON
//! object so they can still be logged or surfaced for diagnostics.

use serde::Serialize;
use thiserror::Error;

/// Application-level errors raised by the GitHub client and relay services.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    /// GitHub answered with a non-2xx status, or a GraphQL `errors` payload.
    #[error("GitHub API error: {message}")]
    GitHubApi {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },

    /// Network request failed before a response was received.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Process configuration is missing or invalid.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The operation is disabled by configuration.
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Invalid input provided by the caller.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    /// Internal relay error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create a GitHub API error.
    pub fn github_api(message: impl Into<String>) -> Self {
        Self::GitHubApi {
            message: message.into(),
            status_code: None,
            endpoint: None,
        }
    }

    /// Create a GitHub API error with status code and endpoint.
    pub fn github_api_full(
        message: impl Into<String>,
        status_code: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self::GitHubApi {
            message: message.into(),
            status_code: Some(status_code),
            endpoint: Some(endpoint.into()),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error with field name.
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status reported by GitHub, if this error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::GitHubApi { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

// Conversions from common error types

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("Request timed out")
        } else if err.is_connect() {
            Self::network("Failed to connect to server")
        } else if let Some(status) = err.status() {
            Self::GitHubApi {
                message: format!("HTTP error: {}", err),
                status_code: Some(status.as_u16()),
                endpoint: err.url().map(|u| u.path().to_string()),
            }
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_api_error_full() {
        let err = AppError::github_api_full("Validation Failed", 422, "/orgs/acme/invitations");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"type\":\"GitHubApi\""));
        assert!(json.contains("\"status_code\":422"));
        assert!(json.contains("/orgs/acme/invitations"));
    }

    #[test]
    fn test_status_code_only_for_upstream_errors() {
        assert_eq!(
            AppError::github_api_full("Not Found", 404, "/x").status_code(),
            Some(404)
        );
        assert_eq!(AppError::network("reset").status_code(), None);
        assert_eq!(AppError::github_api("graphql").status_code(), None);
    }

    #[test]
    fn test_optional_fields_not_serialized() {
        let err = AppError::invalid_input("bad url");
        let json = serde_json::to_string(&err).unwrap();
        assert!(!json.contains("field"));
    }

    #[test]
    fn test_display_impl() {
        let err = AppError::network("connection reset");
        assert_eq!(format!("{}", err), "Network error: connection reset");
    }
}
