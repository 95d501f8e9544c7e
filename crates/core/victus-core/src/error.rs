//! Error types for the Victus console core

use thiserror::Error;

/// Main error type for Victus client operations
#[derive(Debug, Error)]
pub enum VictusError {
    /// HTTP response received with a non-2xx status
    #[error("API error: {status} {status_text}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase for the status
        status_text: String,
        /// Decoded response body (empty object when the body was not JSON)
        body: serde_json::Value,
    },

    /// Request never reached a server, or the exchange failed unexpectedly
    #[error("Network error: {0}")]
    Network(String),

    /// Event-stream or socket transport failure
    #[error("Stream error: {0}")]
    Stream(String),

    /// Microphone permission denied or device unavailable
    #[error("Device error: {0}")]
    Device(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Convenient Result type using VictusError
pub type Result<T> = std::result::Result<T, VictusError>;

impl VictusError {
    /// Create an API error from a status and decoded body
    pub fn api(status: u16, status_text: impl Into<String>, body: serde_json::Value) -> Self {
        VictusError::Api {
            status,
            status_text: status_text.into(),
            body,
        }
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        VictusError::Network(msg.into())
    }

    /// Create a stream error
    pub fn stream(msg: impl Into<String>) -> Self {
        VictusError::Stream(msg.into())
    }

    /// Create a device error
    pub fn device(msg: impl Into<String>) -> Self {
        VictusError::Device(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        VictusError::Config(msg.into())
    }

    /// HTTP status of an [`VictusError::Api`] error
    pub fn status(&self) -> Option<u16> {
        match self {
            VictusError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable message for display.
    ///
    /// API errors prefer the server's `detail`, then `message` field.
    pub fn api_message(&self) -> String {
        match self {
            VictusError::Api { status, body, .. } => body
                .get("detail")
                .and_then(|v| v.as_str())
                .or_else(|| body.get("message").and_then(|v| v.as_str()))
                .map(str::to_string)
                .unwrap_or_else(|| format!("Error {}", status)),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_creation() {
        let err = VictusError::network("connection refused");
        assert_eq!(err.to_string(), "Network error: connection refused");

        let err = VictusError::api(404, "Not Found", json!({}));
        assert_eq!(err.to_string(), "API error: 404 Not Found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_api_message_prefers_detail() {
        let err = VictusError::api(400, "Bad Request", json!({"detail": "bad email", "message": "x"}));
        assert_eq!(err.api_message(), "bad email");

        let err = VictusError::api(400, "Bad Request", json!({"message": "try again"}));
        assert_eq!(err.api_message(), "try again");

        let err = VictusError::api(500, "Internal Server Error", json!({}));
        assert_eq!(err.api_message(), "Error 500");
    }

    #[test]
    fn test_network_error_has_no_status() {
        assert_eq!(VictusError::network("down").status(), None);
    }
}
