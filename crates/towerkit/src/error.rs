//! Error types for control plane API calls.
//!
//! Errors are categorized so the transport can decide what to retry and the
//! CLI can print useful advice.

use serde_json::Value;
use std::fmt;

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of API errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection failures and gateway errors (transient, retryable).
    Network,
    /// Credentials missing, wrong, or lacking permission.
    Auth,
    /// The requested URL does not exist.
    NotFound,
    /// The server refused the request content.
    Rejected,
    /// The response could not be decoded.
    Format,
    /// Client configuration is unusable.
    Config,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Auth => "Authentication failed",
            Self::NotFound => "API endpoint not found",
            Self::Rejected => "Request rejected by the server",
            Self::Format => "Unexpected response format",
            Self::Config => "Invalid client configuration",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check that the host is reachable and try again",
            Self::Auth => "Check the username/password or OAuth token",
            Self::NotFound => "Verify the host points at an AWX or Tower server",
            Self::Rejected => "Fix the field values reported by the server",
            Self::Format => "The server answered with something other than JSON",
            Self::Config => "Check the connection settings and config file",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
        /// Message extracted from the response body.
        message: String,
    },

    /// The request never got a response.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying transport error.
        message: String,
    },

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Unusable client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a transport error.
    pub fn transport(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Convert a ureq error for `url`.
    pub fn from_ureq(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => Self::Http {
                status,
                url: url.to_string(),
                message: format!("HTTP {status}"),
            },
            other => Self::transport(url, other),
        }
    }

    /// HTTP status code, if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http { status, .. } => match status {
                401 | 403 => ErrorCategory::Auth,
                404 => ErrorCategory::NotFound,
                502..=504 => ErrorCategory::Network,
                400..=499 => ErrorCategory::Rejected,
                _ => ErrorCategory::Other,
            },
            Self::Transport { .. } => ErrorCategory::Network,
            Self::InvalidResponse(_) => ErrorCategory::Format,
            Self::Config(_) => ErrorCategory::Config,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// Flatten an error response body into one line.
///
/// The API reports failures as `{"detail": ...}`, `{"__all__": [...]}` or
/// one list of messages per rejected field. Anything else is returned
/// trimmed as is.
#[must_use]
pub fn error_message(body: &str) -> String {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        let trimmed = body.trim();
        return if trimmed.is_empty() {
            "empty response body".to_string()
        } else {
            trimmed.to_string()
        };
    };

    if let Some(detail) = map.get("detail") {
        return flatten(detail);
    }
    if let Some(all) = map.get("__all__") {
        return flatten(all);
    }
    map.iter()
        .map(|(field, messages)| format!("{field}: {}", flatten(messages)))
        .collect::<Vec<_>>()
        .join("; ")
}

fn flatten(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(flatten).collect::<Vec<_>>().join(" "),
        other => other.to_string(),
    }
}
