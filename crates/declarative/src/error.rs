//! Error types for reconciliation.
//!
//! Every failure aborts the run. Errors carry enough context (collection,
//! name, operation) to diagnose the problem without re-running.

use std::fmt;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Remote operation that failed, used in [`Error::RemoteRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Listing or fetching objects.
    Lookup,
    /// Server-side duplication of a template.
    Copy,
    /// Creating a new object.
    Create,
    /// Patching an existing object.
    Update,
    /// Deleting an object.
    Delete,
    /// Reading or changing a many-to-many association.
    Associate,
}

impl Operation {
    /// Lowercase verb for messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lookup => "lookup",
            Self::Copy => "copy",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Associate => "associate",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while reconciling a resource.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required named reference does not exist.
    #[error("the {collection} '{name}' was not found")]
    NotFound {
        /// Collection that was searched.
        collection: String,
        /// Name or id that was requested.
        name: String,
    },

    /// More than one remote object matches a name within scope.
    #[error("{count} {collection} match '{name}'; refer to it by id instead")]
    AmbiguousName {
        /// Collection that was searched.
        collection: String,
        /// Name or id that was requested.
        name: String,
        /// Number of matches returned.
        count: usize,
    },

    /// An invariant of the resource would be violated.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// The control plane rejected or failed to execute a request.
    #[error("{operation} on {collection} failed: {message}")]
    RemoteRequest {
        /// Operation being attempted.
        operation: Operation,
        /// Collection the request targeted.
        collection: String,
        /// Message reported by the control plane or transport.
        message: String,
        /// HTTP status, when the failure came from a response.
        status: Option<u16>,
    },
}

impl Error {
    /// Create a not-found error.
    pub fn not_found(collection: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            name: name.into(),
        }
    }

    /// Create a remote request error without an HTTP status.
    pub fn remote(
        operation: Operation,
        collection: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::RemoteRequest {
            operation,
            collection: collection.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Whether this error reports a missing reference.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
