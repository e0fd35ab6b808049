//! Error types returned by the API tester core.
//!
//! Every fallible operation returns [`ApiError`]. Network failures and timeouts
//! are *not* errors here: they are recorded as [`Outcome`](crate::history::Outcome)
//! values on history records so that history stays a complete audit trail.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// The kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A saved request configuration.
    Request,
    /// A named environment.
    Environment,
    /// A history record.
    HistoryRecord,
}

impl EntityKind {
    /// Returns a lower-case, human-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Request => "saved request",
            EntityKind::Environment => "environment",
            EntityKind::HistoryRecord => "history record",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur in the API tester core.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown name or identifier.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: EntityKind, name: String },

    /// A registry entry with this name already exists and overwrite was not requested.
    #[error("{kind} '{name}' already exists")]
    DuplicateName { kind: EntityKind, name: String },

    /// An explicit header contradicts a header derived from the auth spec.
    #[error(
        "conflicting values for header '{header}': explicit '{explicit}' vs auth-derived '{derived}'"
    )]
    ConfigConflict {
        header: String,
        explicit: String,
        derived: String,
    },

    /// The URL could not be parsed or resolved.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Only HTTP and HTTPS are supported.
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// The URL host is rejected by the configured domain policy.
    #[error("URL '{0}' is blocked by the domain policy")]
    BlockedUrl(String),

    /// Invalid configuration or request data.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// File I/O failure while persisting or loading state.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl ApiError {
    pub(crate) fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        ApiError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn duplicate(kind: EntityKind, name: impl Into<String>) -> Self {
        ApiError::DuplicateName {
            kind,
            name: name.into(),
        }
    }

    /// Returns `true` for [`ApiError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::InvalidUrl(err.to_string())
    }
}
