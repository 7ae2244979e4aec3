//! Error types for groundcheck.

use thiserror::Error;

/// Result type alias using groundcheck's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during validation.
///
/// Ambiguous completions and degenerate sample sets are not errors: they are
/// resolved locally (a decline label, the probability floor) and never
/// propagate. Only the failures below surface as `Err`.
#[derive(Error, Debug)]
pub enum Error {
    /// The decision backend could not be reached at all.
    ///
    /// Fatal for the current validation call; the façade converts this into
    /// a fail-open outcome with the risk bound pinned to 1.0.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A backend API call failed with a provider-level error.
    #[error("backend error: {provider} - {message}")]
    Backend { provider: String, message: String },

    /// Invalid validation configuration (n, m, target risk, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a backend-unavailable error.
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable(message.into())
    }

    /// Create a backend API error.
    pub fn backend(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True when the failure means the backend could not be reached at all.
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }
}
