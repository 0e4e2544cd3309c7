//! Error types for Bestiary operations

use thiserror::Error;

/// Durable store errors.
///
/// These never reach cache callers: the cache logs them and degrades the
/// operation to a miss or a dropped write.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Failed to open store at {path}: {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Failed to encode entry for {key}: {reason}")]
    EncodeFailed { key: String, reason: String },

    #[error("Failed to decode entry for {key}: {reason}")]
    DecodeFailed { key: String, reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Remote catalog fetch errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("No record found for {resource}")]
    NotFound { resource: String },
}

impl FetchError {
    /// Returns true when retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse { .. } | Self::NotFound { .. } => false,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, value: impl ToString, reason: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Master error type for all Bestiary errors.
#[derive(Debug, Clone, Error)]
pub enum BestiaryError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cancelled after {settled} of {total} items settled")]
    Cancelled { settled: usize, total: usize },
}

/// Result type alias for Bestiary operations.
pub type BestiaryResult<T> = Result<T, BestiaryError>;

// =============================================================================
// TESTS
// =============================================================================
