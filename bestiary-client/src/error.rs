//! Error types for the catalog client.

use bestiary_core::{BestiaryError, FetchError};

use crate::config::ConfigLoadError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to build HTTP client: {0}")]
    HttpSetup(#[from] reqwest::Error),
    #[error(transparent)]
    Config(#[from] ConfigLoadError),
    #[error(transparent)]
    Core(#[from] BestiaryError),
    #[error("Failed to initialize logging: {0}")]
    Telemetry(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FetchError> for ClientError {
    fn from(err: FetchError) -> Self {
        Self::Core(err.into())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_converts_through_core() {
        let err = ClientError::from(FetchError::NotFound {
            resource: "pokemon/missingno".to_string(),
        });
        assert!(matches!(err, ClientError::Core(BestiaryError::Fetch(_))));
        assert_eq!(
            err.to_string(),
            "Fetch error: No record found for pokemon/missingno"
        );
    }
}
