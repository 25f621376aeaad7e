use thiserror::Error;

/// Failures of the conversion core.
///
/// None of these are fatal to the host surface; each one is turned into a
/// marker on the affected field or feed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("Token not found: {0}")]
    TokenNotFound(String),

    #[error("Price not available for {0}")]
    RateUnavailable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Stored custom tokens are unreadable: {0}")]
    PersistenceCorrupt(String),

    #[error("Failed to save custom tokens: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for ConvertError {
    fn from(err: reqwest::Error) -> Self {
        ConvertError::Network(err.to_string())
    }
}
