//! Ingestion error types

use contracts::ContractError;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Source parameters could not be interpreted
    #[error("invalid configuration for source '{source_id}': {message}")]
    InvalidSourceConfig {
        /// Source ID
        source_id: String,
        /// Error message
        message: String,
    },

    /// A source with the same ID is already registered
    #[error("source '{source_id}' is already registered")]
    DuplicateSource {
        /// Source ID
        source_id: String,
    },

    /// Recording could not be read or decoded
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestionError {
    pub fn invalid_config(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSourceConfig {
            source_id: source_id.into(),
            message: message.into(),
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
