//! Persistence error types

use contracts::ContractError;
use ingestion::IngestionError;
use thiserror::Error;

/// Persistence-specific errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Rows could not be turned into a Parquet file
    #[error("failed to encode batch {batch_id} of '{topic}': {message}")]
    Encode {
        topic: String,
        batch_id: u64,
        message: String,
    },

    /// Pipeline task panicked or was cancelled
    #[error("pipeline for '{topic}' did not finish: {message}")]
    TaskFailed { topic: String, message: String },

    /// Reading from the topic failed
    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    /// Storage, checkpoint or sink write error (from contract)
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl PersistenceError {
    pub fn encode(topic: impl Into<String>, batch_id: u64, message: impl ToString) -> Self {
        Self::Encode {
            topic: topic.into(),
            batch_id,
            message: message.to_string(),
        }
    }

    /// Whether another attempt at the same batch may succeed
    ///
    /// Encoding and checkpoint serialization give the same result every time.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Encode { .. } | Self::Contract(ContractError::Checkpoint { .. })
        )
    }
}

/// Persistence Result type alias
pub type Result<T> = std::result::Result<T, PersistenceError>;
