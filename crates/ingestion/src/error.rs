//! Ingestion error types

use contracts::ContractError;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// A planned offset range is no longer fully readable from the transport
    #[error("topic '{topic}': planned range [{start}, {end}) unavailable, log ends at {available}")]
    RangeUnavailable {
        topic: String,
        start: u64,
        end: u64,
        available: u64,
    },

    /// Wrapped ContractError (schema lookup, transport)
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl IngestionError {
    /// Whether reading again later may succeed
    ///
    /// Transport and IO faults are; a missing range or unknown schema is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Contract(ContractError::Transport { .. } | ContractError::Io(_))
        )
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
