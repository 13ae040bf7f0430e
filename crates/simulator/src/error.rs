//! Simulator error types

use contracts::ContractError;
use thiserror::Error;

/// Simulator specific error
#[derive(Debug, Error)]
pub enum SimulatorError {
    /// Simulated clock ran past the representable range
    #[error("simulated clock overflow at step {step}")]
    ClockOverflow { step: u64 },

    /// Record could not be encoded for publishing
    #[error("failed to encode {kind} record for topic '{topic}': {message}")]
    Encode {
        kind: String,
        topic: String,
        message: String,
    },

    /// Delivery task ended without reporting
    #[error("delivery of '{key}' to '{topic}' was abandoned")]
    DeliveryAbandoned { topic: String, key: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl SimulatorError {
    /// Whether the journey must stop
    pub fn is_fatal(&self) -> bool {
        match self {
            SimulatorError::ClockOverflow { .. } => true,
            SimulatorError::Contract(e) => !e.is_per_record(),
            SimulatorError::Encode { .. } | SimulatorError::DeliveryAbandoned { .. } => false,
        }
    }
}

impl From<SimulatorError> for ContractError {
    fn from(err: SimulatorError) -> Self {
        match err {
            SimulatorError::Contract(e) => e,
            SimulatorError::ClockOverflow { .. } => ContractError::generation(err.to_string()),
            SimulatorError::Encode { ref topic, .. } | SimulatorError::DeliveryAbandoned { ref topic, .. } => {
                ContractError::publish(topic.clone(), err.to_string())
            }
        }
    }
}

/// Simulator Result type alias
pub type Result<T> = std::result::Result<T, SimulatorError>;
