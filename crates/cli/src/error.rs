//! Error types for CLI operations.

use contracts::ContractError;
use persistence::PersistenceError;
use simulator::SimulatorError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration, schema or transport error
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Journey failed
    #[error("Journey failed: {0}")]
    Simulation(#[from] SimulatorError),

    /// Pipeline could not be built
    #[error("Pipeline setup failed: {0}")]
    Persistence(#[from] PersistenceError),

    /// One or more topic pipelines returned an error
    #[error("{failed} of {total} topic pipelines failed")]
    PipelinesFailed { failed: usize, total: usize },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
