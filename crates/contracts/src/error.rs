//! Layered error definitions
//!
//! Categorized by source: config / generation / transport / schema / storage

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Simulation Errors =====
    /// Random source or simulated clock fault
    #[error("generation error: {message}")]
    Generation { message: String },

    /// Record could not be encoded or handed to the transport
    #[error("publish error on topic '{topic}': {message}")]
    Publish { topic: String, message: String },

    // ===== Transport Errors =====
    /// Transport rejected a send or fetch
    #[error("transport '{transport}' error: {message}")]
    Transport { transport: String, message: String },

    // ===== Schema Errors =====
    /// No schema registered for the topic
    #[error("no schema registered for topic '{topic}'")]
    SchemaNotFound { topic: String },

    /// Payload failed to decode or did not match the topic schema
    #[error("decode/validation error on topic '{topic}': {message}")]
    DecodeValidation { topic: String, message: String },

    // ===== Storage Errors =====
    /// Object store operation failed
    #[error("storage error at '{path}': {message}")]
    Storage { path: String, message: String },

    /// Checkpoint could not be read or written
    #[error("checkpoint error for topic '{topic}': {message}")]
    Checkpoint { topic: String, message: String },

    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    pub fn publish(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            message: message.into(),
        }
    }

    pub fn transport(transport: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            transport: transport.into(),
            message: message.into(),
        }
    }

    pub fn schema_not_found(topic: impl Into<String>) -> Self {
        Self::SchemaNotFound {
            topic: topic.into(),
        }
    }

    /// Create decode/validation error
    pub fn decode_validation(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DecodeValidation {
            topic: topic.into(),
            message: message.into(),
        }
    }

    pub fn storage(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn checkpoint(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Checkpoint {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether the error only affects a single record and the caller should carry on
    pub fn is_per_record(&self) -> bool {
        matches!(self, Self::DecodeValidation { .. } | Self::Publish { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = ContractError::schema_not_found("unknown_data");
        assert_eq!(err.to_string(), "no schema registered for topic 'unknown_data'");

        let err = ContractError::decode_validation("gps_data", "missing field 'speed'");
        assert!(err.to_string().contains("gps_data"));
        assert!(err.to_string().contains("missing field 'speed'"));
    }

    #[test]
    fn test_per_record_classification() {
        assert!(ContractError::decode_validation("t", "bad").is_per_record());
        assert!(ContractError::publish("t", "rejected").is_per_record());
        assert!(!ContractError::generation("clock overflow").is_per_record());
        assert!(!ContractError::sink_write("t", "disk full").is_per_record());
    }
}
