//! # Schema Registry
//!
//! Static mapping from topic name to the record schema published on it.
//!
//! Responsibilities:
//! - Declare the field contract of the five telemetry topics
//! - Resolve a topic to its schema (`SchemaNotFound` otherwise)
//! - Decode and validate payloads into typed rows
//!
//! The registry is immutable after construction and shared read-only
//! (behind `Arc`) by every topic pipeline.
//!
//! ```ignore
//! use schema_registry::SchemaRegistry;
//!
//! let registry = SchemaRegistry::new(&blueprint.topics)?;
//! let schema = registry.schema_for("gps_data")?;
//! let row = schema_registry::decode_payload(&schema, payload)?;
//! ```

mod catalog;
mod validate;

use std::collections::BTreeMap;
use std::sync::Arc;

use contracts::{ContractError, RecordKind, Schema, TopicsConfig};
use tracing::debug;

pub use catalog::{fields_for, schema_for_kind};
pub use validate::{decode_payload, decode_record, validate};

/// Topic name -> schema
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    /// Build the registry for the configured topic names
    pub fn new(topics: &TopicsConfig) -> Result<Self, ContractError> {
        let mut schemas = BTreeMap::new();
        for (kind, topic) in topics.iter() {
            let schema = schema_for_kind(kind, topic)?;
            debug!(topic = %topic, kind = %kind, fields = schema.fields().len(), "registered schema");
            if schemas.insert(topic.to_string(), Arc::new(schema)).is_some() {
                return Err(ContractError::config_validation(
                    format!("topics.{kind}"),
                    format!("topic '{topic}' registered twice"),
                ));
            }
        }
        Ok(Self { schemas })
    }

    /// Registry for the default topic names
    pub fn with_default_topics() -> Result<Self, ContractError> {
        Self::new(&TopicsConfig::default())
    }

    /// Schema registered for `topic`
    ///
    /// # Errors
    /// `ContractError::SchemaNotFound` if the topic is not registered
    pub fn schema_for(&self, topic: &str) -> Result<Arc<Schema>, ContractError> {
        self.schemas
            .get(topic)
            .cloned()
            .ok_or_else(|| ContractError::schema_not_found(topic))
    }

    /// Topic registered for `kind`
    pub fn topic_for(&self, kind: RecordKind) -> Option<&str> {
        self.schemas
            .iter()
            .find(|(_, schema)| schema.kind() == kind)
            .map(|(topic, _)| topic.as_str())
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
