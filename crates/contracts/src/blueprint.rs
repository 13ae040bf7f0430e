//! PipelineBlueprint - Config Loader output
//!
//! Describes the complete runtime configuration: transport, topic names, the
//! simulated journey, generated constants, ingestion policy and storage.
//! Every section has defaults, so an empty document is a valid configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{ContractError, Position, RecordKind, BIRMINGHAM, LONDON};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete configuration blueprint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineBlueprint {
    /// Configuration version
    pub version: ConfigVersion,

    /// Transport connection
    pub transport: TransportConfig,

    /// Topic name per record kind
    pub topics: TopicsConfig,

    /// Simulated journey
    pub simulation: SimulationConfig,

    /// Constants stamped onto generated records
    pub vehicle: VehicleProfile,

    /// Reader and watermark policy
    pub ingestion: IngestionConfig,

    /// Output location and write policy
    pub storage: StorageConfig,
}

/// Transport connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// `memory://` (in-process) or `file://<dir>` (JSON-lines log per topic)
    pub address: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            address: "file://./data/broker".to_string(),
        }
    }
}

impl TransportConfig {
    pub fn parse_address(&self) -> Result<TransportAddress, ContractError> {
        TransportAddress::parse(&self.address)
    }
}

/// Parsed transport address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportAddress {
    /// In-process log shared by producer and readers
    Memory,
    /// Directory holding one JSON-lines log per topic
    File(PathBuf),
}

impl TransportAddress {
    pub fn parse(address: &str) -> Result<Self, ContractError> {
        if address == "memory://" || address == "memory" {
            return Ok(TransportAddress::Memory);
        }
        match address.strip_prefix("file://") {
            Some(dir) if !dir.is_empty() => Ok(TransportAddress::File(PathBuf::from(dir))),
            Some(_) => Err(ContractError::config_validation(
                "transport.address",
                "file:// address needs a directory",
            )),
            None => Err(ContractError::config_validation(
                "transport.address",
                format!("unsupported transport address '{address}' (expected memory:// or file://<dir>)"),
            )),
        }
    }
}

/// Topic names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    pub vehicle: String,
    pub gps: String,
    pub traffic: String,
    pub weather: String,
    pub emergency: String,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            vehicle: "vehicle_data".to_string(),
            gps: "gps_data".to_string(),
            traffic: "traffic_data".to_string(),
            weather: "weather_data".to_string(),
            emergency: "emergency_data".to_string(),
        }
    }
}

impl TopicsConfig {
    /// Topic carrying `kind`
    pub fn topic_for(&self, kind: RecordKind) -> &str {
        match kind {
            RecordKind::Vehicle => &self.vehicle,
            RecordKind::Gps => &self.gps,
            RecordKind::Traffic => &self.traffic,
            RecordKind::Weather => &self.weather,
            RecordKind::Emergency => &self.emergency,
        }
    }

    /// `(kind, topic)` pairs in publish order
    pub fn iter(&self) -> impl Iterator<Item = (RecordKind, &str)> + '_ {
        RecordKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.topic_for(kind)))
    }
}

/// Journey settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated vehicle name, stamped as `deviceId`
    pub device_id: String,

    pub origin: Position,

    pub destination: Position,

    /// Number of steps the un-jittered route takes from origin to destination
    pub steps: u32,

    /// Maximum per-axis jitter in degrees
    pub jitter: f64,

    /// Lower bound of the simulated time advance per step (seconds)
    pub min_step_secs: u32,

    /// Upper bound of the simulated time advance per step (seconds)
    pub max_step_secs: u32,

    /// Wall-clock pause between steps (milliseconds)
    pub pacing_ms: u64,

    /// RNG seed; `None` draws one from the OS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Hard stop after this many steps even if the destination was not reached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,

    /// Simulated start time; `None` uses the current time truncated to seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            device_id: "Vehicle-Samkons".to_string(),
            origin: LONDON,
            destination: BIRMINGHAM,
            steps: 100,
            jitter: 0.001,
            min_step_secs: 30,
            max_step_secs: 60,
            pacing_ms: 5000,
            seed: None,
            max_steps: None,
            start_time: None,
        }
    }
}

/// Constant attributes of generated records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleProfile {
    pub direction: String,
    pub make: String,
    pub model: String,
    pub year: i64,
    pub fuel_type: String,
    pub vehicle_type: String,
    pub camera_id: String,
    pub snapshot: String,
    pub incident_description: String,
}

impl Default for VehicleProfile {
    fn default() -> Self {
        Self {
            direction: "North-East".to_string(),
            make: "Toyota".to_string(),
            model: "prius".to_string(),
            year: 2024,
            fuel_type: "Hybrid".to_string(),
            vehicle_type: "private".to_string(),
            camera_id: "Nikon-Camera".to_string(),
            snapshot: "Base64EncodedString".to_string(),
            incident_description: "Description of the Incident".to_string(),
        }
    }
}

/// Reader policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Allowed event-time lateness before a record is flagged late (seconds)
    pub watermark_delay_secs: u64,

    /// Upper bound of records per micro-batch
    pub max_batch_records: usize,

    /// Wait after an empty poll (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            watermark_delay_secs: 120,
            max_batch_records: 500,
            poll_interval_ms: 1000,
        }
    }
}

/// Parquet compression codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParquetCompression {
    Uncompressed,
    #[default]
    Snappy,
}

/// Output storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory of the data lake
    pub base_path: PathBuf,

    pub compression: ParquetCompression,

    /// First retry delay after a failed batch write (milliseconds)
    pub retry_initial_backoff_ms: u64,

    /// Retry delay cap (milliseconds)
    pub retry_max_backoff_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./data/lake"),
            compression: ParquetCompression::Snappy,
            retry_initial_backoff_ms: 500,
            retry_max_backoff_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let bp: PipelineBlueprint = toml::from_str("").unwrap();
        assert_eq!(bp.topics.vehicle, "vehicle_data");
        assert_eq!(bp.simulation.origin, LONDON);
        assert_eq!(bp.simulation.destination, BIRMINGHAM);
        assert_eq!(bp.ingestion.watermark_delay_secs, 120);
        assert_eq!(bp.storage.compression, ParquetCompression::Snappy);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let bp: PipelineBlueprint = toml::from_str(
            r#"
[simulation]
origin = [51.0, -0.5]
seed = 7
"#,
        )
        .unwrap();
        assert_eq!(bp.simulation.origin, Position::new(51.0, -0.5));
        assert_eq!(bp.simulation.seed, Some(7));
        assert_eq!(bp.simulation.steps, 100);
        assert_eq!(bp.simulation.device_id, "Vehicle-Samkons");
    }

    #[test]
    fn test_transport_address_parse() {
        assert_eq!(TransportAddress::parse("memory://").unwrap(), TransportAddress::Memory);
        assert_eq!(
            TransportAddress::parse("file://./data/broker").unwrap(),
            TransportAddress::File(PathBuf::from("./data/broker"))
        );
        assert!(TransportAddress::parse("file://").is_err());
        assert!(TransportAddress::parse("kafka://broker:9092").is_err());
    }

    #[test]
    fn test_topics_iter_order() {
        let topics = TopicsConfig::default();
        let names: Vec<_> = topics.iter().map(|(_, t)| t).collect();
        assert_eq!(
            names,
            ["vehicle_data", "gps_data", "traffic_data", "weather_data", "emergency_data"]
        );
        assert_eq!(topics.topic_for(RecordKind::Weather), "weather_data");
    }
}
