//! Telemetry records, one struct per topic
//!
//! Field names are camelCase on the wire. Timestamps are RFC 3339 strings in UTC,
//! ids are hyphenated UUID strings, locations are `[latitude, longitude]` pairs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Position;

/// Record kind, one per transport topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Vehicle,
    Gps,
    Traffic,
    Weather,
    Emergency,
}

impl RecordKind {
    /// All kinds in publish order
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Vehicle,
        RecordKind::Gps,
        RecordKind::Traffic,
        RecordKind::Weather,
        RecordKind::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Vehicle => "vehicle",
            RecordKind::Gps => "gps",
            RecordKind::Traffic => "traffic",
            RecordKind::Weather => "weather",
            RecordKind::Emergency => "emergency",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle state at a journey step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VehicleRecord {
    pub id: Uuid,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub location: Position,
    pub speed: f64,
    pub direction: String,
    pub make: String,
    pub model: String,
    pub year: i64,
    pub fuel_type: String,
}

/// GPS fix; carries its own speed sample and no location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GpsRecord {
    pub id: Uuid,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub speed: f64,
    pub direction: String,
    pub vehicle_type: String,
}

/// Traffic camera capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TrafficRecord {
    pub id: Uuid,
    pub device_id: String,
    pub camera_id: String,
    pub timestamp: DateTime<Utc>,
    pub location: Position,
    /// Opaque reference to the captured image
    pub snapshot: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherCondition {
    Sunny,
    Cloudy,
    Rain,
    Snowing,
}

impl WeatherCondition {
    pub const ALL: [WeatherCondition; 4] = [
        WeatherCondition::Sunny,
        WeatherCondition::Cloudy,
        WeatherCondition::Rain,
        WeatherCondition::Snowing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherCondition::Sunny => "Sunny",
            WeatherCondition::Cloudy => "Cloudy",
            WeatherCondition::Rain => "Rain",
            WeatherCondition::Snowing => "Snowing",
        }
    }
}

/// Weather observation at the vehicle position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WeatherRecord {
    pub id: Uuid,
    pub device_id: String,
    pub location: Position,
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub weather_condition: WeatherCondition,
    pub precipitation: f64,
    pub wind_speed: f64,
    pub humidity: i64,
    pub air_quality_index: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentType {
    Accident,
    Fire,
    Medical,
    Police,
    /// No incident in progress
    None,
}

impl IncidentType {
    pub const ALL: [IncidentType; 5] = [
        IncidentType::Accident,
        IncidentType::Fire,
        IncidentType::Medical,
        IncidentType::Police,
        IncidentType::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentType::Accident => "Accident",
            IncidentType::Fire => "Fire",
            IncidentType::Medical => "Medical",
            IncidentType::Police => "Police",
            IncidentType::None => "None",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentStatus {
    Active,
    Resolved,
}

impl IncidentStatus {
    pub const ALL: [IncidentStatus; 2] = [IncidentStatus::Active, IncidentStatus::Resolved];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Active => "Active",
            IncidentStatus::Resolved => "Resolved",
        }
    }
}

/// Emergency incident report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmergencyRecord {
    pub id: Uuid,
    pub device_id: String,
    pub incident_id: Uuid,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub timestamp: DateTime<Utc>,
    pub location: Position,
    pub status: IncidentStatus,
    pub description: String,
}

/// Any telemetry record
///
/// Serializes as the bare record object (no tag); the topic carries the kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Vehicle(VehicleRecord),
    Gps(GpsRecord),
    Traffic(TrafficRecord),
    Weather(WeatherRecord),
    Emergency(EmergencyRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Vehicle(_) => RecordKind::Vehicle,
            Record::Gps(_) => RecordKind::Gps,
            Record::Traffic(_) => RecordKind::Traffic,
            Record::Weather(_) => RecordKind::Weather,
            Record::Emergency(_) => RecordKind::Emergency,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Record::Vehicle(r) => r.id,
            Record::Gps(r) => r.id,
            Record::Traffic(r) => r.id,
            Record::Weather(r) => r.id,
            Record::Emergency(r) => r.id,
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            Record::Vehicle(r) => &r.device_id,
            Record::Gps(r) => &r.device_id,
            Record::Traffic(r) => &r.device_id,
            Record::Weather(r) => &r.device_id,
            Record::Emergency(r) => &r.device_id,
        }
    }

    /// Event time
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Record::Vehicle(r) => r.timestamp,
            Record::Gps(r) => r.timestamp,
            Record::Traffic(r) => r.timestamp,
            Record::Weather(r) => r.timestamp,
            Record::Emergency(r) => r.timestamp,
        }
    }

    /// Location, if the kind carries one (GPS does not)
    pub fn location(&self) -> Option<Position> {
        match self {
            Record::Vehicle(r) => Some(r.location),
            Record::Gps(_) => None,
            Record::Traffic(r) => Some(r.location),
            Record::Weather(r) => Some(r.location),
            Record::Emergency(r) => Some(r.location),
        }
    }

    /// Encode as a JSON payload
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode a JSON value into the typed record for `kind`
    pub fn from_json(kind: RecordKind, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            RecordKind::Vehicle => Record::Vehicle(serde_json::from_value(value)?),
            RecordKind::Gps => Record::Gps(serde_json::from_value(value)?),
            RecordKind::Traffic => Record::Traffic(serde_json::from_value(value)?),
            RecordKind::Weather => Record::Weather(serde_json::from_value(value)?),
            RecordKind::Emergency => Record::Emergency(serde_json::from_value(value)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LONDON;
    use chrono::TimeZone;

    fn sample_emergency() -> EmergencyRecord {
        EmergencyRecord {
            id: Uuid::from_u128(1),
            device_id: "Vehicle-Samkons".into(),
            incident_id: Uuid::from_u128(2),
            incident_type: IncidentType::None,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 30).unwrap(),
            location: LONDON,
            status: IncidentStatus::Resolved,
            description: "Description of the Incident".into(),
        }
    }

    #[test]
    fn test_wire_field_names() {
        let record = Record::Emergency(sample_emergency());
        let value: serde_json::Value =
            serde_json::from_slice(&record.to_json_bytes().unwrap()).unwrap();

        assert_eq!(value["type"], "None");
        assert_eq!(value["deviceId"], "Vehicle-Samkons");
        assert_eq!(value["incidentId"], "00000000-0000-0000-0000-000000000002");
        assert_eq!(value["timestamp"], "2024-01-01T08:00:30Z");
        assert_eq!(value["location"], serde_json::json!([51.5074, -0.1278]));
    }

    #[test]
    fn test_from_json_by_kind() {
        let original = Record::Emergency(sample_emergency());
        let value = serde_json::to_value(&original).unwrap();
        let decoded = Record::from_json(RecordKind::Emergency, value).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.kind(), RecordKind::Emergency);
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        let mut value = serde_json::to_value(Record::Emergency(sample_emergency())).unwrap();
        value["extra"] = serde_json::json!(1);
        assert!(Record::from_json(RecordKind::Emergency, value).is_err());
    }
}
