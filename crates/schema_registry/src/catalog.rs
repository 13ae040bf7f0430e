//! Field contracts of the five telemetry topics

use contracts::{
    ContractError, FieldSpec, IncidentStatus, IncidentType, RecordKind, Schema, SemanticType,
    WeatherCondition,
};

use SemanticType::{Double, Integer, Location, String as Str, Timestamp, Uuid};

/// Field list for `kind`, in wire order
pub fn fields_for(kind: RecordKind) -> Vec<FieldSpec> {
    let req = FieldSpec::required;
    match kind {
        RecordKind::Vehicle => vec![
            req("id", Uuid),
            req("deviceId", Str),
            req("timestamp", Timestamp),
            req("location", Location),
            req("speed", Double),
            req("direction", Str),
            req("make", Str),
            req("model", Str),
            req("year", Integer),
            req("fuelType", Str),
        ],
        RecordKind::Gps => vec![
            req("id", Uuid),
            req("deviceId", Str),
            req("timestamp", Timestamp),
            req("speed", Double),
            req("direction", Str),
            req("vehicleType", Str),
        ],
        RecordKind::Traffic => vec![
            req("id", Uuid),
            req("deviceId", Str),
            req("cameraId", Str),
            req("timestamp", Timestamp),
            req("location", Location),
            req("snapshot", Str),
        ],
        RecordKind::Weather => vec![
            req("id", Uuid),
            req("deviceId", Str),
            req("location", Location),
            req("timestamp", Timestamp),
            req("temperature", Double),
            req(
                "weatherCondition",
                SemanticType::enumeration(WeatherCondition::ALL.iter().map(|c| c.as_str())),
            ),
            req("precipitation", Double),
            req("windSpeed", Double),
            req("humidity", Integer),
            req("airQualityIndex", Double),
        ],
        RecordKind::Emergency => vec![
            req("id", Uuid),
            req("deviceId", Str),
            req("incidentId", Uuid),
            req(
                "type",
                SemanticType::enumeration(IncidentType::ALL.iter().map(|t| t.as_str())),
            ),
            req("timestamp", Timestamp),
            req("location", Location),
            req(
                "status",
                SemanticType::enumeration(IncidentStatus::ALL.iter().map(|s| s.as_str())),
            ),
            req("description", Str),
        ],
    }
}

/// Schema for `kind` published on `topic`
pub fn schema_for_kind(kind: RecordKind, topic: &str) -> Result<Schema, ContractError> {
    Schema::new(topic, kind, fields_for(kind), "timestamp")
}
