//! Topic schemas and validated rows
//!
//! A `Schema` is the ordered field contract of one topic. Validation turns a JSON
//! payload into a `Row` whose values follow the schema's field order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{ContractError, Position, RecordKind};

/// Semantic type of a schema field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum SemanticType {
    String,
    /// Hyphenated UUID string
    Uuid,
    /// RFC 3339 timestamp string
    Timestamp,
    Double,
    Integer,
    /// `[latitude, longitude]`
    Location,
    /// String restricted to the listed values
    Enumeration(Vec<String>),
}

impl SemanticType {
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SemanticType::Enumeration(values.into_iter().map(Into::into).collect())
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SemanticType::String => f.write_str("string"),
            SemanticType::Uuid => f.write_str("uuid"),
            SemanticType::Timestamp => f.write_str("timestamp"),
            SemanticType::Double => f.write_str("double"),
            SemanticType::Integer => f.write_str("integer"),
            SemanticType::Location => f.write_str("location"),
            SemanticType::Enumeration(values) => write!(f, "enum{{{}}}", values.join(",")),
        }
    }
}

/// A single field contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub semantic_type: SemanticType,
    pub nullable: bool,
}

impl FieldSpec {
    /// Non-nullable field
    pub fn required(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic_type,
            nullable: false,
        }
    }
}

/// Field contract for one topic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    topic: String,
    kind: RecordKind,
    fields: Vec<FieldSpec>,
    /// Index of the event-time field
    #[serde(skip)]
    event_time_index: usize,
}

impl Schema {
    /// Build a schema; `event_time_field` must name a `Timestamp` field
    pub fn new(
        topic: impl Into<String>,
        kind: RecordKind,
        fields: Vec<FieldSpec>,
        event_time_field: &str,
    ) -> Result<Self, ContractError> {
        let topic = topic.into();
        let event_time_index = fields
            .iter()
            .position(|f| f.name == event_time_field && f.semantic_type == SemanticType::Timestamp)
            .ok_or_else(|| {
                ContractError::Other(format!(
                    "schema for topic '{topic}' has no timestamp field '{event_time_field}'"
                ))
            })?;
        Ok(Self {
            topic,
            kind,
            fields,
            event_time_index,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn event_time_index(&self) -> usize {
        self.event_time_index
    }

    pub fn event_time_field(&self) -> &str {
        &self.fields[self.event_time_index].name
    }
}

/// Typed value of a validated field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    String(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Double(f64),
    Integer(i64),
    Location(Position),
}

impl FieldValue {
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Back to the wire JSON representation
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Uuid(u) => Value::String(u.to_string()),
            FieldValue::Timestamp(ts) => {
                serde_json::to_value(ts).unwrap_or_else(|_| Value::String(ts.to_rfc3339()))
            }
            FieldValue::Double(d) => serde_json::Number::from_f64(*d)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Location(p) => serde_json::json!([p.latitude, p.longitude]),
        }
    }
}

/// Validated record, values in schema field order
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<FieldValue>,
}

impl Row {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Event time according to `schema`
    pub fn event_time(&self, schema: &Schema) -> Option<DateTime<Utc>> {
        self.get(schema.event_time_index())
            .and_then(FieldValue::as_timestamp)
    }

    /// Rebuild the wire JSON object
    pub fn to_json(&self, schema: &Schema) -> serde_json::Value {
        let object = schema
            .fields()
            .iter()
            .zip(&self.values)
            .map(|(field, value)| (field.name.clone(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(object)
    }
}

/// A row read from a topic, with its transport offset and watermark verdict
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedRecord {
    pub offset: u64,
    pub event_time: DateTime<Utc>,
    pub row: Row,
    /// Event time was older than the watermark when the record arrived
    pub late: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_schema() -> Schema {
        Schema::new(
            "t",
            RecordKind::Gps,
            vec![
                FieldSpec::required("id", SemanticType::Uuid),
                FieldSpec::required("timestamp", SemanticType::Timestamp),
            ],
            "timestamp",
        )
        .unwrap()
    }

    #[test]
    fn test_event_time_field_must_be_timestamp() {
        let fields = vec![FieldSpec::required("timestamp", SemanticType::String)];
        assert!(Schema::new("t", RecordKind::Gps, fields, "timestamp").is_err());
        assert_eq!(tiny_schema().event_time_index(), 1);
    }

    #[test]
    fn test_semantic_type_display() {
        let ty = SemanticType::enumeration(["Active", "Resolved"]);
        assert_eq!(ty.to_string(), "enum{Active,Resolved}");
        assert_eq!(SemanticType::Location.to_string(), "location");
    }

    #[test]
    fn test_row_to_json_uses_schema_names() {
        let schema = tiny_schema();
        let ts = DateTime::parse_from_rfc3339("2024-01-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let row = Row::new(vec![
            FieldValue::Uuid(Uuid::from_u128(7)),
            FieldValue::Timestamp(ts),
        ]);

        let json = row.to_json(&schema);
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000007");
        assert_eq!(json["timestamp"], "2024-01-01T08:00:00Z");
        assert_eq!(row.event_time(&schema), Some(ts));
    }
}
