//! Payload decoding and schema validation

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use contracts::{ContractError, FieldSpec, FieldValue, Position, Record, Row, Schema, SemanticType};

/// Decode a raw payload (UTF-8 JSON) and validate it against `schema`
pub fn decode_payload(schema: &Schema, payload: &[u8]) -> Result<Row, ContractError> {
    let text = std::str::from_utf8(payload).map_err(|e| {
        ContractError::decode_validation(schema.topic(), format!("payload is not UTF-8: {e}"))
    })?;
    let value: Value = serde_json::from_str(text).map_err(|e| {
        ContractError::decode_validation(schema.topic(), format!("malformed JSON: {e}"))
    })?;
    validate(schema, &value)
}

/// Validate a JSON value against `schema`, producing a row in schema order
///
/// Fails on a non-object payload, an unknown field, a missing or null
/// non-nullable field, or a value that does not match its semantic type.
pub fn validate(schema: &Schema, value: &Value) -> Result<Row, ContractError> {
    let object = value.as_object().ok_or_else(|| {
        ContractError::decode_validation(schema.topic(), "payload is not a JSON object")
    })?;

    reject_unknown_fields(schema, object)?;

    let values = schema
        .fields()
        .iter()
        .map(|field| validate_field(schema, field, object.get(&field.name)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Row::new(values))
}

/// Rebuild the typed record a validated row came from
pub fn decode_record(schema: &Schema, row: &Row) -> Result<Record, ContractError> {
    Record::from_json(schema.kind(), row.to_json(schema))
        .map_err(|e| ContractError::decode_validation(schema.topic(), e.to_string()))
}

fn reject_unknown_fields(schema: &Schema, object: &Map<String, Value>) -> Result<(), ContractError> {
    match object.keys().find(|key| schema.field(key).is_none()) {
        Some(key) => Err(ContractError::decode_validation(
            schema.topic(),
            format!("unknown field '{key}'"),
        )),
        None => Ok(()),
    }
}

fn validate_field(
    schema: &Schema,
    field: &FieldSpec,
    value: Option<&Value>,
) -> Result<FieldValue, ContractError> {
    let value = match value {
        None | Some(Value::Null) if field.nullable => return Ok(FieldValue::Null),
        None => {
            return Err(ContractError::decode_validation(
                schema.topic(),
                format!("missing required field '{}'", field.name),
            ))
        }
        Some(Value::Null) => {
            return Err(ContractError::decode_validation(
                schema.topic(),
                format!("field '{}' must not be null", field.name),
            ))
        }
        Some(v) => v,
    };

    convert(&field.semantic_type, value).ok_or_else(|| {
        ContractError::decode_validation(
            schema.topic(),
            format!(
                "field '{}' expected {}, got {}",
                field.name,
                field.semantic_type,
                describe(value)
            ),
        )
    })
}

fn convert(semantic_type: &SemanticType, value: &Value) -> Option<FieldValue> {
    match semantic_type {
        SemanticType::String => value.as_str().map(|s| FieldValue::String(s.to_string())),
        SemanticType::Uuid => value
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(FieldValue::Uuid),
        SemanticType::Timestamp => value
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|ts| FieldValue::Timestamp(ts.with_timezone(&Utc))),
        SemanticType::Double => value.as_f64().map(FieldValue::Double),
        SemanticType::Integer => value.as_i64().map(FieldValue::Integer),
        SemanticType::Location => match value.as_array()?.as_slice() {
            [lat, lon] => Some(FieldValue::Location(Position::new(
                lat.as_f64()?,
                lon.as_f64()?,
            ))),
            _ => None,
        },
        SemanticType::Enumeration(allowed) => value
            .as_str()
            .filter(|s| allowed.iter().any(|a| a == s))
            .map(|s| FieldValue::String(s.to_string())),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(a) => format!("array of {} elements", a.len()),
        Value::Object(_) => "object".to_string(),
    }
}
