//! Parquet encoding of validated rows
//!
//! Column types follow the topic schema:
//!
//! | semantic type | Arrow type |
//! |---|---|
//! | string, uuid, enumeration | `Utf8` |
//! | timestamp | `Timestamp(Microsecond, "UTC")` |
//! | double | `Float64` |
//! | integer | `Int64` |
//! | location | `Struct<latitude: Float64, longitude: Float64>` |
//!
//! Two columns are appended to every file: `_offset` (transport offset) and
//! `_late` (watermark flag).

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, RecordBatch, StringBuilder,
    StructArray, TimestampMicrosecondBuilder, UInt64Builder,
};
use arrow::buffer::NullBuffer;
use arrow::datatypes::{DataType, Field, Fields, Schema as ArrowSchema, SchemaRef, TimeUnit};
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use contracts::{FieldSpec, FieldValue, IngestedRecord, ParquetCompression, Schema, SemanticType};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

pub const OFFSET_COLUMN: &str = "_offset";
pub const LATE_COLUMN: &str = "_late";

/// `<topic>/date=YYYY-MM-DD/hour=HH`
pub fn partition_dir(topic: &str, event_time: DateTime<Utc>) -> String {
    format!(
        "{topic}/date={}/hour={:02}",
        event_time.date_naive().format("%Y-%m-%d"),
        event_time.hour()
    )
}

/// Data file name; fixed for a given batch and sequence so a replay overwrites
pub fn part_file_name(batch_id: u64, seq: usize) -> String {
    format!("part-{batch_id:010}-{seq:03}.parquet")
}

/// Split records by event-time partition, keeping offset order inside each
pub fn partition_records(records: &[IngestedRecord]) -> BTreeMap<(NaiveDate, u32), Vec<&IngestedRecord>> {
    let mut partitions: BTreeMap<(NaiveDate, u32), Vec<&IngestedRecord>> = BTreeMap::new();
    for record in records {
        let key = (record.event_time.date_naive(), record.event_time.hour());
        partitions.entry(key).or_default().push(record);
    }
    partitions
}

fn location_fields() -> Fields {
    Fields::from(vec![
        Field::new("latitude", DataType::Float64, false),
        Field::new("longitude", DataType::Float64, false),
    ])
}

fn arrow_type(semantic: &SemanticType) -> DataType {
    match semantic {
        SemanticType::String | SemanticType::Uuid | SemanticType::Enumeration(_) => DataType::Utf8,
        SemanticType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        SemanticType::Double => DataType::Float64,
        SemanticType::Integer => DataType::Int64,
        SemanticType::Location => DataType::Struct(location_fields()),
    }
}

/// Arrow schema of the data files of a topic
pub fn arrow_schema(schema: &Schema) -> SchemaRef {
    let mut fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| Field::new(&f.name, arrow_type(&f.semantic_type), f.nullable))
        .collect();
    fields.push(Field::new(OFFSET_COLUMN, DataType::UInt64, false));
    fields.push(Field::new(LATE_COLUMN, DataType::Boolean, false));
    Arc::new(ArrowSchema::new(fields))
}

enum ColumnBuilder {
    Utf8(StringBuilder),
    Timestamp(TimestampMicrosecondBuilder),
    Float64(Float64Builder),
    Int64(Int64Builder),
    Location {
        latitude: Float64Builder,
        longitude: Float64Builder,
        valid: Vec<bool>,
    },
}

impl ColumnBuilder {
    fn new(semantic: &SemanticType, capacity: usize) -> Self {
        match semantic {
            SemanticType::String | SemanticType::Uuid | SemanticType::Enumeration(_) => {
                ColumnBuilder::Utf8(StringBuilder::with_capacity(capacity, capacity * 16))
            }
            SemanticType::Timestamp => ColumnBuilder::Timestamp(
                TimestampMicrosecondBuilder::with_capacity(capacity).with_timezone("UTC"),
            ),
            SemanticType::Double => ColumnBuilder::Float64(Float64Builder::with_capacity(capacity)),
            SemanticType::Integer => ColumnBuilder::Int64(Int64Builder::with_capacity(capacity)),
            SemanticType::Location => ColumnBuilder::Location {
                latitude: Float64Builder::with_capacity(capacity),
                longitude: Float64Builder::with_capacity(capacity),
                valid: Vec::with_capacity(capacity),
            },
        }
    }

    fn append(&mut self, field: &FieldSpec, value: &FieldValue) -> Result<(), String> {
        match (self, value) {
            (ColumnBuilder::Utf8(b), FieldValue::String(s)) => b.append_value(s),
            (ColumnBuilder::Utf8(b), FieldValue::Uuid(u)) => b.append_value(u.to_string()),
            (ColumnBuilder::Utf8(b), FieldValue::Null) => b.append_null(),
            (ColumnBuilder::Timestamp(b), FieldValue::Timestamp(ts)) => {
                b.append_value(ts.timestamp_micros())
            }
            (ColumnBuilder::Timestamp(b), FieldValue::Null) => b.append_null(),
            (ColumnBuilder::Float64(b), FieldValue::Double(d)) => b.append_value(*d),
            (ColumnBuilder::Float64(b), FieldValue::Null) => b.append_null(),
            (ColumnBuilder::Int64(b), FieldValue::Integer(i)) => b.append_value(*i),
            (ColumnBuilder::Int64(b), FieldValue::Null) => b.append_null(),
            (
                ColumnBuilder::Location {
                    latitude,
                    longitude,
                    valid,
                },
                value,
            ) => match value {
                FieldValue::Location(p) => {
                    latitude.append_value(p.latitude);
                    longitude.append_value(p.longitude);
                    valid.push(true);
                }
                FieldValue::Null => {
                    latitude.append_value(0.0);
                    longitude.append_value(0.0);
                    valid.push(false);
                }
                other => return Err(format!("field '{}' cannot hold {other:?}", field.name)),
            },
            (_, other) => return Err(format!("field '{}' cannot hold {other:?}", field.name)),
        }
        Ok(())
    }

    fn finish(self) -> Result<ArrayRef, String> {
        Ok(match self {
            ColumnBuilder::Utf8(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Timestamp(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Float64(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Int64(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Location {
                mut latitude,
                mut longitude,
                valid,
            } => {
                let nulls = if valid.iter().all(|v| *v) {
                    None
                } else {
                    Some(NullBuffer::from(valid))
                };
                let children: Vec<ArrayRef> =
                    vec![Arc::new(latitude.finish()), Arc::new(longitude.finish())];
                let array = StructArray::try_new(location_fields(), children, nulls)
                    .map_err(|e| e.to_string())?;
                Arc::new(array)
            }
        })
    }
}

/// Turns rows of one topic into Parquet file bytes
#[derive(Debug, Clone)]
pub struct ParquetEncoder {
    schema: Arc<Schema>,
    arrow_schema: SchemaRef,
    properties: WriterProperties,
}

impl ParquetEncoder {
    pub fn new(schema: Arc<Schema>, compression: ParquetCompression) -> Self {
        let codec = match compression {
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
            ParquetCompression::Snappy => Compression::SNAPPY,
        };
        let properties = WriterProperties::builder().set_compression(codec).build();
        Self {
            arrow_schema: arrow_schema(&schema),
            schema,
            properties,
        }
    }

    pub fn arrow_schema(&self) -> &SchemaRef {
        &self.arrow_schema
    }

    /// Build the record batch for `records`
    pub fn record_batch(&self, records: &[&IngestedRecord]) -> Result<RecordBatch, String> {
        let fields = self.schema.fields();
        let mut builders: Vec<ColumnBuilder> = fields
            .iter()
            .map(|f| ColumnBuilder::new(&f.semantic_type, records.len()))
            .collect();
        let mut offsets = UInt64Builder::with_capacity(records.len());
        let mut late = BooleanBuilder::with_capacity(records.len());

        for record in records {
            for (index, (field, builder)) in fields.iter().zip(builders.iter_mut()).enumerate() {
                let value = record.row.get(index).unwrap_or(&FieldValue::Null);
                builder.append(field, value)?;
            }
            offsets.append_value(record.offset);
            late.append_value(record.late);
        }

        let mut columns = builders
            .into_iter()
            .map(ColumnBuilder::finish)
            .collect::<Result<Vec<_>, _>>()?;
        columns.push(Arc::new(offsets.finish()));
        columns.push(Arc::new(late.finish()));

        RecordBatch::try_new(Arc::clone(&self.arrow_schema), columns).map_err(|e| e.to_string())
    }

    /// Encode `records` as one Parquet file
    pub fn encode(&self, records: &[&IngestedRecord]) -> Result<Bytes, String> {
        let batch = self.record_batch(records)?;
        let mut writer = ArrowWriter::try_new(
            Vec::new(),
            Arc::clone(&self.arrow_schema),
            Some(self.properties.clone()),
        )
        .map_err(|e| e.to_string())?;
        writer.write(&batch).map_err(|e| e.to_string())?;
        let buffer = writer.into_inner().map_err(|e| e.to_string())?;
        Ok(Bytes::from(buffer))
    }
}
