//! # Ingestion
//!
//! Topic readers for the telemetry pipeline.
//!
//! Responsibilities:
//! - Pull messages per topic from a `Transport`, in offset order
//! - Decode and validate payloads against the topic schema
//! - Track the event-time watermark and flag late records
//! - Resume from a checkpointed offset and watermark
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{ReaderConfig, StreamReader};
//!
//! let mut reader = StreamReader::new("gps_data", &registry, transport, ReaderConfig::default())?;
//! reader.seek(checkpoint.next_offset);
//! reader.restore_watermark(checkpoint.max_event_time);
//! let batch = reader.poll().await?;
//! ```

mod config;
mod error;
mod reader;
mod watermark;

// Re-exports
pub use config::{ReaderConfig, ReaderMetrics, ReaderSnapshot};
pub use error::{IngestionError, Result};
pub use reader::{ReadBatch, StreamReader};
pub use watermark::WatermarkTracker;
