//! # Persistence
//!
//! Exactly-once Parquet persistence of validated topic streams.
//!
//! Responsibilities:
//! - One independent pipeline per topic: poll, validate, batch, persist
//! - Plan / write / commit checkpoint protocol with replay on restart
//! - Event-time partitioned Parquet files
//! - Retry of failed writes with capped exponential backoff

pub mod checkpoint;
pub mod columnar;
pub mod control;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod pipeline;
pub mod sink;
pub mod store;
pub mod supervisor;

pub use checkpoint::CheckpointStore;
pub use columnar::{arrow_schema, ParquetEncoder, LATE_COLUMN, OFFSET_COLUMN};
pub use control::RunState;
pub use error::{PersistenceError, Result};
pub use handle::PipelineHandle;
pub use metrics::{SinkMetrics, SinkSnapshot};
pub use pipeline::{PipelineSummary, StopReason, TopicPipeline};
pub use sink::{BatchProgress, Committed, PersistenceSink, RetryPolicy};
pub use store::{FsObjectStore, MemoryObjectStore};
pub use supervisor::{Supervisor, SupervisorBuilder, TopicMetrics};
