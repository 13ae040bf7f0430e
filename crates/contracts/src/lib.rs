//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace: record
//! types, topic schemas, transport/storage traits, checkpoints and configuration.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Event time is the simulated UTC timestamp carried by every record
//! - Transport offsets order records within a topic; there is no cross-topic order

mod blueprint;
mod checkpoint;
mod error;
mod geo;
mod record;
mod schema;
mod storage;
mod transport;

pub use blueprint::*;
pub use checkpoint::{BatchPlan, Checkpoint};
pub use error::*;
pub use geo::{Position, RouteBoundary, BIRMINGHAM, LONDON};
pub use record::*;
pub use schema::*;
pub use storage::{LocalObjectStore, ObjectStore};
pub use transport::{
    check_topic_name, DeliveryReport, LocalTransport, OutboundMessage, Transport, TransportMessage,
};
