//! # Transport
//!
//! Local implementations of the publish/subscribe boundary.
//!
//! - `MemoryTransport`: shared in-process logs, for `run` and tests
//! - `FileLogTransport`: JSON-lines log per topic, lets `simulate` and
//!   `ingest` run as separate processes
//!
//! `connect` picks one from a `TransportAddress`.

mod file_log;
mod memory;

pub use file_log::FileLogTransport;
pub use memory::MemoryTransport;

use contracts::{
    ContractError, DeliveryReport, OutboundMessage, Transport, TransportAddress, TransportMessage,
};

/// Transport selected at runtime from configuration
#[derive(Debug)]
pub enum AnyTransport {
    Memory(MemoryTransport),
    File(FileLogTransport),
}

/// Connect to the transport named by `address`
pub async fn connect(address: &TransportAddress) -> Result<AnyTransport, ContractError> {
    match address {
        TransportAddress::Memory => Ok(AnyTransport::Memory(MemoryTransport::new())),
        TransportAddress::File(dir) => Ok(AnyTransport::File(FileLogTransport::open(dir).await?)),
    }
}

impl Transport for AnyTransport {
    fn name(&self) -> &str {
        match self {
            AnyTransport::Memory(t) => t.name(),
            AnyTransport::File(t) => t.name(),
        }
    }

    async fn send(&self, message: OutboundMessage) -> Result<DeliveryReport, ContractError> {
        match self {
            AnyTransport::Memory(t) => t.send(message).await,
            AnyTransport::File(t) => t.send(message).await,
        }
    }

    async fn fetch(
        &self,
        topic: &str,
        from_offset: u64,
        max_messages: usize,
    ) -> Result<Vec<TransportMessage>, ContractError> {
        match self {
            AnyTransport::Memory(t) => t.fetch(topic, from_offset, max_messages).await,
            AnyTransport::File(t) => t.fetch(topic, from_offset, max_messages).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_connect_by_address() {
        let transport = connect(&TransportAddress::Memory).await.unwrap();
        assert_eq!(transport.name(), "memory");

        let dir = tempfile::tempdir().unwrap();
        let transport = connect(&TransportAddress::File(dir.path().to_path_buf()))
            .await
            .unwrap();
        assert_eq!(transport.name(), "file");

        transport
            .send(OutboundMessage {
                topic: "t".into(),
                key: "k".into(),
                payload: Bytes::from_static(b"{}"),
            })
            .await
            .unwrap();
        assert_eq!(transport.fetch("t", 0, 1).await.unwrap().len(), 1);
    }
}
