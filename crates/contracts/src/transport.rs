//! Transport trait - publish/subscribe boundary
//!
//! One ordered log per topic. Offsets are dense and start at 0.

use bytes::Bytes;

use crate::ContractError;

/// Message handed to the transport by a producer
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub topic: String,
    pub key: String,
    pub payload: Bytes,
}

/// Message read back from a topic
#[derive(Debug, Clone, PartialEq)]
pub struct TransportMessage {
    pub topic: String,
    pub offset: u64,
    pub key: Option<String>,
    pub payload: Bytes,
}

/// Acknowledgement for a delivered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub topic: String,
    pub offset: u64,
}

/// Check that `topic` can be used as a single file or object path segment
///
/// Allowed are ASCII letters, digits, `.`, `_` and `-`, except `.` and `..`.
pub fn check_topic_name(topic: &str) -> Result<(), String> {
    if topic.is_empty() {
        return Err("topic name cannot be empty".to_string());
    }
    if topic == "." || topic == ".." {
        return Err(format!("'{topic}' is not a valid topic name"));
    }
    if let Some(c) = topic
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(format!(
            "topic name '{topic}' contains '{c}'; use letters, digits, '.', '_' or '-'"
        ));
    }
    Ok(())
}

/// Publish/subscribe transport
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Transport name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Append a message to its topic
    ///
    /// # Errors
    /// Returns `ContractError::Transport` if the message was not durably appended
    async fn send(&self, message: OutboundMessage) -> Result<DeliveryReport, ContractError>;

    /// Read up to `max_messages` messages starting at `from_offset`
    ///
    /// Returns an empty vector when nothing is available yet.
    async fn fetch(
        &self,
        topic: &str,
        from_offset: u64,
        max_messages: usize,
    ) -> Result<Vec<TransportMessage>, ContractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names() {
        for ok in ["vehicle_data", "gps-data", "city.weather.v2", "..hidden"] {
            assert!(check_topic_name(ok).is_ok(), "{ok}");
        }
        for bad in ["", ".", "..", "../escaped", "a/b", "a\\b", "with space", "caf\u{e9}"] {
            assert!(check_topic_name(bad).is_err(), "{bad}");
        }
    }
}
