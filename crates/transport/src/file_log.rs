//! File-backed transport: one JSON-lines log per topic
//!
//! `<dir>/<topic>.jsonl`, one `{"key": ..., "value": ...}` object per line.
//! The offset of a message is its line index. A trailing line without a newline
//! is an append in progress and is not visible to readers yet.
//!
//! A single producer process is assumed; readers may live in other processes.
//! The producer cuts off any unterminated fragment before appending, so a
//! failed or interrupted write never merges with the next message.
//! Payloads must be UTF-8 since they are stored as JSON strings.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use contracts::{
    check_topic_name, ContractError, DeliveryReport, OutboundMessage, Transport, TransportMessage,
};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct LogLine {
    key: Option<String>,
    value: String,
}

/// End of the last complete line of a topic log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LogEnd {
    next_offset: u64,
    len: u64,
}

impl LogEnd {
    fn scan(content: &[u8]) -> Self {
        let lines = content.iter().filter(|b| **b == b'\n').count();
        let len = content.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
        Self {
            next_offset: lines as u64,
            len: len as u64,
        }
    }
}

/// Directory of per-topic append-only logs
#[derive(Debug)]
pub struct FileLogTransport {
    dir: PathBuf,
    /// Log end per topic, populated on first send
    log_ends: Mutex<HashMap<String, LogEnd>>,
}

impl FileLogTransport {
    /// Open (and create if needed) the log directory
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, ContractError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            ContractError::transport("file", format!("cannot create {}: {e}", dir.display()))
        })?;
        debug!(dir = %dir.display(), "file log transport opened");
        Ok(Self {
            dir,
            log_ends: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn log_path(&self, topic: &str) -> Result<PathBuf, ContractError> {
        check_topic_name(topic).map_err(|message| ContractError::transport("file", message))?;
        Ok(self.dir.join(format!("{topic}.jsonl")))
    }

    /// Raw log content, empty if the log does not exist yet
    async fn read_log(path: &Path) -> Result<Vec<u8>, ContractError> {
        match tokio::fs::read(path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(ContractError::transport(
                "file",
                format!("cannot read {}: {e}", path.display()),
            )),
        }
    }

    /// Complete lines of a topic log
    async fn read_lines(&self, topic: &str) -> Result<Vec<String>, ContractError> {
        let content = Self::read_log(&self.log_path(topic)?).await?;

        Ok(content
            .split_inclusive(|b| *b == b'\n')
            .filter(|line| line.ends_with(b"\n"))
            .map(|line| String::from_utf8_lossy(&line[..line.len() - 1]).into_owned())
            .collect())
    }
}

async fn append_line(file: &mut tokio::fs::File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.flush().await
}

impl Transport for FileLogTransport {
    fn name(&self) -> &str {
        "file"
    }

    async fn send(&self, message: OutboundMessage) -> Result<DeliveryReport, ContractError> {
        let value = String::from_utf8(message.payload.to_vec()).map_err(|_| {
            ContractError::transport("file", format!("payload for '{}' is not UTF-8", message.topic))
        })?;
        let mut line = serde_json::to_string(&LogLine {
            key: Some(message.key),
            value,
        })
        .map_err(|e| ContractError::transport("file", e.to_string()))?;
        line.push('\n');

        let path = self.log_path(&message.topic)?;
        let mut log_ends = self.log_ends.lock().await;
        let end = match log_ends.get(&message.topic) {
            Some(end) => *end,
            None => LogEnd::scan(&Self::read_log(&path).await?),
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                ContractError::transport("file", format!("cannot open {}: {e}", path.display()))
            })?;

        let current_len = file.metadata().await?.len();
        let end = if current_len < end.len {
            // Shortened behind our back: trust the file
            LogEnd::scan(&Self::read_log(&path).await?)
        } else {
            end
        };
        if current_len > end.len {
            warn!(
                topic = %message.topic,
                dropped_bytes = current_len.saturating_sub(end.len),
                "discarding unterminated log fragment"
            );
            file.set_len(end.len).await?;
        }

        if let Err(e) = append_line(&mut file, line.as_bytes()).await {
            if let Err(rollback) = file.set_len(end.len).await {
                warn!(topic = %message.topic, error = %rollback, "cannot roll back partial append");
            }
            return Err(ContractError::transport(
                "file",
                format!("cannot append to {}: {e}", path.display()),
            ));
        }

        let offset = end.next_offset;
        log_ends.insert(
            message.topic.clone(),
            LogEnd {
                next_offset: offset + 1,
                len: end.len + line.len() as u64,
            },
        );

        Ok(DeliveryReport {
            topic: message.topic,
            offset,
        })
    }

    async fn fetch(
        &self,
        topic: &str,
        from_offset: u64,
        max_messages: usize,
    ) -> Result<Vec<TransportMessage>, ContractError> {
        let lines = self.read_lines(topic).await?;
        let start = usize::try_from(from_offset).unwrap_or(usize::MAX);

        Ok(lines
            .into_iter()
            .enumerate()
            .skip(start)
            .take(max_messages)
            .map(|(offset, line)| match serde_json::from_str::<LogLine>(&line) {
                Ok(entry) => TransportMessage {
                    topic: topic.to_string(),
                    offset: offset as u64,
                    key: entry.key,
                    payload: Bytes::from(entry.value),
                },
                Err(e) => {
                    // Keep offsets dense; the reader rejects the raw line
                    warn!(topic = %topic, offset, error = %e, "corrupt log line");
                    TransportMessage {
                        topic: topic.to_string(),
                        offset: offset as u64,
                        key: None,
                        payload: Bytes::from(line),
                    }
                }
            })
            .collect())
    }
}
