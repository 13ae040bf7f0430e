//! Checkpoint files for one topic
//!
//! ```text
//! checkpoints/<topic>/offsets/<batch>.json   planned offset range
//! checkpoints/<topic>/commits/<batch>.json   committed checkpoint
//! ```
//!
//! Batch ids are numbered from 0 and parsed numerically, so ordering does not
//! depend on file name padding.

use std::sync::Arc;

use bytes::Bytes;
use contracts::{BatchPlan, Checkpoint, ContractError, ObjectStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

/// Reads and writes plan and commit files
pub struct CheckpointStore<S> {
    store: Arc<S>,
    topic: String,
}

impl<S: ObjectStore + Sync> CheckpointStore<S> {
    pub fn new(store: Arc<S>, topic: impl Into<String>) -> Self {
        Self {
            store,
            topic: topic.into(),
        }
    }

    pub fn offsets_prefix(&self) -> String {
        format!("checkpoints/{}/offsets/", self.topic)
    }

    pub fn commits_prefix(&self) -> String {
        format!("checkpoints/{}/commits/", self.topic)
    }

    /// Record the offset range of a batch before any data is written
    #[instrument(name = "checkpoint_write_plan", skip(self, plan), fields(topic = %self.topic, batch_id = plan.batch_id))]
    pub async fn write_plan(&self, plan: &BatchPlan) -> Result<(), ContractError> {
        let path = format!("{}{}.json", self.offsets_prefix(), plan.batch_id);
        self.put_json(&path, plan).await
    }

    /// Make a batch durable; everything up to `next_offset` is then persisted
    #[instrument(name = "checkpoint_commit", skip(self, checkpoint), fields(topic = %self.topic, batch_id = checkpoint.batch_id))]
    pub async fn commit(&self, checkpoint: &Checkpoint) -> Result<(), ContractError> {
        let path = format!("{}{}.json", self.commits_prefix(), checkpoint.batch_id);
        self.put_json(&path, checkpoint).await
    }

    /// Newest committed checkpoint
    pub async fn latest_commit(&self) -> Result<Option<Checkpoint>, ContractError> {
        match self.latest_id(&self.commits_prefix()).await? {
            Some(id) => {
                let path = format!("{}{id}.json", self.commits_prefix());
                self.get_json(&path).await
            }
            None => Ok(None),
        }
    }

    /// Plan newer than the latest commit, if the previous run stopped mid-batch
    pub async fn pending_plan(
        &self,
        latest_commit: Option<&Checkpoint>,
    ) -> Result<Option<BatchPlan>, ContractError> {
        let Some(planned) = self.latest_id(&self.offsets_prefix()).await? else {
            return Ok(None);
        };
        if latest_commit.is_some_and(|c| c.batch_id >= planned) {
            return Ok(None);
        }

        let path = format!("{}{planned}.json", self.offsets_prefix());
        let plan: Option<BatchPlan> = self.get_json(&path).await?;
        if let Some(plan) = &plan {
            debug!(topic = %self.topic, batch_id = plan.batch_id, "found uncommitted plan");
        }
        Ok(plan)
    }

    /// All committed checkpoints, oldest first
    pub async fn commits(&self) -> Result<Vec<Checkpoint>, ContractError> {
        let mut ids = self.ids(&self.commits_prefix()).await?;
        ids.sort_unstable();

        let mut commits = Vec::with_capacity(ids.len());
        for id in ids {
            let path = format!("{}{id}.json", self.commits_prefix());
            if let Some(checkpoint) = self.get_json(&path).await? {
                commits.push(checkpoint);
            }
        }
        Ok(commits)
    }

    async fn latest_id(&self, prefix: &str) -> Result<Option<u64>, ContractError> {
        Ok(self.ids(prefix).await?.into_iter().max())
    }

    async fn ids(&self, prefix: &str) -> Result<Vec<u64>, ContractError> {
        Ok(self
            .store
            .list(prefix)
            .await?
            .iter()
            .filter_map(|path| path.strip_prefix(prefix))
            .filter_map(|name| name.strip_suffix(".json"))
            .filter_map(|id| id.parse().ok())
            .collect())
    }

    async fn put_json<T: Serialize>(&self, path: &str, value: &T) -> Result<(), ContractError> {
        let body = serde_json::to_vec_pretty(value)
            .map_err(|e| ContractError::checkpoint(&self.topic, e.to_string()))?;
        self.store.put(path, Bytes::from(body)).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ContractError> {
        match self.store.get(path).await? {
            Some(body) => serde_json::from_slice(&body)
                .map(Some)
                .map_err(|e| ContractError::checkpoint(&self.topic, format!("{path}: {e}"))),
            None => Ok(None),
        }
    }
}
