//! ObjectStore trait - durable storage boundary for data files and checkpoints

use bytes::Bytes;

use crate::ContractError;

/// Key/value object storage with atomic puts
///
/// Paths are `/`-separated and relative to the store root.
#[trait_variant::make(ObjectStore: Send)]
pub trait LocalObjectStore {
    /// Store name (used for logging)
    fn name(&self) -> &str;

    /// Write an object; readers see either the old or the new content, never a mix
    async fn put(&self, path: &str, data: Bytes) -> Result<(), ContractError>;

    /// Read an object, `None` if absent
    async fn get(&self, path: &str) -> Result<Option<Bytes>, ContractError>;

    /// List object paths under `prefix`, sorted
    async fn list(&self, prefix: &str) -> Result<Vec<String>, ContractError>;
}
