//! Object store implementations
//!
//! - `FsObjectStore`: a directory tree, atomic puts through temp file + rename
//! - `MemoryObjectStore`: in-process map with injectable put failures

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use contracts::{ContractError, ObjectStore};
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

/// Objects stored as files under a root directory
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open (and create if needed) the root directory
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, ContractError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| ContractError::storage(root.display().to_string(), e.to_string()))?;
        debug!(root = %root.display(), "object store opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an object path onto the filesystem, refusing anything that escapes the root
    fn resolve(&self, path: &str) -> Result<PathBuf, ContractError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(ContractError::storage(path, "invalid object path"));
        }
        Ok(self.root.join(relative))
    }

    async fn write_atomically(target: &Path, data: &[u8]) -> std::io::Result<()> {
        let parent = target.parent().unwrap_or(Path::new("."));
        tokio::fs::create_dir_all(parent).await?;

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = parent.join(format!(".{file_name}.tmp"));

        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp, target).await
    }
}

impl ObjectStore for FsObjectStore {
    fn name(&self) -> &str {
        "fs"
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<(), ContractError> {
        let target = self.resolve(path)?;
        Self::write_atomically(&target, &data)
            .await
            .map_err(|e| ContractError::storage(path, e.to_string()))?;
        trace!(path, bytes = data.len(), "object written");
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Bytes>, ContractError> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(content) => Ok(Some(Bytes::from(content))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ContractError::storage(path, e.to_string())),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ContractError> {
        // Only walk the directory the prefix points into
        let start_dir = match prefix.rfind('/') {
            Some(idx) => self.resolve(&prefix[..idx])?,
            None => self.root.clone(),
        };

        let mut found = Vec::new();
        let mut pending = vec![start_dir];
        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(ContractError::storage(prefix, e.to_string())),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| ContractError::storage(prefix, e.to_string()))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| ContractError::storage(prefix, e.to_string()))?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(&self.root) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if key.starts_with(prefix) {
                    found.push(key);
                }
            }
        }

        found.sort();
        Ok(found)
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    objects: Mutex<BTreeMap<String, Bytes>>,
    /// Puts to reject right away
    failing_puts: AtomicU64,
    /// Puts allowed before every further put fails
    put_allowance: Mutex<Option<u64>>,
}

/// In-memory object store; clones share contents
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    inner: Arc<MemoryInner>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` puts
    pub fn fail_next_puts(&self, count: u64) {
        self.inner.failing_puts.store(count, Ordering::SeqCst);
    }

    /// Accept `count` more puts, then reject every put until `heal`
    pub fn fail_after_puts(&self, count: u64) {
        if let Ok(mut allowance) = self.inner.put_allowance.lock() {
            *allowance = Some(count);
        }
    }

    /// Clear all injected failures
    pub fn heal(&self) {
        self.inner.failing_puts.store(0, Ordering::SeqCst);
        if let Ok(mut allowance) = self.inner.put_allowance.lock() {
            *allowance = None;
        }
    }

    /// All stored paths, sorted
    pub fn paths(&self) -> Vec<String> {
        self.inner
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn injected_failure(&self) -> bool {
        if self
            .inner
            .failing_puts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return true;
        }
        match self.inner.put_allowance.lock() {
            Ok(mut allowance) => match *allowance {
                Some(0) => true,
                Some(n) => {
                    *allowance = Some(n - 1);
                    false
                }
                None => false,
            },
            Err(_) => true,
        }
    }

    fn poisoned(path: &str) -> ContractError {
        ContractError::storage(path, "object map lock poisoned")
    }
}

impl ObjectStore for MemoryObjectStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<(), ContractError> {
        if self.injected_failure() {
            return Err(ContractError::storage(path, "injected put failure"));
        }
        let mut objects = self.inner.objects.lock().map_err(|_| Self::poisoned(path))?;
        objects.insert(path.to_string(), data);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Bytes>, ContractError> {
        let objects = self.inner.objects.lock().map_err(|_| Self::poisoned(path))?;
        Ok(objects.get(path).cloned())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ContractError> {
        let objects = self.inner.objects.lock().map_err(|_| Self::poisoned(prefix))?;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, _)| path.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_fs_put_get_list() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).await.unwrap();

        store.put("a/b/1.json", Bytes::from_static(b"one")).await.unwrap();
        store.put("a/b/2.json", Bytes::from_static(b"two")).await.unwrap();
        store.put("a/c/3.json", Bytes::from_static(b"three")).await.unwrap();

        assert_eq!(
            store.get("a/b/1.json").await.unwrap(),
            Some(Bytes::from_static(b"one"))
        );
        assert_eq!(store.get("a/b/missing").await.unwrap(), None);

        assert_eq!(
            store.list("a/b/").await.unwrap(),
            vec!["a/b/1.json".to_string(), "a/b/2.json".to_string()]
        );
        assert_eq!(store.list("a/").await.unwrap().len(), 3);
        assert!(store.list("nothing/here/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fs_overwrite_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).await.unwrap();

        store.put("x/obj", Bytes::from_static(b"v1")).await.unwrap();
        store.put("x/obj", Bytes::from_static(b"v2")).await.unwrap();

        assert_eq!(store.get("x/obj").await.unwrap(), Some(Bytes::from_static(b"v2")));
        let names: Vec<_> = std::fs::read_dir(dir.path().join("x"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn test_fs_rejects_escaping_paths() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).await.unwrap();
        assert!(store.put("../evil", Bytes::new()).await.is_err());
        assert!(store.put("/abs", Bytes::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_memory_failure_injection() {
        let store = MemoryObjectStore::new();
        store.fail_next_puts(1);
        assert!(store.put("a", Bytes::new()).await.is_err());
        store.put("a", Bytes::new()).await.unwrap();

        store.fail_after_puts(1);
        store.put("b", Bytes::new()).await.unwrap();
        assert!(store.put("c", Bytes::new()).await.is_err());
        assert!(store.put("d", Bytes::new()).await.is_err());

        store.heal();
        store.put("c", Bytes::new()).await.unwrap();
        assert_eq!(store.paths(), vec!["a", "b", "c"]);
        assert_eq!(store.list("b").await.unwrap(), vec!["b".to_string()]);
    }
}
