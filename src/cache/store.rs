use std::collections::HashMap;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::cache::key::CacheKey;
use crate::foundation::error::{GifloomError, GifloomResult};

/// Object storage for finished composites.
pub trait ArtifactStore: Send + Sync {
    /// Whether an artifact is stored under `key`.
    fn exists(&self, key: &CacheKey) -> GifloomResult<bool>;
    /// Store `bytes` under `key`, replacing any previous artifact.
    fn put(&self, key: &CacheKey, bytes: &[u8]) -> GifloomResult<()>;
    /// Public URL of the artifact under `key`.
    fn public_url(&self, key: &CacheKey) -> String;
}

/// Store backed by a directory that is served at `base_url`.
#[derive(Clone, Debug)]
pub struct DirArtifactStore {
    dir: PathBuf,
    base_url: String,
}

impl DirArtifactStore {
    /// Store writing into `dir` (created when missing).
    pub fn new(dir: impl Into<PathBuf>, base_url: impl Into<String>) -> GifloomResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            GifloomError::cache(format!("failed to create store '{}': {e}", dir.display()))
        })?;
        Ok(Self {
            dir,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl ArtifactStore for DirArtifactStore {
    fn exists(&self, key: &CacheKey) -> GifloomResult<bool> {
        let path = self.path(key);
        path.try_exists()
            .map_err(|e| GifloomError::cache(format!("failed to stat '{}': {e}", path.display())))
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> GifloomResult<()> {
        let path = self.path(key);
        // Write beside the target and rename so readers never see a partial file.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| GifloomError::cache(format!("failed to create temp artifact: {e}")))?;
        tmp.write_all(bytes)
            .map_err(|e| GifloomError::cache(format!("failed to write artifact: {e}")))?;
        tmp.persist(&path).map_err(|e| {
            GifloomError::cache(format!("failed to persist '{}': {}", path.display(), e.error))
        })?;
        tracing::debug!(key = %key, len = bytes.len(), "artifact stored");
        Ok(())
    }

    fn public_url(&self, key: &CacheKey) -> String {
        format!("{}/{}", self.base_url, key.file_name())
    }
}

/// Process-local store for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    entries: Mutex<HashMap<CacheKey, Vec<u8>>>,
}

impl InMemoryArtifactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the artifact under `key`.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn exists(&self, key: &CacheKey) -> GifloomResult<bool> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| GifloomError::cache("artifact store lock poisoned"))?;
        Ok(entries.contains_key(key))
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> GifloomResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| GifloomError::cache("artifact store lock poisoned"))?;
        entries.insert(*key, bytes.to_vec());
        Ok(())
    }

    fn public_url(&self, key: &CacheKey) -> String {
        format!("memory://{}", key.file_name())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/store.rs"]
mod tests;
