use crate::core::SessionStorage;
use crate::utils::error::Result;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Session blob kept in a single file, parent directories created on write.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    async fn read(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, data: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process storage; clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStorage {
    slot: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemorySessionStorage {
    pub fn with_contents(data: &[u8]) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(data.to_vec()))),
        }
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn replace(&self, value: Option<Vec<u8>>) {
        *self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = value;
    }
}

impl SessionStorage for MemorySessionStorage {
    async fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.contents())
    }

    async fn write(&self, data: &[u8]) -> Result<()> {
        self.replace(Some(data.to_vec()));
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.replace(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_storage_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = FileSessionStorage::new(dir.path().join("nested/session.json"));

        assert_eq!(storage.read().await.unwrap(), None);
        storage.write(b"{}").await.unwrap();
        assert_eq!(storage.read().await.unwrap(), Some(b"{}".to_vec()));

        storage.remove().await.unwrap();
        assert_eq!(storage.read().await.unwrap(), None);
        // removing twice is fine
        storage.remove().await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_storage_clones_share_slot() {
        let a = MemorySessionStorage::default();
        let b = a.clone();
        a.write(b"x").await.unwrap();
        assert_eq!(b.contents(), Some(b"x".to_vec()));
    }
}
