use crate::config::DEFAULT_DISK_PATH;
use crate::error::{DriftError, Result};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// DiskStore holds disk-tier blob content, one file per blob id.
/// Files live at {base_path}/{blob_id}.blob
#[derive(Debug, Clone)]
pub struct DiskStore {
    base_path: PathBuf,
}

impl DiskStore {
    pub fn new(base_path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&base_path).map_err(|e| {
            DriftError::StorageWrite(format!(
                "failed to create disk storage path {:?}: {}",
                base_path, e
            ))
        })?;
        Ok(Self { base_path })
    }

    /// Open the configured directory, falling back to the default one when it
    /// cannot be created.
    pub fn open(preferred: &Path) -> Result<Self> {
        match Self::new(preferred.to_path_buf()) {
            Ok(store) => Ok(store),
            Err(error) => {
                let fallback = PathBuf::from(DEFAULT_DISK_PATH);
                if preferred == fallback.as_path() {
                    return Err(DriftError::Config(error.to_string()));
                }

                tracing::warn!(
                    "Could not create disk storage path {:?}: {}. Falling back to {:?}",
                    preferred,
                    error,
                    fallback
                );
                Self::new(fallback).map_err(|e| {
                    DriftError::Config(format!("could not create any disk storage path: {}", e))
                })
            }
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the backing file for a blob. Derived from the id only.
    pub fn blob_path(&self, blob_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.blob", blob_id))
    }

    /// Write the full content for a blob and return its path.
    ///
    /// The file only appears under its final name once it is fully written
    /// and synced.
    pub async fn write(&self, blob_id: &str, data: &Bytes) -> Result<PathBuf> {
        let blob_path = self.blob_path(blob_id);
        let temp_path = blob_path.with_extension("tmp");

        if let Err(e) = write_synced(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(DriftError::StorageWrite(format!(
                "failed to write {:?}: {}",
                temp_path, e
            )));
        }

        if let Err(e) = fs::rename(&temp_path, &blob_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(DriftError::StorageWrite(format!(
                "failed to move {:?} into place: {}",
                blob_path, e
            )));
        }

        tracing::debug!(
            "Wrote blob {} ({} bytes) to {:?}",
            blob_id,
            data.len(),
            blob_path
        );
        Ok(blob_path)
    }

    pub async fn read(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path)
            .await
            .map_err(|e| DriftError::StorageRead(format!("failed to read {:?}: {}", path, e)))?;
        Ok(Bytes::from(data))
    }

    pub async fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await?;
        Ok(())
    }

    /// List the blob files currently under the base path
    pub async fn list_blob_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some("blob")
            {
                files.push(path);
            }
        }

        Ok(files)
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disk_store_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(temp_dir.path().to_path_buf()).unwrap();

        let blob_id = "0123456789abcdef0123456789abcdef";
        let data = Bytes::from("test data content");

        let path = store.write(blob_id, &data).await.unwrap();
        assert_eq!(path, temp_dir.path().join(format!("{}.blob", blob_id)));
        assert!(!path.with_extension("tmp").exists());

        let retrieved = store.read(&path).await.unwrap();
        assert_eq!(retrieved, data);

        let files = store.list_blob_files().await.unwrap();
        assert_eq!(files, vec![path.clone()]);

        store.remove(&path).await.unwrap();
        assert!(!path.exists());
        assert!(store.remove(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_read_missing_file_is_storage_read_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(temp_dir.path().to_path_buf()).unwrap();

        let err = store.read(&store.blob_path("missing")).await.unwrap_err();
        assert!(matches!(err, DriftError::StorageRead(_)));
    }

    #[tokio::test]
    async fn test_write_into_vanished_directory_fails_cleanly() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("blobs");
        let store = DiskStore::new(root.clone()).unwrap();
        std::fs::remove_dir_all(&root).unwrap();

        let err = store
            .write("deadbeef", &Bytes::from_static(b"payload"))
            .await
            .unwrap_err();
        assert!(matches!(err, DriftError::StorageWrite(_)));
        assert!(!root.exists());
    }

    #[test]
    fn test_open_falls_back_when_preferred_path_is_unusable() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let preferred = blocker.join("nested");
        let store = DiskStore::open(&preferred).unwrap();
        assert_eq!(store.base_path(), Path::new(DEFAULT_DISK_PATH));
        let _ = std::fs::remove_dir(DEFAULT_DISK_PATH);
    }
}
