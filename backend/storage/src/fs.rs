//! Filesystem-backed object store.
//!
//! Layout under the root directory:
//!   objects/<key>        raw bytes
//!   meta/<key>.json      content type, size, and write time
//!
//! Writes land in a temporary sibling file first and are renamed into place,
//! so readers never observe a half-written object.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use docgate_core::{validate_key, DocgateError, ObjectStore, Result, StoredObject};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    size: u64,
    stored_at: DateTime<Utc>,
}

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("objects")).await?;
        fs::create_dir_all(root.join("meta")).await?;
        debug!(root = %root.display(), "Opened filesystem object store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join("objects").join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join("meta").join(format!("{key}.json"))
    }

    async fn read_meta(&self, key: &str) -> Option<ObjectMeta> {
        let path = self.meta_path(key);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read object metadata");
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt object metadata; ignoring");
                None
            }
        }
    }
}

/// Write `bytes` to a temp file next to `path`, then rename over it.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DocgateError::Storage(format!("bad object path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    fs::write(&tmp, bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    fn name(&self) -> &str {
        "fs"
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        validate_key(key)?;
        let path = self.object_path(key);
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            // A directory at the object path means the key is only a prefix.
            Err(_) if path.is_dir() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let content_type = self.read_meta(key).await.and_then(|m| m.content_type);
        Ok(Some(StoredObject {
            key: key.to_string(),
            data: Bytes::from(data),
            content_type,
        }))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<()> {
        validate_key(key)?;
        let meta = ObjectMeta {
            content_type: content_type.map(str::to_string),
            size: data.len() as u64,
            stored_at: Utc::now(),
        };
        let meta_json = serde_json::to_vec(&meta)
            .map_err(|e| DocgateError::Storage(format!("failed to encode metadata: {e}")))?;

        write_atomic(&self.object_path(key), &data).await?;
        write_atomic(&self.meta_path(key), &meta_json).await?;
        debug!(key, bytes = data.len(), "Stored object on disk");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn round_trips_bytes_and_content_type() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::open(dir.path()).await.unwrap();
        let body = Bytes::from(vec![0u8, 1, 2, 255, 254]);

        store.put("reports/q1.pdf", body.clone(), Some("application/pdf")).await.unwrap();
        let object = store.get("reports/q1.pdf").await.unwrap().unwrap();

        assert_eq!(object.data, body);
        assert_eq!(object.content_type.as_deref(), Some("application/pdf"));
        assert!(dir.path().join("objects/reports/q1.pdf").exists());
        assert!(dir.path().join("meta/reports/q1.pdf.json").exists());
    }

    #[tokio::test]
    async fn missing_object_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::open(dir.path()).await.unwrap();
        assert!(store.get("absent.pdf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn prefix_of_existing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::open(dir.path()).await.unwrap();
        store.put("a/b.pdf", Bytes::from_static(b"x"), None).await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn object_without_metadata_has_no_content_type() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("objects/raw.bin"), b"raw").unwrap();

        let object = store.get("raw.bin").await.unwrap().unwrap();
        assert_eq!(&object.data[..], b"raw");
        assert!(object.content_type.is_none());
    }

    #[tokio::test]
    async fn overwrite_replaces_content() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::open(dir.path()).await.unwrap();
        store.put("k.md", Bytes::from_static(b"old"), Some("text/markdown")).await.unwrap();
        store.put("k.md", Bytes::from_static(b"new"), None).await.unwrap();

        let object = store.get("k.md").await.unwrap().unwrap();
        assert_eq!(&object.data[..], b"new");
        assert!(object.content_type.is_none());
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::open(dir.path()).await.unwrap();
        let err = store.get("../outside").await.unwrap_err();
        assert!(matches!(err, DocgateError::BadRequest(_)));
    }
}
