use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::types::StoredObject;

/// Key/value blob storage with content-type metadata.
///
/// `put` overwrites any existing object under the same key; concurrent writers
/// to one key race and the last write wins.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name for logs (e.g. "memory", "fs").
    fn name(&self) -> &str;

    /// Fetch an object, or `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<StoredObject>>;

    /// Store `data` under `key`.
    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<()>;
}
