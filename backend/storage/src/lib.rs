//! Object store backends for docgate.

pub mod fs;
pub mod memory;

use std::sync::Arc;

use tracing::info;

use docgate_config::schema::{StorageBackend, StorageConfig};
use docgate_core::{ObjectStore, Result};

pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;

/// Build the object store selected by the config.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryObjectStore::new()),
        StorageBackend::Fs => Arc::new(FsObjectStore::open(&config.root).await?),
    };
    info!(backend = store.name(), root = %config.root, "Object store ready");
    Ok(store)
}
