use super::{base::StorageError, DiskStorage, MemoryStorage, StorageBackend, StorageConfig, StorageItem};
use anyhow::Error;
use async_trait::async_trait;
use erased_serde::Serialize as ErasedSerialize;

pub enum StorageType {
    Disk { path: String },
    Memory,
}

#[derive(Clone)]
pub enum Storage {
    Disk(Box<DiskStorage>),
    Memory(Box<MemoryStorage>),
}

#[async_trait]
impl StorageBackend for Storage {
    fn create_config(&self, destination: &str) -> Box<dyn StorageConfig> {
        match self {
            Storage::Disk(storage) => storage.create_config(destination),
            Storage::Memory(storage) => storage.create_config(destination),
        }
    }

    async fn store_serialized(
        &self,
        item: StorageItem<Box<dyn ErasedSerialize + Send + Sync>>,
        config: &dyn StorageConfig,
    ) -> Result<(), StorageError> {
        match self {
            Storage::Disk(storage) => storage.store_serialized(item, config).await,
            Storage::Memory(storage) => storage.store_serialized(item, config).await,
        }
    }
}

pub async fn create_storage(storage_type: StorageType) -> Result<Storage, Error> {
    match storage_type {
        StorageType::Disk { path } => Ok(Storage::Disk(Box::new(DiskStorage::new(path)?))),
        StorageType::Memory => Ok(Storage::Memory(Box::new(MemoryStorage::new()))),
    }
}
