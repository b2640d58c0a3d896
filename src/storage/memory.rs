use super::base::{StorageBackend, StorageConfig, StorageError, StorageItem};
use erased_serde::Serialize as ErasedSerialize;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// In-memory backend. Useful in tests and anywhere persisted output only
/// needs to be inspected, not kept.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    items: Arc<Mutex<Vec<Value>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<Value> {
        self.items.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub collection: String,
}

impl StorageConfig for MemoryConfig {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn clone_box(&self) -> Box<dyn StorageConfig> {
        Box::new(self.clone())
    }
}

#[async_trait::async_trait]
impl StorageBackend for MemoryStorage {
    fn create_config(&self, destination: &str) -> Box<dyn StorageConfig> {
        Box::new(MemoryConfig {
            collection: destination.to_string(),
        })
    }

    async fn store_serialized(
        &self,
        item: StorageItem<Box<dyn ErasedSerialize + Send + Sync>>,
        config: &dyn StorageConfig,
    ) -> Result<(), StorageError> {
        let config = config
            .as_any()
            .downcast_ref::<MemoryConfig>()
            .expect("Invalid config type");

        let json = serde_json::json!({
            "collection": config.collection,
            "task": item.task,
            "timestamp": item.timestamp,
            "data": item.data,
            "metadata": item.metadata,
        });
        self.items.lock().push(json);
        Ok(())
    }
}
