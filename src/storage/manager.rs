use super::{base::StorageBackend, factory::Storage, StorageCategory, StorageConfig};
use std::collections::HashMap;

/// Maps storage categories to configured backends, so the failure log and
/// scraped data can live in different destinations.
#[derive(Clone, Default)]
pub struct StorageManager {
    storages: HashMap<StorageCategory, (Storage, Box<dyn StorageConfig>)>,
}

impl StorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_storage(
        mut self,
        category: StorageCategory,
        storage: Storage,
        destination: &str,
    ) -> Self {
        let config = storage.create_config(destination);
        self.storages.insert(category, (storage, config));
        self
    }

    pub fn get(&self, category: &StorageCategory) -> Option<&(Storage, Box<dyn StorageConfig>)> {
        self.storages.get(category)
    }
}
