use super::base::{StorageBackend, StorageConfig, StorageError, StorageItem};
use anyhow::Error;
use async_trait::async_trait;
use erased_serde::Serialize as ErasedSerialize;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Clone)]
pub struct DiskStorage {
    base_path: PathBuf,
}

impl DiskStorage {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, Error> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }
}

#[derive(Debug, Clone)]
pub struct DiskConfig {
    pub subfolder: Option<String>,
    pub filename_prefix: Option<String>,
}

impl StorageConfig for DiskConfig {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn clone_box(&self) -> Box<dyn StorageConfig> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl StorageBackend for DiskStorage {
    fn create_config(&self, destination: &str) -> Box<dyn StorageConfig> {
        Box::new(DiskConfig {
            subfolder: Some(destination.to_string()),
            filename_prefix: None,
        })
    }

    async fn store_serialized(
        &self,
        item: StorageItem<Box<dyn ErasedSerialize + Send + Sync>>,
        config: &dyn StorageConfig,
    ) -> Result<(), StorageError> {
        let config = config
            .as_any()
            .downcast_ref::<DiskConfig>()
            .expect("Invalid config type");

        let mut path = self.base_path.clone();
        if let Some(ref subfolder) = config.subfolder {
            path = path.join(subfolder);
        }

        let timestamp = item.timestamp.format("%Y%m%d_%H%M%S");
        let prefix = config.filename_prefix.as_deref().unwrap_or("");
        let filename = format!("{}{}_{}_{}.json", prefix, timestamp, item.task, Uuid::now_v7());

        let final_path = path.join(&item.task).join(filename);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::json!({
            "task": item.task,
            "timestamp": item.timestamp,
            "data": item.data,
            "metadata": item.metadata,
        });

        fs::write(final_path, serde_json::to_string_pretty(&json)?)?;
        Ok(())
    }
}
