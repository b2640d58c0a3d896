//! Single-consumer end of the record queue: validates each record against
//! its task's schema and hands it to the task's persistence routine.
//! Validation problems degrade the one task (its registry state flips to
//! `Error`, stopping further production); persistence failures are fatal
//! for the whole run and propagate out of `listen`.

mod schema;

#[cfg(test)]
mod tests;

pub use schema::{FieldKind, FieldSchema, FieldSpec, RecordSchema, SchemaViolation};

use crate::core::{ScrapedRecord, TaskDescriptor};
use crate::launcher::QueueItem;
use crate::registry::CrawlStateRegistry;
use crate::stats::StatsTracker;
use crate::storage::{IntoStorageData, Storage, StorageBackend, StorageConfig, StorageItem};
use crate::ScraperResult;
use async_trait::async_trait;
use chrono::Utc;
use log::{error, info};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Persistence routine for one task type.
#[async_trait]
pub trait RecordWriter: Send + Sync {
    async fn persist(
        &self,
        descriptor: &TaskDescriptor,
        record: &ScrapedRecord,
    ) -> ScraperResult<()>;
}

/// Writes validated records through a storage backend.
pub struct StorageWriter {
    storage: Storage,
    config: Box<dyn StorageConfig>,
}

impl StorageWriter {
    pub fn new(storage: Storage, destination: &str) -> Self {
        let config = storage.create_config(destination);
        Self { storage, config }
    }
}

#[async_trait]
impl RecordWriter for StorageWriter {
    async fn persist(
        &self,
        descriptor: &TaskDescriptor,
        record: &ScrapedRecord,
    ) -> ScraperResult<()> {
        let item = StorageItem {
            task: descriptor.name.clone(),
            timestamp: Utc::now(),
            data: record.payload.clone().into_storage_data(),
            metadata: Some(serde_json::json!({
                "task_id": record.task_id,
                "domain": descriptor.domain,
            })),
        };
        self.storage.store_serialized(item, self.config.as_ref()).await?;
        Ok(())
    }
}

/// Schema plus persistence routine for one task type. A handler without a
/// schema is registered deliberately incomplete; records for it are
/// rejected and the task flipped to `Error`.
pub struct TaskHandler {
    pub schema: Option<Arc<dyn RecordSchema>>,
    pub writer: Arc<dyn RecordWriter>,
}

/// Explicit task-type → handler map supplied at startup. Replaces any
/// convention-based lookup: a task type without an entry here simply has no
/// pipeline.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, TaskHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S>(mut self, task_name: &str, schema: S, writer: Arc<dyn RecordWriter>) -> Self
    where
        S: RecordSchema + 'static,
    {
        self.handlers.insert(
            task_name.to_string(),
            TaskHandler {
                schema: Some(Arc::new(schema)),
                writer,
            },
        );
        self
    }

    pub fn register_handler(mut self, task_name: &str, handler: TaskHandler) -> Self {
        self.handlers.insert(task_name.to_string(), handler);
        self
    }

    pub fn get(&self, task_name: &str) -> Option<&TaskHandler> {
        self.handlers.get(task_name)
    }
}

pub struct RecordPipeline {
    queue: mpsc::Receiver<QueueItem>,
    registry: Arc<CrawlStateRegistry>,
    handlers: Arc<HandlerRegistry>,
    stats: StatsTracker,
}

impl RecordPipeline {
    pub fn new(
        queue: mpsc::Receiver<QueueItem>,
        registry: Arc<CrawlStateRegistry>,
        handlers: Arc<HandlerRegistry>,
        stats: StatsTracker,
    ) -> Self {
        Self {
            queue,
            registry,
            handlers,
            stats,
        }
    }

    /// Drains the queue until the sentinel arrives. Records enqueued before
    /// the sentinel are each processed exactly once, in arrival order.
    pub async fn listen(mut self) -> ScraperResult<()> {
        while let Some(item) = self.queue.recv().await {
            match item {
                QueueItem::Sentinel => {
                    info!("Pipeline sentinel value received");
                    break;
                }
                QueueItem::Record(record) => self.process_record(record).await?,
            }
        }
        info!("Pipeline terminated");
        Ok(())
    }

    async fn process_record(&self, record: ScrapedRecord) -> ScraperResult<()> {
        let descriptor = match self.registry.descriptor(record.task_id) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                error!("record for unknown task {}: {e}", record.task_id);
                self.stats.record_rejected();
                return Ok(());
            }
        };

        let Some(handler) = self.handlers.get(&descriptor.name) else {
            error!("no pipeline handler registered for '{}'", descriptor.name);
            self.reject(&descriptor)?;
            return Ok(());
        };

        let Some(schema) = handler.schema.as_ref() else {
            error!("no validation schema registered for '{}'", descriptor.name);
            self.reject(&descriptor)?;
            return Ok(());
        };

        if let Err(violation) = schema.validate(&record.payload) {
            error!("validation failed for '{}': {violation}", descriptor.name);
            self.reject(&descriptor)?;
            return Ok(());
        }

        // A validated record that fails to persist would silently corrupt
        // downstream record counts, so this error ends the run.
        if let Err(e) = handler.writer.persist(&descriptor, &record).await {
            error!("{} ({})", e.kind(), descriptor.name);
            return Err(e);
        }
        self.stats.record_processed();
        Ok(())
    }

    /// Drops the record and stops the task from producing more.
    fn reject(&self, descriptor: &TaskDescriptor) -> ScraperResult<()> {
        self.registry.mark_error(descriptor.id)?;
        self.stats.record_rejected();
        Ok(())
    }
}
