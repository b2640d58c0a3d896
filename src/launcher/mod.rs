//! Launches all crawl tasks of a run concurrently and feeds their records
//! into the pipeline queue. Each task runs inside its own failure boundary:
//! an escaping error becomes a `BrokenTask` entry and the sibling tasks
//! carry on. The sentinel goes onto the queue strictly after every task has
//! joined, so the pipeline drains everything that was produced.


use crate::core::{CrawlContext, ScrapedRecord, Spider, TaskDescriptor, TaskId};
use crate::fetch::Fetcher;
use crate::middleware::MiddlewareChain;
use crate::proxy::ProxyPool;
use crate::registry::{CrawlState, CrawlStateRegistry};
use crate::stats::StatsTracker;
use crate::storage::{IntoStorageData, StorageBackend, StorageCategory, StorageItem, StorageManager};
use crate::{ScraperError, ScraperResult};
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Items traveling the record queue. The sentinel tells the single consumer
/// that no more records will be produced.
#[derive(Debug, Clone)]
pub enum QueueItem {
    Record(ScrapedRecord),
    Sentinel,
}

/// One failed crawl task, kept in memory during the run and flushed to the
/// failure log when the run ends.
#[derive(Debug, Clone, Serialize)]
pub struct BrokenTask {
    pub task_id: TaskId,
    pub error_kind: String,
    pub time: DateTime<Utc>,
}

impl BrokenTask {
    fn new(task_id: TaskId, error: &ScraperError) -> Self {
        Self {
            task_id,
            error_kind: error.kind().to_string(),
            time: Utc::now(),
        }
    }
}

/// A crawl task paired with the spider that executes it.
pub struct LaunchEntry {
    pub descriptor: TaskDescriptor,
    pub spider: Arc<dyn Spider>,
}

impl LaunchEntry {
    pub fn new(descriptor: TaskDescriptor, spider: Arc<dyn Spider>) -> Self {
        Self { descriptor, spider }
    }
}

pub struct SpiderLauncher {
    entries: Vec<LaunchEntry>,
    registry: Arc<CrawlStateRegistry>,
    middleware: Arc<MiddlewareChain>,
    proxy: Option<Arc<ProxyPool>>,
    fetcher: Box<dyn Fetcher>,
    queue: mpsc::Sender<QueueItem>,
    failure_log: Option<Arc<StorageManager>>,
    stats: StatsTracker,
    acceptable_duration: Duration,
    broken_tasks: Vec<BrokenTask>,
}

impl SpiderLauncher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        entries: Vec<LaunchEntry>,
        registry: Arc<CrawlStateRegistry>,
        middleware: Arc<MiddlewareChain>,
        proxy: Option<Arc<ProxyPool>>,
        fetcher: Box<dyn Fetcher>,
        queue: mpsc::Sender<QueueItem>,
        failure_log: Option<Arc<StorageManager>>,
        stats: StatsTracker,
        acceptable_duration: Duration,
    ) -> Self {
        Self {
            entries,
            registry,
            middleware,
            proxy,
            fetcher,
            queue,
            failure_log,
            stats,
            acceptable_duration,
            broken_tasks: Vec::new(),
        }
    }

    /// Runs every crawl task to completion, then closes the queue with the
    /// sentinel and reports. Individual task failures are captured, never
    /// propagated to siblings.
    pub async fn launch(mut self) -> ScraperResult<Vec<BrokenTask>> {
        let start = Utc::now();
        info!("Launching {} spiders...", self.entries.len());

        let mut joins = FuturesUnordered::new();
        for entry in self.entries.drain(..) {
            let ctx = CrawlContext::new(
                entry.descriptor.clone(),
                self.fetcher.box_clone(),
                Arc::clone(&self.middleware),
                self.proxy.clone(),
            );
            let registry = Arc::clone(&self.registry);
            let queue = self.queue.clone();
            let stats = self.stats.clone();
            let id = entry.descriptor.id;
            let spider = entry.spider;

            let handle =
                tokio::spawn(async move { run_spider(spider, ctx, registry, queue, stats).await });
            debug!(">>>> spider task {id} launched");
            joins.push(async move { (id, handle.await) });
        }

        while let Some((id, joined)) = joins.next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    warn!("spider task {id} failed: {error}");
                    self.spider_broke(BrokenTask::new(id, &error));
                }
                Err(join_error) => {
                    warn!("spider task {id} panicked: {join_error}");
                    self.spider_broke(BrokenTask {
                        task_id: id,
                        error_kind: "TaskPanic".to_string(),
                        time: Utc::now(),
                    });
                }
            }
        }

        self.close_queue().await;
        self.record_timing(start);

        if self.broken_tasks.is_empty() {
            info!("Broken spiders: 0");
        } else {
            self.log_errors();
            self.record_errors().await;
        }

        Ok(self.broken_tasks)
    }

    fn spider_broke(&mut self, broken: BrokenTask) {
        self.stats.record_broken_task();
        self.broken_tasks.push(broken);
    }

    /// Closes the queue by passing in the sentinel value.
    async fn close_queue(&self) {
        debug!("Sending sentinel value to the record pipeline...");
        if self.queue.send(QueueItem::Sentinel).await.is_err() {
            warn!("record queue already closed before sentinel");
        }
    }

    fn record_timing(&self, start: DateTime<Utc>) {
        let elapsed = Utc::now().signed_duration_since(start);
        info!("Scraping complete");
        let seconds = elapsed.num_milliseconds() as f64 / 1000.0;
        if elapsed.num_milliseconds() < self.acceptable_duration.as_millis() as i64 {
            info!("{seconds:.3}s to complete");
        } else {
            warn!("{seconds:.3}s to complete");
        }
    }

    fn log_errors(&self) {
        let num = self.broken_tasks.len();
        error!(
            "{num} broken spider{}",
            if num == 1 { "" } else { "s" }
        );
    }

    /// Bulk-appends one failure record per broken task to the failure log.
    async fn record_errors(&self) {
        let Some(manager) = &self.failure_log else {
            return;
        };
        let Some((storage, config)) = manager.get(&StorageCategory::Error) else {
            warn!("no failure-log storage registered, broken tasks not persisted");
            return;
        };
        for broken in &self.broken_tasks {
            let item = StorageItem {
                task: broken.task_id.to_string(),
                timestamp: broken.time,
                data: broken.clone().into_storage_data(),
                metadata: None,
            };
            if let Err(e) = storage.store_serialized(item, config.as_ref()).await {
                error!("failed to record spider failure: {e}");
            }
        }
    }
}

/// Body of one crawl task. Pulls the spider's record stream lazily and
/// checks the registry before each emission: a task flipped out of
/// `Running` stops producing and lets its stream drop, which returns any
/// proxy lease to the pool. A closed queue (dead consumer) also stops the
/// task rather than blocking forever.
async fn run_spider(
    spider: Arc<dyn Spider>,
    ctx: CrawlContext,
    registry: Arc<CrawlStateRegistry>,
    queue: mpsc::Sender<QueueItem>,
    stats: StatsTracker,
) -> ScraperResult<()> {
    let id = ctx.descriptor().id;
    let mut records = spider.records(&ctx);

    while let Some(item) = records.next().await {
        let payload = item?;
        if payload.is_empty() {
            continue;
        }

        let state = registry.state(id)?;
        if state != CrawlState::Running {
            warn!("{} SpiderState: {:?}", spider.name(), state);
            break;
        }

        let record = ScrapedRecord {
            task_id: id,
            payload,
        };
        if queue.send(QueueItem::Record(record)).await.is_err() {
            warn!("record queue closed, stopping {}", spider.name());
            break;
        }
        stats.record_queued();
    }

    // A finished task stays Running until the registry comes down: its
    // queued records may still fail validation and flip it to Error.
    Ok(())
}
