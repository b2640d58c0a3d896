//! Top-level coordinator for one crawl run: builds the run-scoped registry,
//! the proxy pool (when enabled), the bounded record queue, the launcher and
//! the pipeline, runs both sides to joint completion, and always tears the
//! registry down afterwards so no state leaks into the next run.

use crate::core::CrawlConfig;
use crate::fetch::Fetcher;
use crate::launcher::{LaunchEntry, QueueItem, SpiderLauncher};
use crate::middleware::MiddlewareChain;
use crate::pipeline::{HandlerRegistry, RecordPipeline};
use crate::proxy::ProxyPool;
use crate::registry::CrawlStateRegistry;
use crate::stats::StatsTracker;
use crate::storage::StorageManager;
use crate::ScraperResult;
use log::debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// What one run reports back to its caller.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub broken_tasks: usize,
    pub duration: Duration,
}

impl RunResult {
    pub fn duration_seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}

pub struct CrawlSession {
    config: CrawlConfig,
    handlers: Arc<HandlerRegistry>,
    fetcher: Box<dyn Fetcher>,
    middleware: Arc<MiddlewareChain>,
    storage: Option<Arc<StorageManager>>,
}

impl CrawlSession {
    pub fn new(config: CrawlConfig, handlers: HandlerRegistry, fetcher: Box<dyn Fetcher>) -> Self {
        let middleware = Arc::new(MiddlewareChain::standard(&config));
        Self {
            config,
            handlers: Arc::new(handlers),
            fetcher,
            middleware,
            storage: None,
        }
    }

    /// Registers storage for persisted output, including the failure log.
    pub fn with_storage(mut self, storage: StorageManager) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Replaces the stock middleware chain.
    pub fn with_middleware(mut self, middleware: MiddlewareChain) -> Self {
        self.middleware = Arc::new(middleware);
        self
    }

    /// Runs one crawl with a registry of the session's own making.
    pub async fn run(
        &self,
        entries: Vec<LaunchEntry>,
        use_proxy: bool,
    ) -> ScraperResult<RunResult> {
        let registry = Arc::new(CrawlStateRegistry::new());
        self.run_with_registry(registry, entries, use_proxy).await
    }

    /// Runs one crawl against a caller-held registry handle, so external
    /// collaborators (an admin interrupt, for instance) can inspect or flip
    /// task states while the run is in flight.
    pub async fn run_with_registry(
        &self,
        registry: Arc<CrawlStateRegistry>,
        entries: Vec<LaunchEntry>,
        use_proxy: bool,
    ) -> ScraperResult<RunResult> {
        let start = Instant::now();
        registry.build(entries.iter().map(|e| e.descriptor.clone()).collect())?;

        let proxy = if use_proxy {
            debug!("initialized proxy pool");
            Some(Arc::new(ProxyPool::new(&self.config.proxy)))
        } else {
            None
        };

        let (tx, rx) = mpsc::channel::<QueueItem>(self.config.queue_capacity);
        debug!(
            "initialized record queue (capacity {})",
            self.config.queue_capacity
        );
        let stats = StatsTracker::new();

        let launcher = SpiderLauncher::new(
            entries,
            Arc::clone(&registry),
            Arc::clone(&self.middleware),
            proxy,
            self.fetcher.box_clone(),
            tx,
            self.storage.clone(),
            stats.clone(),
            self.config.acceptable_run_duration,
        );
        let pipeline = RecordPipeline::new(
            rx,
            Arc::clone(&registry),
            Arc::clone(&self.handlers),
            stats.clone(),
        );

        let (launched, listened) = tokio::join!(launcher.launch(), pipeline.listen());

        // The registry must come down even when the run failed, so the next
        // run starts from an empty one.
        registry.clear();
        stats.finish();
        stats.print_summary();

        let broken = launched?;
        listened?;

        Ok(RunResult {
            broken_tasks: broken.len(),
            duration: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CrawlContext, RecordPayload, ScrapedRecord, Spider, TaskDescriptor};
    use crate::fetch::{MockFetcher, MockResponse};
    use crate::pipeline::{FieldKind, FieldSchema, RecordWriter};
    use crate::storage::base::StorageError;
    use crate::{ScraperError, ScraperResult};
    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};
    use parking_lot::Mutex;
    use serde_json::json;

    struct BookSpider;

    impl Spider for BookSpider {
        fn name(&self) -> String {
            "book_spider".to_string()
        }

        fn records<'a>(
            &'a self,
            ctx: &'a CrawlContext,
        ) -> BoxStream<'a, ScraperResult<RecordPayload>> {
            Box::pin(stream::once(async move {
                // A proxy-less run hands out no sessions; the task proceeds
                // without one.
                assert!(ctx.proxy_session(false).await.is_none());
                Ok(json!({"title": "Dune", "price": 9.99})
                    .as_object()
                    .unwrap()
                    .clone())
            }))
        }
    }

    struct ErrSpider;

    impl Spider for ErrSpider {
        fn name(&self) -> String {
            "err_spider".to_string()
        }

        fn records<'a>(
            &'a self,
            _ctx: &'a CrawlContext,
        ) -> BoxStream<'a, ScraperResult<RecordPayload>> {
            Box::pin(stream::iter(vec![Err(ScraperError::ExtractionError(
                "bad markup".to_string(),
            ))]))
        }
    }

    #[derive(Clone, Default)]
    struct CollectingWriter {
        persisted: Arc<Mutex<Vec<ScrapedRecord>>>,
        fail: bool,
    }

    #[async_trait]
    impl RecordWriter for CollectingWriter {
        async fn persist(
            &self,
            _descriptor: &TaskDescriptor,
            record: &ScrapedRecord,
        ) -> ScraperResult<()> {
            if self.fail {
                return Err(StorageError::OperationError("disk full".to_string()).into());
            }
            self.persisted.lock().push(record.clone());
            Ok(())
        }
    }

    fn session_with(writer: Arc<CollectingWriter>) -> CrawlSession {
        let handlers = HandlerRegistry::new().register(
            "books",
            FieldSchema::new()
                .with_field("title", FieldKind::String)
                .with_field("price", FieldKind::Float),
            writer,
        );
        let config = CrawlConfig::default().with_queue_capacity(8);
        let fetcher = Box::new(MockFetcher::new(vec![MockResponse::new(200, "")]));
        CrawlSession::new(config, handlers, fetcher)
    }

    #[tokio::test]
    async fn test_run_persists_records_and_clears_registry() {
        let writer = Arc::new(CollectingWriter::default());
        let session = session_with(Arc::clone(&writer));
        let registry = Arc::new(CrawlStateRegistry::new());

        let entries = vec![LaunchEntry::new(
            TaskDescriptor::new(1, "books", "books.example.com"),
            Arc::new(BookSpider),
        )];
        let result = session
            .run_with_registry(Arc::clone(&registry), entries, false)
            .await
            .unwrap();

        assert_eq!(result.broken_tasks, 0);
        assert_eq!(writer.persisted.lock().len(), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_failed_run_still_clears_registry() {
        let writer = Arc::new(CollectingWriter {
            fail: true,
            ..Default::default()
        });
        let session = session_with(Arc::clone(&writer));
        let registry = Arc::new(CrawlStateRegistry::new());

        let entries = vec![LaunchEntry::new(
            TaskDescriptor::new(1, "books", "books.example.com"),
            Arc::new(BookSpider),
        )];
        let result = session
            .run_with_registry(Arc::clone(&registry), entries, false)
            .await;

        assert!(matches!(result, Err(ScraperError::StorageError(_))));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_run_reports_broken_tasks() {
        let writer = Arc::new(CollectingWriter::default());
        let session = session_with(Arc::clone(&writer));

        let entries = vec![
            LaunchEntry::new(
                TaskDescriptor::new(1, "books", "books.example.com"),
                Arc::new(BookSpider),
            ),
            LaunchEntry::new(
                TaskDescriptor::new(2, "books", "news.example.com"),
                Arc::new(ErrSpider),
            ),
        ];
        let result = session.run(entries, false).await.unwrap();

        assert_eq!(result.broken_tasks, 1);
        assert_eq!(writer.persisted.lock().len(), 1);
        assert!(result.duration_seconds() >= 0.0);
    }
}
