pub mod core;
pub mod fetch;
pub mod launcher;
pub mod middleware;
pub mod pipeline;
pub mod proxy;
pub mod registry;
pub mod session;
pub mod stats;
pub mod storage;

pub mod examples;

pub use crate::core::{
    batch_stream, CrawlConfig, CrawlContext, ProxyCredentials, ProxySettings, RecordPayload,
    ScrapedRecord, ScraperError, ScraperResult, Spider, TaskDescriptor, TaskId,
};
pub use crate::fetch::{Fetcher, HttpFetcher};
pub use crate::launcher::{BrokenTask, LaunchEntry, QueueItem, SpiderLauncher};
pub use crate::middleware::{FetchResponse, MiddlewareChain, RequestContext, Verdict};
pub use crate::pipeline::{
    FieldKind, FieldSchema, HandlerRegistry, RecordPipeline, RecordSchema, RecordWriter,
    StorageWriter, TaskHandler,
};
pub use crate::proxy::{ProxyPool, ProxySession};
pub use crate::registry::{CrawlState, CrawlStateRegistry};
pub use crate::session::{CrawlSession, RunResult};
pub use crate::stats::StatsTracker;
pub use crate::storage::{create_storage, StorageCategory, StorageManager, StorageType};
